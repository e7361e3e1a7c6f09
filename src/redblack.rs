use smallvec::SmallVec;

use crate::arena::{Handle, NodeArena, NULL_HANDLE};
use crate::direction::Direction;
use crate::ordered_set::OrderedSet;

/// The most-significant bit of the packed `parent_and_color` word. Safe to
/// steal because arena handles are `u32` indices that can never reach
/// `2^31` slots on any realistic workload.
const COLOR_BIT: u32 = 0x8000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

/// Inline capacity of the reusable descent-path scratch buffer, used only
/// to bump `subtree_size` along the insertion path; deep enough for any
/// realistically-sized tree without spilling to the heap.
const PATH_INLINE: usize = 64;

struct Slot<K> {
    /// Low 31 bits: parent handle (0 = none, i.e. this is the root).
    /// High bit: color (`1` = red, `0` = black).
    parent_and_color: u32,
    left: Handle,
    right: Handle,
    key: K,
    subtree_size: u32,
}

/// A red-black tree: deterministic balancing via the standard six-case
/// insertion fix-up and six-case deletion fix-up. Augmented with a
/// `subtree_size` field (the reference implementation this is modeled on
/// does not carry one - see `DESIGN.md`) so `count_greater` is answered the
/// same way as the treap backend, in `O(log n)`.
pub struct RedBlack<K: Ord + Copy> {
    arena: NodeArena<Slot<K>>,
    root: Handle,
    path: SmallVec<[Handle; PATH_INLINE]>,
}

impl<K: Ord + Copy> RedBlack<K> {
    fn color(&self, node: Handle) -> Color {
        if node == NULL_HANDLE {
            return Color::Black;
        }
        if self.arena.get(node).parent_and_color & COLOR_BIT != 0 {
            Color::Red
        } else {
            Color::Black
        }
    }

    fn set_color(&mut self, node: Handle, color: Color) {
        if node == NULL_HANDLE {
            return;
        }
        let slot = self.arena.get_mut(node);
        match color {
            Color::Red => slot.parent_and_color |= COLOR_BIT,
            Color::Black => slot.parent_and_color &= !COLOR_BIT,
        }
    }

    fn parent(&self, node: Handle) -> Handle {
        if node == NULL_HANDLE {
            return NULL_HANDLE;
        }
        self.arena.get(node).parent_and_color & !COLOR_BIT
    }

    fn set_parent(&mut self, node: Handle, parent: Handle) {
        let slot = self.arena.get_mut(node);
        let color_bits = slot.parent_and_color & COLOR_BIT;
        slot.parent_and_color = color_bits | (parent & !COLOR_BIT);
    }

    fn child_at(&self, node: Handle, dir: Direction) -> Handle {
        if node == NULL_HANDLE {
            return NULL_HANDLE;
        }
        let slot = self.arena.get(node);
        match dir {
            Direction::Left => slot.left,
            Direction::Right => slot.right,
        }
    }

    fn set_child_at(&mut self, node: Handle, dir: Direction, child: Handle) {
        let slot = self.arena.get_mut(node);
        match dir {
            Direction::Left => slot.left = child,
            Direction::Right => slot.right = child,
        }
    }

    /// Which child `child` is of `parent`, by pointer identity.
    fn direction_of(&self, parent: Handle, child: Handle) -> Direction {
        if self.arena.get(parent).left == child {
            Direction::Left
        } else {
            debug_assert_eq!(self.arena.get(parent).right, child);
            Direction::Right
        }
    }

    fn subtree_size(&self, handle: Handle) -> u32 {
        if handle == NULL_HANDLE {
            0
        } else {
            self.arena.get(handle).subtree_size
        }
    }

    fn recompute_size(&mut self, handle: Handle) {
        let (left, right) = {
            let slot = self.arena.get(handle);
            (slot.left, slot.right)
        };
        let size = 1 + self.subtree_size(left) + self.subtree_size(right);
        self.arena.get_mut(handle).subtree_size = size;
    }

    /// Rotate `node` toward `dir`: `dir == Left` promotes `node`'s right
    /// child (classic rotate-left); `dir == Right` promotes `node`'s left
    /// child (classic rotate-right). Fully relinks parent/child pointers in
    /// both directions and recomputes `subtree_size` on `node` (now lower)
    /// then the promoted node, child first then parent.
    fn rotate(&mut self, node: Handle, dir: Direction) -> Handle {
        let pivot = self.child_at(node, dir.reverse());
        debug_assert_ne!(pivot, NULL_HANDLE, "rotation requires a child on the promoted side");
        let pivot_near_child = self.child_at(pivot, dir);

        self.set_child_at(node, dir.reverse(), pivot_near_child);
        if pivot_near_child != NULL_HANDLE {
            self.set_parent(pivot_near_child, node);
        }

        let node_parent = self.parent(node);
        self.set_parent(pivot, node_parent);
        if node_parent == NULL_HANDLE {
            self.root = pivot;
        } else {
            let node_dir = self.direction_of(node_parent, node);
            self.set_child_at(node_parent, node_dir, pivot);
        }

        self.set_child_at(pivot, dir, node);
        self.set_parent(node, pivot);

        self.recompute_size(node);
        self.recompute_size(pivot);
        pivot
    }

    fn alloc_node(&mut self, key: K, parent: Handle) -> Handle {
        let h = self.arena.alloc();
        self.arena.set(
            h,
            Slot {
                parent_and_color: parent & !COLOR_BIT,
                left: NULL_HANDLE,
                right: NULL_HANDLE,
                key,
                subtree_size: 1,
            },
        );
        h
    }

    fn insert_fixup(&mut self, mut x: Handle) {
        while self.color(self.parent(x)) == Color::Red {
            let p = self.parent(x);
            let g = self.parent(p);
            debug_assert_ne!(g, NULL_HANDLE, "a red node's parent cannot be the root");
            let p_dir = self.direction_of(g, p);
            let uncle = self.child_at(g, p_dir.reverse());

            if self.color(uncle) == Color::Red {
                self.set_color(p, Color::Black);
                self.set_color(uncle, Color::Black);
                self.set_color(g, Color::Red);
                x = g;
                continue;
            }

            let mut x_local = x;
            let x_dir = self.direction_of(p, x_local);
            let p = if x_dir != p_dir {
                // `x` is the inner grandchild: rotate `p` toward the outer
                // side so `x` becomes the outer grandchild.
                self.rotate(p, p_dir);
                x_local = p;
                self.parent(x_local)
            } else {
                p
            };
            let g = self.parent(p);
            let new_subtree_root = self.rotate(g, p_dir.reverse());
            self.set_color(new_subtree_root, Color::Black);
            self.set_color(g, Color::Red);
            break;
        }
        self.set_color(self.root, Color::Black);
    }

    fn delete_fixup(&mut self, mut x: Handle, mut x_parent: Handle, mut x_dir: Option<Direction>) {
        while x != self.root && self.color(x) == Color::Black {
            let parent = x_parent;
            let dir = x_dir.expect("a deficient non-root position has a parent and side");
            let mut sibling = self.child_at(parent, dir.reverse());

            // D3: sibling red.
            if self.color(sibling) == Color::Red {
                self.set_color(sibling, Color::Black);
                self.set_color(parent, Color::Red);
                self.rotate(parent, dir);
                sibling = self.child_at(parent, dir.reverse());
            }

            let close = self.child_at(sibling, dir);
            let distant = self.child_at(sibling, dir.reverse());

            if self.color(close) == Color::Black && self.color(distant) == Color::Black {
                if self.color(parent) == Color::Red {
                    // D4.
                    self.set_color(sibling, Color::Red);
                    self.set_color(parent, Color::Black);
                    x = self.root;
                } else {
                    // All four (parent, sibling's both children) black: move the
                    // deficiency up one level.
                    self.set_color(sibling, Color::Red);
                    x = parent;
                    x_parent = self.parent(parent);
                    x_dir = if x_parent != NULL_HANDLE {
                        Some(self.direction_of(x_parent, parent))
                    } else {
                        None
                    };
                }
            } else {
                let mut sibling = sibling;
                let mut distant = distant;
                if self.color(distant) == Color::Black {
                    // D5: close nephew red, distant black - rotate sibling away
                    // from the deficient side, then fall into D6.
                    self.set_color(close, Color::Black);
                    self.set_color(sibling, Color::Red);
                    self.rotate(sibling, dir.reverse());
                    sibling = self.child_at(parent, dir.reverse());
                    distant = self.child_at(sibling, dir.reverse());
                }
                // D6: distant nephew red.
                self.set_color(sibling, self.color(parent));
                self.set_color(parent, Color::Black);
                self.set_color(distant, Color::Black);
                self.rotate(parent, dir);
                x = self.root;
            }
        }
        self.set_color(x, Color::Black);
    }
}

impl<K: Ord + Copy> OrderedSet<K> for RedBlack<K> {
    fn new() -> Self {
        Self::with_capacity(0)
    }

    fn with_capacity(capacity: usize) -> Self {
        RedBlack {
            arena: NodeArena::with_capacity(capacity),
            root: NULL_HANDLE,
            path: SmallVec::new(),
        }
    }

    fn len(&self) -> usize {
        self.arena.len()
    }

    fn contains(&self, key: &K) -> bool {
        let mut cur = self.root;
        while cur != NULL_HANDLE {
            let slot = self.arena.get(cur);
            cur = match key.cmp(&slot.key) {
                std::cmp::Ordering::Less => slot.left,
                std::cmp::Ordering::Greater => slot.right,
                std::cmp::Ordering::Equal => return true,
            };
        }
        false
    }

    fn insert(&mut self, key: K) -> bool {
        if self.root == NULL_HANDLE {
            let h = self.alloc_node(key, NULL_HANDLE);
            self.set_color(h, Color::Black);
            self.root = h;
            return true;
        }

        self.path.clear();
        let mut cur = self.root;
        let (parent, dir) = loop {
            self.path.push(cur);
            let slot_key = self.arena.get(cur).key;
            let next = match key.cmp(&slot_key) {
                std::cmp::Ordering::Equal => return false,
                std::cmp::Ordering::Less => (self.arena.get(cur).left, Direction::Left),
                std::cmp::Ordering::Greater => (self.arena.get(cur).right, Direction::Right),
            };
            if next.0 == NULL_HANDLE {
                break (cur, next.1);
            }
            cur = next.0;
        };

        let h = self.alloc_node(key, parent);
        self.set_color(h, Color::Red);
        self.set_child_at(parent, dir, h);

        for &ancestor in self.path.iter().rev() {
            self.recompute_size(ancestor);
        }

        self.insert_fixup(h);
        true
    }

    fn remove(&mut self, key: &K) -> bool {
        let mut z = self.root;
        loop {
            if z == NULL_HANDLE {
                return false;
            }
            let zk = self.arena.get(z).key;
            match key.cmp(&zk) {
                std::cmp::Ordering::Equal => break,
                std::cmp::Ordering::Less => z = self.arena.get(z).left,
                std::cmp::Ordering::Greater => z = self.arena.get(z).right,
            }
        }

        // Two children: copy the in-order successor's key into `z` and
        // retarget physical deletion at the successor, which has at most
        // one child. This is behaviorally identical to the spec's
        // structural node swap for a key-only set (no external code holds
        // a handle across a `remove` call) and avoids the extra pointer
        // bookkeeping a full structural swap needs.
        if self.arena.get(z).left != NULL_HANDLE && self.arena.get(z).right != NULL_HANDLE {
            let mut succ = self.arena.get(z).right;
            while self.arena.get(succ).left != NULL_HANDLE {
                succ = self.arena.get(succ).left;
            }
            let succ_key = self.arena.get(succ).key;
            self.arena.get_mut(z).key = succ_key;
            z = succ;
        }

        let child = {
            let slot = self.arena.get(z);
            if slot.left != NULL_HANDLE {
                slot.left
            } else {
                slot.right
            }
        };
        let z_parent = self.parent(z);
        let z_color = self.color(z);
        let z_dir = if z_parent != NULL_HANDLE {
            Some(self.direction_of(z_parent, z))
        } else {
            None
        };

        if child != NULL_HANDLE {
            self.set_parent(child, z_parent);
        }
        match z_dir {
            None => self.root = child,
            Some(dir) => self.set_child_at(z_parent, dir, child),
        }

        let mut ancestor = z_parent;
        while ancestor != NULL_HANDLE {
            self.arena.get_mut(ancestor).subtree_size -= 1;
            ancestor = self.parent(ancestor);
        }

        self.arena.free(z);

        if z_color == Color::Black {
            self.delete_fixup(child, z_parent, z_dir);
        }
        true
    }

    fn count_greater(&self, key: &K) -> usize {
        let mut cur = self.root;
        let mut count = 0usize;
        while cur != NULL_HANDLE {
            let slot = self.arena.get(cur);
            match key.cmp(&slot.key) {
                std::cmp::Ordering::Less => {
                    count += 1 + self.subtree_size(slot.right) as usize;
                    cur = slot.left;
                }
                std::cmp::Ordering::Greater => {
                    cur = slot.right;
                }
                std::cmp::Ordering::Equal => {
                    count += self.subtree_size(slot.right) as usize;
                    break;
                }
            }
        }
        count
    }

    fn validate(&self) -> bool {
        is_bst(self)
            && rb_no_red_red(self)
            && rb_black_height_uniform(self).is_some()
            && parent_pointers_ok(self)
            && subtree_sizes_ok(self)
    }
}

fn is_bst<K: Ord + Copy>(set: &RedBlack<K>) -> bool {
    let mut prev: Option<K> = None;
    let mut ok = true;
    walk_in_order(set, |key| {
        if let Some(p) = prev {
            if !(p < key) {
                ok = false;
            }
        }
        prev = Some(key);
    });
    ok
}

/// Root is black; no red node has a red child.
fn rb_no_red_red<K: Ord + Copy>(set: &RedBlack<K>) -> bool {
    if set.color(set.root) != Color::Black {
        return false;
    }
    if set.root == NULL_HANDLE {
        return true;
    }
    let mut stack = vec![set.root];
    while let Some(h) = stack.pop() {
        let slot = set.arena.get(h);
        let this_color = set.color(h);
        for child in [slot.left, slot.right] {
            if child != NULL_HANDLE {
                if this_color == Color::Red && set.color(child) == Color::Red {
                    return false;
                }
                stack.push(child);
            }
        }
    }
    true
}

/// Every root-to-null path crosses the same number of black nodes. Returns
/// `None` on mismatch, `Some(black_height)` otherwise.
fn rb_black_height_uniform<K: Ord + Copy>(set: &RedBlack<K>) -> Option<u32> {
    fn recurse<K: Ord + Copy>(set: &RedBlack<K>, handle: Handle) -> Option<u32> {
        if handle == NULL_HANDLE {
            return Some(1); // null leaves count as black
        }
        let slot = set.arena.get(handle);
        let left = recurse(set, slot.left)?;
        let right = recurse(set, slot.right)?;
        if left != right {
            return None;
        }
        let own = if set.color(handle) == Color::Black { 1 } else { 0 };
        Some(left + own)
    }
    recurse(set, set.root)
}

/// Every non-root node's parent field points to its actual parent, and
/// left/right pointers are consistent in both directions.
fn parent_pointers_ok<K: Ord + Copy>(set: &RedBlack<K>) -> bool {
    if set.root == NULL_HANDLE {
        return true;
    }
    if set.parent(set.root) != NULL_HANDLE {
        return false;
    }
    let mut stack = vec![set.root];
    while let Some(h) = stack.pop() {
        let slot = set.arena.get(h);
        for child in [slot.left, slot.right] {
            if child != NULL_HANDLE {
                if set.parent(child) != h {
                    return false;
                }
                stack.push(child);
            }
        }
    }
    true
}

fn subtree_sizes_ok<K: Ord + Copy>(set: &RedBlack<K>) -> bool {
    fn check<K: Ord + Copy>(set: &RedBlack<K>, handle: Handle) -> Option<u32> {
        if handle == NULL_HANDLE {
            return Some(0);
        }
        let slot = set.arena.get(handle);
        let left = check(set, slot.left)?;
        let right = check(set, slot.right)?;
        let expected = 1 + left + right;
        if expected == slot.subtree_size {
            Some(expected)
        } else {
            None
        }
    }
    check(set, set.root).is_some()
}

fn walk_in_order<K: Ord + Copy>(set: &RedBlack<K>, mut visit: impl FnMut(K)) {
    let mut stack = Vec::new();
    let mut cur = set.root;
    loop {
        while cur != NULL_HANDLE {
            stack.push(cur);
            cur = set.arena.get(cur).left;
        }
        match stack.pop() {
            None => break,
            Some(h) => {
                visit(set.arena.get(h).key);
                cur = set.arena.get(h).right;
            }
        }
    }
}
