use std::sync::Mutex;

use lazy_static::lazy_static;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use smallvec::SmallVec;

use crate::arena::{Handle, NodeArena, NULL_HANDLE};
use crate::ordered_set::OrderedSet;

/// Inline capacity of the reusable descent-path scratch buffer. Deep enough
/// to cover the expected depth of a treap holding many millions of
/// elements (`~2 * log2(n)`) without spilling to the heap.
const PATH_INLINE: usize = 64;

lazy_static! {
    /// Process-wide PRNG, initialized lazily on first use. Every [`Treap`]
    /// constructed via [`Treap::new`]/[`Treap::with_capacity`] draws one
    /// seed from this to initialize its own, independent per-set PRNG - so
    /// two sets never share a priority stream, but the whole process only
    /// pays one entropy-gathering cost.
    static ref PROCESS_RNG: Mutex<SmallRng> = Mutex::new(SmallRng::from_entropy());
}

fn draw_process_seed() -> u64 {
    PROCESS_RNG
        .lock()
        .expect("process RNG mutex poisoned")
        .next_u64()
}

struct Slot<K> {
    key: K,
    priority: u64,
    subtree_size: u32,
    left: Handle,
    right: Handle,
}

/// A treap: simultaneously a binary search tree on `key` and a max-heap on
/// a randomly-drawn `priority`. Random priorities make tree shape
/// independent of insertion order, so expected depth is `O(log n)` even for
/// an already-sorted input stream.
pub struct Treap<K: Ord + Copy> {
    arena: NodeArena<Slot<K>>,
    root: Handle,
    rng: SmallRng,
    // Reusable descent-path scratch buffer: cleared and refilled on every
    // insert/remove, never reallocated once it reaches its working depth.
    path: SmallVec<[Handle; PATH_INLINE]>,
}

impl<K: Ord + Copy> Treap<K> {
    /// Construct a set whose treap priorities are drawn from a PRNG seeded
    /// with `seed`, for deterministic tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_seed_and_capacity(seed, 0)
    }

    /// Construct a set whose treap priorities are drawn from a PRNG seeded
    /// with `seed`, pre-sizing the arena for `capacity` elements.
    pub fn with_seed_and_capacity(seed: u64, capacity: usize) -> Self {
        Treap {
            arena: NodeArena::with_capacity(capacity),
            root: NULL_HANDLE,
            rng: SmallRng::seed_from_u64(seed),
            path: SmallVec::new(),
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

    /// Promote `node`'s left child above it. Returns the new subtree root
    /// (the promoted child). Recomputes `subtree_size` on `node` (now the
    /// lower node) first, then on the promoted node, per the spec's
    /// child-first-then-parent ordering.
    fn rotate_right(&mut self, node: Handle) -> Handle {
        let new_root = self.arena.get(node).left;
        debug_assert_ne!(new_root, NULL_HANDLE, "rotate_right requires a left child");
        let new_root_right = self.arena.get(new_root).right;

        self.arena.get_mut(node).left = new_root_right;
        self.arena.get_mut(new_root).right = node;

        self.recompute_size(node);
        self.recompute_size(new_root);
        new_root
    }

    /// Promote `node`'s right child above it. Mirror image of
    /// [`Treap::rotate_right`].
    fn rotate_left(&mut self, node: Handle) -> Handle {
        let new_root = self.arena.get(node).right;
        debug_assert_ne!(new_root, NULL_HANDLE, "rotate_left requires a right child");
        let new_root_left = self.arena.get(new_root).left;

        self.arena.get_mut(node).right = new_root_left;
        self.arena.get_mut(new_root).left = node;

        self.recompute_size(node);
        self.recompute_size(new_root);
        new_root
    }

    /// Relink whatever pointed at `old_child` (the root's slot, or a
    /// parent's left/right field) to point at `new_child` instead.
    fn relink(&mut self, parent: Option<Handle>, old_child: Handle, new_child: Handle) {
        match parent {
            None => self.root = new_child,
            Some(p) => {
                if self.arena.get(p).left == old_child {
                    self.arena.get_mut(p).left = new_child;
                } else {
                    debug_assert_eq!(self.arena.get(p).right, old_child);
                    self.arena.get_mut(p).right = new_child;
                }
            }
        }
    }
}

impl<K: Ord + Copy> OrderedSet<K> for Treap<K> {
    fn new() -> Self {
        Self::with_capacity(0)
    }

    fn with_capacity(capacity: usize) -> Self {
        Self::with_seed_and_capacity(draw_process_seed(), capacity)
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
            let handle = self.arena.alloc();
            self.arena.set(
                handle,
                Slot {
                    key,
                    priority: self.rng.next_u64(),
                    subtree_size: 1,
                    left: NULL_HANDLE,
                    right: NULL_HANDLE,
                },
            );
            self.root = handle;
            return true;
        }

        self.path.clear();
        let mut cur = self.root;
        let attach_handle: Handle;
        loop {
            let slot = self.arena.get(cur);
            let next = match key.cmp(&slot.key) {
                std::cmp::Ordering::Less => slot.left,
                std::cmp::Ordering::Greater => slot.right,
                std::cmp::Ordering::Equal => return false,
            };
            self.path.push(cur);
            if next == NULL_HANDLE {
                attach_handle = cur;
                break;
            }
            cur = next;
        }

        let new_handle = self.arena.alloc();
        self.arena.set(
            new_handle,
            Slot {
                key,
                priority: self.rng.next_u64(),
                subtree_size: 1,
                left: NULL_HANDLE,
                right: NULL_HANDLE,
            },
        );
        if key < self.arena.get(attach_handle).key {
            self.arena.get_mut(attach_handle).left = new_handle;
        } else {
            self.arena.get_mut(attach_handle).right = new_handle;
        }

        // Bubble up while the heap property is violated.
        let mut cur = new_handle;
        loop {
            let parent = match self.path.last() {
                Some(&p) => p,
                None => break,
            };
            if self.arena.get(cur).priority <= self.arena.get(parent).priority {
                break;
            }
            self.path.pop();
            let cur_is_left = self.arena.get(cur).key < self.arena.get(parent).key;
            let new_subtree_root = if cur_is_left {
                self.rotate_right(parent)
            } else {
                self.rotate_left(parent)
            };
            debug_assert_eq!(new_subtree_root, cur);
            let grandparent = self.path.last().copied();
            self.relink(grandparent, parent, cur);
        }

        // Remaining ancestors above the stopping point weren't touched by a
        // rotation, so their cached subtree_size needs a manual +1.
        for &ancestor in self.path.iter() {
            self.arena.get_mut(ancestor).subtree_size += 1;
        }
        true
    }

    fn remove(&mut self, key: &K) -> bool {
        self.path.clear();
        let mut cur = self.root;
        loop {
            if cur == NULL_HANDLE {
                return false;
            }
            let slot = self.arena.get(cur);
            match key.cmp(&slot.key) {
                std::cmp::Ordering::Less => {
                    self.path.push(cur);
                    cur = slot.left;
                }
                std::cmp::Ordering::Greater => {
                    self.path.push(cur);
                    cur = slot.right;
                }
                std::cmp::Ordering::Equal => break,
            }
        }

        // Rotate `cur` down to a leaf, bubbling the higher-priority child up.
        loop {
            let (left, right) = {
                let slot = self.arena.get(cur);
                (slot.left, slot.right)
            };
            let new_subtree_root = match (left, right) {
                (NULL_HANDLE, NULL_HANDLE) => break,
                (NULL_HANDLE, _right) => self.rotate_left(cur),
                (_left, NULL_HANDLE) => self.rotate_right(cur),
                (left, right) => {
                    if self.arena.get(right).priority < self.arena.get(left).priority {
                        self.rotate_right(cur)
                    } else {
                        self.rotate_left(cur)
                    }
                }
            };
            let parent = self.path.last().copied();
            self.relink(parent, cur, new_subtree_root);
            self.path.push(new_subtree_root);
        }

        let parent = self.path.last().copied();
        self.relink(parent, cur, NULL_HANDLE);
        self.arena.free(cur);

        for &ancestor in self.path.iter() {
            self.arena.get_mut(ancestor).subtree_size -= 1;
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
        is_bst(self) && treap_heap_ok(self) && subtree_sizes_ok(self)
    }
}

/// In-order traversal yields keys in strictly ascending order.
fn is_bst<K: Ord + Copy>(set: &Treap<K>) -> bool {
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

/// Every non-root node's priority is strictly less than its parent's.
fn treap_heap_ok<K: Ord + Copy>(set: &Treap<K>) -> bool {
    if set.root == NULL_HANDLE {
        return true;
    }
    let mut stack = vec![set.root];
    while let Some(h) = stack.pop() {
        let slot = set.arena.get(h);
        let parent_priority = slot.priority;
        for child in [slot.left, slot.right] {
            if child != NULL_HANDLE {
                if set.arena.get(child).priority >= parent_priority {
                    return false;
                }
                stack.push(child);
            }
        }
    }
    true
}

/// Every node's `subtree_size` equals 1 + its children's sizes.
fn subtree_sizes_ok<K: Ord + Copy>(set: &Treap<K>) -> bool {
    fn check<K: Ord + Copy>(set: &Treap<K>, handle: Handle) -> Option<u32> {
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

fn walk_in_order<K: Ord + Copy>(set: &Treap<K>, mut visit: impl FnMut(K)) {
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn empty_set_boundary_behaviors() {
        let set: Treap<i32> = Treap::with_seed(1);
        assert_eq!(set.len(), 0);
        assert!(set.is_empty());
        assert!(!set.contains(&0));
        assert_eq!(set.count_greater(&0), 0);
        assert!(set.validate());
    }

    #[test]
    fn single_element_round_trip() {
        let mut set: Treap<i32> = Treap::with_seed(2);
        assert!(set.insert(42));
        assert!(!set.is_empty());
        assert!(set.contains(&42));
        assert!(set.remove(&42));
        assert!(!set.contains(&42));
        assert_eq!(set.len(), 0);
        assert!(set.is_empty());
        assert!(set.validate());
    }

    #[test]
    fn ascending_run_defeats_naive_bst_degeneracy() {
        let mut set: Treap<i32> = Treap::with_seed(3);
        for i in 1..=100 {
            assert!(set.insert(i));
        }
        assert_eq!(set.len(), 100);
        for i in 1..=100 {
            assert!(set.contains(&i));
        }
        for i in 101..=200 {
            assert!(!set.contains(&i));
        }
        assert!(set.validate());
    }

    #[test]
    fn remove_evens_then_remove_again_is_idempotent() {
        let mut set: Treap<i32> = Treap::with_seed(4);
        for i in 1..=100 {
            set.insert(i);
        }
        let mut evens: Vec<i32> = (2..=100).step_by(2).collect();
        // "randomized order" per spec scenario 2 - deterministic shuffle.
        evens.reverse();
        for e in &evens {
            assert!(set.remove(e));
        }
        assert_eq!(set.len(), 50);
        for i in (1..=100).step_by(2) {
            assert!(set.contains(&i));
        }
        for e in &evens {
            assert!(!set.contains(e));
        }
        assert!(set.validate());

        for e in &evens {
            assert!(!set.remove(e));
        }
        assert_eq!(set.len(), 50);
        assert!(set.validate());
    }

    #[test]
    fn insert_is_idempotent() {
        let mut set: Treap<i32> = Treap::with_seed(5);
        assert!(set.insert(7));
        assert!(!set.insert(7));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn count_greater_matches_in_order_traversal() {
        let mut set: Treap<i32> = Treap::with_seed(6);
        for i in [10, 5, 20, 1, 7, 15, 30] {
            set.insert(i);
        }
        for probe in -5..40 {
            let expected = [10, 5, 20, 1, 7, 15, 30]
                .iter()
                .filter(|&&k| k > probe)
                .count();
            assert_eq!(set.count_greater(&probe), expected, "probe={probe}");
        }
    }

    #[test]
    fn stress_against_shadow_btreeset() {
        let mut set: Treap<i32> = Treap::with_seed(0xC0FFEE);
        let mut shadow: BTreeSet<i32> = BTreeSet::new();
        let mut rng = SmallRng::seed_from_u64(0xC0FFEE);

        for round in 0..2_000 {
            let key = (rng.next_u64() % 500) as i32;
            if round % 3 == 0 {
                let was_new = set.insert(key);
                assert_eq!(was_new, shadow.insert(key));
            } else {
                let was_present = set.remove(&key);
                assert_eq!(was_present, shadow.remove(&key));
            }
            assert_eq!(set.len(), shadow.len());
            if round % 50 == 0 {
                assert!(set.validate());
            }
        }

        for k in -10..510 {
            assert_eq!(set.contains(&k), shadow.contains(&k));
        }
        assert!(set.validate());
    }
}
