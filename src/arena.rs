use smallvec::SmallVec;

/// Inline capacity of the free-list's small-vector backing store, chosen to
/// cover most insert/remove-heavy workloads without spilling to the heap.
const FREE_LIST_INLINE: usize = 32;

/// A stable integer handle into a [`NodeArena`].
///
/// `0` ([`NULL_HANDLE`]) is reserved to mean "absent"; every handle returned
/// by [`NodeArena::alloc`] is `>= 1`. Handles are stable across arena growth
/// (slots never move once written) and are reused only after their slot is
/// explicitly freed via [`NodeArena::free`].
pub type Handle = u32;

/// The reserved "absent/null" handle value.
pub const NULL_HANDLE: Handle = 0;

/// A growable pool of node slots, indexed by stable [`Handle`]s.
///
/// Owns all node memory for an [`OrderedSet`](crate::OrderedSet) backend.
/// Slots are never moved once allocated: growth appends new slots to the
/// tail, and removal only ever clears a free-list entry, never relocates a
/// live slot. This is what lets both tree backends hold parent/child
/// back-pointers as plain integers instead of real references.
///
/// A slot is `None` from the moment it is materialized until
/// [`NodeArena::set`] publishes a value into it, and goes back to `None` the
/// moment [`NodeArena::free`] releases it - there is no requirement that the
/// node type implement `Default`, and no `unsafe` stand-in for
/// uninitialized memory is needed.
pub struct NodeArena<T> {
    slots: Vec<Option<T>>,
    free: SmallVec<[Handle; FREE_LIST_INLINE]>,
}

impl<T> NodeArena<T> {
    /// Constructor.
    pub fn new() -> Self {
        NodeArena {
            slots: Vec::new(),
            free: SmallVec::new(),
        }
    }

    /// Constructor, pre-sizing the backing storage for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        NodeArena {
            slots: Vec::with_capacity(capacity),
            free: SmallVec::new(),
        }
    }

    /// Allocate a slot, growing the arena if the free-list is empty.
    ///
    /// The returned slot holds no value until [`NodeArena::set`] is called
    /// on it; the caller is responsible for publishing a fully-initialized
    /// value before the handle is linked into a tree.
    pub fn alloc(&mut self) -> Handle {
        if let Some(handle) = self.free.pop() {
            return handle;
        }

        let old_len = self.slots.len();
        let new_len = if old_len == 0 { 1 } else { old_len * 2 };
        self.slots.resize_with(new_len, || None);

        // Seed the free list with the newly-created tail, in reverse, then
        // pop one - so the first handle handed out of a fresh doubling is
        // the lowest-numbered new slot, same as sequential allocation.
        for idx in (old_len..new_len).rev() {
            self.free.push((idx + 1) as Handle);
        }
        self.free
            .pop()
            .expect("free list was just seeded with at least one handle")
    }

    /// Publish `value` into the slot for `handle`.
    pub fn set(&mut self, handle: Handle, value: T) {
        debug_assert_ne!(handle, NULL_HANDLE, "wrote through the null handle");
        self.slots[(handle - 1) as usize] = Some(value);
    }

    /// Release a slot back to the free-list.
    ///
    /// Must not be called on a handle still referenced by any tree pointer
    /// (`left`, `right`, `parent`, or `root`). Clears the slot back to
    /// `None`; its contents are undefined until the handle is reallocated
    /// and `set` again.
    pub fn free(&mut self, handle: Handle) {
        debug_assert_ne!(handle, NULL_HANDLE, "attempted to free the null handle");
        let idx = (handle - 1) as usize;
        debug_assert!(
            idx < self.slots.len() && self.slots[idx].is_some(),
            "attempted to free an already-free or out-of-range handle"
        );
        self.slots[idx] = None;
        self.free.push(handle);
    }

    /// Borrow the slot for `handle`.
    pub fn get(&self, handle: Handle) -> &T {
        debug_assert_ne!(handle, NULL_HANDLE, "dereferenced the null handle");
        self.slots[(handle - 1) as usize]
            .as_ref()
            .expect("dereferenced a freed or unset handle")
    }

    /// Mutably borrow the slot for `handle`.
    pub fn get_mut(&mut self, handle: Handle) -> &mut T {
        debug_assert_ne!(handle, NULL_HANDLE, "dereferenced the null handle");
        self.slots[(handle - 1) as usize]
            .as_mut()
            .expect("dereferenced a freed or unset handle")
    }

    /// Number of live (allocated, not-yet-freed) slots.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Whether the arena currently holds no live slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of slots ever materialized (live + free), i.e. the
    /// backing store's current logical size.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Slot {
        value: i32,
    }

    #[test]
    fn alloc_is_sequential_and_one_based() {
        let mut arena: NodeArena<Slot> = NodeArena::new();
        let h1 = arena.alloc();
        let h2 = arena.alloc();
        let h3 = arena.alloc();
        assert_eq!(h1, 1);
        assert_eq!(h2, 2);
        assert_eq!(h3, 3);
        arena.set(h1, Slot { value: 0 });
        arena.set(h2, Slot { value: 0 });
        arena.set(h3, Slot { value: 0 });
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn free_then_alloc_recycles_handle() {
        let mut arena: NodeArena<Slot> = NodeArena::new();
        let h1 = arena.alloc();
        let h2 = arena.alloc();
        arena.set(h1, Slot { value: 111 });
        arena.set(h2, Slot { value: 222 });

        arena.free(h1);
        assert_eq!(arena.len(), 1);

        let h3 = arena.alloc();
        assert_eq!(h3, h1, "freed handle should be recycled before growing");
        arena.set(h3, Slot { value: 333 });
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn handles_are_stable_across_growth() {
        let mut arena: NodeArena<Slot> = NodeArena::new();
        let mut handles = Vec::new();
        for i in 0..100 {
            let h = arena.alloc();
            arena.set(h, Slot { value: i });
            handles.push(h);
        }
        for (i, h) in handles.iter().enumerate() {
            assert_eq!(arena.get(*h).value, i as i32);
        }
    }

    #[test]
    fn len_tracks_live_minus_freed() {
        let mut arena: NodeArena<Slot> = NodeArena::new();
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let h = arena.alloc();
                arena.set(h, Slot { value: i });
                h
            })
            .collect();
        assert_eq!(arena.len(), 10);
        for h in &handles[0..4] {
            arena.free(*h);
        }
        assert_eq!(arena.len(), 6);
    }

    #[test]
    fn with_capacity_preallocates_without_materializing_slots() {
        let arena: NodeArena<Slot> = NodeArena::with_capacity(64);
        assert!(arena.slots.capacity() >= 64);
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn capacity_tracks_materialized_slots_not_live_count() {
        let mut arena: NodeArena<Slot> = NodeArena::new();
        assert!(arena.is_empty());
        assert_eq!(arena.capacity(), 0);

        let h1 = arena.alloc();
        arena.set(h1, Slot { value: 1 });
        let h2 = arena.alloc();
        arena.set(h2, Slot { value: 2 });
        assert!(!arena.is_empty());
        assert_eq!(arena.capacity(), 2, "doubling growth from empty materializes exactly 2 slots");

        // Freeing a slot drops live-count but not the materialized capacity.
        arena.free(h1);
        assert!(!arena.is_empty());
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.capacity(), 2);

        arena.free(h2);
        assert!(arena.is_empty());
        assert_eq!(arena.capacity(), 2, "capacity never shrinks back down on free");
    }

    #[test]
    #[should_panic(expected = "dereferenced a freed or unset handle")]
    fn get_on_unset_slot_panics() {
        let mut arena: NodeArena<Slot> = NodeArena::new();
        let h = arena.alloc();
        arena.get(h);
    }
}
