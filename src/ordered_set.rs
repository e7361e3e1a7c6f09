/// A balanced ordered set over a small, trivially-copyable, totally-ordered
/// key type, augmented to answer order-statistic "count strictly greater
/// than" queries in `O(log n)`.
///
/// This is the interface the reuse-distance pipeline (see
/// [`crate::histogram::reuse_histogram`]) is generic over; [`crate::Treap`]
/// and [`crate::RedBlack`] are interchangeable implementations.
///
/// Every operation here is total: no operation reports an error to the
/// caller in normal use. `remove` of an absent key and `contains` of an
/// absent key are not errors, they return `false`; `insert` of an
/// already-present key is not an error, it returns `false` (was-new).
pub trait OrderedSet<K: Ord + Copy> {
    /// Construct an empty set.
    fn new() -> Self;

    /// Construct an empty set, pre-sizing the backing arena for `capacity`
    /// elements.
    fn with_capacity(capacity: usize) -> Self;

    /// Number of distinct keys currently present.
    fn len(&self) -> usize;

    /// Whether the set currently holds no keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` is currently present.
    fn contains(&self, key: &K) -> bool;

    /// Insert `key`. Returns `true` if the key was not already present
    /// (was-new); a second insert of the same key is a no-op and returns
    /// `false`.
    fn insert(&mut self, key: K) -> bool;

    /// Remove `key` if present. Returns `true` if the key was present
    /// (was-present); removing an absent key is a no-op and returns `false`.
    fn remove(&mut self, key: &K) -> bool;

    /// Number of stored keys strictly greater than `key`. `key` need not be
    /// present.
    fn count_greater(&self, key: &K) -> usize;

    /// Run the full structural verifier: BST ordering plus whatever
    /// backend-specific balance invariant applies (heap property for a
    /// treap, red/black coloring and uniform black height for a red-black
    /// tree). Intended for tests and debug assertions, not hot paths.
    fn validate(&self) -> bool;
}
