/*!
Reuse-distance histograms via an arena-based, order-statistic balanced tree.

Reuse distance is a classical cache-behavior metric: for each position in an
access sequence, the number of *distinct* elements seen strictly between the
current occurrence of a symbol and its immediately previous occurrence (or a
sentinel if this is the symbol's first occurrence). Computed naively this is
an `O(n^2)` pass over the stream. This crate replaces the naive pass with a
single `O(n log n)` streaming pass, built on an augmented balanced search
tree that answers "how many stored keys are strictly greater than `k`?" in
`O(log n)`.

### About

Two interchangeable tree backends implement the same [`OrderedSet`] trait:

* [`Treap`] - randomized priority, expected `O(log n)` depth independent of
  insertion order.
* [`RedBlack`] - deterministic six-case insertion/deletion fix-up, worst-case
  `O(log n)` depth.

Both are backed by an arena ([`NodeArena`]) of reusable, integer-handle
addressed node slots: after warm-up, steady-state insert/remove cycles
allocate zero heap memory, because freed slots are recycled via a free-list
rather than returned to the allocator.

### Safety and verification

* `#![forbid(unsafe_code)]` - no raw pointer dereference, anywhere in this
  crate.
* `debug_assert!`-guarded internal invariants at every mutation site.
* [`OrderedSet::validate`] runs the full structural verifier (BST ordering,
  heap property or red/black coloring, uniform black height) and is meant
  to be exercised in tests, not production hot paths.

### Usage

```
use reuse_distance::{OrderedSet, Treap};

let mut set: Treap<i64> = Treap::new();
assert!(set.insert(5));
assert!(set.insert(2));
assert!(!set.insert(5)); // already present
assert_eq!(set.count_greater(&2), 1); // just the 5
assert!(set.remove(&5));
assert!(set.validate());
```

[`reuse_histogram`] drives either backend over an access sequence and
returns the full histogram:

```
use reuse_distance::{reuse_histogram, Treap};

let seq = ["A", "B", "C", "A", "B", "C"];
let hist = reuse_histogram::<_, Treap<(usize, &str)>>(&seq);
assert_eq!(hist.get(&-1), Some(&3)); // 3 first-sightings
assert_eq!(hist.get(&2), Some(&3));  // each repeat saw the other two symbols
```

### Non-goals

Persistence, concurrency (an [`OrderedSet`] is single-owner, single-threaded),
priority-ordered iteration, range queries, duplicate keys (insert of an
already-present key is a no-op), and arbitrary key types (keys must be
`Copy + Ord`).
*/

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod arena;
mod direction;
mod ordered_set;
mod redblack;
mod treap;

pub mod histogram;

pub use crate::arena::{Handle, NodeArena, NULL_HANDLE};
pub use crate::histogram::reuse_histogram;
pub use crate::ordered_set::OrderedSet;
pub use crate::redblack::RedBlack;
pub use crate::treap::Treap;
