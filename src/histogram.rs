//! The reuse-distance pipeline: the external collaborator that drives an
//! [`OrderedSet`] to turn an access sequence into a reuse-distance
//! histogram. This module is glue around the engine, not part of the core
//! balanced-tree subject; see the crate root for that boundary.

use std::collections::HashMap;
use std::hash::Hash;

use crate::OrderedSet;

/// Compute the reuse-distance histogram of `sequence` using `S` (the
/// [`OrderedSet`] backend) as the order-statistic engine.
///
/// For each position, the reuse distance is the number of *distinct*
/// symbols seen strictly between the symbol's previous occurrence and its
/// current one, or `-1` if this is the symbol's first occurrence. The
/// result maps each observed reuse distance to the number of positions
/// that produced it.
///
/// Runs in `O(N log N)`: the set holds exactly one live entry per symbol
/// currently "in flight" (keyed by its last-seen time), and
/// `count_greater` answers "how many distinct symbols were touched after
/// this one was last seen" directly from the tree shape.
///
/// # Examples
///
/// ```
/// use reuse_distance::{reuse_histogram, Treap};
///
/// let hist = reuse_histogram::<_, Treap<(usize, char)>>(&['A', 'B', 'C', 'A', 'B', 'C']);
/// assert_eq!(hist.get(&-1), Some(&3));
/// assert_eq!(hist.get(&2), Some(&3));
/// ```
pub fn reuse_histogram<T, S>(sequence: &[T]) -> HashMap<i64, u64>
where
    T: Copy + Eq + Hash + Ord,
    S: OrderedSet<(usize, T)>,
{
    let mut set = S::with_capacity(sequence.len());
    let mut last: HashMap<T, usize> = HashMap::new();
    let mut hist: HashMap<i64, u64> = HashMap::new();

    for (t, &s) in sequence.iter().enumerate() {
        let distance = if let Some(&prev_t) = last.get(&s) {
            let key = (prev_t, s);
            let d = set.count_greater(&key) as i64;
            set.remove(&key);
            d
        } else {
            -1
        };
        *hist.entry(distance).or_insert(0) += 1;
        set.insert((t, s));
        last.insert(s, t);
    }

    hist
}

/// The naive `O(N^2)` reference oracle: for each position, directly counts
/// the distinct symbols between the symbol's previous occurrence and the
/// current one by rescanning the intervening slice. Exists purely as a
/// test fixture to check the pipeline's output against (see `P7` in the
/// design notes this crate's test suite is seeded from).
pub fn naive_reuse_histogram<T>(sequence: &[T]) -> HashMap<i64, u64>
where
    T: Copy + Eq + Hash,
{
    use std::collections::HashSet;

    let mut last: HashMap<T, usize> = HashMap::new();
    let mut hist: HashMap<i64, u64> = HashMap::new();

    for (t, &s) in sequence.iter().enumerate() {
        let distance = if let Some(&prev_t) = last.get(&s) {
            let mut distinct: HashSet<T> = HashSet::new();
            for &between in &sequence[prev_t + 1..t] {
                distinct.insert(between);
            }
            distinct.len() as i64
        } else {
            -1
        };
        *hist.entry(distance).or_insert(0) += 1;
        last.insert(s, t);
    }

    hist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RedBlack, Treap};

    #[test]
    fn abc_repeat_matches_worked_example() {
        let input = ['A', 'B', 'C', 'A', 'B', 'C'];
        let hist = reuse_histogram::<_, Treap<(usize, char)>>(&input);
        assert_eq!(hist.get(&-1), Some(&3));
        assert_eq!(hist.get(&2), Some(&3));
        assert_eq!(hist.values().sum::<u64>(), 6);
    }

    #[test]
    fn all_same_symbol_matches_worked_example() {
        let input = ['X', 'X', 'X'];
        let hist = reuse_histogram::<_, Treap<(usize, char)>>(&input);
        assert_eq!(hist.get(&-1), Some(&1));
        assert_eq!(hist.get(&0), Some(&2));
    }

    #[test]
    fn red_black_backend_agrees_with_treap() {
        let input = ['A', 'B', 'C', 'A', 'B', 'C'];
        let treap_hist = reuse_histogram::<_, Treap<(usize, char)>>(&input);
        let rb_hist = reuse_histogram::<_, RedBlack<(usize, char)>>(&input);
        assert_eq!(treap_hist, rb_hist);
    }

    #[test]
    fn matches_naive_oracle_on_worked_examples() {
        for input in [vec!['A', 'B', 'C', 'A', 'B', 'C'], vec!['X', 'X', 'X']] {
            let expected = naive_reuse_histogram(&input);
            let actual = reuse_histogram::<_, Treap<(usize, char)>>(&input);
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn empty_sequence_yields_empty_histogram() {
        let input: [char; 0] = [];
        let hist = reuse_histogram::<_, Treap<(usize, char)>>(&input);
        assert!(hist.is_empty());
    }
}
