use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use reuse_distance::{OrderedSet, RedBlack, Treap};

fn rand_keys(n: usize, seed: u64) -> Vec<i64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0, n as i64 * 4)).collect()
}

// Benches -------------------------------------------------------------------------------------------------------------

fn bench_insert(c: &mut Criterion) {
    for &n in &[100, 1_000, 10_000] {
        let keys = rand_keys(n, 0xC0FFEE);

        c.bench_function(&format!("treap_insert_{n}_rand"), |b| {
            b.iter(|| {
                let mut set: Treap<i64> = Treap::with_seed(0xC0FFEE);
                for k in &keys {
                    set.insert(*k);
                }
            })
        });

        c.bench_function(&format!("redblack_insert_{n}_rand"), |b| {
            b.iter(|| {
                let mut set: RedBlack<i64> = RedBlack::new();
                for k in &keys {
                    set.insert(*k);
                }
            })
        });

        let keys_seq: Vec<i64> = (0..n as i64).collect();

        c.bench_function(&format!("treap_insert_{n}_seq"), |b| {
            b.iter(|| {
                let mut set: Treap<i64> = Treap::with_seed(0xC0FFEE);
                for k in &keys_seq {
                    set.insert(*k);
                }
            })
        });

        c.bench_function(&format!("redblack_insert_{n}_seq"), |b| {
            b.iter(|| {
                let mut set: RedBlack<i64> = RedBlack::new();
                for k in &keys_seq {
                    set.insert(*k);
                }
            })
        });
    }
}

fn bench_remove(c: &mut Criterion) {
    for &n in &[100, 1_000, 10_000] {
        let keys = rand_keys(n, 0xDEAD);

        c.bench_function(&format!("treap_remove_{n}_rand"), |b| {
            b.iter(|| {
                let mut set = Treap::with_seed(0xDEAD);
                for k in &keys {
                    set.insert(*k);
                }
                for k in &keys {
                    set.remove(k);
                }
            })
        });

        c.bench_function(&format!("redblack_remove_{n}_rand"), |b| {
            b.iter(|| {
                let mut set: RedBlack<i64> = RedBlack::new();
                for k in &keys {
                    set.insert(*k);
                }
                for k in &keys {
                    set.remove(k);
                }
            })
        });
    }
}

fn bench_count_greater(c: &mut Criterion) {
    for &n in &[100, 1_000, 10_000] {
        let keys = rand_keys(n, 0xFACE);

        let mut treap_set: Treap<i64> = Treap::with_seed(0xFACE);
        let mut rb_set: RedBlack<i64> = RedBlack::new();
        for k in &keys {
            treap_set.insert(*k);
            rb_set.insert(*k);
        }

        c.bench_function(&format!("treap_count_greater_{n}_rand"), |b| {
            b.iter(|| {
                for k in &keys {
                    let _ = treap_set.count_greater(k);
                }
            })
        });

        c.bench_function(&format!("redblack_count_greater_{n}_rand"), |b| {
            b.iter(|| {
                for k in &keys {
                    let _ = rb_set.count_greater(k);
                }
            })
        });
    }
}

// Runner --------------------------------------------------------------------------------------------------------------

criterion_group!(benches, bench_insert, bench_remove, bench_count_greater);
criterion_main!(benches);
