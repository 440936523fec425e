use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

fn validate_tree<V: Clone>(t: &RadixTree<V>, model_len: usize) {
    let issues = t.verify_integrity();
    assert!(issues.is_empty(), "tree invariants broken: {issues:#?}");
    assert_eq!(t.len(), model_len, "entry count must match the model");
    // A radix tree never needs more than two nodes per key.
    assert!(
        t.node_count() <= 2 * model_len,
        "{} nodes for {} keys",
        t.node_count(),
        model_len
    );
}

/// Longest key in `m` that prefixes `query`.
fn model_prefix_entry(m: &BTreeMap<Vec<u8>, u64>, query: &[u8]) -> Option<(Vec<u8>, u64)> {
    m.iter()
        .filter(|(k, _)| query.starts_with(k))
        .max_by_key(|(k, _)| k.len())
        .map(|(k, v)| (k.clone(), *v))
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    // A small alphabet makes shared prefixes, splits and promotions common.
    prop::collection::vec(prop_oneof![Just(b'a'), Just(b'b'), Just(b'c'), Just(0u8)], 0..=8)
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 5)]
    Insert(#[proptest(strategy = "key_strategy()")] Vec<u8>, u64),
    #[proptest(weight = 2)]
    Get(#[proptest(strategy = "key_strategy()")] Vec<u8>),
    #[proptest(weight = 2)]
    PrefixEntry(#[proptest(strategy = "key_strategy()")] Vec<u8>),
    #[proptest(weight = 1)]
    PrefixNode(#[proptest(strategy = "key_strategy()")] Vec<u8>),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=500)) {
        let t: RadixTree<u64> = RadixTree::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let expected = !key.is_empty() && !m.contains_key(&key);
                    if expected {
                        m.insert(key.clone(), value);
                    }
                    prop_assert_eq!(t.insert(&key, value), expected);
                }
                Op::Get(key) => {
                    let (echo, got) = t.perfect_match(&key);
                    prop_assert_eq!(&echo, &key);
                    prop_assert_eq!(got, m.get(&key).copied());
                }
                Op::PrefixEntry(key) => {
                    prop_assert_eq!(t.longest_prefix_entry(&key), model_prefix_entry(&m, &key));
                }
                Op::PrefixNode(key) => {
                    let view = t.longest_prefix_match(&key);
                    prop_assert_eq!(view.full_key.is_some(), view.value.is_some());
                    if let Some(full) = &view.full_key {
                        prop_assert_eq!(m.get(full).copied(), view.value);
                        // The reached node shares at least its first byte with the query.
                        prop_assert_eq!(full.get(..1), key.get(..1));
                    }
                    prop_assert_eq!(t.longest_prefix_match(&key), view);
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t, m.len());
        let got = t.dump().index;
        let expected: Vec<(Vec<u8>, u64)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys: Vec<Vec<u8>> = vec![
        b"a".to_vec(),
        b"b".to_vec(),
        b"ab".to_vec(),
        b"abc".to_vec(),
        b"abd".to_vec(),
        b"ba".to_vec(),
    ];

    let mut shapes = Vec::new();
    for_each_permutation(&keys, |perm| {
        let t: RadixTree<u64> = RadixTree::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for k in perm {
            let v = k.len() as u64;
            assert!(t.insert(&k, v));
            m.insert(k, v);
        }

        validate_tree(&t, m.len());
        let got = t.dump().index;
        let expected: Vec<(Vec<u8>, u64)> = m.into_iter().collect();
        assert_eq!(got, expected);
        shapes.push(t.node_count());
    });

    // A radix tree's shape does not depend on insertion order.
    assert!(shapes.windows(2).all(|w| w[0] == w[1]), "{shapes:?}");
}
