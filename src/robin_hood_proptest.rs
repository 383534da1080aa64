#![cfg(test)]

// Property tests for RobinHoodIndex kept inside the crate so they can use
// the test-only slot inspection helpers.

use crate::arena::Handle;
use crate::robin_hood::{Entry, RobinHoodIndex};
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Clone, Debug)]
enum Op {
    Insert(u32),
    Find(u32),
    Lookup(u32),
}

// Hashes come from a small pool so that chains, wrap-around and
// displacement all show up in short op sequences.
fn arb_scenario() -> impl Strategy<Value = (usize, f64, Vec<Op>)> {
    let hash = prop_oneof![0u32..16, any::<u32>()];
    let op = prop_oneof![
        4 => hash.clone().prop_map(Op::Insert),
        1 => hash.clone().prop_map(Op::Find),
        1 => hash.prop_map(Op::Lookup),
    ];
    (
        0usize..40,
        prop_oneof![Just(0.5), Just(0.8), Just(0.95)],
        proptest::collection::vec(op, 1..200),
    )
}

// Property: State-machine equivalence against a HashMap of handle -> hash.
// Invariants exercised across random operation sequences:
// - Every inserted entry stays findable by (hash, handle), also across growth.
// - Lookup hits exactly when the model holds an entry with that hash.
// - `len` matches the model and the load factor never exceeds its maximum.
// - Adjacent occupied slots never differ in DIB by more than one step up.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((capacity, load, ops) in arb_scenario()) {
        let mut sut = if capacity == 0 {
            RobinHoodIndex::new(load)
        } else {
            RobinHoodIndex::with_capacity(capacity, load).unwrap()
        };
        let mut model: HashMap<Handle, u32> = HashMap::new();
        let mut next_raw = 1u32;

        for op in ops {
            match op {
                Op::Insert(hash) => {
                    let handle = Handle::from_raw(next_raw).unwrap();
                    next_raw += 1;
                    sut.insert(Entry::new(handle, hash)).unwrap();
                    model.insert(handle, hash);
                }
                Op::Find(hash) => {
                    let expected: Vec<Handle> = model
                        .iter()
                        .filter(|(_, &h)| h == hash)
                        .map(|(&k, _)| k)
                        .collect();
                    for handle in expected {
                        prop_assert_eq!(sut.find(hash, |c| c == handle), Some(handle));
                    }
                }
                Op::Lookup(hash) => {
                    let present = model.values().any(|&h| h == hash);
                    let got = sut.lookup(hash);
                    prop_assert_eq!(got.is_some(), present);
                    if let Some(entry) = got {
                        prop_assert_eq!(model.get(&entry.handle()), Some(&hash));
                    }
                }
            }

            prop_assert_eq!(sut.len(), model.len());
            prop_assert!(sut.len() < sut.capacity() || sut.capacity() == 0);
            prop_assert!(sut.load_factor() <= load);
            sut.assert_robin_hood_invariant();
        }

        for (&handle, &hash) in &model {
            prop_assert_eq!(sut.find(hash, |c| c == handle), Some(handle));
        }
        let mut seen: Vec<Handle> = sut.iter().map(|e| e.handle()).collect();
        seen.sort();
        let mut expected: Vec<Handle> = model.keys().copied().collect();
        expected.sort();
        prop_assert_eq!(seen, expected);
    }
}

// Property: with a load factor of at most 0.9, the longest probe stays
// within a small multiple of ln(capacity) for well-spread hashes.
proptest! {
    #![proptest_config(ProptestConfig { cases: 16, .. ProptestConfig::default() })]
    #[test]
    fn prop_max_dib_is_logarithmic(seed in any::<u64>()) {
        let mut idx = RobinHoodIndex::with_capacity(1024, 0.9).unwrap();
        let mut s = seed;
        for raw in 1..=900u32 {
            s = s.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            idx.insert(Entry::new(Handle::from_raw(raw).unwrap(), (s >> 32) as u32)).unwrap();
        }
        prop_assert_eq!(idx.capacity(), 1024);
        let bound = (8.0 * (idx.capacity() as f64).ln()) as usize;
        prop_assert!(idx.max_dib() <= bound, "max dib {} above {}", idx.max_dib(), bound);
        idx.assert_robin_hood_invariant();
    }
}
