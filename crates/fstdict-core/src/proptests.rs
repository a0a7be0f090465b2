//! Model-based tests: the FST must agree with a `BTreeMap` reference on
//! enumeration order, per-key outputs, and seek results.

use std::collections::BTreeMap;
use std::ops::Bound;

use proptest::prelude::*;

use crate::builder::Builder;
use crate::enumerate::FstEnum;
use crate::fst::{Fst, InputType};
use crate::outputs::IntOutputs;

fn key_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop_oneof![
        // Empty key
        Just(Vec::new()),
        // Short keys over the full byte range
        prop::collection::vec(0u32..=255, 1..4),
        // Longer keys over a tiny alphabet, to exercise shared prefixes
        // and suffix sharing hard
        prop::collection::vec(0u32..=7, 1..10),
        // Word-like keys
        "[a-d]{1,8}".prop_map(|s| s.bytes().map(u32::from).collect()),
    ]
}

fn model_strategy() -> impl Strategy<Value = BTreeMap<Vec<u32>, u64>> {
    prop::collection::btree_map(key_strategy(), 0u64..1000, 0..48)
}

fn build(model: &BTreeMap<Vec<u32>, u64>) -> Option<Fst<IntOutputs>> {
    let mut builder = Builder::new(InputType::Byte1, IntOutputs);
    for (key, &value) in model {
        builder.add(key, value).unwrap();
    }
    builder.finish().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn proptest_round_trip_vs_btreemap(model in model_strategy()) {
        let fst = build(&model);
        prop_assert_eq!(fst.is_some(), !model.is_empty());
        if let Some(fst) = fst {
            let mut en = FstEnum::new(&fst);
            let mut seen = Vec::new();
            while let Some(entry) = en.next() {
                seen.push((entry.input, entry.output));
            }
            let expected: Vec<_> = model.iter().map(|(k, &v)| (k.clone(), v)).collect();
            prop_assert_eq!(seen, expected);
        }
    }

    #[test]
    fn proptest_seeks_vs_btreemap(
        model in model_strategy(),
        probes in prop::collection::vec(key_strategy(), 1..16),
    ) {
        if let Some(fst) = build(&model) {
            let mut en = FstEnum::new(&fst);
            for probe in &probes {
                let exact = en.seek_exact(probe).map(|e| (e.input, e.output));
                prop_assert_eq!(exact, model.get(probe).map(|&v| (probe.clone(), v)));

                let floor = en.seek_floor(probe).map(|e| (e.input, e.output));
                let expected_floor = model
                    .range(..=probe.clone())
                    .next_back()
                    .map(|(k, &v)| (k.clone(), v));
                prop_assert_eq!(floor, expected_floor);

                let ceil = en.seek_ceil(probe).map(|e| (e.input, e.output));
                let expected_ceil = model
                    .range(probe.clone()..)
                    .next()
                    .map(|(k, &v)| (k.clone(), v));
                prop_assert_eq!(&ceil, &expected_ceil);

                // a seek positions the enumerator on the key it landed on
                let after = en.next().map(|e| (e.input, e.output));
                let expected_after = match &expected_ceil {
                    Some((k, _)) => model
                        .range((Bound::Excluded(k.clone()), Bound::Unbounded))
                        .next()
                        .map(|(k, &v)| (k.clone(), v)),
                    None => None,
                };
                prop_assert_eq!(after, expected_after);
            }
        }
    }
}
