// tests/property_diff.rs
use std::collections::BTreeMap;
use std::path::PathBuf;

use proptest::prelude::*;
use watchrun::fs::mock::mtime;
use watchrun::types::ChangeKind;
use watchrun::watch::Snapshot;

// Small key/time spaces so the two snapshots overlap often.
fn snapshot_strategy() -> impl Strategy<Value = BTreeMap<String, u64>> {
    proptest::collection::btree_map("[a-e]{1,2}", 0..4u64, 0..12)
}

fn to_snapshot(map: &BTreeMap<String, u64>) -> Snapshot {
    map.iter()
        .map(|(k, v)| (PathBuf::from(k), mtime(*v)))
        .collect()
}

proptest! {
    #[test]
    fn diff_describes_exactly_the_differences(
        prev in snapshot_strategy(),
        next in snapshot_strategy(),
    ) {
        let a = to_snapshot(&prev);
        let b = to_snapshot(&next);
        let batch = a.diff(&b);

        prop_assert_eq!(batch.is_empty(), a == b);

        let mut seen = std::collections::HashSet::new();
        for change in &batch {
            let key = change.path.to_string_lossy().into_owned();
            prop_assert!(seen.insert(key.clone()), "path reported twice: {}", key);

            match change.kind {
                ChangeKind::Create => {
                    prop_assert!(!prev.contains_key(&key));
                    prop_assert_eq!(change.modified, mtime(next[&key]));
                }
                ChangeKind::Delete => {
                    prop_assert!(!next.contains_key(&key));
                    prop_assert_eq!(change.modified, mtime(prev[&key]));
                }
                ChangeKind::Modify => {
                    prop_assert_ne!(prev[&key], next[&key]);
                    prop_assert_eq!(change.modified, mtime(next[&key]));
                }
            }
        }

        let expected = prev.keys().chain(next.keys())
            .filter(|k| prev.get(*k) != next.get(*k))
            .collect::<std::collections::HashSet<_>>()
            .len();
        prop_assert_eq!(batch.len(), expected);

        // Creates always trail deletes and modifies.
        let first_create = batch.iter().position(|c| c.kind == ChangeKind::Create);
        if let Some(idx) = first_create {
            prop_assert!(batch.as_slice()[idx..].iter().all(|c| c.kind == ChangeKind::Create));
        }
    }
}
