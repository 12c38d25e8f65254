//! Property-based testing for difftree
//!
//! Uses proptest to check that every path is classified exactly once per
//! comparison, against random pairs of trees and random tables.

use ::difftree::*;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::integration::pin_tree;

/// Flat file names drawn from a small alphabet so trees overlap often
fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof!["f[0-9]{1,2}", "[a-e]{1,3}\\.txt"]
}

/// A tree: file name to content
fn tree_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(name_strategy(), "[a-z]{0,6}", 0..20)
}

fn write_tree(root: &Path, files: &BTreeMap<String, String>) {
    fs::create_dir_all(root).unwrap();
    for (name, content) in files {
        fs::write(root.join(name), content).unwrap();
    }
    pin_tree(root);
}

fn record(path: &str) -> FileRecord {
    FileRecord {
        path: path.to_string(),
        kind: EntryKind::File,
        size: 1,
        modified: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        permissions: None,
        uid: None,
        gid: None,
        digest: None,
        matched: false,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Added is B \ A, missing is A \ B, changed only within A ∩ B
    #[test]
    fn prop_two_root_set_difference(a in tree_strategy(), b in tree_strategy()) {
        let base = TempDir::new().unwrap();
        let root_a = base.path().join("a");
        let root_b = base.path().join("b");
        write_tree(&root_a, &a);
        write_tree(&root_b, &b);

        let config = ConfigBuilder::new().quick(true).build().unwrap();
        let mut sink = MemorySink::new();
        ChainController::new(config, RunState::new())
            .run(&[root_a, root_b], &mut sink)
            .unwrap();

        let keys_a: BTreeSet<String> = a.keys().map(|k| format!("/{}", k)).collect();
        let keys_b: BTreeSet<String> = b.keys().map(|k| format!("/{}", k)).collect();

        let added: BTreeSet<String> = sink.paths(ChangeKind::Added).into_iter().map(String::from).collect();
        let missing: BTreeSet<String> = sink.paths(ChangeKind::Missing).into_iter().map(String::from).collect();
        let changed: BTreeSet<String> = sink.paths(ChangeKind::Changed).into_iter().map(String::from).collect();

        let expected_added: BTreeSet<String> = keys_b.difference(&keys_a).cloned().collect();
        let expected_missing: BTreeSet<String> = keys_a.difference(&keys_b).cloned().collect();
        prop_assert_eq!(&added, &expected_added);
        prop_assert_eq!(&missing, &expected_missing);

        // Pinned mtimes leave size as the only quick-mode signal
        let expected_changed: BTreeSet<String> = a
            .iter()
            .filter(|(name, content)| b.get(*name).is_some_and(|other| other.len() != content.len()))
            .map(|(name, _)| format!("/{}", name))
            .collect();
        prop_assert_eq!(&changed, &expected_changed);

        // No path is reported twice
        prop_assert_eq!(sink.events().len(), added.len() + missing.len() + changed.len());
    }

    /// Matching a subset leaves exactly the complement for the missing pass
    #[test]
    fn prop_unmatched_records_are_missing(
        paths in prop::collection::btree_set("/[a-z]{1,8}", 0..50),
        seed in any::<u64>(),
    ) {
        let mut table = PathTable::with_capacity(paths.len()).unwrap();
        for path in &paths {
            table.insert(record(path)).unwrap();
        }
        prop_assert_eq!(table.len(), paths.len());

        let matched: BTreeSet<&String> = paths
            .iter()
            .enumerate()
            .filter(|(i, _)| (seed >> (i % 64)) & 1 == 1)
            .map(|(_, p)| p)
            .collect();
        for path in &matched {
            prop_assert!(table.match_record(path).is_some());
        }

        let mut sink = MemorySink::new();
        let stats = DiffEngine::report_missing(&table, Path::new("/next"), &mut sink).unwrap();

        let expected: Vec<&str> = paths
            .iter()
            .filter(|p| !matched.contains(p))
            .map(|p| p.as_str())
            .collect();
        prop_assert_eq!(sink.paths(ChangeKind::Missing), expected);
        prop_assert_eq!(stats.entries_missing, paths.len() - matched.len());
    }

    /// Traversal visits every record exactly once, regardless of capacity
    #[test]
    fn prop_traverse_visits_each_record_once(
        paths in prop::collection::btree_set("/[a-z]{1,4}/[a-z]{1,4}", 0..100),
        capacity in 1usize..8,
    ) {
        let mut table = PathTable::with_capacity(capacity).unwrap();
        for path in &paths {
            table.insert(record(path)).unwrap();
        }

        let mut seen = Vec::new();
        table.traverse(|r| seen.push(r.path.clone()));
        seen.sort();
        let expected: Vec<String> = paths.iter().cloned().collect();
        prop_assert_eq!(seen, expected);
    }
}
