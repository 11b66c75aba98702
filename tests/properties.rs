//! Property tests for the delta codec, member filtering and field edits.

mod common;

use common::{read_zip, write_zip};
use modpatch::delta::{apply, diff};
use modpatch::document::{remove_field, set_field};
use modpatch::{FieldPath, FilterSpec, Workspace};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

fn member_name() -> impl Strategy<Value = String> {
    prop::collection::vec("[A-Za-z0-9_]{1,8}", 1..4).prop_map(|parts| parts.join("/"))
}

fn members() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(member_name(), prop::collection::vec(any::<u8>(), 0..64), 1..8)
        .prop_filter("no member may also be a directory", |map| {
            map.keys().all(|a| {
                map.keys()
                    .all(|b| a == b || !b.starts_with(&format!("{}/", a)))
            })
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn delta_reconstructs_target(
        old in prop::collection::vec(any::<u8>(), 1..512),
        new in prop::collection::vec(any::<u8>(), 1..512),
    ) {
        let patch = diff(&old, &new).unwrap();
        prop_assert_eq!(apply(&old, &patch).unwrap(), new);
    }

    #[test]
    fn delta_of_small_edit(
        old in prop::collection::vec(any::<u8>(), 16..512),
        index in any::<prop::sample::Index>(),
        byte in any::<u8>(),
    ) {
        let mut new = old.clone();
        let i = index.index(new.len());
        new[i] = byte;
        let patch = diff(&old, &new).unwrap();
        prop_assert_eq!(apply(&old, &patch).unwrap(), new);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn keep_filter_round_trip(entries in members(), mask in prop::collection::vec(any::<bool>(), 8)) {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("mod.zip");
        let list: Vec<(&str, &[u8])> = entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
            .collect();
        write_zip(&archive, &list);

        let kept: BTreeMap<String, Vec<u8>> = entries
            .iter()
            .zip(mask.iter().cycle())
            .filter(|(_, keep)| **keep)
            .map(|((k, v), _)| (k.clone(), v.clone()))
            .collect();

        let filter = FilterSpec::keep(kept.keys());
        let output = Workspace::open(&archive, &filter).unwrap().close("trw").unwrap();
        prop_assert_eq!(read_zip(&output), kept.clone());

        let filter = FilterSpec::remove(kept.keys());
        let output = Workspace::open(&archive, &filter).unwrap().close("trw").unwrap();
        let removed: BTreeMap<String, Vec<u8>> = entries
            .into_iter()
            .filter(|(k, _)| !kept.contains_key(k))
            .collect();
        prop_assert_eq!(read_zip(&output), removed);
    }

    #[test]
    fn set_then_remove_field(
        keys in prop::collection::vec("[a-z]{1,6}", 1..4),
        value in any::<i64>(),
    ) {
        let field = FieldPath::parse(&keys.join("."));
        let (parents, _) = keys.split_at(keys.len() - 1);

        let mut doc = json!({"Existing": true});
        {
            let mut cursor = &mut doc;
            for key in parents {
                cursor = cursor
                    .as_object_mut()
                    .unwrap()
                    .entry(key.clone())
                    .or_insert_with(|| json!({}));
            }
        }

        set_field(&mut doc, &field, json!(value), Path::new("doc.json")).unwrap();
        let mut cursor = &doc;
        for key in &keys {
            cursor = &cursor[key.as_str()];
        }
        prop_assert_eq!(cursor, &json!(value));
        prop_assert_eq!(&doc["Existing"], &Value::Bool(true));

        prop_assert!(remove_field(&mut doc, &field));
        prop_assert!(!remove_field(&mut doc, &field));
    }

    #[test]
    fn set_field_needs_parents(keys in prop::collection::vec("[a-z]{1,6}", 2..4)) {
        let field = FieldPath::parse(&keys.join("."));
        let mut doc = json!({});
        prop_assert!(set_field(&mut doc, &field, json!(1), Path::new("doc.json")).is_err());
        prop_assert_eq!(doc, json!({}));
    }
}
