use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use super::*;
use crate::test_utils::general_config;
use crate::test_utils::GeneralConfig;
use crate::test_utils::TEST_PREFIX;
use crate::FieldSpec;
use crate::KeyMap;
use crate::LiveRecord;
use crate::RecordSchema;
use crate::ValueKind;
use crate::MAX_KEY_DEPTH;

/// Descriptor of a [`GeneralConfig`] field by dotted path
fn descriptor(path: &str) -> FieldDescriptor {
    let record = serde_json::to_value(general_config()).unwrap();
    let key_map = KeyMap::build(TEST_PREFIX, &GeneralConfig::schema(), &record, MAX_KEY_DEPTH).unwrap();
    key_map
        .iter()
        .map(|(_, d)| d)
        .find(|d| d.path() == path)
        .cloned()
        .unwrap()
}

fn staged(values: &[(&str, serde_json::Value)]) -> StagedValues {
    let mut staged = StagedValues::new(MAX_KEY_DEPTH);
    for (path, value) in values {
        staged.stage(&descriptor(path), value.clone()).unwrap();
    }
    staged
}

#[derive(Debug, Serialize, Deserialize)]
struct Counted {
    level: String,
    #[serde(skip)]
    runtime_counter: u64,
}

impl LiveRecord for Counted {
    fn schema() -> RecordSchema {
        RecordSchema::new("Counted")
            .field(FieldSpec::value("level", |c: &mut Counted| &mut c.level).tags("level", "level"))
    }
}

#[test]
fn merge_into_writes_nested_leaf() {
    let mut record = general_config();

    staged(&[("log.level", json!("debug"))]).merge_into(&mut record).unwrap();

    assert_eq!(record.log.level, "debug");
    // untouched siblings keep their values
    assert_eq!(record.log.filepath, "/var/log/svc.log");
    assert_eq!(record.log.max_files, 3);
    assert_eq!(record.server.port, 8080);
}

#[test]
fn merge_into_writes_multiple_roots() {
    let mut record = general_config();

    staged(&[
        ("name", json!("payments")),
        ("server.port", json!(9090)),
        ("log.rotation", json!(true)),
    ])
    .merge_into(&mut record)
    .unwrap();

    assert_eq!(record.name, "payments");
    assert_eq!(record.server.port, 9090);
    assert!(record.log.rotation);
}

#[test]
fn merge_into_replaces_collections_wholesale() {
    let mut record = general_config();
    record.log.fields = HashMap::from([("old".to_string(), "x".to_string())]);

    staged(&[("log.fields", json!({"new": "y"}))]).merge_into(&mut record).unwrap();

    assert_eq!(
        record.log.fields,
        HashMap::from([("new".to_string(), "y".to_string())])
    );
}

#[test]
fn merge_into_keeps_fields_serde_skips() {
    let mut record = Counted {
        level: "info".to_string(),
        runtime_counter: 42,
    };
    let tree = serde_json::to_value(&record).unwrap();
    let key_map = KeyMap::build("/p", &Counted::schema(), &tree, MAX_KEY_DEPTH).unwrap();
    let mut staged = StagedValues::new(MAX_KEY_DEPTH);
    staged.stage(key_map.get("/p/level").unwrap(), json!("debug")).unwrap();

    staged.merge_into(&mut record).unwrap();

    assert_eq!(record.level, "debug");
    assert_eq!(record.runtime_counter, 42);
}

#[test]
fn merge_into_leaves_record_unchanged_on_type_mismatch() {
    let mut record = general_config();
    let before = record.clone();
    // 70000 does not fit a u16
    let staged = staged(&[("log.level", json!("debug")), ("server.port", json!(70000))]);

    let err = staged.merge_into(&mut record).unwrap_err();

    assert!(matches!(err, Error::Merge(_)));
    assert_eq!(record, before);
}

#[test]
fn merge_into_rejects_fields_of_another_record_type() {
    let mut record = Counted {
        level: "info".to_string(),
        runtime_counter: 1,
    };

    let err = staged(&[("name", json!("x"))]).merge_into(&mut record).unwrap_err();

    assert!(matches!(
        err,
        Error::Schema(SchemaError::UnreachableField { ref path }) if path == "name"
    ));
    assert_eq!(record.level, "info");
}

#[test]
fn merge_into_skips_fields_without_writer() {
    let mut record = general_config();
    let mut staged = StagedValues::new(MAX_KEY_DEPTH);
    staged
        .stage(&FieldDescriptor::new("owner", ValueKind::Opaque, Ok), json!("ops"))
        .unwrap();

    staged.merge_into(&mut record).unwrap();

    assert_eq!(record.owner, None);
}

#[test]
fn merge_into_with_nothing_staged_is_a_no_op() {
    let mut record = general_config();
    let before = record.clone();

    StagedValues::new(MAX_KEY_DEPTH).merge_into(&mut record).unwrap();

    assert_eq!(record, before);
}

#[test]
fn stage_rejects_paths_deeper_than_limit() {
    let mut staged = StagedValues::new(MAX_KEY_DEPTH);
    let five = FieldDescriptor::new("a.b.c.d.e", ValueKind::Bool, Ok);
    let six = FieldDescriptor::new("a.b.c.d.e.f", ValueKind::Bool, Ok);

    assert!(staged.stage(&five, json!(true)).is_ok());
    let err = staged.stage(&six, json!(true)).unwrap_err();
    assert!(matches!(err, SchemaError::RecursionLimitExceeded { limit: 5, .. }));
}

#[test]
fn stage_keeps_last_value_for_a_path() {
    let level = descriptor("log.level");
    let mut staged = StagedValues::new(MAX_KEY_DEPTH);
    staged.stage(&level, json!("info")).unwrap();
    staged.stage(&level, json!("warn")).unwrap();

    assert_eq!(staged.len(), 1);
    assert_eq!(staged.to_tree(), json!({"log": {"level": "warn"}}).as_object().unwrap().clone());
}

#[test]
fn to_tree_groups_values_by_root_field() {
    let staged = staged(&[
        ("log.level", json!("debug")),
        ("log.max_files", json!(7)),
        ("name", json!("svc")),
    ]);

    let tree = staged.to_tree();

    assert_eq!(tree.len(), 2);
    assert_eq!(tree["log"], json!({"level": "debug", "max_files": 7}));
    assert_eq!(tree["name"], json!("svc"));
}
