use crate::{
    collector::{build_snapshot, CollectError, OBJECT_COLUMN, PARENT_COLUMN},
    database::{RawUsage, RawValue},
    usage::{Metric, ObjectKind, ROOT},
};

fn raw(columns: &[&str], rows: Vec<Vec<RawValue>>) -> RawUsage {
    RawUsage {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

#[test]
pub fn converts_timings_and_keeps_unknown_metrics() {
    let raw = raw(
        &[
            "object_oid",
            "parent_oid",
            "object_type",
            "object_schema",
            "object_name",
            "num_calls",
            "total_time",
            "self_time",
            "blk_read_time",
            "calls_per_moon",
        ],
        vec![vec![
            RawValue::Int(16384),
            RawValue::Int(0),
            RawValue::Text("F".to_owned()),
            RawValue::Text("public".to_owned()),
            RawValue::Text("ff1".to_owned()),
            RawValue::Int(2),
            RawValue::Int(20_500),
            RawValue::Float(1500.0),
            RawValue::Int(3000),
            RawValue::Int(7),
        ]],
    );

    let snapshot = build_snapshot(&raw).unwrap();
    let record = snapshot.get(16384, ROOT).unwrap();

    assert_eq!(record.kind, ObjectKind::Function);
    assert_eq!(record.name, "ff1");
    assert_eq!(record.metric(&Metric::NumCalls), Some(2.0));
    assert_eq!(record.metric(&Metric::TotalTime), Some(20.5));
    assert_eq!(record.metric(&Metric::SelfTime), Some(1.5));
    assert_eq!(record.metric(&Metric::from("blk_read_time")), Some(3.0));
    assert_eq!(record.metric(&Metric::from("calls_per_moon")), Some(7.0));
}

#[test]
pub fn only_key_columns_are_required() {
    let snapshot = build_snapshot(&raw(
        &["parent_oid", "object_oid", "num_scans"],
        vec![vec![RawValue::Int(5), RawValue::Int(7), RawValue::Null]],
    ))
    .unwrap();
    let record = snapshot.get(7, 5).unwrap();

    assert_eq!(record.name, "");
    assert_eq!(record.metric(&Metric::NumScans), None);
}

#[test]
pub fn missing_key_column_fails() {
    let result = build_snapshot(&raw(&["object_oid", "num_calls"], vec![]));

    assert!(matches!(
        result,
        Err(CollectError::MissingColumn(PARENT_COLUMN))
    ));
}

#[test]
pub fn negative_or_text_keys_fail() {
    let result = build_snapshot(&raw(
        &["object_oid", "parent_oid"],
        vec![
            vec![RawValue::Int(1), RawValue::Int(0)],
            vec![RawValue::Int(-1), RawValue::Int(0)],
        ],
    ));

    assert!(matches!(
        result,
        Err(CollectError::InvalidKey {
            column: OBJECT_COLUMN,
            row: 1
        })
    ));

    let result = build_snapshot(&raw(
        &["object_oid", "parent_oid"],
        vec![vec![RawValue::Int(1), RawValue::Text("x".to_owned())]],
    ));

    assert!(matches!(
        result,
        Err(CollectError::InvalidKey {
            column: PARENT_COLUMN,
            ..
        })
    ));
}

#[test]
pub fn duplicate_rows_fail() {
    let result = build_snapshot(&raw(
        &["object_oid", "parent_oid"],
        vec![
            vec![RawValue::Int(1), RawValue::Int(0)],
            vec![RawValue::Int(1), RawValue::Int(0)],
        ],
    ));

    assert!(matches!(result, Err(CollectError::Snapshot(_))));
}
