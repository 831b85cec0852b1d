use super::{Metric, ObjectKind, SnapshotError, UsageKey, UsageRecord, UsageSnapshot, ROOT};

fn function_record(object: u32, parent: u32, calls: f64) -> UsageRecord {
    UsageRecord::new(
        UsageKey::new(object, parent),
        ObjectKind::Function,
        "public".to_owned(),
        format!("f{object}"),
    )
    .with_metric(Metric::NumCalls, calls)
}

#[test]
pub fn same_object_different_parents_are_distinct() {
    let mut builder = UsageSnapshot::builder();
    builder.insert(function_record(100, ROOT, 1.0)).unwrap();
    builder.insert(function_record(100, 200, 3.0)).unwrap();
    let snapshot = builder.build();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(
        snapshot.get(100, ROOT).unwrap().metric(&Metric::NumCalls),
        Some(1.0)
    );
    assert_eq!(
        snapshot.get(100, 200).unwrap().metric(&Metric::NumCalls),
        Some(3.0)
    );
}

#[test]
pub fn duplicate_key_is_rejected() {
    let mut builder = UsageSnapshot::builder();
    builder.insert(function_record(100, ROOT, 1.0)).unwrap();

    assert_eq!(
        builder.insert(function_record(100, ROOT, 2.0)),
        Err(SnapshotError::DuplicateKey(UsageKey::root(100)))
    );

    // the first record survives
    let snapshot = builder.build();
    assert_eq!(
        snapshot.get(100, ROOT).unwrap().metric(&Metric::NumCalls),
        Some(1.0)
    );
}

#[test]
pub fn missing_record_differs_from_zero_metrics() {
    let mut builder = UsageSnapshot::builder();
    builder.insert(function_record(100, ROOT, 0.0)).unwrap();
    let snapshot = builder.build();

    assert!(snapshot.get(100, 200).is_none());
    assert_eq!(
        snapshot.get(100, ROOT).unwrap().metric(&Metric::NumCalls),
        Some(0.0)
    );
    assert_eq!(snapshot.get(100, ROOT).unwrap().metric(&Metric::SelfTime), None);
}

#[test]
pub fn children_of_filters_by_parent() {
    let mut builder = UsageSnapshot::builder();
    builder.insert(function_record(200, ROOT, 1.0)).unwrap();
    builder.insert(function_record(100, 200, 1.0)).unwrap();
    builder.insert(function_record(101, 200, 1.0)).unwrap();
    builder.insert(function_record(101, ROOT, 1.0)).unwrap();
    let snapshot = builder.build();

    let mut children: Vec<u32> = snapshot.children_of(200).map(|r| r.key.object).collect();
    children.sort();

    assert_eq!(children, vec![100, 101]);
    assert_eq!(snapshot.all().count(), 4);
}

#[test]
pub fn metric_names_round_trip_through_columns() {
    assert_eq!(Metric::from("num_calls"), Metric::NumCalls);
    assert_eq!(Metric::from("N_TUP_RET"), Metric::TuplesReturned);
    assert_eq!(
        Metric::from("blk_read_time"),
        Metric::Other("blk_read_time".to_owned())
    );
    assert!(Metric::from("blk_read_time").is_timing());
    assert!(Metric::SelfTime.is_timing());
    assert!(!Metric::NumScans.is_timing());
    assert_eq!(Metric::TuplesInserted.to_string(), "n_tup_ins");
}

#[test]
pub fn record_display_lists_metrics() {
    let record = function_record(100, 200, 2.0).with_metric(Metric::TotalTime, 1.5);

    assert_eq!(
        record.to_string(),
        "F public.f100 oid=100 parent=200 num_calls=2 total_time=1.5"
    );
}
