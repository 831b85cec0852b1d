use super::{simulated::SimulatedConnection, ConnectionError};
use crate::{
    collector::build_snapshot,
    usage::{Metric, ObjectKind, Oid, UsageSnapshot, ROOT},
    workload::{FunctionDef, Statement},
};

fn snapshot(connection: &SimulatedConnection) -> UsageSnapshot {
    build_snapshot(&connection.fetch_usage()).unwrap()
}

fn metric(snapshot: &UsageSnapshot, object: Oid, parent: Oid, metric: Metric) -> f64 {
    snapshot
        .get(object, parent)
        .and_then(|record| record.metric(&metric))
        .unwrap()
}

/// ff1 sleeps, ff2 calls ff1
fn nested(connection: &mut SimulatedConnection) -> (Oid, Oid) {
    let ff1 = connection.create_function(&FunctionDef::new("ff1", [Statement::sleep_ms(10)]));
    let ff2 = connection.create_function(&FunctionDef::new("ff2", [Statement::call("ff1")]));

    (ff1, ff2)
}

#[test]
pub fn calls_are_attributed_to_the_immediate_caller() {
    let mut connection = SimulatedConnection::default();
    let (ff1, ff2) = nested(&mut connection);

    connection.execute(&Statement::call("ff2")).unwrap();
    let usage = snapshot(&connection);

    assert_eq!(usage.len(), 2);
    assert_eq!(metric(&usage, ff2, ROOT, Metric::NumCalls), 1.0);
    assert_eq!(metric(&usage, ff1, ff2, Metric::NumCalls), 1.0);
    assert!(usage.get(ff1, ROOT).is_none());

    let record = usage.get(ff1, ff2).unwrap();
    assert_eq!(record.kind, ObjectKind::Function);
    assert_eq!(record.name, "ff1");
}

#[test]
pub fn total_time_is_self_time_plus_children() {
    let mut connection = SimulatedConnection::new(20, 1);
    let (ff1, ff2) = nested(&mut connection);

    connection.execute(&Statement::call("ff2")).unwrap();
    let usage = snapshot(&connection);

    let total = metric(&usage, ff2, ROOT, Metric::TotalTime);
    let own = metric(&usage, ff2, ROOT, Metric::SelfTime);
    let child = metric(&usage, ff1, ff2, Metric::TotalTime);

    assert!(own <= total);
    assert!((total - (own + child)).abs() < 1e-9);
    assert!((total - 10.04).abs() < 1e-9);
    assert!((own - 0.02).abs() < 1e-9);
}

#[test]
pub fn timings_are_exact_without_overhead() {
    let mut connection = SimulatedConnection::new(0, 0);
    let (ff1, _) = nested(&mut connection);

    connection.execute(&Statement::call("ff1")).unwrap();
    let usage = snapshot(&connection);

    assert_eq!(metric(&usage, ff1, ROOT, Metric::TotalTime), 10.0);
    assert_eq!(metric(&usage, ff1, ROOT, Metric::SelfTime), 10.0);
    assert_eq!(connection.clock(), 10_000);
}

#[test]
pub fn counters_accumulate_until_reset() {
    let mut connection = SimulatedConnection::new(0, 0);
    let (ff1, _) = nested(&mut connection);

    connection.execute(&Statement::call("ff1")).unwrap();
    connection.execute(&Statement::call("ff1")).unwrap();
    let usage = snapshot(&connection);
    assert_eq!(metric(&usage, ff1, ROOT, Metric::NumCalls), 2.0);
    assert_eq!(metric(&usage, ff1, ROOT, Metric::TotalTime), 20.0);

    connection.reset();
    assert!(connection.fetch_usage().rows.is_empty());
    assert!(snapshot(&connection).is_empty());
}

#[test]
pub fn table_access_is_attributed_to_the_running_function() {
    let mut connection = SimulatedConnection::default();
    let tt1 = connection.create_table("tt1");
    let ff3 = connection.create_function(&FunctionDef::new("ff3", [Statement::count_rows("tt1")]));

    connection.execute(&Statement::insert_series("tt1", 100)).unwrap();
    connection.execute(&Statement::call("ff3")).unwrap();
    let usage = snapshot(&connection);

    assert_eq!(metric(&usage, tt1, ROOT, Metric::TuplesInserted), 100.0);
    assert_eq!(metric(&usage, tt1, ROOT, Metric::NumScans), 0.0);
    assert_eq!(metric(&usage, tt1, ff3, Metric::NumScans), 1.0);
    assert_eq!(metric(&usage, tt1, ff3, Metric::TuplesReturned), 100.0);
    assert_eq!(usage.get(tt1, ff3).unwrap().kind, ObjectKind::Table);
}

#[test]
pub fn replaced_function_keeps_its_oid() {
    let mut connection = SimulatedConnection::default();
    let first = connection.create_function(&FunctionDef::new("ff", [Statement::Null]));
    let second = connection.create_function(&FunctionDef::new("ff", [Statement::sleep_ms(1)]));
    assert_eq!(first, second);

    let table = connection.create_table("tt");
    let recreated = connection.create_table("tt");
    assert_ne!(table, recreated);
}

#[test]
pub fn unknown_objects_and_raw_sql_are_rejected() {
    let mut connection = SimulatedConnection::default();

    assert!(matches!(
        connection.execute(&Statement::call("missing")),
        Err(ConnectionError::UnknownObject(name)) if name == "missing"
    ));
    assert!(matches!(
        connection.execute(&Statement::count_rows("missing")),
        Err(ConnectionError::UnknownObject(_))
    ));
    assert!(matches!(
        connection.execute(&Statement::Raw("SELECT 1".to_owned())),
        Err(ConnectionError::Unsupported(_))
    ));
}

#[test]
pub fn unbounded_recursion_hits_the_depth_limit() {
    let mut connection = SimulatedConnection::default();
    connection.create_function(&FunctionDef::new("again", [Statement::call("again")]));
    let (ff1, _) = nested(&mut connection);

    assert!(matches!(
        connection.execute(&Statement::call("again")),
        Err(ConnectionError::StackDepthExceeded(_))
    ));

    // nothing of the failed recursion is reported
    assert!(connection.fetch_usage().rows.is_empty());

    // the call stack is unwound, later calls are counted at the root again
    connection.execute(&Statement::call("ff1")).unwrap();
    let usage = snapshot(&connection);
    assert_eq!(metric(&usage, ff1, ROOT, Metric::NumCalls), 1.0);
}

#[test]
pub fn failed_calls_are_not_counted() {
    let mut connection = SimulatedConnection::default();
    let broken = connection.create_function(&FunctionDef::new(
        "broken",
        [Statement::sleep_ms(1), Statement::call("missing")],
    ));

    assert!(connection.execute(&Statement::call("broken")).is_err());
    assert!(snapshot(&connection).get(broken, ROOT).is_none());
}
