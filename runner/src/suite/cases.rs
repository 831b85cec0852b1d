use super::{HarnessError, RunContext, Suite, TestCase};
use crate::{
    usage::Metric,
    workload::{Statement, Workload},
};

/// fixed delay of the innermost test function
pub const SLEEP_MS: u64 = 10;
/// rows inserted by the table test cases
pub const SERIES_ROWS: u32 = 100;

/// cases build on each other, `ff2` calls the `ff1` of the first case
pub fn builtin() -> Suite {
    [
        TestCase::new("test_01_simple_function", simple_function),
        TestCase::new("test_02_nested_functions", nested_functions),
        TestCase::new("test_03_repeated_nested_calls", repeated_nested_calls),
        TestCase::new("test_04_table_access", table_access),
        TestCase::new("test_05_nested_table_access", nested_table_access),
        TestCase::new("test_06_cumulative_without_reset", cumulative_without_reset),
    ]
    .into_iter()
    .collect()
}

fn simple_function(ctx: &mut RunContext) -> Result<(), HarnessError> {
    ctx.create_function("ff1", [Statement::sleep_ms(SLEEP_MS)])?;

    let usage = ctx.measure(&Workload::new().call("ff1"))?;
    ctx.assert_calls(&usage, "ff1", None, 1)?;
    ctx.assert_time(&usage, "ff1", None, Metric::TotalTime, 10.0)?;
    ctx.assert_time(&usage, "ff1", None, Metric::SelfTime, 10.0)?;

    Ok(())
}

fn nested_functions(ctx: &mut RunContext) -> Result<(), HarnessError> {
    ctx.create_function("ff2", [Statement::call("ff1")])?;

    let usage = ctx.measure(&Workload::new().call("ff2"))?;
    ctx.assert_calls(&usage, "ff2", None, 1)?;
    ctx.assert_time(&usage, "ff2", None, Metric::TotalTime, 10.0)?;
    ctx.assert_time(&usage, "ff2", None, Metric::SelfTime, 1.0)?;

    ctx.assert_calls(&usage, "ff1", Some("ff2"), 1)?;
    ctx.assert_time(&usage, "ff1", Some("ff2"), Metric::TotalTime, 10.0)?;
    ctx.assert_time(&usage, "ff1", Some("ff2"), Metric::SelfTime, 10.0)?;

    ctx.assert_time_consistency(&usage, "ff2")?;

    Ok(())
}

fn repeated_nested_calls(ctx: &mut RunContext) -> Result<(), HarnessError> {
    let usage = ctx.measure(&Workload::new().call("ff2").call("ff2"))?;

    ctx.assert_calls(&usage, "ff2", None, 2)?;
    ctx.assert_time(&usage, "ff2", None, Metric::TotalTime, 20.0)?;

    ctx.assert_calls(&usage, "ff1", Some("ff2"), 2)?;
    ctx.assert_time(&usage, "ff1", Some("ff2"), Metric::TotalTime, 20.0)?;
    ctx.assert_time(&usage, "ff1", Some("ff2"), Metric::SelfTime, 20.0)?;

    Ok(())
}

fn table_access(ctx: &mut RunContext) -> Result<(), HarnessError> {
    ctx.create_table("tt1")?;

    let usage = ctx.measure(&Workload::from(vec![Statement::insert_series(
        "tt1",
        SERIES_ROWS,
    )]))?;
    ctx.assert_count(&usage, "tt1", None, Metric::NumScans, 0)?;
    ctx.assert_count(&usage, "tt1", None, Metric::TuplesInserted, SERIES_ROWS.into())?;

    let usage = ctx.measure(&Workload::from(vec![Statement::count_rows("tt1")]))?;
    ctx.assert_count(&usage, "tt1", None, Metric::NumScans, 1)?;
    ctx.assert_count(&usage, "tt1", None, Metric::TuplesReturned, SERIES_ROWS.into())?;

    Ok(())
}

/// table access from inside a function is attributed to that function
fn nested_table_access(ctx: &mut RunContext) -> Result<(), HarnessError> {
    ctx.create_function("ff3", [Statement::count_rows("tt1")])?;

    let usage = ctx.measure(&Workload::new().call("ff3"))?;
    ctx.assert_calls(&usage, "ff3", None, 1)?;
    ctx.assert_count(&usage, "tt1", Some("ff3"), Metric::NumScans, 1)?;
    ctx.assert_count(
        &usage,
        "tt1",
        Some("ff3"),
        Metric::TuplesReturned,
        SERIES_ROWS.into(),
    )?;

    Ok(())
}

/// counters keep growing across workloads until they are reset
fn cumulative_without_reset(ctx: &mut RunContext) -> Result<(), HarnessError> {
    let once = ctx.measure(&Workload::new().call("ff1"))?;
    ctx.assert_calls(&once, "ff1", None, 1)?;

    let twice = ctx.accumulate(&Workload::new().call("ff1"))?;
    ctx.assert_calls(&twice, "ff1", None, 2)?;
    ctx.assert_time(&twice, "ff1", None, Metric::TotalTime, 20.0)?;
    ctx.assert_time(&twice, "ff1", None, Metric::SelfTime, 20.0)?;

    ctx.reset()?;
    let cleared = ctx.collect()?;
    ctx.assert_no_usage(&cleared, "ff1", None)?;

    Ok(())
}
