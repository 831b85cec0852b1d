use super::HarnessError;
use crate::{
    assertion::{AssertionEngine, AssertionResult, Outcome},
    collector::UsageCollector,
    database::Connection,
    registry::ObjectRegistry,
    usage::{Metric, Oid, UsageSnapshot},
    workload::{FunctionDef, Statement, Workload},
};
use std::io::Write;
use tracing::info;

pub const DEFAULT_TOLERANCE: f64 = 10.0;

/// Everything a test case works with, shared by all cases of a run
#[derive(Debug)]
pub struct RunContext {
    connection: Connection,
    registry: ObjectRegistry,
    engine: AssertionEngine,
    tolerance: f64,
}

impl RunContext {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            registry: ObjectRegistry::new(),
            engine: AssertionEngine::default(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// send report lines somewhere else than stdout
    pub fn with_sink(mut self, sink: Box<dyn Write>) -> Self {
        self.engine = AssertionEngine::new(sink);
        self
    }

    /// tolerance used by timing assertions, in ms
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// create (or replace) a test function and register its oid
    pub fn create_function<I: IntoIterator<Item = Statement>>(
        &mut self,
        name: &str,
        body: I,
    ) -> Result<Oid, HarnessError> {
        let function = FunctionDef::new(name, body);
        let oid = self.connection.create_function(&function)?;

        info!(name = name, oid = oid, "Created test function");
        self.registry.register(name, oid);

        Ok(oid)
    }

    /// create an empty test table and register its oid
    pub fn create_table(&mut self, name: &str) -> Result<Oid, HarnessError> {
        let oid = self.connection.create_table(name)?;

        info!(name = name, oid = oid, "Created test table");
        self.registry.register(name, oid);

        Ok(oid)
    }

    pub fn reset(&mut self) -> Result<(), HarnessError> {
        Ok(UsageCollector::reset(&mut self.connection)?)
    }

    pub fn collect(&mut self) -> Result<UsageSnapshot, HarnessError> {
        Ok(UsageCollector::collect(&mut self.connection)?)
    }

    /// every function a workload calls has to be a registered test object
    fn check_workload(&self, workload: &Workload) -> Result<(), HarnessError> {
        for statement in workload.statements() {
            if let Statement::Call(function) = statement {
                self.registry.resolve(function)?;
            }
        }

        Ok(())
    }

    /// reset, run the workload and collect
    pub fn measure(&mut self, workload: &Workload) -> Result<UsageSnapshot, HarnessError> {
        self.check_workload(workload)?;

        Ok(UsageCollector::measure(&mut self.connection, workload)?)
    }

    /// run the workload on top of the current counters and collect
    pub fn accumulate(&mut self, workload: &Workload) -> Result<UsageSnapshot, HarnessError> {
        self.check_workload(workload)?;

        Ok(UsageCollector::accumulate(&mut self.connection, workload)?)
    }

    pub fn assert_value(
        &mut self,
        snapshot: &UsageSnapshot,
        object: &str,
        parent: Option<&str>,
        metric: Metric,
        expected: f64,
        tolerance: f64,
    ) -> Result<Outcome, HarnessError> {
        Ok(self.engine.assert_value(
            snapshot,
            &self.registry,
            object,
            parent,
            &metric,
            expected,
            tolerance,
        )?)
    }

    /// exact comparison, for counters
    pub fn assert_count(
        &mut self,
        snapshot: &UsageSnapshot,
        object: &str,
        parent: Option<&str>,
        metric: Metric,
        expected: u64,
    ) -> Result<Outcome, HarnessError> {
        self.assert_value(snapshot, object, parent, metric, expected as f64, 0.0)
    }

    /// timing comparison with the run's tolerance
    pub fn assert_time(
        &mut self,
        snapshot: &UsageSnapshot,
        object: &str,
        parent: Option<&str>,
        metric: Metric,
        expected_ms: f64,
    ) -> Result<Outcome, HarnessError> {
        let tolerance = self.tolerance;

        self.assert_value(snapshot, object, parent, metric, expected_ms, tolerance)
    }

    pub fn assert_calls(
        &mut self,
        snapshot: &UsageSnapshot,
        object: &str,
        parent: Option<&str>,
        calls: u64,
    ) -> Result<Outcome, HarnessError> {
        Ok(self
            .engine
            .assert_calls(snapshot, &self.registry, object, parent, calls)?)
    }

    pub fn assert_no_usage(
        &mut self,
        snapshot: &UsageSnapshot,
        object: &str,
        parent: Option<&str>,
    ) -> Result<Outcome, HarnessError> {
        Ok(self
            .engine
            .assert_no_usage(snapshot, &self.registry, object, parent)?)
    }

    pub fn assert_time_consistency(
        &mut self,
        snapshot: &UsageSnapshot,
        object: &str,
    ) -> Result<Outcome, HarnessError> {
        let tolerance = self.tolerance;

        Ok(self
            .engine
            .assert_time_consistency(snapshot, &self.registry, object, tolerance)?)
    }

    pub(crate) fn write_line(&mut self, line: &str) {
        self.engine.write_line(line);
    }

    pub(crate) fn take_results(&mut self) -> Vec<AssertionResult> {
        self.engine.take_results()
    }
}
