use crate::{
    registry::{ObjectRegistry, UnresolvedName},
    usage::{Metric, Oid, UsageSnapshot},
};
use std::{
    fmt,
    io::{self, Write},
};
use tracing::{debug, warn};


/// Result of comparing a single expectation against a snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Pass,
    /// observed value is outside of the tolerance
    Mismatch { actual: f64 },
    /// the record exists but the source did not report this metric
    MetricNotReported,
    /// no record for this (object, parent) pair at all
    NoUsageData,
    /// counters were expected to be cleared
    UnexpectedUsage,
    /// timing of an object does not add up with its children
    Inconsistent {
        self_time: f64,
        total_time: f64,
        children_total: f64,
    },
}

impl Outcome {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssertionResult {
    pub outcome: Outcome,
    pub line: String,
}

impl AssertionResult {
    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }
}

/// "parent -> object" label for report lines
struct Pair<'a> {
    parent: Option<&'a str>,
    object: &'a str,
}

impl fmt::Display for Pair<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.parent.unwrap_or("root"), self.object)
    }
}

fn status(passed: bool) -> &'static str {
    if passed {
        "PASS"
    } else {
        "FAIL"
    }
}

/// Compares expectations against usage snapshots.
///
/// Assertions never abort: every call writes one report line to the sink,
/// dumps the whole snapshot on failure and keeps the result for the runner.
/// Only names that were never registered are returned as errors.
pub struct AssertionEngine {
    sink: Box<dyn Write>,
    results: Vec<AssertionResult>,
}

impl fmt::Debug for AssertionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionEngine")
            .field("results", &self.results)
            .finish_non_exhaustive()
    }
}

impl Default for AssertionEngine {
    fn default() -> Self {
        Self::new(Box::new(io::stdout()))
    }
}

impl AssertionEngine {
    pub fn new(sink: Box<dyn Write>) -> Self {
        Self {
            sink,
            results: Vec::new(),
        }
    }

    pub(crate) fn write_line(&mut self, line: &str) {
        if let Err(error) = writeln!(self.sink, "{line}") {
            warn!(error = ?error, "Failed to write report line: {error}");
        }
    }

    fn record(&mut self, snapshot: &UsageSnapshot, outcome: Outcome, line: String) -> Outcome {
        debug!(passed = outcome.passed(), "{line}");
        self.write_line(&line);

        if !outcome.passed() {
            for record in snapshot.all() {
                self.write_line(&record.to_string());
            }
        }

        self.results.push(AssertionResult {
            outcome: outcome.clone(),
            line,
        });

        outcome
    }

    /// check that `metric` of (object, parent) is within `tolerance` of `expected`
    #[allow(clippy::too_many_arguments)]
    pub fn assert_value(
        &mut self,
        snapshot: &UsageSnapshot,
        registry: &ObjectRegistry,
        object: &str,
        parent: Option<&str>,
        metric: &Metric,
        expected: f64,
        tolerance: f64,
    ) -> Result<Outcome, UnresolvedName> {
        let object_oid = registry.resolve(object)?;
        let parent_oid = registry.resolve_parent(parent)?;
        let pair = Pair { parent, object };

        let (outcome, actual) = match snapshot.get(object_oid, parent_oid) {
            None => (Outcome::NoUsageData, None),
            Some(record) => match record.metric(metric) {
                None => (Outcome::MetricNotReported, None),
                Some(actual) if (actual - expected).abs() > tolerance => {
                    (Outcome::Mismatch { actual }, Some(actual))
                }
                Some(actual) => (Outcome::Pass, Some(actual)),
            },
        };

        let actual = match actual {
            Some(actual) => actual.to_string(),
            None => "-".to_owned(),
        };
        let mut line = format!(
            "{} assert_value(\"{pair}\", {metric}, expected={expected}, actual={actual})",
            status(outcome.passed())
        );
        match outcome {
            Outcome::NoUsageData => line.push_str(": no usage data!"),
            Outcome::MetricNotReported => line.push_str(": metric not reported"),
            Outcome::Mismatch { .. } => {
                line.push_str(&format!(": value outside tolerance {tolerance}"))
            }
            _ => {}
        }

        Ok(self.record(snapshot, outcome, line))
    }

    /// exact check of the number of calls
    pub fn assert_calls(
        &mut self,
        snapshot: &UsageSnapshot,
        registry: &ObjectRegistry,
        object: &str,
        parent: Option<&str>,
        calls: u64,
    ) -> Result<Outcome, UnresolvedName> {
        self.assert_value(
            snapshot,
            registry,
            object,
            parent,
            &Metric::NumCalls,
            calls as f64,
            0.0,
        )
    }

    /// check that (object, parent) has no usage: either no record or only zero metrics
    pub fn assert_no_usage(
        &mut self,
        snapshot: &UsageSnapshot,
        registry: &ObjectRegistry,
        object: &str,
        parent: Option<&str>,
    ) -> Result<Outcome, UnresolvedName> {
        let object_oid = registry.resolve(object)?;
        let parent_oid = registry.resolve_parent(parent)?;
        let pair = Pair { parent, object };

        let outcome = match snapshot.get(object_oid, parent_oid) {
            Some(record) if record.metrics.values().any(|value| *value != 0.0) => {
                Outcome::UnexpectedUsage
            }
            _ => Outcome::Pass,
        };

        let mut line = format!("{} assert_no_usage(\"{pair}\")", status(outcome.passed()));
        if outcome == Outcome::UnexpectedUsage {
            line.push_str(": counters were not reset");
        }

        Ok(self.record(snapshot, outcome, line))
    }

    /// check that the self time of an object is bounded by its total time and
    /// that its total time is its self time plus the total time of its children
    ///
    /// Children are recorded per caller object, not per (caller, grand caller)
    /// pair, so the check is done over all records of `object`.
    pub fn assert_time_consistency(
        &mut self,
        snapshot: &UsageSnapshot,
        registry: &ObjectRegistry,
        object: &str,
        tolerance: f64,
    ) -> Result<Outcome, UnresolvedName> {
        let object_oid = registry.resolve(object)?;

        let mut total_time = 0.0;
        let mut self_time = 0.0;
        let mut found = false;
        for record in snapshot.all().filter(|record| record.key.object == object_oid) {
            found = true;
            total_time += record.metric(&Metric::TotalTime).unwrap_or(0.0);
            self_time += record.metric(&Metric::SelfTime).unwrap_or(0.0);
        }
        let children_total = sum_metric(snapshot, object_oid, &Metric::TotalTime);

        let outcome = if !found {
            Outcome::NoUsageData
        } else if self_time > total_time + tolerance
            || (total_time - (self_time + children_total)).abs() > tolerance
        {
            Outcome::Inconsistent {
                self_time,
                total_time,
                children_total,
            }
        } else {
            Outcome::Pass
        };

        let mut line = format!(
            "{} assert_time_consistency(\"{object}\", self_time={self_time}, total_time={total_time}, children_total={children_total})",
            status(outcome.passed())
        );
        match outcome {
            Outcome::NoUsageData => line.push_str(": no usage data!"),
            Outcome::Inconsistent { .. } => {
                line.push_str(&format!(": timings disagree beyond tolerance {tolerance}"))
            }
            _ => {}
        }

        Ok(self.record(snapshot, outcome, line))
    }

    /// drain the results collected since the last call
    pub fn take_results(&mut self) -> Vec<AssertionResult> {
        std::mem::take(&mut self.results)
    }
}

/// sum of a metric over every record called from `parent`
fn sum_metric(snapshot: &UsageSnapshot, parent: Oid, metric: &Metric) -> f64 {
    snapshot
        .children_of(parent)
        .filter_map(|record| record.metric(metric))
        .sum()
}
