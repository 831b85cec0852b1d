pub mod cases;
pub mod context;


pub use context::RunContext;

use crate::{
    assertion::AssertionResult,
    collector::CollectError,
    database::ConnectionError,
    registry::UnresolvedName,
};
use globset::GlobMatcher;
use itertools::Itertools;
use std::{fmt, thread, time::Duration};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// name prefix every test case has to carry
pub const TEST_PREFIX: &str = "test_";

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Unresolvable name")]
    UnresolvedName(#[from] UnresolvedName),
    #[error("Failed to collect usage")]
    Collect(#[from] CollectError),
}

impl From<ConnectionError> for HarnessError {
    fn from(error: ConnectionError) -> Self {
        HarnessError::Collect(CollectError::Connection(error))
    }
}

impl HarnessError {
    /// harness programming errors only end the current test case
    pub fn aborts_run(&self) -> bool {
        match self {
            Self::UnresolvedName(_) => false,
            Self::Collect(_) => true,
        }
    }
}

pub type TestFn = fn(&mut RunContext) -> Result<(), HarnessError>;

#[derive(Clone, Copy)]
pub struct TestCase {
    pub name: &'static str,
    pub run: TestFn,
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase").field("name", &self.name).finish()
    }
}

impl TestCase {
    pub const fn new(name: &'static str, run: TestFn) -> Self {
        Self { name, run }
    }
}

/// Ordered set of test cases
#[derive(Debug, Default, Clone)]
pub struct Suite {
    cases: Vec<TestCase>,
}

impl Suite {
    pub fn new() -> Self {
        Self::default()
    }

    /// register a case, names must carry the test prefix and be unique
    pub fn register(&mut self, case: TestCase) -> &mut Self {
        if !case.name.starts_with(TEST_PREFIX) {
            warn!(name = case.name, "Ignoring test case without the '{TEST_PREFIX}' prefix");
        } else if self.cases.iter().any(|existing| existing.name == case.name) {
            warn!(name = case.name, "Ignoring duplicate test case");
        } else {
            self.cases.push(case);
            self.cases.sort_by_key(|case| case.name);
        }

        self
    }

    /// keep only the cases whose name matches the glob
    pub fn filter(mut self, matcher: &GlobMatcher) -> Self {
        self.cases.retain(|case| matcher.is_match(case.name));
        self
    }

    /// cases in execution order
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.cases.iter().map(|case| case.name).collect_vec()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl FromIterator<TestCase> for Suite {
    fn from_iter<I: IntoIterator<Item = TestCase>>(iter: I) -> Self {
        let mut suite = Suite::new();
        for case in iter {
            suite.register(case);
        }

        suite
    }
}

#[derive(Debug)]
pub struct CaseSummary {
    pub name: &'static str,
    pub results: Vec<AssertionResult>,
    // set if the case ended early
    pub error: Option<String>,
}

impl CaseSummary {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|result| result.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn success(&self) -> bool {
        self.error.is_none() && self.failed() == 0
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub cases: Vec<CaseSummary>,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.cases.iter().all(CaseSummary::success)
    }

    pub fn passed(&self) -> usize {
        self.cases.iter().map(CaseSummary::passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.cases.iter().map(CaseSummary::failed).sum()
    }

    pub fn errored(&self) -> usize {
        self.cases.iter().filter(|case| case.error.is_some()).count()
    }

    pub fn case(&self, name: &str) -> Option<&CaseSummary> {
        self.cases.iter().find(|case| case.name == name)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for case in self.cases.iter() {
            write!(
                f,
                "{} {}: {} passed, {} failed",
                if case.success() { "ok  " } else { "FAIL" },
                case.name,
                case.passed(),
                case.failed()
            )?;
            if let Some(ref error) = case.error {
                write!(f, " (aborted: {error})")?;
            }
            writeln!(f)?;
        }

        write!(
            f,
            "{} cases, {} assertions passed, {} failed, {} cases aborted",
            self.cases.len(),
            self.passed(),
            self.failed(),
            self.errored()
        )
    }
}

/// Runs a suite case by case on a shared context
#[derive(Debug)]
pub struct TestRunner {
    suite: Suite,
    settle_delay: Duration,
}

impl TestRunner {
    pub fn new(suite: Suite) -> Self {
        Self {
            suite,
            settle_delay: Duration::ZERO,
        }
    }

    /// fixed wait after every test case, for sources that publish counters asynchronously
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// execute all cases in order
    ///
    /// Assertion failures and unresolvable names are recorded and the run goes
    /// on, connection or collection failures end the run. Created objects are
    /// left in place.
    #[instrument(skip_all, level = "info", fields(cases = self.suite.len()))]
    pub fn run(&self, context: &mut RunContext) -> Result<RunSummary, HarnessError> {
        let mut summary = RunSummary::default();
        let total = self.suite.len();

        for (index, case) in self.suite.cases().iter().enumerate() {
            context.write_line(&format!("{} Running test: {}", "=".repeat(10), case.name));
            info!(case = case.name, "Running test case ({}/{total})", index + 1);

            let result = (case.run)(context);
            let results = context.take_results();

            match result {
                Ok(()) => {
                    summary.cases.push(CaseSummary {
                        name: case.name,
                        results,
                        error: None,
                    });
                }
                Err(error) if !error.aborts_run() => {
                    error!(case = case.name, error = ?error, "Test case aborted: {error}");
                    context.write_line(&format!("ERROR {}: {error}", case.name));

                    summary.cases.push(CaseSummary {
                        name: case.name,
                        results,
                        error: Some(error_chain(&error)),
                    });
                }
                Err(error) => {
                    error!(case = case.name, error = ?error, "Run aborted: {error}");

                    return Err(error);
                }
            }

            if !self.settle_delay.is_zero() {
                debug!(delay = ?self.settle_delay, "Waiting for statistics to settle");
                thread::sleep(self.settle_delay);
            }
        }

        info!(
            passed = summary.passed(),
            failed = summary.failed(),
            "Done with processing"
        );

        Ok(summary)
    }
}

/// error message including all sources
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();

    while let Some(inner) = source {
        message.push_str(&format!(": {inner}"));
        source = inner.source();
    }

    message
}
