use crate::database::{Connection, ConnectionError};
use std::time::Duration;
use tracing::{debug, instrument};

/// A single step of a workload or of a test function body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// no-op
    Null,
    /// fixed delay, e.g. `pg_sleep`
    Sleep(Duration),
    /// invoke a zero argument function
    Call(String),
    /// insert `rows` generated rows into a table
    InsertSeries { table: String, rows: u32 },
    /// count all rows of a table, i.e. one full scan
    CountRows { table: String },
    /// verbatim SQL, only understood by real database connections
    Raw(String),
}

impl Statement {
    pub fn call(function: &str) -> Self {
        Self::Call(function.to_owned())
    }

    pub fn sleep_ms(millis: u64) -> Self {
        Self::Sleep(Duration::from_millis(millis))
    }

    pub fn insert_series(table: &str, rows: u32) -> Self {
        Self::InsertSeries {
            table: table.to_owned(),
            rows,
        }
    }

    pub fn count_rows(table: &str) -> Self {
        Self::CountRows {
            table: table.to_owned(),
        }
    }
}

/// Definition of a test function: a name and a body of statements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub body: Vec<Statement>,
}

impl FunctionDef {
    pub fn new<I: IntoIterator<Item = Statement>>(name: &str, body: I) -> Self {
        Self {
            name: name.to_owned(),
            body: body.into_iter().collect(),
        }
    }
}

/// Ordered list of statements executed as one logical workload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workload {
    statements: Vec<Statement>,
}

impl Workload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }

    pub fn call(self, function: &str) -> Self {
        self.then(Statement::call(function))
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl From<Vec<Statement>> for Workload {
    fn from(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

impl FromIterator<Statement> for Workload {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}

/// Runs workloads sequentially on a single connection
pub struct WorkloadExecutor;

impl WorkloadExecutor {
    /// execute all statements in order, the first failure aborts the workload
    #[instrument(skip_all, level = "debug", fields(statements = workload.len()))]
    pub fn execute(connection: &mut Connection, workload: &Workload) -> Result<(), ConnectionError> {
        for (index, statement) in workload.statements().iter().enumerate() {
            debug!(index = index, statement = ?statement, "Executing statement");
            connection.execute(statement)?;
        }

        Ok(())
    }
}
