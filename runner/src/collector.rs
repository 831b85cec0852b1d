use crate::{
    database::{Connection, ConnectionError, RawUsage, RawValue},
    usage::{Metric, ObjectKind, Oid, SnapshotError, UsageKey, UsageRecord, UsageSnapshot},
    workload::{Workload, WorkloadExecutor},
};
use thiserror::Error;
use tracing::{debug, error, instrument, trace};

pub const OBJECT_COLUMN: &str = "object_oid";
pub const PARENT_COLUMN: &str = "parent_oid";
pub const TYPE_COLUMN: &str = "object_type";
pub const SCHEMA_COLUMN: &str = "object_schema";
pub const NAME_COLUMN: &str = "object_name";

const IDENTITY_COLUMNS: [&str; 5] = [
    OBJECT_COLUMN,
    PARENT_COLUMN,
    TYPE_COLUMN,
    SCHEMA_COLUMN,
    NAME_COLUMN,
];

/// the source reports timings in microseconds, snapshots hold milliseconds
pub const MICROS_PER_MILLI: f64 = 1000.0;

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Failed to talk to the instrumented system")]
    Connection(#[from] ConnectionError),
    #[error("Usage source does not expose the required column '{0}'")]
    MissingColumn(&'static str),
    #[error("Row {row} has an invalid value in key column '{column}'")]
    InvalidKey { column: &'static str, row: usize },
    #[error("Usage source returned an inconsistent snapshot")]
    Snapshot(#[from] SnapshotError),
}

/// position of every column of interest in the raw table
#[derive(Debug)]
struct ColumnLayout {
    object: usize,
    parent: usize,
    kind: Option<usize>,
    schema: Option<usize>,
    name: Option<usize>,
    metrics: Vec<(usize, Metric)>,
}

impl ColumnLayout {
    /// discover the layout, only the two key columns are required
    fn discover(raw: &RawUsage) -> Result<Self, CollectError> {
        let object = raw
            .column_index(OBJECT_COLUMN)
            .ok_or(CollectError::MissingColumn(OBJECT_COLUMN))?;
        let parent = raw
            .column_index(PARENT_COLUMN)
            .ok_or(CollectError::MissingColumn(PARENT_COLUMN))?;

        let metrics = raw
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| !IDENTITY_COLUMNS.contains(&column.as_str()))
            .map(|(index, column)| (index, Metric::from(column.as_str())))
            .collect();

        Ok(Self {
            object,
            parent,
            kind: raw.column_index(TYPE_COLUMN),
            schema: raw.column_index(SCHEMA_COLUMN),
            name: raw.column_index(NAME_COLUMN),
            metrics,
        })
    }
}

fn key_value(
    row: &[RawValue],
    index: usize,
    column: &'static str,
    row_number: usize,
) -> Result<Oid, CollectError> {
    row.get(index)
        .and_then(RawValue::as_i64)
        .and_then(|value| Oid::try_from(value).ok())
        .ok_or(CollectError::InvalidKey {
            column,
            row: row_number,
        })
}

fn text_value(row: &[RawValue], index: Option<usize>) -> String {
    index
        .and_then(|index| row.get(index))
        .and_then(RawValue::as_text)
        .unwrap_or_default()
        .to_owned()
}

/// Convert a raw usage table into a snapshot
pub fn build_snapshot(raw: &RawUsage) -> Result<UsageSnapshot, CollectError> {
    let layout = ColumnLayout::discover(raw)?;
    trace!(layout = ?layout, "Discovered usage columns");

    let mut builder = UsageSnapshot::builder();

    for (row_number, row) in raw.rows.iter().enumerate() {
        let key = UsageKey::new(
            key_value(row, layout.object, OBJECT_COLUMN, row_number)?,
            key_value(row, layout.parent, PARENT_COLUMN, row_number)?,
        );
        let mut record = UsageRecord::new(
            key,
            ObjectKind::from_code(&text_value(row, layout.kind)),
            text_value(row, layout.schema),
            text_value(row, layout.name),
        );

        for (index, metric) in layout.metrics.iter() {
            match row.get(*index) {
                Some(RawValue::Null) | None => {}
                Some(value) => match value.as_f64() {
                    Some(value) if metric.is_timing() => {
                        record
                            .metrics
                            .insert(metric.clone(), value / MICROS_PER_MILLI);
                    }
                    Some(value) => {
                        record.metrics.insert(metric.clone(), value);
                    }
                    None => {
                        trace!(metric = %metric, value = ?value, "Ignoring non-numeric column");
                    }
                },
            }
        }

        builder.insert(record)?;
    }

    Ok(builder.build())
}

/// Resets, drives and reads the server side usage counters
pub struct UsageCollector;

impl UsageCollector {
    /// zero the counters of all instrumented objects
    pub fn reset(connection: &mut Connection) -> Result<(), CollectError> {
        debug!("Resetting usage counters");

        connection.reset().map_err(CollectError::from)
    }

    /// fetch the current counters as a new snapshot, no retries
    #[instrument(skip_all, level = "debug")]
    pub fn collect(connection: &mut Connection) -> Result<UsageSnapshot, CollectError> {
        let raw = match connection.fetch_usage() {
            Ok(raw) => raw,
            Err(error) => {
                error!(error = ?error, "Failed to fetch usage rows: {error}");

                return Err(error.into());
            }
        };

        let snapshot = build_snapshot(&raw)?;
        debug!(records = snapshot.len(), "Collected usage snapshot");

        Ok(snapshot)
    }

    /// measure a workload in isolation: reset, run, collect
    pub fn measure(
        connection: &mut Connection,
        workload: &Workload,
    ) -> Result<UsageSnapshot, CollectError> {
        Self::reset(connection)?;
        Self::accumulate(connection, workload)
    }

    /// run a workload on top of the current counters and collect
    pub fn accumulate(
        connection: &mut Connection,
        workload: &Workload,
    ) -> Result<UsageSnapshot, CollectError> {
        WorkloadExecutor::execute(connection, workload)?;
        Self::collect(connection)
    }
}
