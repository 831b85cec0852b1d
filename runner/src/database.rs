#[cfg(feature = "postgres")]
pub mod pg;
pub mod simulated;
pub mod util;

#[cfg(test)]
mod simulated_test;
#[cfg(test)]
mod util_test;

use crate::{
    config::ConnectionConfig,
    usage::Oid,
    workload::{FunctionDef, Statement},
};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Database error")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Statement not supported by this connection: {0}")]
    Unsupported(String),
    #[error("Unknown object '{0}'")]
    UnknownObject(String),
    #[error("Call stack depth limit of {0} exceeded")]
    StackDepthExceeded(usize),
    #[error("Connection is not configured correctly: {0}")]
    ConfigError(String),
}

/// A single cell of the raw usage table
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl RawValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(_) | Self::Null => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

/// Metric rows as fetched from the instrumentation source, column set included
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawUsage {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

impl RawUsage {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }
}

/// All supported connections to an instrumented system
/// These should be initialized from `Connection::load`
#[derive(Debug)]
pub enum Connection {
    #[cfg(feature = "postgres")]
    Postgres(pg::PgConnection),
    Simulated(simulated::SimulatedConnection),
}

impl Connection {
    pub fn load(config: &ConnectionConfig) -> Result<Self, ConnectionError> {
        match config {
            #[cfg(feature = "postgres")]
            ConnectionConfig::Postgres { .. } => {
                Ok(Self::Postgres(pg::PgConnection::load(config)?))
            }
            #[cfg(not(feature = "postgres"))]
            ConnectionConfig::Postgres { .. } => Err(ConnectionError::ConfigError(
                "built without the `postgres` feature".to_owned(),
            )),
            ConnectionConfig::Simulated {
                call_overhead_us,
                tuple_cost_us,
            } => {
                info!("Using simulated instrumentation");

                Ok(Self::Simulated(simulated::SimulatedConnection::new(
                    *call_overhead_us,
                    *tuple_cost_us,
                )))
            }
        }
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<(), ConnectionError> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(connection) => connection.execute(statement),
            Self::Simulated(connection) => connection.execute(statement),
        }
    }

    /// zero all server side usage counters
    pub fn reset(&mut self) -> Result<(), ConnectionError> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(connection) => connection.reset(),
            Self::Simulated(connection) => {
                connection.reset();

                Ok(())
            }
        }
    }

    pub fn fetch_usage(&mut self) -> Result<RawUsage, ConnectionError> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(connection) => connection.fetch_usage(),
            Self::Simulated(connection) => Ok(connection.fetch_usage()),
        }
    }

    pub fn create_function(&mut self, function: &FunctionDef) -> Result<Oid, ConnectionError> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(connection) => connection.create_function(function),
            Self::Simulated(connection) => Ok(connection.create_function(function)),
        }
    }

    pub fn create_table(&mut self, name: &str) -> Result<Oid, ConnectionError> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(connection) => connection.create_table(name),
            Self::Simulated(connection) => Ok(connection.create_table(name)),
        }
    }
}
