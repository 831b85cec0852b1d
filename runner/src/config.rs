use crate::{
    database::{
        simulated::{DEFAULT_CALL_OVERHEAD_US, DEFAULT_TUPLE_COST_US},
        ConnectionError,
    },
    suite::{context::DEFAULT_TOLERANCE, TEST_PREFIX},
};
use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::{fs, io::Error, path::Path, time::Duration};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Globs were invalid")]
    InvalidGlobs(#[from] globset::Error),
    #[error("File not found")]
    FileNotFound(#[from] Error),
    #[error("Config file is not valid YAML")]
    InvalidYaml(#[from] serde_yaml::Error),
    #[error("Config failed preflight checks")]
    PreflightFailed,
    #[error("Connection failed to load")]
    FailedLoadConnection(#[from] ConnectionError),
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    #[serde(alias = "db", default, with = "serde_yaml::with::singleton_map")]
    pub connection: ConnectionConfig,
    // wait after every test case in ms, lets an asynchronous stats collector catch up
    #[serde(default)]
    pub settle_delay: u64,
    // default tolerance for timing assertions in ms
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    // glob over test case names
    #[serde(default = "default_filter")]
    pub filter: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "lowercase")]
pub enum ConnectionConfig {
    Postgres {
        // libpq style connection string
        #[serde(default)]
        dsn: String,
        #[serde(default = "default_extension")]
        extension: Option<String>,
        #[serde(default = "default_view")]
        view: String,
        #[serde(default = "default_reset_function")]
        reset_function: String,
    },
    Simulated {
        #[serde(default = "default_call_overhead")]
        call_overhead_us: u64,
        #[serde(default = "default_tuple_cost")]
        tuple_cost_us: u64,
    },
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::Postgres {
            dsn: String::new(),
            extension: default_extension(),
            view: default_view(),
            reset_function: default_reset_function(),
        }
    }
}

impl ConnectionConfig {
    pub fn simulated() -> Self {
        Self::Simulated {
            call_overhead_us: default_call_overhead(),
            tuple_cost_us: default_tuple_cost(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            settle_delay: 0,
            tolerance: default_tolerance(),
            filter: default_filter(),
        }
    }
}

impl RunnerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        let content = fs::read_to_string(path)?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigErrors> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay)
    }

    /// compile the test case filter
    pub fn compile_filter(&self) -> Result<GlobMatcher, ConfigErrors> {
        Ok(GlobBuilder::new(&self.filter)
            .build()
            .map(|glob| glob.compile_matcher())?)
    }

    /// returns true if any problem was found, all problems are logged
    pub fn preflight_checks(&self) -> bool {
        // attempt to catch all errors instead of piece-by-piece to make debugging easier for users
        let mut contains_error = false;

        match &self.connection {
            ConnectionConfig::Postgres {
                dsn,
                view,
                reset_function,
                ..
            } => {
                if dsn.is_empty() {
                    warn!("connection.postgres.dsn is empty, falling back to libpq defaults");
                }
                if view.trim().is_empty() {
                    error!("connection.postgres.view must name the usage view");
                    contains_error = true;
                }
                if reset_function.trim().is_empty() {
                    error!("connection.postgres.reset_function must name the reset function");
                    contains_error = true;
                }
            }
            ConnectionConfig::Simulated { .. } => {}
        }

        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            error!(
                "tolerance ({}) must be a non-negative number of milliseconds",
                self.tolerance
            );
            contains_error = true;
        }

        if let Err(error) = self.compile_filter() {
            error!("filter '{}' is not a valid glob: {error}", self.filter);
            contains_error = true;
        } else if !self.filter.starts_with(TEST_PREFIX) && !self.filter.starts_with('*') {
            warn!(
                "filter '{}' does not start with '{TEST_PREFIX}', it might not match any test case",
                self.filter
            );
        }

        contains_error
    }
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_filter() -> String {
    format!("{TEST_PREFIX}*")
}

fn default_extension() -> Option<String> {
    Some("pg_stat_usage".to_owned())
}

fn default_view() -> String {
    "pg_stat_usage".to_owned()
}

fn default_reset_function() -> String {
    "pg_stat_usage_reset".to_owned()
}

fn default_call_overhead() -> u64 {
    DEFAULT_CALL_OVERHEAD_US
}

fn default_tuple_cost() -> u64 {
    DEFAULT_TUPLE_COST_US
}
