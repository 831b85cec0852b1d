use super::{Metric, UsageKey};
use itertools::Itertools;
use std::{collections::BTreeMap, fmt};

/// Kind of an instrumented object, decoded from the `object_type` column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Function,
    Table,
    Other(String),
}

impl ObjectKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "F" => Self::Function,
            "r" => Self::Table,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Function => "F",
            Self::Table => "r",
            Self::Other(code) => code.as_str(),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One row of a usage snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub key: UsageKey,
    // descriptive metadata, only used for diagnostics
    pub kind: ObjectKind,
    pub schema: String,
    pub name: String,
    pub metrics: BTreeMap<Metric, f64>,
}

impl UsageRecord {
    pub fn new(key: UsageKey, kind: ObjectKind, schema: String, name: String) -> Self {
        Self {
            key,
            kind,
            schema,
            name,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, metric: Metric, value: f64) -> Self {
        self.metrics.insert(metric, value);
        self
    }

    /// value of a metric, `None` if the source did not report it for this row
    pub fn metric(&self, metric: &Metric) -> Option<f64> {
        self.metrics.get(metric).copied()
    }
}

impl fmt::Display for UsageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{} oid={} parent={}",
            self.kind, self.schema, self.name, self.key.object, self.key.parent
        )?;

        if !self.metrics.is_empty() {
            write!(
                f,
                " {}",
                self.metrics
                    .iter()
                    .map(|(metric, value)| format!("{metric}={value}"))
                    .join(" ")
            )?;
        }

        Ok(())
    }
}
