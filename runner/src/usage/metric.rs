use once_cell::sync::Lazy;
use std::{collections::BTreeMap, convert::Infallible, fmt, str::FromStr};

/// Name of a metric column exposed by the instrumentation source.
///
/// The source decides which columns exist, so anything that is not one of the
/// well-known metrics is carried as `Other` instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    NumCalls,
    NumScans,
    TotalTime,
    SelfTime,
    TuplesInserted,
    TuplesUpdated,
    TuplesDeleted,
    TuplesReturned,
    Other(String),
}

static WELL_KNOWN: Lazy<BTreeMap<String, Metric>> = Lazy::new(|| {
    [
        Metric::NumCalls,
        Metric::NumScans,
        Metric::TotalTime,
        Metric::SelfTime,
        Metric::TuplesInserted,
        Metric::TuplesUpdated,
        Metric::TuplesDeleted,
        Metric::TuplesReturned,
    ]
    .into_iter()
    .map(|metric| (metric.as_str().to_owned(), metric))
    .collect()
});

impl Metric {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NumCalls => "num_calls",
            Self::NumScans => "num_scans",
            Self::TotalTime => "total_time",
            Self::SelfTime => "self_time",
            Self::TuplesInserted => "n_tup_ins",
            Self::TuplesUpdated => "n_tup_upd",
            Self::TuplesDeleted => "n_tup_del",
            Self::TuplesReturned => "n_tup_ret",
            Self::Other(name) => name.as_str(),
        }
    }

    /// timing metrics arrive in microseconds and are stored in milliseconds
    pub fn is_timing(&self) -> bool {
        match self {
            Self::TotalTime | Self::SelfTime => true,
            Self::Other(name) => name.ends_with("_time"),
            _ => false,
        }
    }
}

impl FromStr for Metric {
    type Err = Infallible;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim().to_lowercase();

        Ok(WELL_KNOWN
            .get(name.as_str())
            .cloned()
            .unwrap_or(Self::Other(name)))
    }
}

impl From<&str> for Metric {
    fn from(name: &str) -> Self {
        match name.parse() {
            Ok(metric) => metric,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
