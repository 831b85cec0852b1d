pub mod metric;
pub mod record;
pub mod snapshot;

#[cfg(test)]
mod snapshot_test;

pub use metric::Metric;
pub use record::{ObjectKind, UsageRecord};
pub use snapshot::{SnapshotBuilder, SnapshotError, UsageSnapshot};

/// opaque object identifier as reported by the instrumentation source
pub type Oid = u32;

/// parent sentinel for objects that were invoked directly
pub const ROOT: Oid = 0;

/// composite primary key of a snapshot: (object, immediate caller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UsageKey {
    pub object: Oid,
    pub parent: Oid,
}

impl UsageKey {
    pub fn new(object: Oid, parent: Oid) -> Self {
        Self { object, parent }
    }

    pub fn root(object: Oid) -> Self {
        Self::new(object, ROOT)
    }
}
