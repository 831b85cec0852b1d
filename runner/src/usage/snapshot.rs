use super::{Oid, UsageKey, UsageRecord};
use std::collections::{btree_map::Entry, BTreeMap};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Duplicate usage record for object {} with parent {}", .0.object, .0.parent)]
    DuplicateKey(UsageKey),
}

/// Point-in-time capture of all usage records since the last reset.
///
/// A snapshot can only be created through [`SnapshotBuilder`] and offers no way
/// to change it afterwards.
#[derive(Debug, Clone, Default)]
pub struct UsageSnapshot {
    records: BTreeMap<UsageKey, UsageRecord>,
}

impl UsageSnapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// point lookup, `None` means the object was never used with this parent
    pub fn get(&self, object: Oid, parent: Oid) -> Option<&UsageRecord> {
        self.records.get(&UsageKey::new(object, parent))
    }

    pub fn all(&self) -> impl Iterator<Item = &UsageRecord> {
        self.records.values()
    }

    /// all records whose immediate caller is `parent`
    pub fn children_of(&self, parent: Oid) -> impl Iterator<Item = &UsageRecord> {
        self.records
            .values()
            .filter(move |record| record.key.parent == parent)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    records: BTreeMap<UsageKey, UsageRecord>,
}

impl SnapshotBuilder {
    pub fn insert(&mut self, record: UsageRecord) -> Result<(), SnapshotError> {
        match self.records.entry(record.key) {
            Entry::Occupied(entry) => Err(SnapshotError::DuplicateKey(*entry.key())),
            Entry::Vacant(entry) => {
                entry.insert(record);

                Ok(())
            }
        }
    }

    pub fn build(self) -> UsageSnapshot {
        UsageSnapshot {
            records: self.records,
        }
    }
}
