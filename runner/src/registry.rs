use crate::usage::{Oid, ROOT};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Object '{0}' was never registered")]
pub struct UnresolvedName(pub String);

/// map of test object name -> oid, filled while test objects are created
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    oids: BTreeMap<String, Oid>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// register (or replace) the oid of a named object
    pub fn register(&mut self, name: &str, oid: Oid) {
        if let Some(previous) = self.oids.insert(name.to_owned(), oid) {
            if previous != oid {
                debug!(name = name, previous = previous, oid = oid, "Replaced registered object");
            }
        } else {
            debug!(name = name, oid = oid, "Registered object");
        }
    }

    pub fn resolve(&self, name: &str) -> Result<Oid, UnresolvedName> {
        self.oids
            .get(name)
            .copied()
            .ok_or_else(|| UnresolvedName(name.to_owned()))
    }

    /// `None` resolves to the root sentinel
    pub fn resolve_parent(&self, name: Option<&str>) -> Result<Oid, UnresolvedName> {
        match name {
            Some(name) => self.resolve(name),
            None => Ok(ROOT),
        }
    }

    pub fn len(&self) -> usize {
        self.oids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oids.is_empty()
    }
}
