//! Cache key construction.
//!
//! Keys follow `entity:op[:id]|params`, where `params` is the JSON rendering
//! of every effective query parameter after defaulting, sorted by name. Two
//! requests that resolve to the same effective parameters share an entry;
//! any differing parameter, pagination state included, yields a new one.

use std::collections::BTreeMap;
use std::fmt;

/// Key for one cached read, scoped by entity, operation, and optional row id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    entity: &'static str,
    op: &'static str,
    id: Option<i64>,
    params: BTreeMap<&'static str, String>,
}

impl CacheKey {
    /// Key for a collection-level operation such as a listing.
    pub fn new(entity: &'static str, op: &'static str) -> Self {
        Self {
            entity,
            op,
            id: None,
            params: BTreeMap::new(),
        }
    }

    /// Key for an operation on a single row or relation root.
    pub fn scoped(entity: &'static str, op: &'static str, id: i64) -> Self {
        Self {
            entity,
            op,
            id: Some(id),
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.insert(name, value.to_string());
        self
    }

    /// Add a parameter only when a value was supplied.
    pub fn opt_param(mut self, name: &'static str, value: Option<impl ToString>) -> Self {
        if let Some(value) = value {
            self.params.insert(name, value.to_string());
        }
        self
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.op)?;
        if let Some(id) = self.id {
            write!(f, ":{id}")?;
        }
        let params = serde_json::to_string(&self.params)
            .expect("serializing cache key params should succeed");
        write!(f, "|{params}")
    }
}
