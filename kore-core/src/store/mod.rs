pub mod memory;

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::criteria::{Predicate, Query};
use crate::entity::{Collection, Record};

/// One result row of a query: source alias -> record.
pub type Row = BTreeMap<String, Record>;

/// Primitive methods a store may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreMethod {
    Select,
    Insert,
    Update,
    Delete,
}

impl StoreMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreMethod::Select => "select",
            StoreMethod::Insert => "insert",
            StoreMethod::Update => "update",
            StoreMethod::Delete => "delete",
        }
    }
}

/// What a store is able to do.
#[derive(Debug, Clone)]
pub struct StoreCapabilities {
    pub methods: Vec<StoreMethod>,
    pub joins: bool,
}

impl StoreCapabilities {
    pub fn full() -> Self {
        use StoreMethod::*;
        Self {
            methods: vec![Select, Insert, Update, Delete],
            joins: true,
        }
    }

    pub fn read_only() -> Self {
        Self {
            methods: vec![StoreMethod::Select],
            joins: true,
        }
    }

    pub fn supports(&self, method: StoreMethod) -> bool {
        self.methods.contains(&method)
    }
}

/// The underlying data store a scoped repository delegates to.
///
/// It knows nothing about tenants: by the time a call arrives here the
/// criteria have already been rewritten. Filters address fields of
/// `collection` either unqualified or qualified with the collection name.
///
/// All methods default to "Method not implemented", so a store only
/// overrides what it supports.
#[async_trait]
pub trait DataStore: Send + Sync {
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::full()
    }

    async fn select(&self, _query: &Query) -> Result<Vec<Row>> {
        Err(anyhow!("Method not implemented: select"))
    }

    /// Insert and return the stored record.
    async fn insert(&self, _collection: &Collection, _record: Record) -> Result<Record> {
        Err(anyhow!("Method not implemented: insert"))
    }

    /// Merge `changes` into every matching record; return the updated ones.
    async fn update(
        &self,
        _collection: &Collection,
        _filter: &Predicate,
        _changes: &Record,
    ) -> Result<Vec<Record>> {
        Err(anyhow!("Method not implemented: update"))
    }

    /// Remove every matching record; return how many were removed.
    async fn delete(&self, _collection: &Collection, _filter: &Predicate) -> Result<u64> {
        Err(anyhow!("Method not implemented: delete"))
    }
}
