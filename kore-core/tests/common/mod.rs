#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use kore_core::{
    AuditGranularity, Collection, DataStore, Entity, MemoryAuditSink, MemoryStore, Predicate,
    Query, Record, Row, ScopedRepository, StoreCapabilities, TenantContext, TenantId,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<TenantId>,
    pub name: String,
}

impl Building {
    pub fn named(name: &str) -> Self {
        Self {
            id: None,
            agency_id: None,
            name: name.to_string(),
        }
    }

    pub fn owned_by(name: &str, agency: &str) -> Self {
        Self {
            agency_id: Some(TenantId::from(agency)),
            ..Self::named(name)
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }
}

impl Entity for Building {
    const COLLECTION: &'static str = "buildings";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<TenantId>,
    pub building_id: String,
    pub label: String,
    pub currency: String,
}

impl Entity for Unit {
    const COLLECTION: &'static str = "units";
}

pub const CURRENCIES: Collection = Collection::global("currencies");

/// DataStore wrapper that counts calls and keeps every query it was given.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    calls: AtomicUsize,
    queries: Mutex<Vec<Query>>,
    filters: Mutex<Vec<Predicate>>,
    capabilities: Mutex<Option<StoreCapabilities>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<Query> {
        self.queries.lock().clone()
    }

    /// Report `capabilities` instead of the inner store's.
    pub fn restrict(&self, capabilities: StoreCapabilities) {
        *self.capabilities.lock() = Some(capabilities);
    }

    /// Filters given to update/delete.
    pub fn write_filters(&self) -> Vec<Predicate> {
        self.filters.lock().clone()
    }
}

#[async_trait]
impl DataStore for RecordingStore {
    fn capabilities(&self) -> StoreCapabilities {
        match &*self.capabilities.lock() {
            Some(restricted) => restricted.clone(),
            None => self.inner.capabilities(),
        }
    }

    async fn select(&self, query: &Query) -> Result<Vec<Row>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push(query.clone());
        self.inner.select(query).await
    }

    async fn insert(&self, collection: &Collection, record: Record) -> Result<Record> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(collection, record).await
    }

    async fn update(
        &self,
        collection: &Collection,
        filter: &Predicate,
        changes: &Record,
    ) -> Result<Vec<Record>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.filters.lock().push(filter.clone());
        self.inner.update(collection, filter, changes).await
    }

    async fn delete(&self, collection: &Collection, filter: &Predicate) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.filters.lock().push(filter.clone());
        self.inner.delete(collection, filter).await
    }
}

pub struct Harness {
    pub store: Arc<RecordingStore>,
    pub audit: Arc<MemoryAuditSink>,
    pub buildings: ScopedRepository<Building>,
    pub units: ScopedRepository<Unit>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(RecordingStore::new());
        let audit = Arc::new(MemoryAuditSink::new());
        Self {
            buildings: ScopedRepository::new(store.clone()),
            units: ScopedRepository::new(store.clone()),
            store,
            audit,
        }
    }

    /// Unset context.
    pub fn ctx(&self) -> TenantContext {
        TenantContext::new(self.audit.clone()).with_actor("tester")
    }

    pub fn ctx_for(&self, tenant: &str) -> TenantContext {
        let ctx = self.ctx();
        ctx.set(tenant).unwrap();
        ctx
    }

    pub fn statement_ctx(&self) -> TenantContext {
        self.ctx().with_granularity(AuditGranularity::Statement)
    }
}
