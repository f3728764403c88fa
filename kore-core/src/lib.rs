//! kore-core: tenant-scoped data access for KORE ERP.
//!
//! Every business record belongs to exactly one agency. This crate keeps
//! that boundary honest:
//! - [`TenantContext`] holds the agency of one logical operation and is
//!   passed explicitly to every repository call
//! - [`ScopedRepository`] rewrites criteria so reads only see the current
//!   agency and writes are stamped with it
//! - [`ScopeBypass`] is the one audited way to work across agencies

pub mod audit;
pub mod bypass;
pub mod config;
pub mod criteria;
pub mod entity;
pub mod errors;
pub mod jobs;
pub mod repository;
pub mod store;
pub mod tenant;

pub use audit::{
    AuditEntry, AuditKind, AuditSink, AuditedOperation, BroadcastAuditSink, FanoutAuditSink,
    MemoryAuditSink, OperationKind, TracingAuditSink,
};
pub use bypass::{BypassGuard, BypassState, ScopeBypass};
pub use config::{AuditGranularity, KoreConfig, KoreConfigSnapshot, TenancySettings};
pub use criteria::{Criteria, Direction, FieldRef, Join, Order, Predicate, Query, Source};
pub use entity::{Collection, Entity, Record, DEFAULT_TENANT_FIELD, ID_FIELD};
pub use errors::{ErrorKind, KoreError, TenancyError, TenancyResult};
pub use jobs::JobRunner;
pub use repository::{take_entity, ScopedRepository};
pub use store::{memory::MemoryStore, DataStore, Row, StoreCapabilities, StoreMethod};
pub use tenant::{TenantContext, TenantGuard, TenantId};
