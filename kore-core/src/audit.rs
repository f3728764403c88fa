//! Audit trail for scope bypasses.
//!
//! Entries are handed to an [`AuditSink`] synchronously, because a bypass
//! session reports itself from a guard's `Drop`. Sinks that persist
//! asynchronously should hand entries off (see [`BroadcastAuditSink`]).

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::tenant::TenantId;

/// Data access performed through a scoped repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Find,
    List,
    Create,
    Update,
    Delete,
    Join,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Find => "find",
            OperationKind::List => "list",
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Join => "join",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// Summary written when a bypass session ends.
    BypassSession,
    /// One bypassed statement (statement granularity only).
    BypassStatement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditedOperation {
    pub entity_type: String,
    pub operation: OperationKind,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Operation (request/job) the bypass ran in.
    pub operation_id: Uuid,
    pub kind: AuditKind,
    pub actor: String,
    pub reason: String,
    /// Tenant held by the context at the time, if any.
    pub tenant_id: Option<TenantId>,
    pub entity_type: Option<String>,
    pub operation: Option<OperationKind>,
    pub operations: Vec<AuditedOperation>,
    pub started_at: DateTime<Utc>,
    pub at: DateTime<Utc>,
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Keeps entries in memory. Used by tests and local tooling.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        self.entries.lock().push(entry);
    }
}

/// Writes entries as structured `tracing` events under `kore::audit`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        let operations = entry
            .operations
            .iter()
            .map(|op| format!("{}:{}", op.operation, op.entity_type))
            .collect::<Vec<_>>()
            .join(",");

        tracing::info!(
            target: "kore::audit",
            operation_id = %entry.operation_id,
            kind = ?entry.kind,
            actor = %entry.actor,
            reason = %entry.reason,
            tenant = ?entry.tenant_id.as_ref().map(TenantId::as_str),
            entity_type = ?entry.entity_type,
            operations = %operations,
            "scope bypass audited"
        );
    }
}

/// Fans entries out to async subscribers (e.g. a task persisting them).
pub struct BroadcastAuditSink {
    sender: broadcast::Sender<AuditEntry>,
}

impl BroadcastAuditSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuditEntry> {
        self.sender.subscribe()
    }
}

impl AuditSink for BroadcastAuditSink {
    fn record(&self, entry: AuditEntry) {
        if let Err(broadcast::error::SendError(entry)) = self.sender.send(entry) {
            tracing::warn!(
                target: "kore::audit",
                operation_id = %entry.operation_id,
                actor = %entry.actor,
                reason = %entry.reason,
                "audit entry has no subscribers"
            );
        }
    }
}

/// Sends every entry to each inner sink in order.
#[derive(Default, Clone)]
pub struct FanoutAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl FanoutAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl AuditSink for FanoutAuditSink {
    fn record(&self, entry: AuditEntry) {
        for sink in &self.sinks {
            sink.record(entry.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> AuditEntry {
        AuditEntry {
            operation_id: Uuid::new_v4(),
            kind: AuditKind::BypassSession,
            actor: "admin".to_string(),
            reason: "migration".to_string(),
            tenant_id: None,
            entity_type: None,
            operation: None,
            operations: vec![],
            started_at: Utc::now(),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn broadcast_sink_delivers_to_subscribers() {
        let sink = BroadcastAuditSink::new(16);
        let mut rx = sink.subscribe();

        sink.record(entry());

        let received = rx.recv().await.unwrap();
        assert_eq!(received.reason, "migration");
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let a = Arc::new(MemoryAuditSink::new());
        let b = Arc::new(MemoryAuditSink::new());
        let fanout = FanoutAuditSink::new().with(a.clone()).with(b.clone());

        fanout.record(entry());

        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn entries_serialize_with_snake_case_kinds() {
        let json = serde_json::to_value(entry()).unwrap();
        assert_eq!(json["kind"], "bypass_session");
        assert_eq!(json["actor"], "admin");
    }
}
