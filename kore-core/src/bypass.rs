//! Audited scope bypass.
//!
//! A bypass lifts tenant filtering for the dynamic extent of one block.
//! It always carries a reason and an actor, never nests, and leaves at
//! least one audit entry behind when it ends.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::audit::{AuditEntry, AuditKind, AuditedOperation, OperationKind};
use crate::config::AuditGranularity;
use crate::errors::{TenancyError, TenancyResult};
use crate::tenant::TenantContext;

/// Authorization to access data across tenants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeBypass {
    reason: String,
    actor: String,
}

impl ScopeBypass {
    /// Both `reason` and `actor` are mandatory and must not be blank.
    pub fn new(reason: impl Into<String>, actor: impl Into<String>) -> TenancyResult<Self> {
        let reason = reason.into();
        let actor = actor.into();
        if reason.trim().is_empty() {
            return Err(TenancyError::InvalidBypass { field: "reason" });
        }
        if actor.trim().is_empty() {
            return Err(TenancyError::InvalidBypass { field: "actor" });
        }
        Ok(Self { reason, actor })
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassState {
    Inactive,
    Active,
}

/// Bookkeeping for the bypass session currently running on a context.
#[derive(Debug)]
pub(crate) struct ActiveBypass {
    bypass: ScopeBypass,
    started_at: DateTime<Utc>,
    operations: Vec<AuditedOperation>,
}

impl ActiveBypass {
    fn new(bypass: ScopeBypass) -> Self {
        Self {
            bypass,
            started_at: Utc::now(),
            operations: Vec::new(),
        }
    }
}

/// Ends the bypass session when dropped.
#[must_use = "the bypass ends as soon as the guard is dropped"]
pub struct BypassGuard<'a> {
    ctx: &'a TenantContext,
}

impl Drop for BypassGuard<'_> {
    fn drop(&mut self) {
        self.ctx.exit_bypass();
    }
}

impl TenantContext {
    pub fn bypass_state(&self) -> BypassState {
        if self.bypass.lock().is_some() {
            BypassState::Active
        } else {
            BypassState::Inactive
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass_state() == BypassState::Active
    }

    /// Activate `bypass` until the returned guard is dropped.
    ///
    /// Fails with [`TenancyError::NestedBypass`] while another session is
    /// active on this context.
    pub fn begin_bypass(&self, bypass: ScopeBypass) -> TenancyResult<BypassGuard<'_>> {
        let mut slot = self.bypass.lock();
        if let Some(active) = slot.as_ref() {
            tracing::warn!(
                operation_id = %self.operation_id(),
                active_reason = %active.bypass.reason,
                requested_reason = %bypass.reason,
                "rejected: nested scope bypass"
            );
            return Err(TenancyError::NestedBypass {
                active_reason: active.bypass.reason.clone(),
            });
        }

        tracing::info!(
            operation_id = %self.operation_id(),
            actor = %bypass.actor,
            reason = %bypass.reason,
            "scope bypass entered"
        );
        *slot = Some(ActiveBypass::new(bypass));
        Ok(BypassGuard { ctx: self })
    }

    /// Run `f` with `bypass` active. The bypass ends when `f` completes,
    /// fails, or the returned future is dropped.
    pub async fn with_bypass<F, Fut, T, E>(&self, bypass: ScopeBypass, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TenancyError>,
    {
        let _guard = self.begin_bypass(bypass)?;
        f().await
    }

    /// Record one access against the active session.
    ///
    /// Returns `false` (recording nothing) when no bypass is active.
    pub(crate) fn note_bypassed_access(&self, operation: OperationKind, entity: &str) -> bool {
        let statement = {
            let mut slot = self.bypass.lock();
            let Some(active) = slot.as_mut() else {
                return false;
            };

            let access = AuditedOperation {
                entity_type: entity.to_string(),
                operation,
                at: Utc::now(),
            };
            active.operations.push(access.clone());

            match self.granularity {
                AuditGranularity::Session => None,
                AuditGranularity::Statement => Some(AuditEntry {
                    operation_id: self.operation_id(),
                    kind: AuditKind::BypassStatement,
                    actor: active.bypass.actor.clone(),
                    reason: active.bypass.reason.clone(),
                    tenant_id: None,
                    entity_type: Some(access.entity_type.clone()),
                    operation: Some(operation),
                    operations: vec![access],
                    started_at: active.started_at,
                    at: Utc::now(),
                }),
            }
        };

        if let Some(mut entry) = statement {
            entry.tenant_id = self.current();
            self.audit.record(entry);
        }
        true
    }

    fn exit_bypass(&self) {
        let Some(active) = self.bypass.lock().take() else {
            return;
        };

        tracing::info!(
            operation_id = %self.operation_id(),
            actor = %active.bypass.actor,
            reason = %active.bypass.reason,
            operations = active.operations.len(),
            "scope bypass exited"
        );

        self.audit.record(AuditEntry {
            operation_id: self.operation_id(),
            kind: AuditKind::BypassSession,
            actor: active.bypass.actor,
            reason: active.bypass.reason,
            tenant_id: self.current(),
            entity_type: None,
            operation: None,
            operations: active.operations,
            started_at: active.started_at,
            at: Utc::now(),
        });
    }
}
