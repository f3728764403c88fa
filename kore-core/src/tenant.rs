//! Operation-scoped tenant state.
//!
//! A [`TenantContext`] is created when an operation (HTTP request, job,
//! CLI invocation) starts and is handed by reference to every repository
//! call made on its behalf. It is never stored in a global: two concurrent
//! operations always hold two distinct contexts.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{AuditSink, OperationKind};
use crate::bypass::ActiveBypass;
use crate::config::{AuditGranularity, TenancySettings};
use crate::errors::{TenancyError, TenancyResult};

/// Identifier of an agency (the isolation boundary).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// How a single data access is allowed to proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AccessScope {
    /// Filter and stamp with this tenant.
    Tenant(TenantId),
    /// An audited bypass is active; `tenant` is whatever the context holds.
    Bypassed { tenant: Option<TenantId> },
}

/// Context carried with every KORE operation.
///
/// Holds the current tenant (or none), the active scope bypass (or none)
/// and the audit sink bypassed accesses are reported to. Not `Clone`: an
/// operation owns exactly one context.
pub struct TenantContext {
    operation_id: Uuid,
    actor: String,
    tenant: Mutex<Option<TenantId>>,
    pub(crate) bypass: Mutex<Option<ActiveBypass>>,
    pub(crate) audit: Arc<dyn AuditSink>,
    pub(crate) granularity: AuditGranularity,
}

impl fmt::Debug for TenantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantContext")
            .field("operation_id", &self.operation_id)
            .field("actor", &self.actor)
            .field("tenant", &*self.tenant.lock())
            .field("bypass", &self.bypass_state())
            .finish()
    }
}

impl TenantContext {
    /// Fresh, unset context reporting bypasses to `audit`.
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            operation_id: Uuid::new_v4(),
            actor: "anonymous".to_string(),
            tenant: Mutex::new(None),
            bypass: Mutex::new(None),
            audit,
            granularity: AuditGranularity::default(),
        }
    }

    pub fn from_settings(settings: &TenancySettings, audit: Arc<dyn AuditSink>) -> Self {
        Self::new(audit).with_granularity(settings.granularity)
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn with_granularity(mut self, granularity: AuditGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Establish the active tenant.
    ///
    /// Fails with [`TenancyError::ContextAlreadySet`] if a tenant is already
    /// set; switching tenants mid-operation requires an explicit `clear()`.
    pub fn set(&self, tenant: impl Into<TenantId>) -> TenancyResult<()> {
        let tenant = tenant.into();
        let mut slot = self.tenant.lock();
        if let Some(current) = slot.as_ref() {
            return Err(TenancyError::ContextAlreadySet {
                current: current.clone(),
                requested: tenant,
            });
        }
        tracing::debug!(
            operation_id = %self.operation_id,
            tenant = %tenant,
            "tenant context set"
        );
        *slot = Some(tenant);
        Ok(())
    }

    pub fn current(&self) -> Option<TenantId> {
        self.tenant.lock().clone()
    }

    pub fn clear(&self) {
        if let Some(previous) = self.tenant.lock().take() {
            tracing::debug!(
                operation_id = %self.operation_id,
                tenant = %previous,
                "tenant context cleared"
            );
        }
    }

    /// Scoped form of [`set`](Self::set): the returned guard clears the
    /// context when dropped, on success, error or cancellation alike.
    pub fn enter(&self, tenant: impl Into<TenantId>) -> TenancyResult<TenantGuard<'_>> {
        self.set(tenant)?;
        Ok(TenantGuard { ctx: self })
    }

    /// Decide how one access proceeds, recording it if bypassed.
    pub(crate) fn resolve_scope(
        &self,
        operation: OperationKind,
        entity: &str,
    ) -> TenancyResult<AccessScope> {
        if self.note_bypassed_access(operation, entity) {
            return Ok(AccessScope::Bypassed {
                tenant: self.current(),
            });
        }

        match self.current() {
            Some(tenant) => Ok(AccessScope::Tenant(tenant)),
            None => {
                tracing::warn!(
                    operation_id = %self.operation_id,
                    operation = operation.as_str(),
                    entity,
                    "rejected: no active tenant"
                );
                Err(TenancyError::NoActiveTenant {
                    operation,
                    entity: entity.to_string(),
                })
            }
        }
    }
}

/// Clears its [`TenantContext`] on drop.
#[must_use = "the tenant is cleared as soon as the guard is dropped"]
pub struct TenantGuard<'a> {
    ctx: &'a TenantContext,
}

impl TenantGuard<'_> {
    pub fn tenant(&self) -> Option<TenantId> {
        self.ctx.current()
    }
}

impl Drop for TenantGuard<'_> {
    fn drop(&mut self) {
        self.ctx.clear();
    }
}
