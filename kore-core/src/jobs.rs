//! Background jobs under tenant scope.
//!
//! Jobs have no request to derive a tenant from, so each run gets its own
//! [`TenantContext`] that is either pinned to one agency or running under an
//! audited [`ScopeBypass`].

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use crate::audit::AuditSink;
use crate::bypass::ScopeBypass;
use crate::config::TenancySettings;
use crate::errors::TenancyError;
use crate::tenant::{TenantContext, TenantId};

#[derive(Clone)]
pub struct JobRunner {
    settings: TenancySettings,
    audit: Arc<dyn AuditSink>,
}

impl JobRunner {
    pub fn new(settings: TenancySettings, audit: Arc<dyn AuditSink>) -> Self {
        Self { settings, audit }
    }

    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    /// Unset context acting as `actor`.
    pub fn context(&self, actor: impl Into<String>) -> TenantContext {
        TenantContext::from_settings(&self.settings, Arc::clone(&self.audit)).with_actor(actor)
    }

    /// Run `f` with a fresh context pinned to `tenant`.
    ///
    /// The tenant is cleared when `f` finishes, fails or is cancelled.
    pub async fn run_as_tenant<F, Fut, T, E>(
        &self,
        job: &str,
        tenant: impl Into<TenantId>,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(Arc<TenantContext>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TenancyError>,
    {
        let tenant = tenant.into();
        let ctx = Arc::new(self.context(format!("job:{job}")));
        let span = tracing::info_span!(
            "job",
            job,
            tenant = %tenant,
            operation_id = %ctx.operation_id()
        );

        async {
            let _guard = match ctx.enter(tenant) {
                Ok(guard) => guard,
                Err(err) => return Err(E::from(err)),
            };
            let started = Instant::now();
            let outcome = f(Arc::clone(&ctx)).await;
            tracing::info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                ok = outcome.is_ok(),
                "job finished"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    /// Run `f` across every tenant under `bypass`.
    ///
    /// The context has no tenant, so creates inside `f` must name one
    /// explicitly. One audit session covers the whole run.
    pub async fn run_across_tenants<F, Fut, T, E>(
        &self,
        job: &str,
        bypass: ScopeBypass,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(Arc<TenantContext>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TenancyError>,
    {
        let ctx = Arc::new(self.context(bypass.actor().to_string()));
        let span = tracing::info_span!(
            "job",
            job,
            bypass_reason = %bypass.reason(),
            operation_id = %ctx.operation_id()
        );

        async {
            let _guard = match ctx.begin_bypass(bypass) {
                Ok(guard) => guard,
                Err(err) => return Err(E::from(err)),
            };
            let started = Instant::now();
            let outcome = f(Arc::clone(&ctx)).await;
            tracing::info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                ok = outcome.is_ok(),
                "cross-tenant job finished"
            );
            outcome
        }
        .instrument(span)
        .await
    }
}
