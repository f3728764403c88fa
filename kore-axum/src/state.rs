use std::sync::Arc;

use axum::http::HeaderMap;
use kore_core::{AuditSink, TenancySettings, TenantContext, TenantId};

/// What the HTTP layer needs to open a tenant context per request.
#[derive(Clone)]
pub struct KoreAxumState {
    pub settings: Arc<TenancySettings>,
    pub audit: Arc<dyn AuditSink>,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl KoreAxumState {
    pub fn new(settings: TenancySettings, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            settings: Arc::new(settings),
            audit,
        }
    }

    /// Tenant named by the request, if any. There is no fallback tenant.
    pub fn tenant_from_headers(&self, headers: &HeaderMap) -> Option<TenantId> {
        header(headers, &self.settings.tenant_header).map(TenantId::from)
    }

    /// Fresh, unset context for one request.
    pub fn context_from_headers(&self, headers: &HeaderMap) -> TenantContext {
        let actor = header(headers, &self.settings.actor_header).unwrap_or("anonymous");
        TenantContext::from_settings(&self.settings, Arc::clone(&self.audit)).with_actor(actor)
    }
}
