use std::sync::Arc;

use anyhow::Result;
use axum::{Json, Router};
use kore_axum::{axum as kore_app, AxumApp, KoreAxumError, KoreAxumState, Tenancy};
use kore_core::{
    AuditSink, DataStore, FanoutAuditSink, JobRunner, KoreConfig, KoreConfigSnapshot,
    MemoryAuditSink, MemoryStore, TenancySettings, TracingAuditSink,
};

use crate::agencies::{Agency, AgencyDirectory};
use crate::dashboard::{dashboard, DashboardStats};
use crate::services::{self, ErpRepositories};

/// The assembled ERP: repositories, agency directory, job runner and the
/// HTTP app, all sharing one store and one audit pipeline.
pub struct Erp {
    pub config: KoreConfigSnapshot,
    pub store: Arc<dyn DataStore>,
    pub repos: ErpRepositories,
    pub agencies: AgencyDirectory,
    pub jobs: JobRunner,
    /// Every audit entry written so far. Entries also go to the
    /// `kore::audit` tracing target.
    pub audit_log: Arc<MemoryAuditSink>,
    pub app: AxumApp,
}

impl Erp {
    pub fn router(&self) -> Router {
        self.app.clone().into_router()
    }

    pub fn addr(&self) -> String {
        let host = self
            .config
            .get_string("http.host")
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let port = self.config.get_u16("http.port").unwrap_or(3030);
        format!("{host}:{port}")
    }

    pub async fn listen(&self) -> Result<()> {
        self.app.clone().listen(self.addr()).await
    }
}

/// In-memory ERP with default configuration.
pub fn build() -> Result<Erp> {
    build_with(KoreConfig::with_defaults(), Arc::new(MemoryStore::new()))
}

pub fn build_with(config: KoreConfig, store: Arc<dyn DataStore>) -> Result<Erp> {
    let config = config.snapshot();
    let settings = TenancySettings::from_snapshot(&config)?;

    let audit_log = Arc::new(MemoryAuditSink::new());
    let audit: Arc<dyn AuditSink> = Arc::new(
        FanoutAuditSink::new()
            .with(audit_log.clone())
            .with(Arc::new(TracingAuditSink)),
    );

    let repos = ErpRepositories::new(Arc::clone(&store));
    let agencies = AgencyDirectory::new(Arc::clone(&store));
    let jobs = JobRunner::new(settings.clone(), Arc::clone(&audit));

    tracing::debug!(granularity = %settings.granularity, "audit pipeline ready");
    let app = kore_app(KoreAxumState::new(settings, audit));
    let app = services::configure(app, &repos)
        .use_get("/health", || async { "ok" })
        .use_get("/dashboard", {
            let repos = repos.clone();
            move |tenancy: Tenancy| async move {
                Ok::<Json<DashboardStats>, KoreAxumError>(Json(dashboard(&repos, &tenancy).await?))
            }
        })
        .use_get("/agency", {
            let agencies = agencies.clone();
            move |tenancy: Tenancy| async move {
                Ok::<Json<Agency>, KoreAxumError>(Json(agencies.current(&tenancy).await?))
            }
        });

    Ok(Erp {
        config,
        store,
        repos,
        agencies,
        jobs,
        audit_log,
        app,
    })
}
