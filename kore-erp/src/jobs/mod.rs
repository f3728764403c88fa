//! Background work. Every job gets its own tenant context from
//! [`kore_core::JobRunner`]; nothing here touches a request's context.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::services::BillingPeriod;
use crate::Erp;

pub mod invoices;
pub mod portfolio;

pub use invoices::{generate_invoices, InvoiceRun, INVOICE_JOB};
pub use portfolio::{portfolio_report, AgencyPortfolio, PortfolioReport, PORTFOLIO_JOB};

/// Draft invoices for the current month every `every`, starting now.
///
/// Failures are logged and retried on the next tick.
pub fn spawn_invoice_schedule(erp: &Erp, every: Duration) -> JoinHandle<()> {
    let runner = erp.jobs.clone();
    let repos = erp.repos.clone();
    let agencies = erp.agencies.clone();

    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(every);
        loop {
            ticks.tick().await;
            let period = BillingPeriod::containing(Utc::now().date_naive());
            match generate_invoices(&runner, &repos, &agencies, period).await {
                Ok(run) => tracing::info!(
                    period = %run.period,
                    created = run.total_created(),
                    skipped = run.skipped,
                    failed = run.failed.len(),
                    "scheduled invoice run finished"
                ),
                Err(err) => tracing::error!(error = %err, "scheduled invoice run failed"),
            }
        }
    })
}
