use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use kore_core::{Criteria, JobRunner, Predicate, TenantContext, TenantId};
use serde::Serialize;

use crate::agencies::AgencyDirectory;
use crate::services::{BillingPeriod, ErpRepositories, Invoice, InvoiceStatus};

pub const INVOICE_JOB: &str = "invoice-generation";

/// Outcome of one invoice generation pass over every agency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceRun {
    pub period: BillingPeriod,
    /// Drafts created per agency, including agencies with none.
    pub created: BTreeMap<TenantId, usize>,
    /// Occupied units that already had an invoice for the period.
    pub skipped: usize,
    /// Agencies whose pass failed, with the error. Other agencies still run.
    pub failed: BTreeMap<TenantId, String>,
}

impl InvoiceRun {
    pub fn total_created(&self) -> usize {
        self.created.values().sum()
    }
}

/// Draft one invoice per occupied unit for `period`, agency by agency.
///
/// Each agency runs in its own tenant context, so a unit can only ever be
/// invoiced by the agency that owns it. Running the job twice for the same
/// period creates nothing the second time. One agency failing does not
/// stop the others; it lands in [`InvoiceRun::failed`].
pub async fn generate_invoices(
    runner: &JobRunner,
    repos: &ErpRepositories,
    agencies: &AgencyDirectory,
    period: BillingPeriod,
) -> Result<InvoiceRun> {
    let mut run = InvoiceRun {
        period,
        created: BTreeMap::new(),
        skipped: 0,
        failed: BTreeMap::new(),
    };

    for agency in agencies.list().await? {
        let repos = repos.clone();
        let outcome: Result<(usize, usize)> = runner
            .run_as_tenant(INVOICE_JOB, agency.tenant(), |ctx| async move {
                invoice_agency(&repos, &ctx, period).await
            })
            .await;
        match outcome {
            Ok((created, skipped)) => {
                run.created.insert(agency.tenant(), created);
                run.skipped += skipped;
            }
            Err(err) => {
                tracing::warn!(
                    agency = %agency.tenant(),
                    period = %period,
                    error = %err,
                    "invoice generation failed for agency"
                );
                run.failed.insert(agency.tenant(), err.to_string());
            }
        }
    }

    Ok(run)
}

async fn invoice_agency(
    repos: &ErpRepositories,
    ctx: &TenantContext,
    period: BillingPeriod,
) -> Result<(usize, usize)> {
    let occupied = repos
        .units
        .list(ctx, Criteria::new().and_where(Predicate::not_null("renter_id")))
        .await?;
    let invoiced: HashSet<String> = repos
        .invoices
        .list(ctx, Criteria::new().eq("period", period.to_string()))
        .await?
        .into_iter()
        .map(|invoice| invoice.unit_id)
        .collect();

    let (mut created, mut skipped) = (0, 0);
    for unit in occupied {
        let (Some(unit_id), Some(renter_id)) = (unit.id, unit.renter_id) else {
            continue;
        };
        if invoiced.contains(&unit_id) {
            skipped += 1;
            continue;
        }
        let draft = Invoice {
            id: None,
            agency_id: None,
            unit_id,
            renter_id,
            period,
            amount: unit.monthly_rent,
            currency: unit.currency,
            status: InvoiceStatus::Draft,
            due_on: period.due_date(),
        };
        repos.invoices.create(ctx, draft).await?;
        created += 1;
    }

    tracing::info!(period = %period, created, skipped, "invoices drafted");
    Ok((created, skipped))
}
