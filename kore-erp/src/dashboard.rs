use anyhow::Result;
use kore_core::{Criteria, KoreError, Predicate, TenantContext, TenantId};
use serde::Serialize;
use serde_json::json;

use crate::services::{ErpRepositories, InvoiceStatus, MaintenanceStatus};

/// Headline figures for the agency a request is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub agency_id: Option<TenantId>,
    pub buildings: usize,
    pub units: usize,
    pub occupied_units: usize,
    pub open_maintenance_requests: usize,
    pub outstanding_invoices: usize,
    /// Sum of outstanding invoices in minor units. Mixed currencies are
    /// summed as-is; agencies bill in a single currency.
    pub outstanding_amount: i64,
}

pub async fn dashboard(repos: &ErpRepositories, ctx: &TenantContext) -> Result<DashboardStats> {
    let buildings = repos.buildings.list(ctx, Criteria::new()).await?;
    let units = repos.units.list(ctx, Criteria::new()).await?;

    let open = [MaintenanceStatus::Open, MaintenanceStatus::InProgress]
        .iter()
        .map(|s| json!(s.as_str()))
        .collect();
    let open_requests = repos
        .maintenance
        .list(ctx, Criteria::new().and_where(Predicate::is_in("status", open)))
        .await?;

    let outstanding = [InvoiceStatus::Issued, InvoiceStatus::Overdue]
        .iter()
        .map(|s| json!(s.as_str()))
        .collect();
    let invoices = repos
        .invoices
        .list(ctx, Criteria::new().and_where(Predicate::is_in("status", outstanding)))
        .await?;
    let outstanding_amount = invoices
        .iter()
        .try_fold(0i64, |sum, invoice| sum.checked_add(invoice.amount))
        .ok_or_else(|| {
            KoreError::general_error("outstanding amount does not fit in 64 bits").into_anyhow()
        })?;

    Ok(DashboardStats {
        agency_id: ctx.current(),
        buildings: buildings.len(),
        units: units.len(),
        occupied_units: units.iter().filter(|u| u.is_occupied()).count(),
        open_maintenance_requests: open_requests.len(),
        outstanding_invoices: invoices.len(),
        outstanding_amount,
    })
}
