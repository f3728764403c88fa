use std::collections::BTreeMap;

use anyhow::Result;
use kore_core::{Criteria, JobRunner, ScopeBypass, TenantId};
use serde::Serialize;

use crate::services::ErpRepositories;

pub const PORTFOLIO_JOB: &str = "portfolio-report";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgencyPortfolio {
    pub buildings: usize,
    pub units: usize,
    pub occupied_units: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortfolioReport {
    pub agencies: BTreeMap<TenantId, AgencyPortfolio>,
}

/// Count buildings and units per agency across the whole platform.
///
/// Reads every agency's data, so it only runs under `bypass` and leaves
/// one audit entry naming its reason and actor.
pub async fn portfolio_report(
    runner: &JobRunner,
    repos: &ErpRepositories,
    bypass: ScopeBypass,
) -> Result<PortfolioReport> {
    let repos = repos.clone();
    runner
        .run_across_tenants(PORTFOLIO_JOB, bypass, |ctx| async move {
            let mut report = PortfolioReport::default();
            for building in repos.buildings.list(&ctx, Criteria::new()).await? {
                if let Some(agency) = building.agency_id {
                    report.agencies.entry(agency).or_default().buildings += 1;
                }
            }
            for unit in repos.units.list(&ctx, Criteria::new()).await? {
                let occupied = unit.is_occupied();
                if let Some(agency) = unit.agency_id {
                    let entry = report.agencies.entry(agency).or_default();
                    entry.units += 1;
                    if occupied {
                        entry.occupied_units += 1;
                    }
                }
            }
            Ok(report)
        })
        .await
}
