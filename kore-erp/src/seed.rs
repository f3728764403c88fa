use anyhow::Result;
use kore_core::TenantContext;

use crate::agencies::Agency;
use crate::services::{Building, ErpRepositories, Owner, Renter, Unit};
use crate::Erp;

fn demo_agencies() -> Vec<Agency> {
    vec![
        Agency {
            id: "42".to_string(),
            name: "Teranga Immobilier".to_string(),
            locale: "fr-SN".to_string(),
            currency: "XOF".to_string(),
            country: "SN".to_string(),
        },
        Agency {
            id: "99".to_string(),
            name: "Rhône Gestion".to_string(),
            locale: "fr-FR".to_string(),
            currency: "EUR".to_string(),
            country: "FR".to_string(),
        },
    ]
}

async fn seed_agency(repos: &ErpRepositories, ctx: &TenantContext, agency: &Agency) -> Result<()> {
    let owner = repos
        .owners
        .create(
            ctx,
            Owner {
                id: None,
                agency_id: None,
                name: format!("{} Holdings", agency.name),
                email: format!("owner@agency-{}.example", agency.id),
                phone: None,
            },
        )
        .await?;
    let renter = repos
        .renters
        .create(
            ctx,
            Renter {
                id: None,
                agency_id: None,
                name: "Awa Diop".to_string(),
                email: format!("renter@agency-{}.example", agency.id),
                phone: None,
            },
        )
        .await?;
    let building = repos
        .buildings
        .create(
            ctx,
            Building {
                id: None,
                agency_id: None,
                name: "Tower".to_string(),
                address: format!("1 Main Street, {}", agency.country),
                floors: 8,
            },
        )
        .await?;

    let building_id = building.id.unwrap_or_default();
    for (label, renter_id) in [("A1", renter.id.clone()), ("A2", None)] {
        repos
            .units
            .create(
                ctx,
                Unit {
                    id: None,
                    agency_id: None,
                    building_id: building_id.clone(),
                    label: label.to_string(),
                    bedrooms: 2,
                    monthly_rent: 150_000,
                    currency: agency.currency.clone(),
                    owner_id: owner.id.clone(),
                    renter_id,
                },
            )
            .await?;
    }
    Ok(())
}

/// Register two demo agencies, each with an owner, a renter, a building and
/// two units (one let). Agencies that already exist are left untouched.
pub async fn seed_demo(erp: &Erp) -> Result<()> {
    for agency in demo_agencies() {
        if erp.agencies.get(&agency.id).await?.is_some() {
            tracing::debug!(agency = %agency.id, "demo agency already present");
            continue;
        }
        let agency = erp.agencies.register(agency).await?;
        let repos = erp.repos.clone();
        erp.jobs
            .run_as_tenant("seed-demo", agency.tenant(), |ctx| async move {
                seed_agency(&repos, &ctx, &agency).await
            })
            .await?;
    }
    Ok(())
}
