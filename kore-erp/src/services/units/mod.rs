use std::sync::Arc;

use kore_axum::EntityRoutes;

use crate::services::shared::{RejectBlank, RequireVisible, ValidateSchema};
use crate::services::ErpRepositories;

pub mod units_schema;

pub use units_schema::Unit;

fn building_of(unit: &Unit) -> Option<&str> {
    Some(unit.building_id.as_str())
}

fn owner_of(unit: &Unit) -> Option<&str> {
    unit.owner_id.as_deref()
}

fn renter_of(unit: &Unit) -> Option<&str> {
    unit.renter_id.as_deref()
}

pub fn routes(repos: &ErpRepositories) -> EntityRoutes<Unit> {
    EntityRoutes::new(repos.units.clone())
        .hook(Arc::new(ValidateSchema))
        .hook(Arc::new(RejectBlank(&["building_id", "label"])))
        .hook(Arc::new(RequireVisible::new(
            "building_id",
            building_of,
            repos.buildings.clone(),
        )))
        .hook(Arc::new(RequireVisible::new(
            "owner_id",
            owner_of,
            repos.owners.clone(),
        )))
        .hook(Arc::new(RequireVisible::new(
            "renter_id",
            renter_of,
            repos.renters.clone(),
        )))
}
