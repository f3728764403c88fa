use std::sync::Arc;

use kore_axum::EntityRoutes;

use crate::services::shared::{RejectBlank, RequireVisible, ValidateSchema};
use crate::services::ErpRepositories;

pub mod maintenance_schema;

pub use maintenance_schema::{MaintenanceRequest, MaintenanceStatus, Priority};

fn unit_of(request: &MaintenanceRequest) -> Option<&str> {
    Some(request.unit_id.as_str())
}

pub fn routes(repos: &ErpRepositories) -> EntityRoutes<MaintenanceRequest> {
    EntityRoutes::new(repos.maintenance.clone())
        .hook(Arc::new(ValidateSchema))
        .hook(Arc::new(RejectBlank(&["title"])))
        .hook(Arc::new(RequireVisible::new(
            "unit_id",
            unit_of,
            repos.units.clone(),
        )))
}
