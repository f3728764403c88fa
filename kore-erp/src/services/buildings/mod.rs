use std::sync::Arc;

use kore_axum::EntityRoutes;

use crate::services::shared::{RejectBlank, ValidateSchema};
use crate::services::ErpRepositories;

pub mod buildings_schema;

pub use buildings_schema::Building;

pub fn routes(repos: &ErpRepositories) -> EntityRoutes<Building> {
    EntityRoutes::new(repos.buildings.clone())
        .hook(Arc::new(ValidateSchema))
        .hook(Arc::new(RejectBlank(&["name", "address"])))
}
