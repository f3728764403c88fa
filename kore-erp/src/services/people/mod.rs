use std::sync::Arc;

use kore_axum::EntityRoutes;

use crate::services::shared::{RejectBlank, ValidateSchema};
use crate::services::ErpRepositories;

pub mod owners_schema;
pub mod renters_schema;

pub use owners_schema::Owner;
pub use renters_schema::Renter;

pub fn owner_routes(repos: &ErpRepositories) -> EntityRoutes<Owner> {
    EntityRoutes::new(repos.owners.clone())
        .hook(Arc::new(ValidateSchema))
        .hook(Arc::new(RejectBlank(&["name", "email"])))
}

pub fn renter_routes(repos: &ErpRepositories) -> EntityRoutes<Renter> {
    EntityRoutes::new(repos.renters.clone())
        .hook(Arc::new(ValidateSchema))
        .hook(Arc::new(RejectBlank(&["name", "email"])))
}
