use std::sync::Arc;

use kore_axum::AxumApp;
use kore_core::{DataStore, ScopedRepository};

pub mod buildings;
pub mod invoices;
pub mod maintenance;
pub mod people;
pub mod shared;
pub mod units;

pub use buildings::Building;
pub use invoices::{BillingPeriod, Invoice, InvoiceStatus};
pub use maintenance::{MaintenanceRequest, MaintenanceStatus, Priority};
pub use people::{Owner, Renter};
pub use units::Unit;

/// One scoped repository per tenant-owned entity, all over the same store.
#[derive(Clone)]
pub struct ErpRepositories {
    pub buildings: ScopedRepository<Building>,
    pub units: ScopedRepository<Unit>,
    pub owners: ScopedRepository<Owner>,
    pub renters: ScopedRepository<Renter>,
    pub invoices: ScopedRepository<Invoice>,
    pub maintenance: ScopedRepository<MaintenanceRequest>,
}

impl ErpRepositories {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            buildings: ScopedRepository::new(Arc::clone(&store)),
            units: ScopedRepository::new(Arc::clone(&store)),
            owners: ScopedRepository::new(Arc::clone(&store)),
            renters: ScopedRepository::new(Arc::clone(&store)),
            invoices: ScopedRepository::new(Arc::clone(&store)),
            maintenance: ScopedRepository::new(store),
        }
    }
}

/// Mount the REST routes of every tenant-owned entity.
pub fn configure(app: AxumApp, repos: &ErpRepositories) -> AxumApp {
    app.use_entity_routes("/buildings", buildings::routes(repos))
        .use_entity_routes("/units", units::routes(repos))
        .use_entity_routes("/owners", people::owner_routes(repos))
        .use_entity_routes("/renters", people::renter_routes(repos))
        .use_entity_routes("/invoices", invoices::routes(repos))
        .use_entity_routes("/maintenance-requests", maintenance::routes(repos))
}
