use std::sync::Arc;

use kore_axum::EntityRoutes;

use crate::services::shared::{RequireVisible, ValidateSchema};
use crate::services::ErpRepositories;

pub mod invoices_schema;

pub use invoices_schema::{BillingPeriod, Invoice, InvoiceStatus};

fn unit_of(invoice: &Invoice) -> Option<&str> {
    Some(invoice.unit_id.as_str())
}

fn renter_of(invoice: &Invoice) -> Option<&str> {
    Some(invoice.renter_id.as_str())
}

pub fn routes(repos: &ErpRepositories) -> EntityRoutes<Invoice> {
    EntityRoutes::new(repos.invoices.clone())
        .hook(Arc::new(ValidateSchema))
        .hook(Arc::new(RequireVisible::new(
            "unit_id",
            unit_of,
            repos.units.clone(),
        )))
        .hook(Arc::new(RequireVisible::new(
            "renter_id",
            renter_of,
            repos.renters.clone(),
        )))
}
