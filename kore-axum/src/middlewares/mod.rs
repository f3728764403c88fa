pub mod tenancy;

pub use tenancy::{Tenancy, TenancyLayer, TenancyService};
