//! kore-axum: Axum adapter for KORE ERP.
//!
//! Every request gets its own [`kore_core::TenantContext`], resolved from
//! headers by the [`middlewares::TenancyLayer`] and handed to handlers via
//! the [`Tenancy`] extractor. Tenant-owned entities are exposed as REST
//! routers over a [`kore_core::ScopedRepository`].

pub mod app;
pub mod middlewares;
pub mod params;
pub mod rest;
pub mod state;
mod error;
pub use error::KoreAxumError;
pub use middlewares::{Tenancy, TenancyLayer};
pub use rest::{EntityHook, EntityRoutes};
pub use state::KoreAxumState;

pub use app::{axum, AxumApp};
