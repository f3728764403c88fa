//! KORE ERP: property management for many agencies on one platform.
//!
//! Every tenant-owned record is reached through a
//! [`kore_core::ScopedRepository`]; HTTP requests and background jobs each
//! get their own tenant context.

mod app;

pub mod agencies;
pub mod dashboard;
pub mod jobs;
pub mod seed;
pub mod services;

pub use app::{build, build_with, Erp};
