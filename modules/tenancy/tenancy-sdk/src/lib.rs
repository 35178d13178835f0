//! Tenancy SDK
//!
//! This crate provides the public API for the `tenancy` module:
//!
//! - [`TenancyClientV1`] - Public API trait for consumers
//! - [`Tenant`], [`TenantStatus`], [`NewTenant`], [`TenantPatch`] - Domain models
//! - [`TenancyError`] - Error types

pub mod api;
pub mod errors;
pub mod models;

pub use api::TenancyClientV1;
pub use errors::TenancyError;
pub use models::{DeleteOutcome, Metadata, NewTenant, Tenant, TenantId, TenantPatch, TenantStatus};
