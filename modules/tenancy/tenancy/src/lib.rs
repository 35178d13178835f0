//! Tenancy Module Implementation
//!
//! Tenant registry, lifecycle event dispatch, provisioning pipelines and the
//! resource provisioners behind them. The public API is defined in
//! `tenancy-sdk` and re-exported here.

pub use tenancy_sdk::{
    DeleteOutcome, Metadata, NewTenant, TenancyClientV1, TenancyError, Tenant, TenantPatch,
    TenantStatus,
};

pub mod module;
pub use module::TenancyModule;

pub mod config;
pub use config::TenancyConfig;

pub mod local_client;

#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
