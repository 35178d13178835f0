//! `TenancyClientV1` trait definition.
//!
//! This trait defines the public in-process API of the tenancy module
//! (Version 1). The HTTP layer and other modules consume it instead of the
//! concrete registry service.

use async_trait::async_trait;

use crate::errors::TenancyError;
use crate::models::{DeleteOutcome, NewTenant, Tenant, TenantPatch};

/// Public API trait for the tenancy module (Version 1).
///
/// ```ignore
/// let tenancy: Arc<dyn TenancyClientV1> = module.client();
/// let tenant = tenancy
///     .create_tenant(NewTenant { id: "acme".into(), ..Default::default() })
///     .await?;
/// ```
///
/// Every successful mutation publishes exactly one lifecycle event after the
/// record is committed; failed calls publish nothing.
#[async_trait]
pub trait TenancyClientV1: Send + Sync {
    /// Register a new tenant and run its provisioning pipeline.
    async fn create_tenant(&self, new_tenant: NewTenant) -> Result<Tenant, TenancyError>;

    /// Fetch a tenant by id, including tenants pending deletion.
    async fn get_tenant(&self, id: &str) -> Result<Tenant, TenancyError>;

    /// All tenants ordered by id.
    async fn list_tenants(&self) -> Result<Vec<Tenant>, TenancyError>;

    /// Replace metadata and/or rename a tenant.
    async fn update_tenant(&self, id: &str, patch: TenantPatch) -> Result<Tenant, TenancyError>;

    /// Request teardown of a tenant's resources followed by record removal.
    async fn delete_tenant(&self, id: &str) -> Result<DeleteOutcome, TenancyError>;
}
