//! Port for creating and releasing per-tenant isolated resources.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("resources for tenant '{tenant}' already exist")]
    AlreadyExists { tenant: String },

    #[error("resources for tenant '{tenant}' do not exist")]
    NotFound { tenant: String },

    #[error("failed to provision resources for tenant '{tenant}': {reason}")]
    Provisioning { tenant: String, reason: String },

    #[error("failed to migrate resources for tenant '{tenant}': {reason}")]
    Migration { tenant: String, reason: String },

    #[error("failed to seed resources for tenant '{tenant}': {reason}")]
    Seeding { tenant: String, reason: String },

    #[error("failed to release resources for tenant '{tenant}': {reason}")]
    Teardown { tenant: String, reason: String },
}

impl ProvisionError {
    #[must_use]
    pub fn provisioning(tenant: &str, reason: impl std::fmt::Display) -> Self {
        Self::Provisioning {
            tenant: tenant.to_owned(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn migration(tenant: &str, reason: impl std::fmt::Display) -> Self {
        Self::Migration {
            tenant: tenant.to_owned(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn seeding(tenant: &str, reason: impl std::fmt::Display) -> Self {
        Self::Seeding {
            tenant: tenant.to_owned(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn teardown(tenant: &str, reason: impl std::fmt::Display) -> Self {
        Self::Teardown {
            tenant: tenant.to_owned(),
            reason: reason.to_string(),
        }
    }
}

/// Creates, migrates, seeds and destroys the isolated resources of a tenant.
///
/// Calls for the same tenant id are serialized by implementations; calls for
/// different tenants may run concurrently.
#[async_trait]
pub trait ResourceProvisioner: Send + Sync {
    /// Short driver name used in logs.
    fn driver(&self) -> &'static str;

    /// # Errors
    /// [`ProvisionError::AlreadyExists`] if the resources exist, leaving them
    /// untouched.
    async fn create_resources(&self, tenant_id: &str) -> Result<(), ProvisionError>;

    /// # Errors
    /// [`ProvisionError::NotFound`] if the resources were never created.
    async fn migrate_resources(&self, tenant_id: &str) -> Result<(), ProvisionError>;

    /// # Errors
    /// [`ProvisionError::NotFound`] if the resources were never created.
    async fn seed_resources(&self, tenant_id: &str) -> Result<(), ProvisionError>;

    /// Releasing resources that do not exist succeeds.
    ///
    /// # Errors
    /// [`ProvisionError::Teardown`] if the resources could not be released.
    async fn delete_resources(&self, tenant_id: &str) -> Result<(), ProvisionError>;
}
