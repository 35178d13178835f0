//! Provisioner creating one database per tenant.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info, warn};

use super::migrations::TenantMigrator;
use crate::config::ProvisioningConfig;
use crate::domain::locks::TenantLocks;
use crate::domain::provisioner::{ProvisionError, ResourceProvisioner};

const SEED_SQL: &str = "INSERT INTO tenant_settings (key, value) VALUES \
    ('locale', 'en'), ('timezone', 'UTC') \
    ON CONFLICT (key) DO NOTHING";

/// Backend-specific database lifecycle operations.
#[async_trait]
pub trait DatabaseManager: Send + Sync {
    fn driver(&self) -> &'static str;

    async fn database_exists(&self, name: &str) -> anyhow::Result<bool>;

    /// Create the database; `false` if it already existed.
    async fn create_database(&self, name: &str) -> anyhow::Result<bool>;

    /// Drop the database; `false` if it did not exist.
    async fn drop_database(&self, name: &str) -> anyhow::Result<bool>;

    async fn connect(&self, name: &str) -> anyhow::Result<DatabaseConnection>;
}

pub struct DatabaseProvisioner {
    manager: Arc<dyn DatabaseManager>,
    prefix: String,
    suffix: String,
    locks: TenantLocks,
}

impl DatabaseProvisioner {
    #[must_use]
    pub fn new(manager: Arc<dyn DatabaseManager>, config: &ProvisioningConfig) -> Self {
        Self {
            manager,
            prefix: config.database_prefix.clone(),
            suffix: config.database_suffix.clone(),
            locks: TenantLocks::new(),
        }
    }

    #[must_use]
    pub fn database_name(&self, tenant_id: &str) -> String {
        format!("{}{tenant_id}{}", self.prefix, self.suffix)
    }

    async fn connect_existing(
        &self,
        tenant_id: &str,
        name: &str,
        on_error: fn(&str, String) -> ProvisionError,
    ) -> Result<DatabaseConnection, ProvisionError> {
        let exists = self
            .manager
            .database_exists(name)
            .await
            .map_err(|e| on_error(tenant_id, format!("{e:#}")))?;
        if !exists {
            return Err(ProvisionError::NotFound {
                tenant: tenant_id.to_owned(),
            });
        }
        self.manager
            .connect(name)
            .await
            .map_err(|e| on_error(tenant_id, format!("{e:#}")))
    }
}

async fn close(conn: DatabaseConnection, name: &str) {
    if let Err(e) = conn.close().await {
        warn!(database = name, error = %e, "Failed to close tenant database connection");
    }
}

#[async_trait]
impl ResourceProvisioner for DatabaseProvisioner {
    fn driver(&self) -> &'static str {
        self.manager.driver()
    }

    async fn create_resources(&self, tenant_id: &str) -> Result<(), ProvisionError> {
        let _guard = self.locks.acquire(tenant_id).await;
        let name = self.database_name(tenant_id);
        let created = self
            .manager
            .create_database(&name)
            .await
            .map_err(|e| ProvisionError::provisioning(tenant_id, format!("{e:#}")))?;
        if !created {
            return Err(ProvisionError::AlreadyExists {
                tenant: tenant_id.to_owned(),
            });
        }
        info!(database = %name, driver = self.manager.driver(), "Tenant database created");
        Ok(())
    }

    async fn migrate_resources(&self, tenant_id: &str) -> Result<(), ProvisionError> {
        let _guard = self.locks.acquire(tenant_id).await;
        let name = self.database_name(tenant_id);
        let conn = self
            .connect_existing(tenant_id, &name, ProvisionError::migration)
            .await?;
        let res = TenantMigrator::up(&conn, None).await;
        close(conn, &name).await;
        res.map_err(|e| ProvisionError::migration(tenant_id, e))?;
        debug!(database = %name, "Tenant database migrated");
        Ok(())
    }

    async fn seed_resources(&self, tenant_id: &str) -> Result<(), ProvisionError> {
        let _guard = self.locks.acquire(tenant_id).await;
        let name = self.database_name(tenant_id);
        let conn = self
            .connect_existing(tenant_id, &name, ProvisionError::seeding)
            .await?;
        let res = conn.execute_unprepared(SEED_SQL).await;
        close(conn, &name).await;
        res.map_err(|e| ProvisionError::seeding(tenant_id, e))?;
        debug!(database = %name, "Tenant database seeded");
        Ok(())
    }

    async fn delete_resources(&self, tenant_id: &str) -> Result<(), ProvisionError> {
        let guard = self.locks.acquire(tenant_id).await;
        let name = self.database_name(tenant_id);
        let dropped = self
            .manager
            .drop_database(&name)
            .await
            .map_err(|e| ProvisionError::teardown(tenant_id, format!("{e:#}")))?;
        if dropped {
            info!(database = %name, "Tenant database dropped");
        } else {
            debug!(database = %name, "Tenant database already absent");
        }
        drop(guard);
        self.locks.release(tenant_id);
        Ok(())
    }
}
