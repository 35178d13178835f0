//! Built-in provisioning steps backed by a [`ResourceProvisioner`].

use std::sync::Arc;

use async_trait::async_trait;
use tenancy_sdk::Tenant;
use tracing::{debug, warn};

use super::events::EventKind;
use super::pipeline::{PipelineStep, StepContext, StepError};
use super::provisioner::{ProvisionError, ResourceProvisioner};

pub struct CreateDatabase {
    provisioner: Arc<dyn ResourceProvisioner>,
}

impl CreateDatabase {
    #[must_use]
    pub fn new(provisioner: Arc<dyn ResourceProvisioner>) -> Self {
        Self { provisioner }
    }
}

#[async_trait]
impl PipelineStep for CreateDatabase {
    fn name(&self) -> &'static str {
        "CreateDatabase"
    }

    fn emits(&self) -> Option<EventKind> {
        Some(EventKind::DatabaseCreated)
    }

    async fn run(&self, tenant: &Tenant, ctx: &StepContext) -> Result<(), StepError> {
        match self.provisioner.create_resources(&tenant.id).await {
            Ok(()) => {
                debug!(
                    tenant_id = %tenant.id,
                    driver = self.provisioner.driver(),
                    "Tenant database created"
                );
                Ok(())
            }
            // Redelivered creation; the database is already there.
            Err(ProvisionError::AlreadyExists { .. }) => {
                warn!(
                    tenant_id = %tenant.id,
                    correlation_id = %ctx.correlation_id,
                    "Tenant database already exists"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub struct MigrateDatabase {
    provisioner: Arc<dyn ResourceProvisioner>,
}

impl MigrateDatabase {
    #[must_use]
    pub fn new(provisioner: Arc<dyn ResourceProvisioner>) -> Self {
        Self { provisioner }
    }
}

#[async_trait]
impl PipelineStep for MigrateDatabase {
    fn name(&self) -> &'static str {
        "MigrateDatabase"
    }

    fn emits(&self) -> Option<EventKind> {
        Some(EventKind::DatabaseMigrated)
    }

    async fn run(&self, tenant: &Tenant, _ctx: &StepContext) -> Result<(), StepError> {
        self.provisioner.migrate_resources(&tenant.id).await?;
        Ok(())
    }
}

pub struct SeedDatabase {
    provisioner: Arc<dyn ResourceProvisioner>,
}

impl SeedDatabase {
    #[must_use]
    pub fn new(provisioner: Arc<dyn ResourceProvisioner>) -> Self {
        Self { provisioner }
    }
}

#[async_trait]
impl PipelineStep for SeedDatabase {
    fn name(&self) -> &'static str {
        "SeedDatabase"
    }

    fn emits(&self) -> Option<EventKind> {
        Some(EventKind::DatabaseSeeded)
    }

    async fn run(&self, tenant: &Tenant, _ctx: &StepContext) -> Result<(), StepError> {
        self.provisioner.seed_resources(&tenant.id).await?;
        Ok(())
    }
}

pub struct DeleteDatabase {
    provisioner: Arc<dyn ResourceProvisioner>,
}

impl DeleteDatabase {
    #[must_use]
    pub fn new(provisioner: Arc<dyn ResourceProvisioner>) -> Self {
        Self { provisioner }
    }
}

#[async_trait]
impl PipelineStep for DeleteDatabase {
    fn name(&self) -> &'static str {
        "DeleteDatabase"
    }

    fn emits(&self) -> Option<EventKind> {
        Some(EventKind::DatabaseDeleted)
    }

    async fn run(&self, tenant: &Tenant, _ctx: &StepContext) -> Result<(), StepError> {
        self.provisioner.delete_resources(&tenant.id).await?;
        Ok(())
    }
}
