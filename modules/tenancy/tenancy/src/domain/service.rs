use std::sync::Arc;

use tenancy_sdk::{DeleteOutcome, Metadata, NewTenant, Tenant, TenantPatch, TenantStatus};
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use super::dispatcher::EventPublisher;
use super::error::DomainError;
use super::events::{EventKind, LifecycleEvent};
use super::repo::TenantRepository;

pub struct ServiceConfig {
    pub max_id_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { max_id_length: 64 }
    }
}

/// Tenant registry.
///
/// Every successful mutation commits the record first and then publishes
/// exactly one lifecycle event. Rejected mutations publish nothing.
pub struct Service {
    repo: Arc<dyn TenantRepository>,
    publisher: Arc<dyn EventPublisher>,
    config: ServiceConfig,
}

impl Service {
    pub fn new(
        repo: Arc<dyn TenantRepository>,
        publisher: Arc<dyn EventPublisher>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repo,
            publisher,
            config,
        }
    }

    #[instrument(name = "tenancy.service.create", skip(self, new), fields(tenant_id = %new.id))]
    pub async fn create(&self, new: NewTenant) -> Result<Tenant, DomainError> {
        self.validate_id(&new.id)?;

        let now = OffsetDateTime::now_utc();
        let tenant = Tenant {
            id: new.id,
            status: TenantStatus::Active,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        };
        if !self.repo.try_insert(&tenant).await? {
            return Err(DomainError::duplicate_id(tenant.id));
        }
        info!("Tenant created");

        self.emit(EventKind::TenantCreated, tenant.clone()).await;
        Ok(tenant)
    }

    pub async fn get(&self, id: &str) -> Result<Tenant, DomainError> {
        self.repo
            .find(id)
            .await?
            .ok_or_else(|| DomainError::not_found(id))
    }

    pub async fn list(&self) -> Result<Vec<Tenant>, DomainError> {
        Ok(self.repo.list().await?)
    }

    /// Update metadata, or rename when `patch.rename_to` differs from `id`.
    #[instrument(name = "tenancy.service.update", skip(self, patch))]
    pub async fn update(&self, id: &str, patch: TenantPatch) -> Result<Tenant, DomainError> {
        if let Some(new_id) = patch.rename_to.filter(|new_id| new_id != id) {
            return self.rename(id, &new_id, patch.metadata).await;
        }

        let current = self.get_active(id).await?;
        let metadata = patch.metadata.unwrap_or(current.metadata);
        let tenant = self
            .repo
            .update_metadata(id, metadata, OffsetDateTime::now_utc())
            .await?
            .ok_or_else(|| DomainError::not_found(id))?;
        debug!("Tenant metadata updated");

        self.emit(EventKind::TenantUpdated, tenant.clone()).await;
        Ok(tenant)
    }

    /// Move a tenant to a new id: the new tenant is created and provisioned
    /// first, then the old one is deleted. Metadata is carried over unless
    /// `metadata` replaces it.
    #[instrument(name = "tenancy.service.rename", skip(self, metadata))]
    pub async fn rename(
        &self,
        id: &str,
        new_id: &str,
        metadata: Option<Metadata>,
    ) -> Result<Tenant, DomainError> {
        self.validate_id(new_id)?;
        let current = self.get_active(id).await?;

        let renamed = self
            .create(NewTenant {
                id: new_id.to_owned(),
                metadata: metadata.unwrap_or(current.metadata),
            })
            .await?;
        self.delete(id).await?;
        info!("Tenant renamed");
        Ok(renamed)
    }

    /// Mark the tenant as deleting and request teardown of its resources.
    ///
    /// The record is purged once teardown completes; when that happens
    /// before this call returns the outcome is [`DeleteOutcome::Removed`].
    #[instrument(name = "tenancy.service.delete", skip(self))]
    pub async fn delete(&self, id: &str) -> Result<DeleteOutcome, DomainError> {
        self.get_active(id).await?;
        let tenant = self
            .repo
            .set_status(id, TenantStatus::Deleting, OffsetDateTime::now_utc())
            .await?
            .ok_or_else(|| DomainError::not_found(id))?;
        info!("Tenant marked for deletion");

        self.emit(EventKind::TenantDeleted, tenant).await;
        self.outcome(id).await
    }

    /// Re-run the creation pipeline for an active tenant.
    #[instrument(name = "tenancy.service.reprovision", skip(self))]
    pub async fn reprovision(&self, id: &str) -> Result<Tenant, DomainError> {
        let tenant = self.get_active(id).await?;
        self.emit(EventKind::TenantCreated, tenant.clone()).await;
        Ok(tenant)
    }

    /// Re-run the deletion pipeline for a tenant stuck in `deleting`.
    #[instrument(name = "tenancy.service.resume_teardown", skip(self))]
    pub async fn resume_teardown(&self, id: &str) -> Result<DeleteOutcome, DomainError> {
        let tenant = self.get(id).await?;
        if !tenant.is_deleting() {
            return Err(DomainError::validation("status", "tenant is not being deleted"));
        }
        self.emit(EventKind::TenantDeleted, tenant).await;
        self.outcome(id).await
    }

    /// Resume teardown of every tenant left in `deleting`, e.g. after a
    /// restart dropped its queued deletion job. Returns how many were found.
    ///
    /// # Errors
    /// Returns [`DomainError::Database`] if the registry cannot be listed.
    #[instrument(name = "tenancy.service.resume_pending_teardowns", skip(self))]
    pub async fn resume_pending_teardowns(&self) -> Result<usize, DomainError> {
        let stuck: Vec<Tenant> = self
            .repo
            .list()
            .await?
            .into_iter()
            .filter(Tenant::is_deleting)
            .collect();
        for tenant in &stuck {
            if let Err(e) = self.resume_teardown(&tenant.id).await {
                warn!(tenant_id = %tenant.id, error = %e, "Failed to resume tenant teardown");
            }
        }
        if !stuck.is_empty() {
            info!(count = stuck.len(), "Resumed pending tenant teardowns");
        }
        Ok(stuck.len())
    }

    async fn get_active(&self, id: &str) -> Result<Tenant, DomainError> {
        let tenant = self.get(id).await?;
        if tenant.is_deleting() {
            return Err(DomainError::teardown_in_progress(id));
        }
        Ok(tenant)
    }

    async fn outcome(&self, id: &str) -> Result<DeleteOutcome, DomainError> {
        Ok(match self.repo.find(id).await? {
            None => DeleteOutcome::Removed,
            Some(tenant) => DeleteOutcome::Pending(tenant),
        })
    }

    async fn emit(&self, kind: EventKind, tenant: Tenant) {
        let report = self.publisher.publish(LifecycleEvent::new(kind, tenant)).await;
        for failure in report.failures() {
            warn!(
                event = %kind,
                handler = %failure.handler,
                correlation_id = %report.correlation_id,
                "Lifecycle handler failed"
            );
        }
    }

    fn validate_id(&self, id: &str) -> Result<(), DomainError> {
        if id.is_empty() {
            return Err(DomainError::validation("name", "must not be empty"));
        }
        if id.len() > self.config.max_id_length {
            return Err(DomainError::validation(
                "name",
                format!("exceeds maximum length of {}", self.config.max_id_length),
            ));
        }
        if !id.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(DomainError::validation(
                "name",
                "must start with an ASCII letter or digit",
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::validation(
                "name",
                "may only contain ASCII letters, digits, '-' and '_'",
            ));
        }
        Ok(())
    }
}
