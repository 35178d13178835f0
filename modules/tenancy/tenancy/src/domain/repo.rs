use async_trait::async_trait;
use tenancy_sdk::{Metadata, Tenant, TenantStatus};
use time::OffsetDateTime;

/// Durable store of tenant records.
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find(&self, id: &str) -> anyhow::Result<Option<Tenant>>;

    /// All tenants ordered by id.
    async fn list(&self) -> anyhow::Result<Vec<Tenant>>;

    /// Insert `tenant`; `false` if a record with the same id already exists.
    async fn try_insert(&self, tenant: &Tenant) -> anyhow::Result<bool>;

    async fn update_metadata(
        &self,
        id: &str,
        metadata: Metadata,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Tenant>>;

    async fn set_status(
        &self,
        id: &str,
        status: TenantStatus,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Tenant>>;

    /// Remove the record; `false` if it did not exist.
    async fn delete(&self, id: &str) -> anyhow::Result<bool>;
}
