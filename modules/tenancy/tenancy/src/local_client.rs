use std::sync::Arc;

use async_trait::async_trait;
use tenancy_sdk::{DeleteOutcome, NewTenant, TenancyClientV1, TenancyError, Tenant, TenantPatch};

use crate::domain::service::Service;

/// In-process implementation of [`TenancyClientV1`].
pub struct LocalClient {
    service: Arc<Service>,
}

impl LocalClient {
    #[must_use]
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl TenancyClientV1 for LocalClient {
    async fn create_tenant(&self, new: NewTenant) -> Result<Tenant, TenancyError> {
        self.service.create(new).await.map_err(Into::into)
    }

    async fn get_tenant(&self, id: &str) -> Result<Tenant, TenancyError> {
        self.service.get(id).await.map_err(Into::into)
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, TenancyError> {
        self.service.list().await.map_err(Into::into)
    }

    async fn update_tenant(&self, id: &str, patch: TenantPatch) -> Result<Tenant, TenancyError> {
        self.service.update(id, patch).await.map_err(Into::into)
    }

    async fn delete_tenant(&self, id: &str) -> Result<DeleteOutcome, TenancyError> {
        self.service.delete(id).await.map_err(Into::into)
    }
}
