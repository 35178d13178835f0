use serde::{Deserialize, Serialize};
use tenancy_sdk::{DeleteOutcome, Metadata, NewTenant, Tenant, TenantPatch};
use time::OffsetDateTime;

#[derive(Debug, Serialize, Deserialize)]
pub struct TenantDto {
    pub id: String,
    pub status: String,
    pub metadata: Metadata,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Tenant> for TenantDto {
    fn from(tenant: Tenant) -> Self {
        Self {
            id: tenant.id,
            status: tenant.status.as_str().to_owned(),
            metadata: tenant.metadata,
            created_at: tenant.created_at,
            updated_at: tenant.updated_at,
        }
    }
}

/// Body of `POST /tenants`. `name` becomes the tenant id.
#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl From<CreateTenantRequest> for NewTenant {
    fn from(req: CreateTenantRequest) -> Self {
        Self {
            id: req.name,
            metadata: req.metadata,
        }
    }
}

/// Body of `PUT /tenants/{id}`. A `name` different from the path id renames
/// the tenant.
#[derive(Debug, Deserialize)]
pub struct UpdateTenantRequest {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl From<UpdateTenantRequest> for TenantPatch {
    fn from(req: UpdateTenantRequest) -> Self {
        Self {
            rename_to: Some(req.name),
            metadata: req.metadata,
        }
    }
}

/// Tenant still pending teardown, if any.
#[must_use]
pub fn pending(outcome: DeleteOutcome) -> Option<TenantDto> {
    match outcome {
        DeleteOutcome::Removed => None,
        DeleteOutcome::Pending(tenant) => Some(tenant.into()),
    }
}
