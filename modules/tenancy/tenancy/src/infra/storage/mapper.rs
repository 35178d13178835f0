use anyhow::anyhow;
use tenancy_sdk::{Metadata, Tenant, TenantStatus};

use super::entity;

impl TryFrom<entity::Model> for Tenant {
    type Error = anyhow::Error;

    fn try_from(entity: entity::Model) -> Result<Self, Self::Error> {
        let status = TenantStatus::parse(&entity.status).ok_or_else(|| {
            anyhow!("tenant '{}' has unknown status '{}'", entity.id, entity.status)
        })?;
        let metadata = match entity.metadata {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => Metadata::new(),
            other => return Err(anyhow!("tenant '{}' has non-object metadata: {other}", entity.id)),
        };
        Ok(Self {
            id: entity.id,
            status,
            metadata,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

impl From<&Tenant> for entity::ActiveModel {
    fn from(tenant: &Tenant) -> Self {
        use sea_orm::ActiveValue::Set;

        Self {
            id: Set(tenant.id.clone()),
            status: Set(tenant.status.as_str().to_owned()),
            metadata: Set(serde_json::Value::Object(tenant.metadata.clone())),
            created_at: Set(tenant.created_at),
            updated_at: Set(tenant.updated_at),
        }
    }
}
