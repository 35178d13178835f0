use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue, DatabaseConnection, EntityTrait, QueryOrder, SqlErr,
};
use tenancy_sdk::{Metadata, Tenant, TenantStatus};
use time::OffsetDateTime;

use crate::domain::repo::TenantRepository;

use super::entity::{self, Entity as TenantEntity};

pub struct SeaOrmTenantRepository {
    db: DatabaseConnection,
}

impl SeaOrmTenantRepository {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn modify(
        &self,
        id: &str,
        apply: impl FnOnce(&mut entity::ActiveModel) + Send,
    ) -> anyhow::Result<Option<Tenant>> {
        let Some(existing) = TenantEntity::find_by_id(id.to_owned()).one(&self.db).await? else {
            return Ok(None);
        };
        let mut active_model: entity::ActiveModel = existing.into();
        apply(&mut active_model);
        let model = active_model.update(&self.db).await?;
        Ok(Some(model.try_into()?))
    }
}

#[async_trait]
impl TenantRepository for SeaOrmTenantRepository {
    async fn find(&self, id: &str) -> anyhow::Result<Option<Tenant>> {
        TenantEntity::find_by_id(id.to_owned())
            .one(&self.db)
            .await?
            .map(Tenant::try_from)
            .transpose()
    }

    async fn list(&self) -> anyhow::Result<Vec<Tenant>> {
        TenantEntity::find()
            .order_by_asc(entity::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Tenant::try_from)
            .collect()
    }

    async fn try_insert(&self, tenant: &Tenant) -> anyhow::Result<bool> {
        let active_model = entity::ActiveModel::from(tenant);
        match TenantEntity::insert(active_model)
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_metadata(
        &self,
        id: &str,
        metadata: Metadata,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Tenant>> {
        self.modify(id, |m| {
            m.metadata = ActiveValue::Set(serde_json::Value::Object(metadata));
            m.updated_at = ActiveValue::Set(at);
        })
        .await
    }

    async fn set_status(
        &self,
        id: &str,
        status: TenantStatus,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Tenant>> {
        self.modify(id, |m| {
            m.status = ActiveValue::Set(status.as_str().to_owned());
            m.updated_at = ActiveValue::Set(at);
        })
        .await
    }

    async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let res = TenantEntity::delete_by_id(id.to_owned())
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }
}
