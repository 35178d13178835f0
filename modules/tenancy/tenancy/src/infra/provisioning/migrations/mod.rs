//! Schema applied to every tenant database.

use sea_orm_migration::prelude::*;

mod tenant_001;

pub struct TenantMigrator;

#[async_trait::async_trait]
impl MigratorTrait for TenantMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(tenant_001::Migration)]
    }
}
