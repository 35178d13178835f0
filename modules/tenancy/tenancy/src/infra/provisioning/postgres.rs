use async_trait::async_trait;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};
use url::Url;

use super::database::DatabaseManager;

/// One database per tenant on the server hosting the central database.
///
/// Databases are created and dropped over the central connection; tenant
/// connections reuse the central DSN with the database name swapped.
pub struct PostgresDatabaseManager {
    admin: DatabaseConnection,
    base_url: Url,
}

impl PostgresDatabaseManager {
    /// # Errors
    /// Returns an error if `dsn` is not a valid URL.
    pub fn new(admin: DatabaseConnection, dsn: &str) -> anyhow::Result<Self> {
        Ok(Self {
            admin,
            base_url: Url::parse(dsn)?,
        })
    }

    fn tenant_url(&self, name: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("/{name}"));
        url
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[async_trait]
impl DatabaseManager for PostgresDatabaseManager {
    fn driver(&self) -> &'static str {
        "postgres"
    }

    async fn database_exists(&self, name: &str) -> anyhow::Result<bool> {
        let row = self
            .admin
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT 1 FROM pg_database WHERE datname = $1",
                [name.into()],
            ))
            .await?;
        Ok(row.is_some())
    }

    async fn create_database(&self, name: &str) -> anyhow::Result<bool> {
        if self.database_exists(name).await? {
            return Ok(false);
        }
        self.admin
            .execute_unprepared(&format!("CREATE DATABASE {}", quote_ident(name)))
            .await?;
        Ok(true)
    }

    async fn drop_database(&self, name: &str) -> anyhow::Result<bool> {
        let existed = self.database_exists(name).await?;
        self.admin
            .execute_unprepared(&format!("DROP DATABASE IF EXISTS {}", quote_ident(name)))
            .await?;
        Ok(existed)
    }

    async fn connect(&self, name: &str) -> anyhow::Result<DatabaseConnection> {
        Ok(Database::connect(self.tenant_url(name).as_str()).await?)
    }
}
