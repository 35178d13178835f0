use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use sea_orm::{Database, DatabaseConnection};

use super::database::DatabaseManager;

/// One SQLite file per tenant database, named `{name}.sqlite`.
pub struct SqliteDatabaseManager {
    dir: PathBuf,
}

impl SqliteDatabaseManager {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.sqlite"))
    }
}

#[async_trait]
impl DatabaseManager for SqliteDatabaseManager {
    fn driver(&self) -> &'static str {
        "sqlite"
    }

    async fn database_exists(&self, name: &str) -> anyhow::Result<bool> {
        Ok(tokio::fs::try_exists(self.path(name)).await?)
    }

    async fn create_database(&self, name: &str) -> anyhow::Result<bool> {
        tokio::fs::create_dir_all(&self.dir).await?;
        // An empty file is a valid SQLite database.
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path(name))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn drop_database(&self, name: &str) -> anyhow::Result<bool> {
        match tokio::fs::remove_file(self.path(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn connect(&self, name: &str) -> anyhow::Result<DatabaseConnection> {
        let url = format!("sqlite://{}?mode=rw", self.path(name).display());
        Ok(Database::connect(url).await?)
    }
}
