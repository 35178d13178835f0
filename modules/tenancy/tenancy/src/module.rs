//! Composition root of the tenancy module.

use std::sync::Arc;

use anyhow::bail;
use axum::Router;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tenancy_sdk::TenancyClientV1;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::rest::routes;
use crate::config::{ProvisionerDriver, TenancyConfig};
use crate::domain::dispatcher::EventDispatcher;
use crate::domain::jobs::{JobQueue, JobWorker};
use crate::domain::provisioner::ResourceProvisioner;
use crate::domain::service::{Service, ServiceConfig};
use crate::domain::wiring;
use crate::infra::provisioning::{
    DatabaseProvisioner, InMemoryProvisioner, PostgresDatabaseManager, SqliteDatabaseManager,
};
use crate::infra::storage::SeaOrmTenantRepository;
use crate::infra::storage::migrations::Migrator;
use crate::local_client::LocalClient;

pub struct TenancyModule {
    service: Arc<Service>,
    dispatcher: Arc<EventDispatcher>,
    worker: Option<JobWorker>,
    resume_on_start: bool,
}

impl TenancyModule {
    /// Migrate the registry database and assemble the module with the
    /// provisioner selected by `config.provisioning.driver`.
    ///
    /// Tenants left in `deleting` by a previous run have their teardown
    /// resumed once the worker starts.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, migrations fail or
    /// the provisioner cannot be built.
    pub async fn init(
        db: DatabaseConnection,
        dsn: &str,
        config: &TenancyConfig,
    ) -> anyhow::Result<Self> {
        info!("Initializing tenancy module");
        config.validate()?;
        Self::migrate(&db).await?;
        let provisioner = build_provisioner(&db, dsn, config)?;
        let mut module = Self::with_provisioner(db, provisioner, config)?;
        module.resume_on_start = true;
        info!("Tenancy module initialized");
        Ok(module)
    }

    /// # Errors
    /// Returns an error if a migration fails.
    pub async fn migrate(db: &DatabaseConnection) -> anyhow::Result<()> {
        info!("Running tenancy database migrations");
        Migrator::up(db, None).await?;
        info!("Tenancy database migrations completed successfully");
        Ok(())
    }

    /// Assemble the module on an already migrated registry database.
    ///
    /// # Errors
    /// Returns an error if lifecycle listeners cannot be registered.
    pub fn with_provisioner(
        db: DatabaseConnection,
        provisioner: Arc<dyn ResourceProvisioner>,
        config: &TenancyConfig,
    ) -> anyhow::Result<Self> {
        let repo = Arc::new(SeaOrmTenantRepository::new(db));
        let (queue, receiver) =
            JobQueue::with_retention(config.worker.queue_capacity, config.worker.retained_jobs);
        let dispatcher = Arc::new(EventDispatcher::with_queue(queue.clone()));
        wiring::register(
            &dispatcher,
            wiring::default_listeners(&provisioner, repo.clone(), config),
        )?;

        let worker = JobWorker::new(receiver, queue, dispatcher.clone(), config.worker.clone());
        let service = Arc::new(Service::new(
            repo,
            dispatcher.clone(),
            ServiceConfig {
                max_id_length: config.max_id_length,
            },
        ));
        info!(driver = provisioner.driver(), "Tenancy provisioner ready");

        Ok(Self {
            service,
            dispatcher,
            worker: Some(worker),
            resume_on_start: false,
        })
    }

    /// Spawn the background job worker. Returns `None` if it already runs.
    ///
    /// For a module built by [`Self::init`] this also resumes teardown of
    /// tenants a previous run left in `deleting`.
    pub fn start_worker(&mut self, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        let worker = self.worker.take()?;
        let handle = tokio::spawn(worker.run(cancel));
        if self.resume_on_start {
            let service = Arc::clone(&self.service);
            tokio::spawn(async move {
                if let Err(e) = service.resume_pending_teardowns().await {
                    warn!(error = %e, "Failed to resume pending tenant teardowns");
                }
            });
        }
        Some(handle)
    }

    #[must_use]
    pub fn register_rest(&self, router: Router) -> Router {
        routes::register_routes(router, self.service.clone())
    }

    #[must_use]
    pub fn client(&self) -> Arc<dyn TenancyClientV1> {
        Arc::new(LocalClient::new(self.service.clone()))
    }

    /// Dispatcher for subscribing additional lifecycle handlers.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }
}

fn build_provisioner(
    db: &DatabaseConnection,
    dsn: &str,
    config: &TenancyConfig,
) -> anyhow::Result<Arc<dyn ResourceProvisioner>> {
    let provisioning = &config.provisioning;
    Ok(match provisioning.driver {
        ProvisionerDriver::Memory => Arc::new(InMemoryProvisioner::new()),
        ProvisionerDriver::Sqlite => Arc::new(DatabaseProvisioner::new(
            Arc::new(SqliteDatabaseManager::new(provisioning.sqlite_dir.clone())),
            provisioning,
        )),
        ProvisionerDriver::Postgres => {
            if db.get_database_backend() != DatabaseBackend::Postgres {
                bail!("the postgres provisioner requires a postgres registry database");
            }
            Arc::new(DatabaseProvisioner::new(
                Arc::new(PostgresDatabaseManager::new(db.clone(), dsn)?),
                provisioning,
            ))
        }
    })
}
