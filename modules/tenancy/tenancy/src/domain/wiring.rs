//! Startup registration of lifecycle listeners.
//!
//! The event-to-listener map is a plain list of [`Listener`] entries built by
//! [`default_listeners`]; [`register`] subscribes each entry on the
//! dispatcher. Tests can register any subset.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::dispatcher::{
    DeliveryMode, DispatchError, EventDispatcher, EventHandler, EventPublisher,
};
use super::events::{EventKind, LifecycleEvent};
use super::pipeline::{Pipeline, PipelineListener};
use super::provisioner::ResourceProvisioner;
use super::repo::TenantRepository;
use super::steps::{CreateDatabase, DeleteDatabase, MigrateDatabase, SeedDatabase};
use crate::config::TenancyConfig;

pub const CREATED_PIPELINE: &str = "tenant-created";
pub const DELETED_PIPELINE: &str = "tenant-deleted";

pub struct Listener {
    pub kind: EventKind,
    pub handler: Arc<dyn EventHandler>,
    pub mode: DeliveryMode,
}

/// Creation pipeline: create, migrate and optionally seed the tenant database.
#[must_use]
pub fn created_pipeline(
    provisioner: &Arc<dyn ResourceProvisioner>,
    config: &TenancyConfig,
) -> Pipeline {
    let mut pipeline = Pipeline::new(CREATED_PIPELINE, EventKind::TenantCreated)
        .step(Arc::new(CreateDatabase::new(Arc::clone(provisioner))))
        .step(Arc::new(MigrateDatabase::new(Arc::clone(provisioner))));
    if config.provisioning.seed {
        pipeline = pipeline.step(Arc::new(SeedDatabase::new(Arc::clone(provisioner))));
    }
    pipeline
        .queued(config.pipelines.created.queued)
        .on_success(EventKind::ProvisioningCompleted)
        .on_failure(EventKind::ProvisioningFailed)
}

/// Deletion pipeline: drop the tenant database.
///
/// Queued whenever the creation pipeline is, so teardown lands behind any
/// creation job still pending for the same tenant.
#[must_use]
pub fn deleted_pipeline(
    provisioner: &Arc<dyn ResourceProvisioner>,
    config: &TenancyConfig,
) -> Pipeline {
    let queued = config.pipelines.deleted.queued || config.pipelines.created.queued;
    if queued && !config.pipelines.deleted.queued {
        debug!("Queueing the deletion pipeline behind the queued creation pipeline");
    }
    Pipeline::new(DELETED_PIPELINE, EventKind::TenantDeleted)
        .step(Arc::new(DeleteDatabase::new(Arc::clone(provisioner))))
        .queued(queued)
        .on_success(EventKind::TeardownCompleted)
        .on_failure(EventKind::TeardownFailed)
}

fn pipeline_listener(pipeline: Pipeline) -> Listener {
    let mode = if pipeline.is_queued() {
        DeliveryMode::Deferred
    } else {
        DeliveryMode::Synchronous
    };
    Listener {
        kind: pipeline.trigger(),
        handler: Arc::new(PipelineListener::new(Arc::new(pipeline))),
        mode,
    }
}

#[must_use]
pub fn default_listeners(
    provisioner: &Arc<dyn ResourceProvisioner>,
    repo: Arc<dyn TenantRepository>,
    config: &TenancyConfig,
) -> Vec<Listener> {
    vec![
        pipeline_listener(created_pipeline(provisioner, config)),
        pipeline_listener(deleted_pipeline(provisioner, config)),
        Listener {
            kind: EventKind::TeardownCompleted,
            handler: Arc::new(RecordPurger::new(repo)),
            mode: DeliveryMode::Synchronous,
        },
    ]
}

/// Subscribe every listener on `dispatcher`.
///
/// # Errors
/// Returns [`DispatchError::NoJobQueue`] if a queued listener is registered
/// on a dispatcher without a job queue.
pub fn register(
    dispatcher: &EventDispatcher,
    listeners: Vec<Listener>,
) -> Result<(), DispatchError> {
    let count = listeners.len();
    for listener in listeners {
        dispatcher.subscribe(listener.kind, listener.handler, listener.mode)?;
    }
    info!(listeners = count, "Tenancy lifecycle listeners registered");
    Ok(())
}

/// Removes a tenant record once its resources were released.
pub struct RecordPurger {
    repo: Arc<dyn TenantRepository>,
}

impl RecordPurger {
    #[must_use]
    pub fn new(repo: Arc<dyn TenantRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl EventHandler for RecordPurger {
    fn name(&self) -> &'static str {
        "record-purger"
    }

    async fn handle(
        &self,
        event: &LifecycleEvent,
        _publisher: &dyn EventPublisher,
    ) -> anyhow::Result<()> {
        let id = event.tenant_id();
        match self.repo.find(id).await? {
            Some(tenant) if tenant.is_deleting() => {
                self.repo.delete(id).await?;
                info!(tenant_id = id, "Tenant record purged");
            }
            Some(_) => debug!(tenant_id = id, "Tenant is active again, keeping record"),
            None => debug!(tenant_id = id, "Tenant record already purged"),
        }
        Ok(())
    }
}
