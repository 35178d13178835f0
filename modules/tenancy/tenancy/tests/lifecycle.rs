#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end lifecycle through the module composition root.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::http::StatusCode;
use parking_lot::Mutex;
use sea_orm::Database;
use serde_json::json;
use tenancy::config::{ProvisionerDriver, TenancyConfig};
use tenancy::domain::dispatcher::{DeliveryMode, EventHandler, EventPublisher};
use tenancy::domain::events::{EventKind, LifecycleEvent};
use tenancy::infra::provisioning::InMemoryProvisioner;
use tenancy::{DeleteOutcome, NewTenant, TenancyError, TenancyModule, TenantPatch, TenantStatus};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Recorder {
    kinds: Mutex<Vec<EventKind>>,
}

impl Recorder {
    fn kinds(&self) -> Vec<EventKind> {
        self.kinds.lock().clone()
    }
}

#[async_trait]
impl EventHandler for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    async fn handle(
        &self,
        event: &LifecycleEvent,
        _publisher: &dyn EventPublisher,
    ) -> anyhow::Result<()> {
        self.kinds.lock().push(event.kind);
        Ok(())
    }
}

async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..400 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn sqlite_driver_creates_and_drops_tenant_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = TenancyConfig::default();
    config.provisioning.driver = ProvisionerDriver::Sqlite;
    config.provisioning.sqlite_dir = dir.path().to_path_buf();
    config.provisioning.seed = true;

    let db = Database::connect("sqlite::memory:").await.unwrap();
    let module = TenancyModule::init(db, "sqlite::memory:", &config)
        .await
        .unwrap();
    let router = module.register_rest(Router::new());
    let file = dir.path().join("tenant_acme.sqlite");

    let (status, _) =
        common::send(&router, "POST", "/tenants", Some(json!({"name": "acme"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(file.exists());

    let (status, _) = common::send(&router, "DELETE", "/tenants/acme", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!file.exists());
}

#[tokio::test]
async fn queued_deletion_finishes_on_worker() {
    let mut config = TenancyConfig::default();
    config.pipelines.deleted.queued = true;
    config.worker.retry_backoff_ms = 1;
    let provisioner = Arc::new(InMemoryProvisioner::new());
    let mut module = common::module(provisioner.clone(), &config).await;
    let router = module.register_rest(Router::new());

    common::send(&router, "POST", "/tenants", Some(json!({"name": "acme"}))).await;
    let (status, body) = common::send(&router, "DELETE", "/tenants/acme", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "deleting");

    let (status, problem) = common::send(
        &router,
        "PUT",
        "/tenants/acme",
        Some(json!({"name": "acme", "metadata": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(problem["code"], "TENANT_TEARDOWN_IN_PROGRESS");

    let cancel = CancellationToken::new();
    let worker = module.start_worker(cancel.clone()).unwrap();
    assert!(module.start_worker(cancel.clone()).is_none());

    eventually(|| !provisioner.contains("acme")).await;
    let mut status = StatusCode::OK;
    for _ in 0..400 {
        status = common::send(&router, "GET", "/tenants/acme", None).await.0;
        if status == StatusCode::NOT_FOUND {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(status, StatusCode::NOT_FOUND);

    cancel.cancel();
    worker.await.unwrap();
}

#[tokio::test]
async fn restart_resumes_interrupted_teardown() {
    let dir = tempfile::tempdir().unwrap();
    let dsn = format!("sqlite://{}?mode=rwc", dir.path().join("registry.db").display());
    let mut config = TenancyConfig::default();
    config.provisioning.driver = ProvisionerDriver::Sqlite;
    config.provisioning.sqlite_dir = dir.path().to_path_buf();
    config.pipelines.deleted.queued = true;
    config.worker.retry_backoff_ms = 1;
    let file = dir.path().join("tenant_acme.sqlite");

    {
        let db = Database::connect(&dsn).await.unwrap();
        let module = TenancyModule::init(db, &dsn, &config).await.unwrap();
        let router = module.register_rest(Router::new());
        let (status, _) =
            common::send(&router, "POST", "/tenants", Some(json!({"name": "acme"}))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = common::send(&router, "DELETE", "/tenants/acme", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        // Shut down before any worker picked up the teardown.
    }
    assert!(file.exists());

    let db = Database::connect(&dsn).await.unwrap();
    let mut module = TenancyModule::init(db, &dsn, &config).await.unwrap();
    let router = module.register_rest(Router::new());
    let (_, body) = common::send(&router, "GET", "/tenants/acme", None).await;
    assert_eq!(body["status"], "deleting");

    let cancel = CancellationToken::new();
    let worker = module.start_worker(cancel.clone()).unwrap();

    eventually(|| !file.exists()).await;
    let mut status = StatusCode::OK;
    for _ in 0..400 {
        status = common::send(&router, "GET", "/tenants/acme", None).await.0;
        if status == StatusCode::NOT_FOUND {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(status, StatusCode::NOT_FOUND);

    cancel.cancel();
    worker.await.unwrap();
}

#[tokio::test]
async fn local_client_drives_the_registry() {
    let provisioner = Arc::new(InMemoryProvisioner::new());
    let module = common::module(provisioner.clone(), &TenancyConfig::default()).await;
    let recorder = Arc::new(Recorder::default());
    for kind in [
        EventKind::TenantCreated,
        EventKind::TenantUpdated,
        EventKind::ProvisioningCompleted,
    ] {
        module
            .dispatcher()
            .subscribe(kind, recorder.clone(), DeliveryMode::Synchronous)
            .unwrap();
    }
    let client = module.client();

    let created = client
        .create_tenant(NewTenant {
            id: "acme".to_owned(),
            metadata: json!({"plan": "pro"}).as_object().cloned().unwrap(),
        })
        .await
        .unwrap();
    assert_eq!(created.status, TenantStatus::Active);

    let updated = client
        .update_tenant(
            "acme",
            TenantPatch {
                rename_to: None,
                metadata: json!({"plan": "free"}).as_object().cloned(),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.metadata.get("plan"), Some(&json!("free")));
    assert_eq!(client.list_tenants().await.unwrap().len(), 1);

    assert_eq!(
        recorder.kinds(),
        vec![
            EventKind::ProvisioningCompleted,
            EventKind::TenantCreated,
            EventKind::TenantUpdated,
        ]
    );

    assert_eq!(client.delete_tenant("acme").await.unwrap(), DeleteOutcome::Removed);
    let err = client.get_tenant("acme").await.unwrap_err();
    assert!(matches!(err, TenancyError::NotFound { .. }));
}
