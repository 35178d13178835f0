#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::TenancyConfig;
    use crate::domain::dispatcher::{DeliveryMode, EventDispatcher};
    use crate::domain::events::EventKind;
    use crate::domain::jobs::{JobQueue, JobWorker};
    use crate::domain::provisioner::ResourceProvisioner;
    use crate::domain::repo::TenantRepository;
    use crate::domain::test_support::{MemoryRepository, RecordingHandler, wait_for};
    use crate::infra::provisioning::InMemoryProvisioner;
    use serde_json::json;
    use std::sync::Arc;
    use tenancy_sdk::{DeleteOutcome, Metadata, NewTenant, TenantPatch, TenantStatus};
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    const ALL_KINDS: [EventKind; 4] = [
        EventKind::TenantCreated,
        EventKind::TenantUpdated,
        EventKind::TenantDeleted,
        EventKind::TeardownCompleted,
    ];

    struct Fixture {
        service: service::Service,
        repo: Arc<MemoryRepository>,
        provisioner: Arc<InMemoryProvisioner>,
        recorder: Arc<RecordingHandler>,
    }

    fn fixture_with(
        config: &TenancyConfig,
        dispatcher: EventDispatcher,
    ) -> (Fixture, Arc<EventDispatcher>) {
        let repo = Arc::new(MemoryRepository::default());
        let provisioner = Arc::new(InMemoryProvisioner::new());
        let dyn_provisioner: Arc<dyn ResourceProvisioner> = provisioner.clone();
        wiring::register(
            &dispatcher,
            wiring::default_listeners(&dyn_provisioner, repo.clone(), config),
        )
        .unwrap();
        let recorder = Arc::new(RecordingHandler::new("recorder"));
        for kind in ALL_KINDS {
            dispatcher
                .subscribe(kind, recorder.clone(), DeliveryMode::Synchronous)
                .unwrap();
        }
        let dispatcher = Arc::new(dispatcher);
        let service = service::Service::new(
            repo.clone(),
            dispatcher.clone(),
            service::ServiceConfig {
                max_id_length: config.max_id_length,
            },
        );
        (
            Fixture {
                service,
                repo,
                provisioner,
                recorder,
            },
            dispatcher,
        )
    }

    fn fixture() -> Fixture {
        fixture_with(&TenancyConfig::default(), EventDispatcher::new()).0
    }

    fn new_tenant(id: &str, metadata: &serde_json::Value) -> NewTenant {
        NewTenant {
            id: id.to_owned(),
            metadata: metadata.as_object().cloned().unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_returns_record() {
        let f = fixture();

        let created = f
            .service
            .create(new_tenant("acme", &json!({"plan": "pro"})))
            .await
            .unwrap();
        let fetched = f.service.get("acme").await.unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.id, "acme");
        assert_eq!(fetched.status, TenantStatus::Active);
        assert_eq!(fetched.metadata.get("plan"), Some(&json!("pro")));
        assert_eq!(f.recorder.kinds(), vec![EventKind::TenantCreated]);
        assert!(f.provisioner.is_migrated("acme"));
    }

    #[tokio::test]
    async fn test_create_duplicate_fails_without_event() {
        let f = fixture();
        f.service
            .create(new_tenant("acme", &json!({"plan": "pro"})))
            .await
            .unwrap();

        let err = f
            .service
            .create(new_tenant("acme", &json!({"plan": "free"})))
            .await
            .unwrap_err();

        assert!(matches!(err, error::DomainError::DuplicateId { id } if id == "acme"));
        let stored = f.service.get("acme").await.unwrap();
        assert_eq!(stored.metadata.get("plan"), Some(&json!("pro")));
        assert_eq!(f.recorder.kinds(), vec![EventKind::TenantCreated]);
        assert_eq!(f.provisioner.created_count(), 1);
    }

    #[tokio::test]
    async fn test_create_validates_id() {
        let f = fixture();

        for bad in ["", "-acme", "acme corp", "acme/../x", "tenant\u{e9}"] {
            let err = f
                .service
                .create(new_tenant(bad, &json!({})))
                .await
                .unwrap_err();
            assert!(
                matches!(err, error::DomainError::Validation { ref field, .. } if field == "name"),
                "'{bad}' accepted: {err}"
            );
        }
        assert!(f.recorder.kinds().is_empty());
        assert!(f.repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_validates_max_length() {
        let config = TenancyConfig {
            max_id_length: 8,
            ..TenancyConfig::default()
        };
        let f = fixture_with(&config, EventDispatcher::new()).0;

        f.service
            .create(new_tenant("abcdefgh", &json!({})))
            .await
            .unwrap();
        let err = f
            .service
            .create(new_tenant("abcdefghi", &json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, error::DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let f = fixture();
        for id in ["globex", "acme", "initech"] {
            f.service.create(new_tenant(id, &json!({}))).await.unwrap();
        }

        let ids: Vec<_> = f
            .service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();

        assert_eq!(ids, vec!["acme", "globex", "initech"]);
    }

    #[tokio::test]
    async fn test_update_replaces_metadata() {
        let f = fixture();
        f.service
            .create(new_tenant("acme", &json!({"plan": "pro"})))
            .await
            .unwrap();

        let updated = f
            .service
            .update(
                "acme",
                TenantPatch {
                    rename_to: Some("acme".to_owned()),
                    metadata: json!({"plan": "enterprise"}).as_object().cloned(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, "acme");
        assert_eq!(updated.metadata.get("plan"), Some(&json!("enterprise")));
        assert_eq!(
            f.recorder.kinds(),
            vec![EventKind::TenantCreated, EventKind::TenantUpdated]
        );
    }

    #[tokio::test]
    async fn test_update_missing_tenant_is_not_found() {
        let f = fixture();

        let err = f
            .service
            .update("ghost", TenantPatch::default())
            .await
            .unwrap_err();

        assert!(matches!(err, error::DomainError::NotFound { .. }));
        assert!(f.recorder.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_rename_creates_new_then_deletes_old() {
        let f = fixture();
        f.service
            .create(new_tenant("acme", &json!({"plan": "pro"})))
            .await
            .unwrap();

        let renamed = f
            .service
            .update(
                "acme",
                TenantPatch {
                    rename_to: Some("acme-corp".to_owned()),
                    metadata: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(renamed.id, "acme-corp");
        assert_eq!(renamed.metadata.get("plan"), Some(&json!("pro")));
        assert!(f.provisioner.is_migrated("acme-corp"));
        assert!(!f.provisioner.contains("acme"));
        assert!(!f.repo.contains("acme"));
        assert_eq!(
            f.recorder.kinds(),
            vec![
                EventKind::TenantCreated,
                EventKind::TenantCreated,
                EventKind::TenantDeleted,
                EventKind::TeardownCompleted,
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let f = fixture();

        let err = f.service.delete("ghost").await.unwrap_err();

        assert!(matches!(err, error::DomainError::NotFound { id } if id == "ghost"));
        assert!(f.recorder.kinds().is_empty());
        assert_eq!(f.provisioner.deleted_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_tears_down_and_purges() {
        let f = fixture();
        f.service.create(new_tenant("acme", &json!({}))).await.unwrap();

        let outcome = f.service.delete("acme").await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Removed);
        assert_eq!(f.provisioner.deleted_count(), 1);
        assert!(!f.repo.contains("acme"));
        let err = f.service.get("acme").await.unwrap_err();
        assert!(matches!(err, error::DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_with_queued_teardown_is_pending() {
        let mut config = TenancyConfig::default();
        config.pipelines.deleted.queued = true;
        config.worker.retry_backoff_ms = 1;
        let (queue, receiver) = JobQueue::new(16);
        let (f, dispatcher) = fixture_with(&config, EventDispatcher::with_queue(queue.clone()));
        f.service.create(new_tenant("acme", &json!({}))).await.unwrap();

        let outcome = f.service.delete("acme").await.unwrap();

        let DeleteOutcome::Pending(tenant) = outcome else {
            panic!("expected pending outcome");
        };
        assert_eq!(tenant.status, TenantStatus::Deleting);
        assert_eq!(queue.pending_count(), 1);

        let again = f.service.delete("acme").await.unwrap_err();
        assert!(matches!(again, error::DomainError::TeardownInProgress { .. }));
        let update = f
            .service
            .update("acme", TenantPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(update, error::DomainError::TeardownInProgress { .. }));

        let cancel = CancellationToken::new();
        tokio::spawn(
            JobWorker::new(receiver, queue, dispatcher, config.worker.clone()).run(cancel.clone()),
        );
        wait_for(|| !f.repo.contains("acme")).await;
        assert!(!f.provisioner.contains("acme"));
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_delete_before_queued_creation_leaves_no_database() {
        let mut config = TenancyConfig::default();
        config.pipelines.created.queued = true;
        config.worker.retry_backoff_ms = 1;
        let (queue, receiver) = JobQueue::new(16);
        let (f, dispatcher) = fixture_with(&config, EventDispatcher::with_queue(queue.clone()));
        f.service.create(new_tenant("acme", &json!({}))).await.unwrap();

        let outcome = f.service.delete("acme").await.unwrap();

        assert!(matches!(outcome, DeleteOutcome::Pending(_)));
        assert!(!f.provisioner.contains("acme"));

        let cancel = CancellationToken::new();
        tokio::spawn(
            JobWorker::new(receiver, queue, dispatcher, config.worker.clone()).run(cancel.clone()),
        );
        wait_for(|| !f.repo.contains("acme")).await;
        assert!(!f.provisioner.contains("acme"));
        assert_eq!(f.provisioner.created_count(), 1);
        assert_eq!(f.provisioner.deleted_count(), 1);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_resume_pending_teardowns_purges_every_deleting_tenant() {
        let f = fixture();
        for id in ["acme", "globex", "initech"] {
            f.service.create(new_tenant(id, &json!({}))).await.unwrap();
        }
        for id in ["acme", "initech"] {
            f.repo
                .set_status(id, TenantStatus::Deleting, time::OffsetDateTime::now_utc())
                .await
                .unwrap();
        }

        let resumed = f.service.resume_pending_teardowns().await.unwrap();

        assert_eq!(resumed, 2);
        assert!(!f.repo.contains("acme"));
        assert!(!f.repo.contains("initech"));
        assert!(f.repo.contains("globex"));
        assert!(f.provisioner.contains("globex"));
        assert!(!f.provisioner.contains("acme"));
    }

    #[tokio::test]
    async fn test_resume_teardown_requires_deleting_tenant() {
        let f = fixture();
        f.service.create(new_tenant("acme", &json!({}))).await.unwrap();

        let err = f.service.resume_teardown("acme").await.unwrap_err();

        assert!(matches!(
            err,
            error::DomainError::Validation { ref field, .. } if field == "status"
        ));
    }

    #[tokio::test]
    async fn test_resume_teardown_purges_stuck_record() {
        let f = fixture();
        f.service.create(new_tenant("acme", &json!({}))).await.unwrap();
        f.repo
            .set_status("acme", TenantStatus::Deleting, time::OffsetDateTime::now_utc())
            .await
            .unwrap();

        let outcome = f.service.resume_teardown("acme").await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Removed);
        assert!(!f.provisioner.contains("acme"));
    }

    #[tokio::test]
    async fn test_reprovision_recreates_missing_database() {
        let f = fixture();
        f.service.create(new_tenant("acme", &json!({}))).await.unwrap();
        f.provisioner.delete_resources("acme").await.unwrap();

        let tenant = f.service.reprovision("acme").await.unwrap();

        assert_eq!(tenant.id, "acme");
        assert!(f.provisioner.is_migrated("acme"));
        assert_eq!(f.provisioner.created_count(), 2);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_provisioning_failure_keeps_record() {
        let f = fixture();
        f.provisioner.fail_next_migration("acme");

        let tenant = f
            .service
            .create(NewTenant {
                id: "acme".to_owned(),
                metadata: Metadata::new(),
            })
            .await
            .unwrap();

        assert_eq!(tenant.status, TenantStatus::Active);
        assert!(f.repo.contains("acme"));
        assert!(f.provisioner.contains("acme"));
        assert!(!f.provisioner.is_migrated("acme"));
        assert!(logs_contain("Pipeline step failed"));
        assert!(logs_contain("Lifecycle handler failed"));
    }
}
