use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::domain::locks::TenantLocks;
use crate::domain::provisioner::{ProvisionError, ResourceProvisioner};

#[derive(Debug, Default, Clone, Copy)]
struct Resources {
    migrated: bool,
    seeded: bool,
}

/// Provisioner that only keeps bookkeeping in memory.
///
/// Used by `--mock` runs and tests.
#[derive(Default)]
pub struct InMemoryProvisioner {
    locks: TenantLocks,
    resources: DashMap<String, Resources>,
    created: AtomicUsize,
    deleted: AtomicUsize,
    failing_migrations: Mutex<HashSet<String>>,
}

impl InMemoryProvisioner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, tenant_id: &str) -> bool {
        self.resources.contains_key(tenant_id)
    }

    #[must_use]
    pub fn is_migrated(&self, tenant_id: &str) -> bool {
        self.resources.get(tenant_id).is_some_and(|r| r.migrated)
    }

    #[must_use]
    pub fn is_seeded(&self, tenant_id: &str) -> bool {
        self.resources.get(tenant_id).is_some_and(|r| r.seeded)
    }

    /// Number of successful `create_resources` calls.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of `delete_resources` calls that released something.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.deleted.load(Ordering::SeqCst)
    }

    /// Make the next migration of `tenant_id` fail.
    pub fn fail_next_migration(&self, tenant_id: &str) {
        self.failing_migrations.lock().insert(tenant_id.to_owned());
    }
}

#[async_trait]
impl ResourceProvisioner for InMemoryProvisioner {
    fn driver(&self) -> &'static str {
        "memory"
    }

    async fn create_resources(&self, tenant_id: &str) -> Result<(), ProvisionError> {
        let _guard = self.locks.acquire(tenant_id).await;
        if self.resources.contains_key(tenant_id) {
            return Err(ProvisionError::AlreadyExists {
                tenant: tenant_id.to_owned(),
            });
        }
        // Let other tasks interleave between the check and the insert.
        tokio::task::yield_now().await;
        self.resources
            .insert(tenant_id.to_owned(), Resources::default());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn migrate_resources(&self, tenant_id: &str) -> Result<(), ProvisionError> {
        let _guard = self.locks.acquire(tenant_id).await;
        if self.failing_migrations.lock().remove(tenant_id) {
            return Err(ProvisionError::migration(tenant_id, "injected failure"));
        }
        let mut resources = self
            .resources
            .get_mut(tenant_id)
            .ok_or_else(|| ProvisionError::NotFound {
                tenant: tenant_id.to_owned(),
            })?;
        resources.migrated = true;
        Ok(())
    }

    async fn seed_resources(&self, tenant_id: &str) -> Result<(), ProvisionError> {
        let _guard = self.locks.acquire(tenant_id).await;
        let mut resources = self
            .resources
            .get_mut(tenant_id)
            .ok_or_else(|| ProvisionError::NotFound {
                tenant: tenant_id.to_owned(),
            })?;
        if !resources.migrated {
            return Err(ProvisionError::seeding(tenant_id, "schema is not migrated"));
        }
        resources.seeded = true;
        Ok(())
    }

    async fn delete_resources(&self, tenant_id: &str) -> Result<(), ProvisionError> {
        let guard = self.locks.acquire(tenant_id).await;
        if self.resources.remove(tenant_id).is_some() {
            self.deleted.fetch_add(1, Ordering::SeqCst);
        }
        drop(guard);
        self.locks.release(tenant_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn concurrent_create_provisions_once() {
        let provisioner = Arc::new(InMemoryProvisioner::new());

        let results = futures::future::join_all((0..8).map(|_| {
            let p = Arc::clone(&provisioner);
            tokio::spawn(async move { p.create_resources("acme").await })
        }))
        .await;

        let ok = results
            .into_iter()
            .map(Result::unwrap)
            .filter(Result::is_ok)
            .count();
        assert_eq!(ok, 1);
        assert_eq!(provisioner.created_count(), 1);
    }

    #[tokio::test]
    async fn second_create_is_already_exists() {
        let provisioner = InMemoryProvisioner::new();
        provisioner.create_resources("acme").await.unwrap();

        let err = provisioner.create_resources("acme").await.unwrap_err();

        assert_eq!(
            err,
            ProvisionError::AlreadyExists {
                tenant: "acme".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn seed_requires_migration() {
        let provisioner = InMemoryProvisioner::new();
        provisioner.create_resources("acme").await.unwrap();

        assert!(matches!(
            provisioner.seed_resources("acme").await,
            Err(ProvisionError::Seeding { .. })
        ));
        provisioner.migrate_resources("acme").await.unwrap();
        provisioner.seed_resources("acme").await.unwrap();
        assert!(provisioner.is_seeded("acme"));
    }

    #[tokio::test]
    async fn deleted_tenants_leave_no_lock_behind() {
        let provisioner = InMemoryProvisioner::new();
        for i in 0..50 {
            let id = format!("tenant-{i}");
            provisioner.create_resources(&id).await.unwrap();
            provisioner.delete_resources(&id).await.unwrap();
        }

        assert!(provisioner.locks.is_empty());
        assert_eq!(provisioner.deleted_count(), 50);
    }
}
