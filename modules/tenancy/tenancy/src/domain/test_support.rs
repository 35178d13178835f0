//! Shared fixtures for domain unit tests.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tenancy_sdk::{Metadata, Tenant, TenantStatus};
use time::OffsetDateTime;

use super::dispatcher::{EventHandler, EventPublisher};
use super::events::{EventKind, LifecycleEvent};
use super::repo::TenantRepository;

pub fn tenant(id: &str) -> Tenant {
    let now = OffsetDateTime::now_utc();
    Tenant {
        id: id.to_owned(),
        status: TenantStatus::Active,
        metadata: Metadata::new(),
        created_at: now,
        updated_at: now,
    }
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

/// Handler recording every event it receives.
pub struct RecordingHandler {
    name: String,
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingHandler {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(|e| e.kind).collect()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(
        &self,
        event: &LifecycleEvent,
        _publisher: &dyn EventPublisher,
    ) -> anyhow::Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Map-backed repository.
#[derive(Default)]
pub struct MemoryRepository {
    rows: Mutex<BTreeMap<String, Tenant>>,
}

impl MemoryRepository {
    pub fn contains(&self, id: &str) -> bool {
        self.rows.lock().contains_key(id)
    }
}

#[async_trait]
impl TenantRepository for MemoryRepository {
    async fn find(&self, id: &str) -> anyhow::Result<Option<Tenant>> {
        Ok(self.rows.lock().get(id).cloned())
    }

    async fn list(&self) -> anyhow::Result<Vec<Tenant>> {
        Ok(self.rows.lock().values().cloned().collect())
    }

    async fn try_insert(&self, tenant: &Tenant) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock();
        if rows.contains_key(&tenant.id) {
            return Ok(false);
        }
        rows.insert(tenant.id.clone(), tenant.clone());
        Ok(true)
    }

    async fn update_metadata(
        &self,
        id: &str,
        metadata: Metadata,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Tenant>> {
        Ok(self.rows.lock().get_mut(id).map(|t| {
            t.metadata = metadata;
            t.updated_at = at;
            t.clone()
        }))
    }

    async fn set_status(
        &self,
        id: &str,
        status: TenantStatus,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Tenant>> {
        Ok(self.rows.lock().get_mut(id).map(|t| {
            t.status = status;
            t.updated_at = at;
            t.clone()
        }))
    }

    async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        Ok(self.rows.lock().remove(id).is_some())
    }
}
