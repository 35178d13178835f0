use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-tenant async mutexes.
///
/// Waiters are served in FIFO order, so work acquired for one tenant runs in
/// the order it asked for the lock while other tenants proceed in parallel.
#[derive(Debug, Default, Clone)]
pub struct TenantLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl TenantLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, tenant_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .inner
            .entry(tenant_id.to_owned())
            .or_default()
            .value()
            .clone();
        lock.lock_owned().await
    }

    /// Forget the lock of a tenant nobody holds or waits for.
    pub fn release(&self, tenant_id: &str) {
        self.inner.remove_if(tenant_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
