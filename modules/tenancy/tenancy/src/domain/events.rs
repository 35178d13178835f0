use tenancy_sdk::Tenant;
use time::OffsetDateTime;
use uuid::Uuid;

/// Kind tag of a tenant lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    TenantCreated,
    TenantUpdated,
    TenantDeleted,
    DatabaseCreated,
    DatabaseMigrated,
    DatabaseSeeded,
    DatabaseDeleted,
    ProvisioningCompleted,
    ProvisioningFailed,
    TeardownCompleted,
    TeardownFailed,
}

impl EventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TenantCreated => "tenant.created",
            Self::TenantUpdated => "tenant.updated",
            Self::TenantDeleted => "tenant.deleted",
            Self::DatabaseCreated => "tenant.database.created",
            Self::DatabaseMigrated => "tenant.database.migrated",
            Self::DatabaseSeeded => "tenant.database.seeded",
            Self::DatabaseDeleted => "tenant.database.deleted",
            Self::ProvisioningCompleted => "tenant.provisioning.completed",
            Self::ProvisioningFailed => "tenant.provisioning.failed",
            Self::TeardownCompleted => "tenant.teardown.completed",
            Self::TeardownFailed => "tenant.teardown.failed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time lifecycle occurrence carrying a tenant snapshot.
///
/// Events derived from one provisioning run share the `correlation_id` of
/// the event that triggered it.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub tenant: Tenant,
    pub at: OffsetDateTime,
    pub correlation_id: Uuid,
}

impl LifecycleEvent {
    /// New root event with a fresh correlation id.
    #[must_use]
    pub fn new(kind: EventKind, tenant: Tenant) -> Self {
        Self {
            kind,
            tenant,
            at: OffsetDateTime::now_utc(),
            correlation_id: Uuid::now_v7(),
        }
    }

    /// Follow-up event in the same run.
    #[must_use]
    pub fn derive(&self, kind: EventKind) -> Self {
        Self {
            kind,
            tenant: self.tenant.clone(),
            at: OffsetDateTime::now_utc(),
            correlation_id: self.correlation_id,
        }
    }

    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant.id
    }
}
