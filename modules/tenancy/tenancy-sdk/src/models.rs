//! Public models for the tenancy module.
//!
//! These are transport-agnostic data structures that define the contract
//! between the tenancy module and its consumers.

use time::OffsetDateTime;

/// Tenant identifier. It doubles as the provisioning namespace, so it is
/// restricted to characters that are safe in database and file names.
pub type TenantId = String;

/// Free-form tenant attributes.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Lifecycle status of a tenant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenantStatus {
    /// Record is live and its resources are expected to be provisioned.
    Active,
    /// Teardown was requested; the record is kept until resources are released.
    Deleting,
}

impl TenantStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleting => "deleting",
        }
    }

    /// Parse the persisted representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "deleting" => Some(Self::Deleting),
            _ => None,
        }
    }
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tenant entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Tenant {
    pub id: TenantId,
    pub status: TenantStatus,
    pub metadata: Metadata,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Tenant {
    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.status == TenantStatus::Deleting
    }
}

/// Data for creating a new tenant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewTenant {
    pub id: TenantId,
    pub metadata: Metadata,
}

/// Update data for an existing tenant.
///
/// The id is immutable; a different `rename_to` is carried out as
/// create-then-delete so provisioned resources are never orphaned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TenantPatch {
    pub rename_to: Option<TenantId>,
    pub metadata: Option<Metadata>,
}

/// Result of a delete request.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// Resources were released and the record purged.
    Removed,
    /// The record is kept in `Deleting` state until teardown succeeds.
    Pending(Tenant),
}
