//! Error types for the tenancy SDK.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TenancyError {
    #[error("Tenant not found: {id}")]
    NotFound { id: String },

    #[error("Tenant '{id}' already exists")]
    DuplicateId { id: String },

    #[error("Validation error on field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Teardown of tenant '{id}' is in progress")]
    TeardownInProgress { id: String },

    #[error("Internal error")]
    Internal,
}

impl TenancyError {
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    #[must_use]
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn teardown_in_progress(id: impl Into<String>) -> Self {
        Self::TeardownInProgress { id: id.into() }
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::Internal
    }
}
