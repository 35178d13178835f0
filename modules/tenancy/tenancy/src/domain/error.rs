use tenancy_sdk::TenancyError;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Tenant not found: {id}")]
    NotFound { id: String },

    #[error("Tenant '{id}' already exists")]
    DuplicateId { id: String },

    #[error("Validation error on field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Teardown of tenant '{id}' is in progress")]
    TeardownInProgress { id: String },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl DomainError {
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
}

impl From<DomainError> for TenancyError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound { id } => Self::not_found(id),
            DomainError::DuplicateId { id } => Self::duplicate_id(id),
            DomainError::Validation { field, message } => Self::validation(field, message),
            DomainError::TeardownInProgress { id } => Self::teardown_in_progress(id),
            DomainError::Database(_) => Self::internal(),
        }
    }
}
