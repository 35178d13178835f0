use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

use super::problem::Problem;
use crate::domain::error::DomainError;

const ERROR_TYPE_BASE: &str = "https://errors.tenancy.dev";

impl From<DomainError> for Problem {
    fn from(e: DomainError) -> Self {
        let trace_id = tracing::Span::current()
            .id()
            .map(|id| id.into_u64().to_string());

        let (status, code, title, detail) = match &e {
            DomainError::NotFound { id } => (
                StatusCode::NOT_FOUND,
                "TENANT_NOT_FOUND",
                "Not Found",
                format!("Tenant '{id}' not found"),
            ),
            DomainError::DuplicateId { id } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "TENANT_DUPLICATE",
                "Unprocessable Entity",
                format!("Tenant '{id}' already exists"),
            ),
            DomainError::Validation { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "TENANT_VALIDATION",
                "Unprocessable Entity",
                format!("Validation error on '{field}': {message}"),
            ),
            DomainError::TeardownInProgress { id } => (
                StatusCode::CONFLICT,
                "TENANT_TEARDOWN_IN_PROGRESS",
                "Conflict",
                format!("Teardown of tenant '{id}' is in progress"),
            ),
            DomainError::Database(_) => {
                tracing::error!(error = ?e, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TENANT_INTERNAL",
                    "Internal Server Error",
                    "An internal error occurred".to_owned(),
                )
            }
        };

        let mut problem = Problem::new(status, title, detail)
            .with_type(format!("{ERROR_TYPE_BASE}/{code}"))
            .with_code(code);

        if let Some(id) = trace_id {
            problem = problem.with_trace_id(id);
        }

        problem
    }
}

impl From<JsonRejection> for Problem {
    fn from(rejection: JsonRejection) -> Self {
        Problem::new(rejection.status(), "Invalid request body", rejection.body_text())
            .with_type(format!("{ERROR_TYPE_BASE}/TENANT_BAD_REQUEST"))
            .with_code("TENANT_BAD_REQUEST")
    }
}
