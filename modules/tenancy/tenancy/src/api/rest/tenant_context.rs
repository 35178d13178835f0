//! Request-data tenant identification.
//!
//! The current tenant is named by the `X-Tenant` header or, failing that,
//! the `tenant` query parameter.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use tenancy_sdk::Tenant;

use super::problem::Problem;
use crate::domain::service::Service;

pub const TENANT_HEADER: &str = "x-tenant";
pub const TENANT_QUERY_PARAM: &str = "tenant";

/// Tenant resolved from request data.
#[derive(Debug, Clone)]
pub struct CurrentTenant(pub Tenant);

fn requested_tenant(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(TENANT_HEADER) {
        return value
            .to_str()
            .ok()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);
    }
    url::form_urlencoded::parse(parts.uri.query()?.as_bytes())
        .find(|(key, _)| key == TENANT_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|v| !v.is_empty())
}

impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = Problem;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(id) = requested_tenant(parts) else {
            return Err(Problem::new(
                StatusCode::BAD_REQUEST,
                "Bad Request",
                format!(
                    "Tenant could not be identified; send the '{TENANT_HEADER}' header \
                     or '{TENANT_QUERY_PARAM}' query parameter"
                ),
            )
            .with_code("TENANT_NOT_IDENTIFIED"));
        };
        let service = parts
            .extensions
            .get::<Arc<Service>>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("Tenancy service extension is missing");
                Problem::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    "An internal error occurred",
                )
            })?;
        let tenant = service.get(&id).await?;
        Ok(Self(tenant))
    }
}
