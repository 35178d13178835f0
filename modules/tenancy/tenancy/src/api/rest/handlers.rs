use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::field::Empty;

use crate::domain::service::Service;

use super::dto::{self, CreateTenantRequest, TenantDto, UpdateTenantRequest};
use super::problem::ApiResult;
use super::tenant_context::CurrentTenant;

fn deleted(outcome: tenancy_sdk::DeleteOutcome) -> Response {
    match dto::pending(outcome) {
        None => StatusCode::NO_CONTENT.into_response(),
        Some(tenant) => (StatusCode::ACCEPTED, Json(tenant)).into_response(),
    }
}

pub async fn list_tenants(
    Extension(svc): Extension<Arc<Service>>,
) -> ApiResult<Json<Vec<TenantDto>>> {
    let tenants = svc.list().await?;
    Ok(Json(tenants.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(name = "tenancy.http.create", skip_all, fields(tenant_id = Empty))]
pub async fn create_tenant(
    Extension(svc): Extension<Arc<Service>>,
    body: Result<Json<CreateTenantRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    tracing::Span::current().record("tenant_id", req.name.as_str());
    let tenant = svc.create(req.into()).await?;
    let dto: TenantDto = tenant.into();
    Ok((StatusCode::OK, Json(dto)))
}

pub async fn get_tenant(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<TenantDto>> {
    let tenant = svc.get(&id).await?;
    Ok(Json(tenant.into()))
}

pub async fn update_tenant(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateTenantRequest>, JsonRejection>,
) -> ApiResult<Json<TenantDto>> {
    let Json(req) = body?;
    let tenant = svc.update(&id, req.into()).await?;
    Ok(Json(tenant.into()))
}

pub async fn delete_tenant(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let outcome = svc.delete(&id).await?;
    Ok(deleted(outcome))
}

pub async fn provision_tenant(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let tenant = svc.reprovision(&id).await?;
    let dto: TenantDto = tenant.into();
    Ok((StatusCode::ACCEPTED, Json(dto)))
}

pub async fn teardown_tenant(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let outcome = svc.resume_teardown(&id).await?;
    Ok(deleted(outcome))
}

pub async fn current_tenant(CurrentTenant(tenant): CurrentTenant) -> Json<TenantDto> {
    Json(tenant.into())
}

pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
