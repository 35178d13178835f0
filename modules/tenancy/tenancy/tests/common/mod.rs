#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use sea_orm::Database;
use serde_json::Value;
use tenancy::TenancyModule;
use tenancy::config::TenancyConfig;
use tenancy::domain::provisioner::ResourceProvisioner;
use tower::ServiceExt;

pub async fn module(
    provisioner: Arc<dyn ResourceProvisioner>,
    config: &TenancyConfig,
) -> TenancyModule {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    TenancyModule::migrate(&db).await.unwrap();
    TenancyModule::with_provisioner(db, provisioner, config).unwrap()
}

pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    send_request(router, builder.body(body).unwrap()).await
}

pub async fn send_request(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
