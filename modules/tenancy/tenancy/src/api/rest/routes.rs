use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};

use crate::api::rest::handlers;
use crate::domain::service::Service;

pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    router
        .route(
            "/tenants",
            get(handlers::list_tenants).post(handlers::create_tenant),
        )
        .route(
            "/tenants/{id}",
            get(handlers::get_tenant)
                .put(handlers::update_tenant)
                .delete(handlers::delete_tenant),
        )
        .route("/tenants/{id}/provision", post(handlers::provision_tenant))
        .route("/tenants/{id}/teardown", post(handlers::teardown_tenant))
        .route("/tenant", get(handlers::current_tenant))
        .route("/healthz", get(handlers::healthz))
        .layer(Extension(service))
}
