pub mod api;
mod middleware;

pub use api::rate_limit::ApiRateLimiter;
pub use api::{ApiState, build_api_router as build_api_v1_router};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};

use std::sync::Arc;

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, middleware as axum_middleware, routing::get};
use tracing::warn;

use crate::application::error::ErrorReport;
use crate::application::repos::StorageHealth;
use crate::cache::CacheStore;

use api::models::HealthResponse;

/// Dependencies of the health probe.
#[derive(Clone)]
pub struct HealthState {
    pub storage: Arc<dyn StorageHealth>,
    pub cache: Arc<CacheStore>,
}

#[derive(Clone)]
pub struct RouterState {
    pub api: ApiState,
    pub health: HealthState,
}

impl FromRef<RouterState> for ApiState {
    fn from_ref(state: &RouterState) -> Self {
        state.api.clone()
    }
}

impl FromRef<RouterState> for HealthState {
    fn from_ref(state: &RouterState) -> Self {
        state.health.clone()
    }
}

pub fn build_router(state: RouterState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(build_api_v1_router(state.clone()))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

/// Storage failure makes the service unavailable; a cache failure only degrades it.
async fn health(State(state): State<HealthState>) -> Response {
    let database = state.storage.ping().await;
    let cache = state.cache.ping().await;

    if let Err(err) = &cache {
        warn!(
            target = "content_hub::http::health",
            backend = state.cache.backend_name(),
            error = %err,
            "cache probe failed"
        );
    }

    let body = HealthResponse {
        status: match (&database, &cache) {
            (Err(_), _) => "unavailable",
            (Ok(()), Err(_)) => "degraded",
            (Ok(()), Ok(())) => "ok",
        },
        database: if database.is_ok() { "ok" } else { "error" },
        cache: if cache.is_ok() { "ok" } else { "error" },
    };

    match database {
        Ok(()) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => {
            let mut response = (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
            ErrorReport::from_error(
                "infra::http::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
