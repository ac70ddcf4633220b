use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use energy_credit::credit::{credit_router, CreditScoringService, CustomerRepository};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) fn with_credit_routes<R>(service: Arc<CreditScoringService<R>>) -> axum::Router
where
    R: CustomerRepository + 'static,
{
    credit_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready once the listener is bound and a model artifact is serving.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let listening = state.readiness.load(Ordering::Relaxed);
    let model = state.engine.status();

    let (status, label) = match (listening, model.loaded) {
        (true, true) => (StatusCode::OK, "ready"),
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, "initializing"),
        (true, false) => (StatusCode::SERVICE_UNAVAILABLE, "model_not_loaded"),
    };

    (status, Json(json!({ "status": label, "model": model })))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
