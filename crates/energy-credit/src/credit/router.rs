use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::CustomerId;
use super::features::RawCustomerRecord;
use super::model::ScoringError;
use super::repository::{CustomerRepository, RepositoryError};
use super::service::{BatchEntry, CreditScoringService, CreditServiceError};

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreRequest {
    pub(crate) customer_id: CustomerId,
    #[serde(default)]
    pub(crate) include_explanation: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeatureScoreRequest {
    #[serde(flatten)]
    pub(crate) record: RawCustomerRecord,
    #[serde(default)]
    pub(crate) include_explanation: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchScoreRequest {
    pub(crate) customer_ids: Vec<CustomerId>,
    #[serde(default, rename = "async")]
    pub(crate) asynchronous: bool,
    #[serde(default)]
    pub(crate) include_explanation: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchScoreResponse {
    pub(crate) results: Vec<BatchEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ReloadRequest {
    #[serde(default)]
    pub(crate) path: Option<PathBuf>,
}

/// Router builder exposing the scoring and model management endpoints.
pub fn credit_router<R>(service: Arc<CreditScoringService<R>>) -> Router
where
    R: CustomerRepository + 'static,
{
    Router::new()
        .route("/credit/score", post(score_handler::<R>))
        .route("/credit/score/features", post(score_features_handler::<R>))
        .route("/credit/batch-score", post(batch_score_handler::<R>))
        .route(
            "/credit/model",
            get(model_status_handler::<R>).delete(unload_handler::<R>),
        )
        .route("/credit/model/reload", post(reload_handler::<R>))
        .with_state(service)
}

pub(crate) async fn score_handler<R>(
    State(service): State<Arc<CreditScoringService<R>>>,
    Json(request): Json<ScoreRequest>,
) -> Response
where
    R: CustomerRepository + 'static,
{
    let timeout = service.options().score_timeout;
    match service
        .score_customer_within(request.customer_id, request.include_explanation, timeout)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn score_features_handler<R>(
    State(service): State<Arc<CreditScoringService<R>>>,
    Json(request): Json<FeatureScoreRequest>,
) -> Response
where
    R: CustomerRepository + 'static,
{
    let timeout = service.options().score_timeout;
    match service
        .score_record_within(request.record, request.include_explanation, timeout)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn batch_score_handler<R>(
    State(service): State<Arc<CreditScoringService<R>>>,
    Json(request): Json<BatchScoreRequest>,
) -> Response
where
    R: CustomerRepository + 'static,
{
    if request.asynchronous {
        let payload = json!({
            "error": "asynchronous batch jobs are not handled by this service",
            "kind": "unsupported",
        });
        return (StatusCode::NOT_IMPLEMENTED, Json(payload)).into_response();
    }

    let timeout = service.options().score_timeout;
    match service
        .score_batch(request.customer_ids, request.include_explanation, timeout)
        .await
    {
        Ok(results) => (StatusCode::OK, Json(BatchScoreResponse { results })).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn model_status_handler<R>(
    State(service): State<Arc<CreditScoringService<R>>>,
) -> Response
where
    R: CustomerRepository + 'static,
{
    (StatusCode::OK, Json(service.model_status())).into_response()
}

pub(crate) async fn reload_handler<R>(
    State(service): State<Arc<CreditScoringService<R>>>,
    body: Bytes,
) -> Response
where
    R: CustomerRepository + 'static,
{
    let request = match parse_reload_request(&body) {
        Ok(request) => request,
        Err(err) => {
            let payload = json!({
                "error": format!("invalid reload request: {err}"),
                "kind": "invalid_request",
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
        }
    };
    match service.reload_model_in_background(request.path).await {
        Ok(metadata) => (StatusCode::OK, Json(metadata)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn unload_handler<R>(
    State(service): State<Arc<CreditScoringService<R>>>,
) -> Response
where
    R: CustomerRepository + 'static,
{
    let payload = json!({
        "status": "unloaded",
        "previous": service.unload_model(),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

/// An empty body reloads the configured artifact; anything else must be a well-formed request.
fn parse_reload_request(body: &[u8]) -> Result<ReloadRequest, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ReloadRequest::default());
    }
    serde_json::from_slice(body)
}

fn error_response(error: CreditServiceError) -> Response {
    let status = match &error {
        CreditServiceError::Schema(_)
        | CreditServiceError::ModelLoad(_)
        | CreditServiceError::Explanation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CreditServiceError::NoModelPath => StatusCode::BAD_REQUEST,
        CreditServiceError::Scoring(ScoringError::ModelNotLoaded)
        | CreditServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        CreditServiceError::Repository(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
        CreditServiceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        CreditServiceError::Scoring(ScoringError::NonFiniteScore { .. })
        | CreditServiceError::Policy(_)
        | CreditServiceError::Worker(_)
        | CreditServiceError::WorkerPool(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": error.to_string(),
        "kind": error.kind(),
    });
    (status, Json(payload)).into_response()
}
