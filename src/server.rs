//! HTTP server for diversity-aware reranking

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::{CompareRequest, CompareResponse, RerankEngine, RerankError, RerankRequest, RerankResponse};

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub relevance_source: String,
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RerankEngine>,
    pub request_timeout: Duration,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: RerankError) -> HandlerError {
    let (status, label) = match &err {
        RerankError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
        RerankError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "Rerank timed out"),
        RerankError::Relevance(_) | RerankError::ModelLoad(_) | RerankError::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Rerank failed")
        }
    };

    if err.is_client_error() {
        warn!("Rejected request: {}", err);
    } else {
        error!("Rerank failed: {:?}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: label.to_string(),
            details: Some(err.to_string()),
        }),
    )
}

/// Run an engine call under the configured request timeout
async fn with_timeout<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T, RerankError>>,
) -> Result<T, RerankError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| RerankError::Timeout(timeout))?
}

/// Rerank handler
pub async fn rerank_handler(
    State(state): State<AppState>,
    Json(req): Json<RerankRequest>,
) -> Result<Json<RerankResponse>, HandlerError> {
    info!(
        "Received rerank request: {} candidates, diversity_level={}, k={:?}",
        req.candidates.len(),
        req.diversity_level,
        req.k
    );

    let response = with_timeout(state.request_timeout, state.engine.rerank(&req))
        .await
        .map_err(error_response)?;

    Ok(Json(response))
}

/// Diversity comparison handler
pub async fn compare_handler(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<CompareResponse>, HandlerError> {
    info!(
        "Received compare request: {} candidates, redundancy_threshold={:?}",
        req.rerank.candidates.len(),
        req.redundancy_threshold
    );

    let response = with_timeout(state.request_timeout, state.engine.compare(&req))
        .await
        .map_err(error_response)?;

    info!(
        "Compare: ILD {:.3} -> {:.3}, unique sources {} -> {}",
        response.without_mmr.ild,
        response.with_mmr.ild,
        response.without_mmr.unique_sources,
        response.with_mmr.unique_sources
    );

    Ok(Json(response))
}

/// Health check handler
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "newsrank".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        relevance_source: state.engine.relevance.name().to_string(),
    })
}

/// Create and configure the HTTP server
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/rerank", post(rerank_handler))
        .route("/rerank/compare", post(compare_handler))
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    info!("Starting newsrank server on {}", addr);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
