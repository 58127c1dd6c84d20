//! HTTP routes of the lookup service
//!
//! | Route | Response |
//! |---|---|
//! | `GET /api/ping` | 200 `Ping ACK` (traffic manager probe) |
//! | `GET /api/health` | 200 JSON status |
//! | `GET /metrics` | Prometheus text |
//! | `GET /cosmos` | 200 `url` field of record `test`, or 404 |
//! | `GET /{key}` | 200 JSON document, or 404 |
//!
//! Backend failures answer 503 so the router and callers can tell an
//! outage from a missing key.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::metrics;

use super::error::{FailureKind, StoreError};
use super::lookup::{Lookup, DEFAULT_RECORD_KEY, PING_ACK};
use super::server::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Simple error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
    pub uptime_secs: u64,
}

// ============================================================================
// Router
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/ping", get(ping))
        .route("/api/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/cosmos", get(default_record))
        .route("/{key}", get(lookup_key))
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(state)
}

async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_http_request(
        &route,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

fn store_failure(err: &StoreError) -> Response {
    match err.failure_kind() {
        FailureKind::NotFound => StatusCode::NOT_FOUND.into_response(),
        FailureKind::Unavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new(err.to_string())),
        )
            .into_response(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Liveness probe
async fn ping() -> &'static str {
    PING_ACK
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.lookup.backend().to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn metrics_handler() -> Response {
    match metrics::encode_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!("Failed to encode metrics: {e}"))),
        )
            .into_response(),
    }
}

/// URL stored in the default record
async fn default_record(State(state): State<AppState>) -> Response {
    match state.lookup.lookup_url(DEFAULT_RECORD_KEY).await {
        Ok(Some(url)) => (StatusCode::OK, url).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => store_failure(&e),
    }
}

/// Look up a document by key
async fn lookup_key(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    match state.lookup.lookup(&key).await {
        Ok(Lookup::Ack) => (StatusCode::OK, PING_ACK).into_response(),
        Ok(Lookup::Found(document)) => (StatusCode::OK, Json(document)).into_response(),
        Ok(Lookup::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => store_failure(&e),
    }
}
