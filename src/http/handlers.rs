//! Endpoint handlers: liveness, health, readiness, metrics.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};

use crate::http::middleware::request_id_of;
use crate::http::response::{ErrorResponse, HealthResponse, StatusResponse};
use crate::http::server::AppState;

/// Content type of the Prometheus text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub async fn ping(headers: HeaderMap) -> Json<StatusResponse> {
    tracing::debug!(request_id = request_id_of(&headers), "ping request received");
    Json(StatusResponse::new("success", "pong"))
}

pub async fn health(State(state): State<AppState>, headers: HeaderMap) -> Json<HealthResponse> {
    let uptime = format!("{:?}", state.started.elapsed());
    tracing::debug!(
        uptime = %uptime,
        request_id = request_id_of(&headers),
        "health check"
    );
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime,
    })
}

pub async fn ready(headers: HeaderMap) -> Json<StatusResponse> {
    tracing::debug!(request_id = request_id_of(&headers), "readiness check");
    Json(StatusResponse::new(
        "ready",
        "application is ready to serve traffic",
    ))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.snapshot(),
    )
        .into_response()
}

pub async fn not_found(uri: Uri) -> Response {
    ErrorResponse::new("not found", Some(format!("no route for {}", uri.path())))
        .with_status(StatusCode::NOT_FOUND)
}
