//! HTTP router setup.
//!
//! # Responsibilities
//! - Register the endpoint handlers and the 404 fallback
//! - Wire up middleware in a fixed order (request ID, client address,
//!   instrumentation, panic recovery, timeout)
//! - Inject shared state (metrics recorder, start time)

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
};

use crate::http::handlers;
use crate::http::middleware::{
    enforce_deadline, panic_response, resolve_client_addr, track_requests, UuidRequestId,
};
use crate::observability::metrics::MetricsRecorder;

/// Ceiling for a single request, whatever the configured write timeout.
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<MetricsRecorder>,
    pub started: Instant,
}

impl AppState {
    pub fn new(metrics: Arc<MetricsRecorder>) -> Self {
        Self {
            metrics,
            started: Instant::now(),
        }
    }
}

/// Per-request timeout: the configured write timeout, capped at 60s.
pub fn request_timeout(write_timeout: Duration) -> Duration {
    write_timeout.min(MAX_REQUEST_TIMEOUT)
}

/// The service's own routes, without middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/metrics", get(handlers::metrics))
}

/// Build the complete application router.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    with_middleware(routes(), state, request_timeout)
}

/// Add the fallback and the middleware stack to `routes`.
///
/// Layers are listed innermost first; the last one added sees the request
/// first.
pub fn with_middleware(routes: Router<AppState>, state: AppState, request_timeout: Duration) -> Router {
    routes
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(request_timeout, enforce_deadline))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(Arc::clone(&state.metrics), track_requests))
        .layer(from_fn(resolve_client_addr))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
        .with_state(state)
}
