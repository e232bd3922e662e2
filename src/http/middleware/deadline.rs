//! Per-request deadline.
//!
//! # Data Flow
//! ```text
//! request → enforce_deadline
//!     → handler finishes in time: response passes through untouched
//!     → deadline elapses: handler future dropped, 503 tagged RequestTimedOut
//!         → instrumentation records the 503
//!         → net::connection turns the tag into a service error
//!         → hyper closes the connection without writing a response
//! ```
//!
//! # Design Decisions
//! - The handler is cancelled, not left running in the background
//! - The client never receives a status line; it sees the connection close

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Marks a response whose handler overran its deadline.
///
/// Travels as a response extension; the connection layer converts it into
/// this error so the connection is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("request exceeded its {0:?} deadline")]
pub struct RequestTimedOut(pub Duration);

impl From<std::convert::Infallible> for RequestTimedOut {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

/// Axum middleware cancelling the handler once `timeout` elapses.
///
/// Install with `axum::middleware::from_fn_with_state(timeout, enforce_deadline)`.
pub async fn enforce_deadline(
    State(timeout): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    match tokio::time::timeout(timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(path = %path, timeout = ?timeout, "request timed out");
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            response.extensions_mut().insert(RequestTimedOut(timeout));
            response
        }
    }
}

/// The deadline error carried by `response`, if any.
pub fn timed_out(response: &Response) -> Option<RequestTimedOut> {
    response.extensions().get::<RequestTimedOut>().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware::from_fn_with_state, routing::get, Router};
    use tower::ServiceExt;

    fn app(timeout: Duration) -> Router {
        Router::new()
            .route("/fast", get(|| async { "fast" }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    "slow"
                }),
            )
            .layer(from_fn_with_state(timeout, enforce_deadline))
    }

    #[tokio::test]
    async fn fast_handler_is_untouched() {
        let response = app(Duration::from_millis(200))
            .oneshot(Request::get("/fast").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(timed_out(&response).is_none());
    }

    #[tokio::test]
    async fn slow_handler_is_cancelled_and_tagged() {
        let started = std::time::Instant::now();
        let response = app(Duration::from_millis(200))
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            timed_out(&response),
            Some(RequestTimedOut(Duration::from_millis(200)))
        );
    }
}
