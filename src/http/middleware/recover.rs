//! Handler panic recovery.
//!
//! Used with `tower_http::catch_panic::CatchPanicLayer::custom`. The panic
//! becomes a 500 JSON body plus one ERROR event; the connection and the
//! server keep running.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::Response;

use crate::http::response::ErrorResponse;

/// Build the response for a panicked handler.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(error = %detail, "handler panicked");

    ErrorResponse::new("internal server error", None).with_status(StatusCode::INTERNAL_SERVER_ERROR)
}
