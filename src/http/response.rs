//! JSON response bodies.
//!
//! # Responsibilities
//! - Define the wire shape of every JSON body the service returns
//! - Turn error bodies into complete responses (status + JSON)
//!
//! # Design Decisions
//! - Timestamps are UTC and serialize as RFC3339
//! - Optional fields are omitted, never sent as `null`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generic status body used by `/ping` and `/ready`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    pub time: DateTime<Utc>,
}

impl StatusResponse {
    pub fn new(status: &str, message: &str) -> Self {
        Self {
            status: status.to_string(),
            message: message.to_string(),
            time: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Human-readable process uptime, e.g. `1.503s`.
    pub uptime: String,
}

/// Error body: `{"status":"error","error":...,"message":...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &str, message: Option<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: error.to_string(),
            message,
        }
    }

    /// Pair this body with a status code.
    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_response_shape() {
        let body = serde_json::to_value(StatusResponse::new("success", "pong")).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "pong");
        let time = body["time"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(time).is_ok());
    }

    #[test]
    fn error_response_omits_missing_message() {
        let body = serde_json::to_value(ErrorResponse::new("internal server error", None)).unwrap();
        assert_eq!(body, serde_json::json!({"status": "error", "error": "internal server error"}));
    }

    #[test]
    fn error_response_carries_status() {
        let response = ErrorResponse::new("not found", Some("no route for /nope".into()))
            .with_status(StatusCode::NOT_FOUND);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );
    }
}
