//! Attribute name mapping onto Elastic Common Schema field paths.
//!
//! # Responsibilities
//! - Translate short structured-log field names (`method`, `status`, ...)
//!   into their canonical ECS paths
//! - Pass every other name through unchanged
//!
//! # Design Decisions
//! - Static table, no control flow per field: a new field is one row
//! - Total function: unknown keys are never dropped or rejected

/// ECS field that carries an elapsed time as integer nanoseconds.
pub const EVENT_DURATION: &str = "event.duration";

/// Short attribute name → ECS field path.
const ECS_FIELDS: &[(&str, &str)] = &[
    ("method", "http.request.method"),
    ("path", "url.path"),
    ("status", "http.response.status_code"),
    ("bytes", "http.response.body.bytes"),
    ("duration", EVENT_DURATION),
    ("remote_addr", "client.address"),
    ("request_id", "trace.id"),
    ("error", "error.message"),
    ("uptime", "event.uptime"),
    ("port", "server.port"),
    ("environment", "service.environment"),
];

/// Map a structured log field name to its output field name.
///
/// Keys found in the ECS table map to their canonical path; any other key
/// maps to itself.
pub fn map_key(key: &str) -> &str {
    ECS_FIELDS
        .iter()
        .find(|(short, _)| *short == key)
        .map(|(_, ecs)| *ecs)
        .unwrap_or(key)
}
