//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! tracing macros (every subsystem)
//!     → logging.rs (EcsLayer: span + event fields → LogEvent)
//!     → encoder.rs (LogEvent → ECS OutputRecord → one JSON line)
//!     → mapping.rs (short attribute names → ECS field paths)
//!     → stdout
//!
//! Request instrumentation
//!     → metrics.rs (counter + histogram per method/endpoint/status)
//!     → GET /metrics (Prometheus text exposition)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON, ECS field names) for machine parsing
//! - Request ID flows into every request log line as `trace.id`
//! - Metrics are cheap (atomic increments) and owned by an explicit recorder
//! - Logging failures are contained; they never reach request handling

pub mod encoder;
pub mod logging;
pub mod mapping;
pub mod metrics;

pub use encoder::{EcsEncoder, LogSink, ServiceIdentity};
pub use logging::{init_logging, EcsLayer};
pub use metrics::{MetricsRecorder, RequestLabels};
