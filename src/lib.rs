//! orchestrated-ping: a small HTTP service with ECS logging, Prometheus
//! metrics and a graceful server lifecycle.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::AppConfig;
pub use http::build_router;
pub use lifecycle::{Server, ServerError, ServerState};
pub use observability::{EcsEncoder, MetricsRecorder};
