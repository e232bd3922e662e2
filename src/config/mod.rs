//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! AppConfig::default()
//!     → loader.rs (optional TOML file via --config / CONFIG_PATH)
//!     → loader.rs (environment overlay: PORT, READ_TIMEOUT, ...)
//!     → validation.rs (semantic checks, all errors at once)
//!     → AppConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Durations are Go-style strings (`15s`, `1m30s`) in file and env alike
//! - An unparsable environment value is fatal, never silently defaulted

pub mod duration;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, ObservabilityConfig, ServerConfig, ServiceConfig};
pub use validation::ValidationError;
