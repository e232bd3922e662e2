//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files and
//! carry a default for every field, so an empty file is a valid config.

use std::time::Duration;

use serde::Deserialize;

use crate::config::duration::serde_go;

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listener and timeout settings.
    pub server: ServerConfig,

    /// Service identity stamped on every log line.
    pub service: ServiceConfig,

    /// Deployment environment name (`development`, `production`, ...).
    pub environment: String,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            service: ServiceConfig::default(),
            environment: "development".to_string(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP port, bound on all interfaces.
    pub port: u16,

    /// Maximum time to read a request's headers.
    #[serde(with = "serde_go")]
    pub read_timeout: Duration,

    /// Upper bound for producing a response (capped at 60s per request).
    #[serde(with = "serde_go")]
    pub write_timeout: Duration,

    /// Deadline for draining in-flight requests on shutdown.
    #[serde(with = "serde_go")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            read_timeout: Duration::from_secs(15),
            write_timeout: Duration::from_secs(15),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Service identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error). `RUST_LOG` overrides it.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
