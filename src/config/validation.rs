//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port in range, timeouts > 0)
//! - Check the log level names a real level
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::time::Duration;

use tracing_subscriber::filter::LevelFilter;

use crate::config::schema::AppConfig;

/// One rejected setting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check every semantic rule and report all violations.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::new("server.port", "must be between 1 and 65535"));
    }

    let timeouts: [(&'static str, Duration); 3] = [
        ("server.read_timeout", config.server.read_timeout),
        ("server.write_timeout", config.server.write_timeout),
        ("server.shutdown_timeout", config.server.shutdown_timeout),
    ];
    for (field, value) in timeouts {
        if value.is_zero() {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::new("service.name", "must not be empty"));
    }
    if config.service.version.trim().is_empty() {
        errors.push(ValidationError::new("service.version", "must not be empty"));
    }
    if config.environment.trim().is_empty() {
        errors.push(ValidationError::new("environment", "must not be empty"));
    }

    if config.observability.log_level.parse::<LevelFilter>().is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level {:?}", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_violation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        config.server.write_timeout = Duration::ZERO;
        config.service.name = "  ".to_string();
        config.observability.log_level = "loud".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            ["server.port", "server.write_timeout", "service.name", "observability.log_level"]
        );
    }

    #[test]
    fn level_names_are_case_insensitive() {
        let mut config = AppConfig::default();
        for level in ["debug", "INFO", "Warn", "error"] {
            config.observability.log_level = level.to_string();
            assert!(validate_config(&config).is_ok(), "{level}");
        }
    }
}
