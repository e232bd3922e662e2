//! Configuration loading: defaults, then an optional TOML file, then the
//! environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {name}: {reason}")]
    Env {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from `path` (if any) and the process environment,
/// then validate it.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_config_with(path, |name| std::env::var(name).ok())
}

/// Like [`load_config`], reading variables through `env` instead of the
/// process environment.
pub fn load_config_with<F>(path: Option<&Path>, env: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay recognised environment variables. Empty values are ignored.
pub fn apply_env<F>(config: &mut AppConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    if let Some(value) = var("PORT") {
        config.server.port = value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
            name: "PORT",
            reason: e.to_string(),
            value,
        })?;
    }

    let durations: [(&'static str, &mut Duration); 3] = [
        ("READ_TIMEOUT", &mut config.server.read_timeout),
        ("WRITE_TIMEOUT", &mut config.server.write_timeout),
        ("SHUTDOWN_TIMEOUT", &mut config.server.shutdown_timeout),
    ];
    for (name, slot) in durations {
        if let Some(value) = var(name) {
            *slot = parse_duration(&value).map_err(|e| ConfigError::Env {
                name,
                reason: e.to_string(),
                value,
            })?;
        }
    }

    if let Some(value) = var("ENVIRONMENT") {
        config.environment = value;
    }
    if let Some(value) = var("LOG_LEVEL") {
        config.observability.log_level = value;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn no_file_no_env_gives_defaults() {
        let config = load_config_with(None, env_of(&[])).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn env_overrides_defaults() {
        let config = load_config_with(
            None,
            env_of(&[
                ("PORT", "9090"),
                ("READ_TIMEOUT", "5s"),
                ("WRITE_TIMEOUT", "1m"),
                ("SHUTDOWN_TIMEOUT", "500ms"),
                ("ENVIRONMENT", "production"),
                ("LOG_LEVEL", "debug"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.read_timeout, Duration::from_secs(5));
        assert_eq!(config.server.write_timeout, Duration::from_secs(60));
        assert_eq!(config.server.shutdown_timeout, Duration::from_millis(500));
        assert_eq!(config.environment, "production");
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let config = load_config_with(None, env_of(&[("PORT", ""), ("ENVIRONMENT", "  ")])).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn invalid_env_values_are_errors() {
        let err = load_config_with(None, env_of(&[("PORT", "abc")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { name: "PORT", .. }));

        let err = load_config_with(None, env_of(&[("READ_TIMEOUT", "fast")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { name: "READ_TIMEOUT", .. }));
    }

    #[test]
    fn zero_port_fails_validation() {
        let err = load_config_with(None, env_of(&[("PORT", "0")])).unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors[0].field, "server.port"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn file_then_env() {
        let path = std::env::temp_dir().join(format!("orchestrated-ping-{}.toml", std::process::id()));
        fs::write(&path, "environment = \"staging\"\n[server]\nport = 7000\n").unwrap();

        let config = load_config_with(Some(&path), env_of(&[("PORT", "7001")])).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.environment, "staging");
        assert_eq!(config.server.port, 7001);
    }

    #[test]
    fn file_durations_use_go_syntax() {
        let path = std::env::temp_dir().join(format!(
            "orchestrated-ping-durations-{}.toml",
            std::process::id()
        ));
        fs::write(
            &path,
            "[server]\nread_timeout = \"500ms\"\nshutdown_timeout = \"1m30s\"\n",
        )
        .unwrap();

        let config = load_config_with(Some(&path), env_of(&[])).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.server.read_timeout, Duration::from_millis(500));
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(90));
        assert_eq!(config.server.write_timeout, Duration::from_secs(15));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config_with(Some(Path::new("/nonexistent/app.toml")), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
