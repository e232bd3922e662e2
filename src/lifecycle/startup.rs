//! Startup orchestration and exit-code policy.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging, metrics, router and server in dependency order
//! - Wait for a shutdown signal, then drain within the configured deadline
//! - Map the outcome to a process exit code
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal (exit 1)
//! - A configuration error is reported before logging exists, through a
//!   directly constructed encoder with the default service identity
//! - A shutdown that overruns its deadline also exits 1
//! - The listener is bound before the signal is awaited, so a signal that
//!   arrives early still finds a running server to stop

use std::future::Future;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use axum::Router;

use crate::config::{load_config, AppConfig};
use crate::http::server::{build_router, request_timeout, AppState};
use crate::lifecycle::server::Server;
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::encoder::{EcsEncoder, LogEvent, LogLevel, LogSink, ServiceIdentity};
use crate::observability::logging::init_logging;
use crate::observability::metrics::MetricsRecorder;

/// Run the service to completion.
pub async fn run(config_path: Option<&Path>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(err) => {
            report_early_failure("failed to load configuration", &err.to_string());
            return ExitCode::FAILURE;
        }
    };

    let identity = ServiceIdentity::new(&config.service.name, &config.service.version);
    let encoder = EcsEncoder::new(LogSink::stdout(), identity)
        .with_attrs([("environment", config.environment.as_str())]);
    if let Err(err) = init_logging(encoder, &config.observability.log_level) {
        report_early_failure("failed to initialize logging", &err.to_string());
        return ExitCode::FAILURE;
    }

    serve(config).await
}

async fn serve(config: AppConfig) -> ExitCode {
    let metrics = match MetricsRecorder::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(err) => {
            tracing::error!(error = %err, "failed to create metrics recorder");
            return ExitCode::FAILURE;
        }
    };

    let router = build_router(
        AppState::new(metrics),
        request_timeout(config.server.write_timeout),
    );

    serve_with(&config, router, shutdown_signal()).await
}

/// Serve `router` until `signal` resolves, then shut down within the
/// configured deadline.
///
/// `signal` yields the name of whatever triggered the shutdown.
pub async fn serve_with<F>(config: &AppConfig, router: Router, signal: F) -> ExitCode
where
    F: Future<Output = &'static str>,
{
    let server = Arc::new(Server::new(
        router,
        config.server.port,
        config.server.read_timeout,
    ));

    tracing::info!(
        service = %config.service.name,
        version = %config.service.version,
        environment = %config.environment,
        port = config.server.port,
        "application starting"
    );

    let listener = match server.bind().await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, "server failed to start");
            return ExitCode::FAILURE;
        }
    };

    let mut serving = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.run(listener).await }
    });

    tokio::select! {
        result = &mut serving => {
            return match result {
                Ok(Ok(())) => {
                    tracing::info!("server stopped");
                    ExitCode::SUCCESS
                }
                Ok(Err(err)) => {
                    tracing::error!(error = %err, "server failed");
                    ExitCode::FAILURE
                }
                Err(err) => {
                    tracing::error!(error = %err, "server task failed");
                    ExitCode::FAILURE
                }
            };
        }
        signal = signal => {
            tracing::info!(signal = signal, "received shutdown signal");
        }
    }

    match server.shutdown(config.server.shutdown_timeout).await {
        Ok(()) => {
            let _ = serving.await;
            tracing::info!("server stopped gracefully");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "server forced to shutdown");
            ExitCode::FAILURE
        }
    }
}

/// Write one ERROR record to stdout without a subscriber installed.
fn report_early_failure(message: &str, error: &str) {
    let encoder = EcsEncoder::new(LogSink::stdout(), ServiceIdentity::default());
    let event = LogEvent::new(LogLevel::Error, message).with("error", error);
    if encoder.log(&event).is_err() {
        eprintln!("{message}: {error}");
    }
}
