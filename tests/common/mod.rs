//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use orchestrated_ping::http::server::{routes, with_middleware, AppState};
use orchestrated_ping::lifecycle::{Server, ServerError, ServerState};
use orchestrated_ping::observability::encoder::{CaptureBuffer, EcsEncoder, ServiceIdentity};
use orchestrated_ping::observability::{EcsLayer, MetricsRecorder};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

/// Per-request deadline used unless a test picks its own.
pub const TEST_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the full application router, plus `extra` test-only routes.
pub fn test_router(extra: Router<AppState>) -> (Router, Arc<MetricsRecorder>) {
    test_router_with_timeout(extra, TEST_REQUEST_TIMEOUT)
}

pub fn test_router_with_timeout(
    extra: Router<AppState>,
    request_timeout: Duration,
) -> (Router, Arc<MetricsRecorder>) {
    let metrics = Arc::new(MetricsRecorder::new().unwrap());
    let router = with_middleware(
        routes().merge(extra),
        AppState::new(Arc::clone(&metrics)),
        request_timeout,
    );
    (router, metrics)
}

/// Route every `tracing` event on this thread into an in-memory buffer.
pub fn capture_logs() -> (CaptureBuffer, DefaultGuard) {
    let buf = CaptureBuffer::new();
    let encoder = EcsEncoder::new(buf.sink(), ServiceIdentity::new("orchestrated-ping", "test"));
    let subscriber =
        tracing_subscriber::registry().with(EcsLayer::new(encoder).with_filter(LevelFilter::INFO));
    let guard = tracing::subscriber::set_default(subscriber);
    (buf, guard)
}

/// A server running on a loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub server: Arc<Server>,
    pub metrics: Arc<MetricsRecorder>,
    pub serving: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Serve the application (plus `extra` routes) on 127.0.0.1:<random>.
pub async fn spawn_server(extra: Router<AppState>) -> TestServer {
    spawn_server_with_timeout(extra, TEST_REQUEST_TIMEOUT).await
}

pub async fn spawn_server_with_timeout(
    extra: Router<AppState>,
    request_timeout: Duration,
) -> TestServer {
    let (router, metrics) = test_router_with_timeout(extra, request_timeout);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = Arc::new(Server::new(router, addr.port(), Duration::from_secs(5)));
    let serving = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.serve(listener).await }
    });

    while server.state() != ServerState::Running {
        tokio::task::yield_now().await;
    }

    TestServer {
        addr,
        server,
        metrics,
        serving,
    }
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
