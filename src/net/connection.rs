//! Per-connection serving.
//!
//! # Responsibilities
//! - Serve HTTP/1.1 and HTTP/2 on one accepted TCP stream
//! - Make the peer address visible to handlers as `ConnectInfo`
//! - Bound header reads with the configured read timeout
//! - Drain gracefully when the server starts shutting down
//! - Drop the connection when a request overran its deadline

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::{extract::ConnectInfo, http::Request, response::Response, Router};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tower::ServiceExt;

use crate::http::middleware::deadline::{timed_out, RequestTimedOut};

/// Global atomic counter for connection IDs.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection, used in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Serve one connection until the client leaves or draining completes.
///
/// When `drain` changes, the connection finishes its in-flight request and
/// closes instead of waiting for the next one.
pub async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    mut drain: watch::Receiver<bool>,
    read_timeout: Duration,
) {
    let id = ConnectionId::new();
    tracing::trace!(connection_id = %id, peer = %peer, "connection accepted");

    let service = router
        .map_request(move |mut request: Request<Incoming>| {
            request.extensions_mut().insert(ConnectInfo(peer));
            request
        })
        .map_result(abort_timed_out);
    let service = TowerToHyperService::new(service);

    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(read_timeout);

    let connection = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        _ = drain.changed() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };

    if let Err(err) = result {
        tracing::debug!(connection_id = %id, error = %err, "connection closed with error");
    }
    tracing::trace!(connection_id = %id, "connection closed");
}

/// Turn a deadline-tagged response into a service error, which makes hyper
/// close the connection instead of writing the response.
fn abort_timed_out(result: Result<Response, Infallible>) -> Result<Response, RequestTimedOut> {
    let response = match result {
        Ok(response) => response,
        Err(never) => match never {},
    };
    match timed_out(&response) {
        Some(err) => Err(err),
        None => Ok(response),
    }
}
