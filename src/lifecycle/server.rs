//! Server lifecycle: bind, serve, drain, stop.
//!
//! # Responsibilities
//! - Own the listening socket and the accept loop
//! - Track every connection task so shutdown can wait for it or abort it
//! - Drive the `ServerState` machine
//!
//! # Data Flow
//! ```text
//! start()  → bind(): Created → Running, bind 0.0.0.0:<port> → run()
//! serve()  → Created → Running → run() on a pre-bound listener
//! run()    → accept loop (one task per connection) while Running
//! shutdown(deadline)
//!     → Running → ShuttingDown
//!     → accept loop exits, listener dropped (new connections refused)
//!     → connections told to drain
//!     → all drained before deadline: Ok
//!     → otherwise: remaining tasks aborted, ShutdownTimeout
//! run() returns → Stopped
//! ```
//!
//! # Design Decisions
//! - `Server` is shared by reference: one task runs `start`/`serve`, another
//!   calls `shutdown`
//! - The deadline is an explicit timeout race, never sleep polling
//! - Shutdown before start, or a second shutdown, is a successful no-op

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};
use tokio::task::JoinSet;

use crate::lifecycle::state::{ServerState, StateCell};
use crate::net::connection::serve_connection;

/// How long a forced stop may take to abort what is left.
const ABORT_GRACE: Duration = Duration::from_millis(500);

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Error type for server lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server already started")]
    AlreadyStarted,

    #[error("in-flight requests did not finish within {0:?}")]
    ShutdownTimeout(Duration),
}

/// The HTTP server and its lifecycle state.
pub struct Server {
    router: Router,
    port: u16,
    read_timeout: Duration,
    state: StateCell,
    force_stop: Notify,
}

impl Server {
    pub fn new(router: Router, port: u16, read_timeout: Duration) -> Self {
        Self {
            router,
            port,
            read_timeout,
            state: StateCell::new(),
            force_stop: Notify::new(),
        }
    }

    pub fn state(&self) -> ServerState {
        self.state.current()
    }

    /// Bind `0.0.0.0:<port>` and serve until shut down.
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.run(listener).await
    }

    /// Claim the server and bind `0.0.0.0:<port>`.
    ///
    /// The server is `Running` before the first await, so a shutdown racing
    /// the bind is never lost. A failed bind leaves it `Stopped`.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        if !self.state.transition(ServerState::Created, ServerState::Running) {
            return Err(ServerError::AlreadyStarted);
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        match TcpListener::bind(addr).await {
            Ok(listener) => Ok(listener),
            Err(source) => {
                self.state.advance(ServerState::Stopped);
                Err(ServerError::Bind { addr, source })
            }
        }
    }

    /// Serve on an already-bound listener until shut down.
    ///
    /// Returns once every connection has finished or been aborted.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        if !self.state.transition(ServerState::Created, ServerState::Running) {
            return Err(ServerError::AlreadyStarted);
        }
        self.run(listener).await
    }

    /// Accept loop for a server already claimed by `bind` or `serve`.
    ///
    /// Stops at once if a shutdown arrived before the loop started.
    pub(crate) async fn run(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut state_rx = self.state.subscribe();

        match listener.local_addr() {
            Ok(addr) => tracing::info!(address = %addr, "starting server"),
            Err(_) => tracing::info!("starting server"),
        }

        let (drain_tx, drain_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        let mut accept_failures = 0u32;

        while *state_rx.borrow_and_update() == ServerState::Running {
            tokio::select! {
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        accept_failures = 0;
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            self.router.clone(),
                            drain_rx.clone(),
                            self.read_timeout,
                        ));
                    }
                    Err(err) => {
                        accept_failures = accept_failures.saturating_add(1);
                        let backoff = accept_backoff(accept_failures);
                        tracing::warn!(error = %err, backoff = ?backoff, "failed to accept connection");
                        tokio::time::sleep(backoff).await;
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        drop(listener);
        tracing::info!(connections = connections.len(), "shutting down server");
        let _ = drain_tx.send(true);

        let forced = tokio::select! {
            _ = drain_all(&mut connections) => false,
            _ = self.force_stop.notified() => true,
        };
        if forced {
            tracing::warn!(connections = connections.len(), "aborting connections still in flight");
            connections.abort_all();
            drain_all(&mut connections).await;
        }

        self.state.advance(ServerState::Stopped);
        Ok(())
    }

    /// Stop accepting, drain in-flight requests, and wait up to `deadline`.
    ///
    /// On timeout the remaining connections are aborted and
    /// `ServerError::ShutdownTimeout` is returned.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), ServerError> {
        if !self.state.transition(ServerState::Running, ServerState::ShuttingDown) {
            return Ok(());
        }

        let mut state_rx = self.state.subscribe();
        let stopped = tokio::time::timeout(
            deadline,
            state_rx.wait_for(|state| *state == ServerState::Stopped),
        )
        .await
        .is_ok();
        if stopped {
            return Ok(());
        }

        self.force_stop.notify_one();
        let _ = tokio::time::timeout(
            ABORT_GRACE,
            state_rx.wait_for(|state| *state == ServerState::Stopped),
        )
        .await;

        Err(ServerError::ShutdownTimeout(deadline))
    }
}

/// Pause after the `failures`-th consecutive accept error: 10ms doubling up
/// to 1s. Accept errors such as EMFILE repeat until something frees up.
fn accept_backoff(failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(7);
    (ACCEPT_BACKOFF_BASE * 2u32.pow(exponent)).min(ACCEPT_BACKOFF_MAX)
}

async fn drain_all(connections: &mut JoinSet<()>) {
    while connections.join_next().await.is_some() {}
}
