//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Logging → Metrics → Router → Start server
//!
//! Serving (server.rs, state.rs):
//!     Created → Running → ShuttingDown → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown(deadline) → drain or abort → exit code
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then observability, then the listener
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has a deadline: forced stop after it elapses

pub mod server;
pub mod signals;
pub mod startup;
pub mod state;

pub use server::{Server, ServerError};
pub use state::ServerState;
