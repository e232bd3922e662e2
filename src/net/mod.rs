//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! lifecycle::server accept loop
//!     → connection.rs (one task per TCP stream, HTTP/1.1 + HTTP/2)
//!     → http::server router
//!
//! On shutdown:
//!     drain signal → graceful close after the in-flight request
//! ```
//!
//! # Design Decisions
//! - Each connection is a task owned by the server's JoinSet, so shutdown
//!   can both wait for it and abort it
//! - Header reads are bounded by the configured read timeout

pub mod connection;

pub use connection::{serve_connection, ConnectionId};
