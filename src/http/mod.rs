//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! connection (net::connection)
//!     → server.rs (router + middleware stack)
//!     → middleware/ (request ID, client address, instrumentation,
//!                    panic recovery, timeout)
//!     → handlers.rs (/ping, /health, /ready, /metrics, 404 fallback)
//!     → response.rs (JSON bodies)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod server;

pub use server::{build_router, AppState};
