//! HTTP middleware.
//!
//! # Data Flow
//! ```text
//! request
//!     → request_id.rs (reuse or generate x-request-id)
//!     → client_addr.rs (resolve client.address)
//!     → instrumentation.rs (timer, status/bytes capture, log + metrics)
//!     → recover.rs (panic → 500)
//!     → deadline.rs (cancel overrunning handler, connection dropped)
//!     → handler
//! ```

pub mod client_addr;
pub mod deadline;
pub mod instrumentation;
pub mod recover;
pub mod request_id;

pub use client_addr::{resolve_client_addr, ClientAddr};
pub use deadline::{enforce_deadline, timed_out, RequestTimedOut};
pub use instrumentation::{track_requests, RequestContext, UNMATCHED_ROUTE};
pub use recover::panic_response;
pub use request_id::{request_id_of, UuidRequestId, X_REQUEST_ID};
