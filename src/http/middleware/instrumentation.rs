//! Request instrumentation: one log line and one metric pair per request.
//!
//! # Responsibilities
//! - Time every request from arrival to the last body byte
//! - Capture the status actually sent and the body bytes actually written
//! - Label metrics by route pattern, never by raw path
//! - Emit exactly one completion event and one counter/histogram update
//!
//! # Data Flow
//! ```text
//! request
//!     → track_requests (RequestContext + Completion guard)
//!     → inner service (panic recovery, timeout, handler)
//!     → response status committed
//!     → body wrapped in InstrumentedBody (counts data frames)
//!     → end of stream or drop → Completion::finish (log + metrics, once)
//! ```
//!
//! # Design Decisions
//! - The response itself is never altered; only the body is wrapped
//! - A request whose future is dropped before a response exists still
//!   completes with the default status 200

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use http_body::{Body as HttpBody, Frame, SizeHint};
use tracing::Instrument;

use crate::http::middleware::client_addr::ClientAddr;
use crate::http::middleware::request_id::request_id_of;
use crate::observability::metrics::{MetricsRecorder, RequestLabels};

/// Route label used when no route matched.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Per-request mutable state, owned by one request's instrumentation.
#[derive(Debug)]
pub struct RequestContext {
    start: Instant,
    status: Option<StatusCode>,
    bytes: u64,
    request_id: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            status: None,
            bytes: 0,
            request_id: request_id.into(),
        }
    }

    /// Record the response status. Only the first call has an effect.
    pub fn commit_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Committed status, 200 if none was committed.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn add_bytes(&mut self, n: u64) {
        self.bytes += n;
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Elapsed time as whole nanoseconds, saturating at `u64::MAX`.
fn saturating_nanos(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
}

/// Emits the completion record exactly once, at the latest when dropped.
struct Completion {
    metrics: Arc<MetricsRecorder>,
    method: String,
    path: String,
    route: String,
    remote_addr: String,
    ctx: RequestContext,
    finished: bool,
}

impl Completion {
    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let elapsed = self.ctx.elapsed();
        let status = self.ctx.status().as_u16();

        self.metrics
            .record_request(&RequestLabels::new(&self.method, &self.route, status), elapsed);

        tracing::info!(
            method = %self.method,
            path = %self.path,
            status = status,
            bytes = self.ctx.bytes(),
            duration = saturating_nanos(elapsed),
            remote_addr = %self.remote_addr,
            request_id = self.ctx.request_id(),
            "request completed"
        );
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Response body decorator that counts data bytes and finishes the request
/// when the stream ends.
struct InstrumentedBody {
    inner: Body,
    completion: Completion,
}

impl HttpBody for InstrumentedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.completion.ctx.add_bytes(data.len() as u64);
                }
                if this.inner.is_end_stream() {
                    this.completion.finish();
                }
            }
            Poll::Ready(Some(Err(_))) | Poll::Ready(None) => this.completion.finish(),
            Poll::Pending => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Axum middleware recording one log event and one metric pair per request.
///
/// Install with `axum::middleware::from_fn_with_state`.
pub async fn track_requests(
    State(metrics): State<Arc<MetricsRecorder>>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let remote_addr = request
        .extensions()
        .get::<ClientAddr>()
        .map(|a| a.0.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let request_id = request_id_of(request.headers()).to_string();

    let span = tracing::info_span!("request", request_id = %request_id);

    let mut completion = Completion {
        metrics,
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        route,
        remote_addr,
        ctx: RequestContext::new(request_id),
        finished: false,
    };

    let response = next.run(request).instrument(span).await;
    completion.ctx.commit_status(response.status());

    let (parts, body) = response.into_parts();
    Response::from_parts(
        parts,
        Body::new(InstrumentedBody {
            inner: body,
            completion,
        }),
    )
}
