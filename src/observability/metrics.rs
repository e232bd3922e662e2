//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Count requests and observe their latency per (method, endpoint, status)
//! - Expose a Prometheus-compatible text snapshot
//!
//! # Metrics
//! - `http_requests_total` (counter): total requests by method, endpoint, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `app_uptime_seconds` (gauge): process uptime, refreshed on every snapshot
//!
//! # Design Decisions
//! - One recorder instance built at startup and handed to whoever needs it;
//!   nothing is installed as the global `metrics` recorder
//! - Endpoint label is the route pattern, never the raw path
//! - Updates are atomic inside the exporter; no lock spans a request

use std::time::{Duration, Instant};

use metrics::{Key, KeyName, Label, Level, Metadata, Recorder, SharedString};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const APP_UPTIME_SECONDS: &str = "app_uptime_seconds";

/// Prometheus default latency buckets, in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Error type for recorder construction.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to build metrics exporter: {0}")]
    Build(#[from] BuildError),
}

/// Label set identifying one request series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestLabels {
    pub method: String,
    pub endpoint: String,
    pub status: String,
}

impl RequestLabels {
    pub fn new(method: &str, endpoint: &str, status: u16) -> Self {
        Self {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            status: status.to_string(),
        }
    }

    fn to_labels(&self) -> Vec<Label> {
        vec![
            Label::new("method", self.method.clone()),
            Label::new("endpoint", self.endpoint.clone()),
            Label::new("status", self.status.clone()),
        ]
    }
}

/// Process-wide request metrics.
pub struct MetricsRecorder {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    started: Instant,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, MetricsError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
                &DEFAULT_BUCKETS,
            )?
            .build_recorder();
        let handle = recorder.handle();

        recorder.describe_counter(
            KeyName::from(HTTP_REQUESTS_TOTAL),
            None,
            SharedString::from("Total number of HTTP requests"),
        );
        recorder.describe_histogram(
            KeyName::from(HTTP_REQUEST_DURATION_SECONDS),
            None,
            SharedString::from("Duration of HTTP requests in seconds"),
        );
        recorder.describe_gauge(
            KeyName::from(APP_UPTIME_SECONDS),
            None,
            SharedString::from("Application uptime in seconds"),
        );

        Ok(Self {
            recorder,
            handle,
            started: Instant::now(),
        })
    }

    fn metadata() -> Metadata<'static> {
        Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
    }

    /// Add one to the counter series `name{labels}`.
    pub fn increment_counter(&self, name: &str, labels: &RequestLabels) {
        let key = Key::from_parts(name.to_string(), labels.to_labels());
        self.recorder
            .register_counter(&key, &Self::metadata())
            .increment(1);
    }

    /// Record one observation into the histogram series `name{labels}`.
    pub fn observe_histogram(&self, name: &str, labels: &RequestLabels, value: f64) {
        let key = Key::from_parts(name.to_string(), labels.to_labels());
        self.recorder
            .register_histogram(&key, &Self::metadata())
            .record(value);
    }

    /// Count one completed request and observe its latency.
    pub fn record_request(&self, labels: &RequestLabels, elapsed: Duration) {
        self.increment_counter(HTTP_REQUESTS_TOTAL, labels);
        self.observe_histogram(HTTP_REQUEST_DURATION_SECONDS, labels, elapsed.as_secs_f64());
    }

    /// Render every series as Prometheus text, families ordered by name.
    pub fn snapshot(&self) -> String {
        self.recorder
            .register_gauge(&Key::from_name(APP_UPTIME_SECONDS), &Self::metadata())
            .set(self.started.elapsed().as_secs_f64());

        sort_families(&self.handle.render())
    }
}

/// Reorder exposition text so metric families appear sorted by name.
///
/// Lines inside a family keep their original order (bucket order matters).
fn sort_families(exposition: &str) -> String {
    let mut families: Vec<(String, Vec<&str>)> = Vec::new();

    for line in exposition.lines().filter(|l| !l.trim().is_empty()) {
        let starts_family = match (line.strip_prefix("# "), families.last()) {
            (_, None) => true,
            (Some(comment), Some((current, _))) => {
                comment.split_whitespace().nth(1) != Some(current.as_str())
            }
            (None, Some(_)) => false,
        };
        if starts_family {
            families.push((family_name(line).to_string(), Vec::new()));
        }
        if let Some((_, lines)) = families.last_mut() {
            lines.push(line);
        }
    }

    families.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::new();
    for (i, (_, lines)) in families.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

fn family_name(line: &str) -> &str {
    match line.strip_prefix("# ") {
        Some(comment) => comment.split_whitespace().nth(1).unwrap_or(""),
        None => line
            .split(|c: char| c == '{' || c.is_whitespace())
            .next()
            .unwrap_or(""),
    }
}
