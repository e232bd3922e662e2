//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the process-wide `tracing` subscriber
//! - Bridge `tracing` events onto the ECS encoder (one JSON line per event)
//! - Keep logging failures away from request handling
//!
//! # Design Decisions
//! - Every call site uses the `tracing` macros; this layer is the only
//!   formatter, so stdout carries nothing but ECS records
//! - Span fields act as pre-bound attributes for events inside the span
//! - Encode/write failures leave a best-effort note on stderr and are dropped

use std::fmt;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

use crate::observability::encoder::{AttrValue, EcsEncoder, EncodeError, LogEvent, LogSink};

/// Install the global subscriber: env filter + ECS layer.
///
/// `RUST_LOG` wins over `default_level` when set.
pub fn init_logging(encoder: EcsEncoder, default_level: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(EcsLayer::new(encoder))
        .try_init()
}

/// A `tracing_subscriber::Layer` that writes every event as an ECS record.
pub struct EcsLayer {
    encoder: EcsEncoder,
    fallback: LogSink,
}

impl EcsLayer {
    pub fn new(encoder: EcsEncoder) -> Self {
        Self {
            encoder,
            fallback: LogSink::stderr(),
        }
    }

    /// Where to leave a note when an event cannot be written.
    pub fn with_fallback(mut self, sink: LogSink) -> Self {
        self.fallback = sink;
        self
    }

    fn report_failure(&self, event: &LogEvent, err: &EncodeError) {
        let note = serde_json::json!({
            "log.level": "ERROR",
            "message": "failed to write log event",
            "error.message": err.to_string(),
            "event.original": event.message(),
        });
        let _ = self.fallback.write_line(format!("{note}\n").as_bytes());
    }
}

/// Fields recorded on a span, inherited by events inside it.
struct SpanAttributes(Vec<(String, AttrValue)>);

#[derive(Default)]
struct AttributeVisitor {
    message: Option<String>,
    attributes: Vec<(String, AttrValue)>,
}

impl AttributeVisitor {
    fn push(&mut self, field: &Field, value: AttrValue) {
        self.attributes.push((field.name().to_string(), value));
    }
}

impl Visit for AttributeVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.push(field, AttrValue::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, AttrValue::Int(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, AttrValue::Uint(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, AttrValue::Float(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, AttrValue::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, AttrValue::Str(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.push(field, AttrValue::Str(rendered));
        }
    }
}

impl<S> Layer<S> for EcsLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = AttributeVisitor::default();
        attrs.record(&mut visitor);
        span.extensions_mut().insert(SpanAttributes(visitor.attributes));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = AttributeVisitor::default();
        values.record(&mut visitor);

        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanAttributes>() {
            Some(existing) => existing.0.extend(visitor.attributes),
            None => extensions.insert(SpanAttributes(visitor.attributes)),
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = AttributeVisitor::default();
        event.record(&mut visitor);

        let mut log_event = LogEvent::new(
            event.metadata().level().into(),
            visitor.message.take().unwrap_or_default(),
        );

        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(bound) = span.extensions().get::<SpanAttributes>() {
                    for (key, value) in &bound.0 {
                        log_event = log_event.with(key.clone(), value.clone());
                    }
                }
            }
        }
        for (key, value) in visitor.attributes {
            log_event = log_event.with(key, value);
        }

        if let Err(err) = self.encoder.log(&log_event) {
            self.report_failure(&log_event, &err);
        }
    }
}
