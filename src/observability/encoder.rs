//! ECS log record encoding.
//!
//! # Data Flow
//! ```text
//! LogEvent (timestamp, level, message, attributes)
//!     → EcsEncoder::encode
//!         fixed fields + ServiceIdentity + bound attributes + event attributes
//!         (each key passed through mapping::map_key)
//!     → OutputRecord (flat key → scalar)
//!     → EcsEncoder::write (one JSON object + '\n', single locked write)
//!     → LogSink (stdout in production, memory in tests)
//! ```
//!
//! # Design Decisions
//! - Sub-encoders (`with_attrs`, `with_group`) are new values sharing the sink
//!   and identity; the parent is never mutated
//! - Grouped keys are qualified as `group.key` before mapping, so they pass
//!   through unmapped
//! - Durations always render as integer nanoseconds

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::observability::mapping::map_key;

/// ECS schema version stamped on every record.
pub const ECS_VERSION: &str = "8.11.0";

/// Error raised when a record cannot be serialized or written.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write log record: {0}")]
    Io(#[from] std::io::Error),
    #[error("log sink lock poisoned")]
    SinkPoisoned,
}

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::ERROR => LogLevel::Error,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::INFO => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }
}

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Duration(Duration),
}

impl AttrValue {
    fn to_json(&self) -> Value {
        match self {
            AttrValue::Str(s) => Value::String(s.clone()),
            AttrValue::Int(i) => Value::from(*i),
            AttrValue::Uint(u) => Value::from(*u),
            // NaN and infinities become null.
            AttrValue::Float(f) => Value::from(*f),
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Duration(d) => Value::from(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v.into())
    }
}

impl From<u64> for AttrValue {
    fn from(v: u64) -> Self {
        AttrValue::Uint(v)
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        AttrValue::Uint(v.into())
    }
}

impl From<u16> for AttrValue {
    fn from(v: u16) -> Self {
        AttrValue::Uint(v.into())
    }
}

impl From<usize> for AttrValue {
    fn from(v: usize) -> Self {
        AttrValue::Uint(v as u64)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<Duration> for AttrValue {
    fn from(v: Duration) -> Self {
        AttrValue::Duration(v)
    }
}

/// One log call: produced once, encoded once, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    message: String,
    attributes: Vec<(String, AttrValue)>,
}

impl LogEvent {
    /// Create an event stamped with the current time.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            attributes: Vec::new(),
        }
    }

    /// Replace the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Append an attribute. Later attributes win on key collision.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn attributes(&self) -> &[(String, AttrValue)] {
        &self.attributes
    }
}

/// Service metadata injected into every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub name: String,
    pub version: String,
    pub schema_version: String,
}

impl ServiceIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            schema_version: ECS_VERSION.to_string(),
        }
    }
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

/// A flat, serialized-ready log record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputRecord(Map<String, Value>);

impl OutputRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Serialize as a single JSON line, newline included.
    pub fn to_line(&self) -> Result<Vec<u8>, EncodeError> {
        let mut line = serde_json::to_vec(&self.0)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Shared, line-atomic output stream.
#[derive(Clone)]
pub struct LogSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl LogSink {
    pub fn stdout() -> Self {
        Self::from_writer(std::io::stdout())
    }

    pub fn stderr() -> Self {
        Self::from_writer(std::io::stderr())
    }

    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Write one complete line under the sink lock.
    pub fn write_line(&self, line: &[u8]) -> Result<(), EncodeError> {
        let mut writer = self.inner.lock().map_err(|_| EncodeError::SinkPoisoned)?;
        writer.write_all(line)?;
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink").finish_non_exhaustive()
    }
}

/// In-memory writer for capturing log output.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink writing into this buffer.
    pub fn sink(&self) -> LogSink {
        LogSink::from_writer(self.clone())
    }

    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Every captured line parsed as a JSON object; unparsable lines are skipped.
    pub fn records(&self) -> Vec<Value> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut inner = self
            .0
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "capture buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Encodes log events into ECS records and writes them to a sink.
#[derive(Debug, Clone)]
pub struct EcsEncoder {
    sink: LogSink,
    identity: Arc<ServiceIdentity>,
    bound: Arc<Vec<(String, AttrValue)>>,
    group: Option<String>,
}

impl EcsEncoder {
    pub fn new(sink: LogSink, identity: ServiceIdentity) -> Self {
        Self {
            sink,
            identity: Arc::new(identity),
            bound: Arc::new(Vec::new()),
            group: None,
        }
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// A sub-encoder with extra attributes bound to every future record.
    ///
    /// Keys are qualified by the current group at binding time.
    pub fn with_attrs<K, V, I>(&self, attrs: I) -> Self
    where
        K: Into<String>,
        V: Into<AttrValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut bound = (*self.bound).clone();
        bound.extend(
            attrs
                .into_iter()
                .map(|(k, v)| (self.qualify(&k.into()), v.into())),
        );
        Self {
            bound: Arc::new(bound),
            ..self.clone()
        }
    }

    /// A sub-encoder whose subsequent attribute keys are prefixed `name.`.
    pub fn with_group(&self, name: &str) -> Self {
        if name.is_empty() {
            return self.clone();
        }
        Self {
            group: Some(self.qualify(name)),
            ..self.clone()
        }
    }

    fn qualify(&self, key: &str) -> String {
        match &self.group {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.to_string(),
        }
    }

    /// Build the output record for an event.
    pub fn encode(&self, event: &LogEvent) -> OutputRecord {
        let mut record = OutputRecord::default();

        record.insert(
            "@timestamp",
            Value::String(event.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)),
        );
        record.insert("ecs.version", Value::String(self.identity.schema_version.clone()));
        record.insert("message", Value::String(event.message.clone()));
        record.insert("log.level", Value::String(event.level.as_str().to_string()));

        record.insert("service.name", Value::String(self.identity.name.clone()));
        record.insert("service.version", Value::String(self.identity.version.clone()));

        for (key, value) in self.bound.iter() {
            record.insert(map_key(key), value.to_json());
        }
        for (key, value) in &event.attributes {
            let key = self.qualify(key);
            record.insert(map_key(&key), value.to_json());
        }

        record
    }

    /// Serialize a record and write it to the sink as one line.
    pub fn write(&self, record: &OutputRecord) -> Result<(), EncodeError> {
        let line = record.to_line()?;
        self.sink.write_line(&line)
    }

    /// Encode and write in one step.
    pub fn log(&self, event: &LogEvent) -> Result<(), EncodeError> {
        self.write(&self.encode(event))
    }
}
