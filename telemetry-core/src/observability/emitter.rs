//! Structured log emitter.
//!
//! Every record carries the ambient environment and, when a span is active,
//! its trace and span ids. The `additional` payload is JSON-encoded before it
//! reaches the sink so the collector keeps the whole record as structured
//! data.
//!
//! A payload that cannot be encoded is an error outside production. In
//! production the emitter logs an ERROR note and then writes the record with
//! the payload's `Debug` rendering instead.
//!
//! ```ignore
//! use telemetry_core::logger;
//!
//! logger().info("logging message");
//! logger().info_with(
//!     "another logging message",
//!     &serde_json::json!({"key1": 1, "key2": {"company": "sample"}, "key3": [1, 2, 3]}),
//! )?;
//! ```

use crate::config::Environment;
use crate::error::SerializationError;
use crate::observability::{context, trace_context};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `additional` field of a record as handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Additional {
    /// JSON encoding of the payload.
    Json(String),
    /// `Debug` rendering of a payload that could not be encoded.
    Raw(String),
}

impl Additional {
    pub fn as_str(&self) -> &str {
        match self {
            Additional::Json(s) | Additional::Raw(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub level: Severity,
    pub message: String,
    pub environment: Option<Environment>,
    pub additional: Option<Additional>,
    pub timestamp: DateTime<Utc>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
}

/// Destination of finished records.
pub trait LogSink: Send + Sync {
    fn write(&self, record: LogRecord);
}

/// Wraps a value that has no JSON representation.
///
/// Encoding always fails with `Type <name> not serializable`, so the record
/// follows the emitter's fallback policy. `Debug` prints the type name, so
/// `T` does not need to implement it.
pub struct Opaque<T>(pub T);

impl<T> Serialize for Opaque<T> {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(S::Error::custom(format!(
            "Type {} not serializable",
            type_name::<T>()
        )))
    }
}

impl<T> fmt::Debug for Opaque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} object>", type_name::<T>())
    }
}

/// Encodes `value` as a JSON string.
///
/// Dates serialize as ISO-8601 strings through chrono, types with named
/// fields opt in with `#[derive(Serialize)]` and become maps.
pub fn to_json_safe<T>(value: &T) -> Result<String, SerializationError>
where
    T: Serialize + ?Sized,
{
    Ok(serde_json::to_string(value)?)
}

pub struct EventEmitter {
    sink: Arc<dyn LogSink>,
}

impl EventEmitter {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Builds and writes one record.
    ///
    /// Fails only when `additional` cannot be encoded and the ambient
    /// environment is not production.
    pub fn emit<T>(
        &self,
        level: Severity,
        message: impl Into<String>,
        additional: Option<&T>,
    ) -> Result<(), SerializationError>
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        let message = message.into();
        let Some(value) = additional else {
            self.dispatch(level, message, None);
            return Ok(());
        };

        match to_json_safe(value) {
            Ok(json) => {
                self.dispatch(level, message, Some(Additional::Json(json)));
                Ok(())
            }
            Err(err) => {
                let production = context::current_environment()
                    .is_some_and(|environment| environment.is_production());
                if !production {
                    return Err(err);
                }

                let raw = format!("{:?}", value);
                self.dispatch(
                    Severity::Error,
                    format!("JSON Unserializable Object: {}", raw),
                    None,
                );
                self.dispatch(level, message, Some(Additional::Raw(raw)));
                Ok(())
            }
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.dispatch(Severity::Debug, message.into(), None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.dispatch(Severity::Info, message.into(), None);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.dispatch(Severity::Warning, message.into(), None);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.dispatch(Severity::Error, message.into(), None);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.dispatch(Severity::Critical, message.into(), None);
    }

    pub fn debug_with<T>(
        &self,
        message: impl Into<String>,
        additional: &T,
    ) -> Result<(), SerializationError>
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        self.emit(Severity::Debug, message, Some(additional))
    }

    pub fn info_with<T>(
        &self,
        message: impl Into<String>,
        additional: &T,
    ) -> Result<(), SerializationError>
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        self.emit(Severity::Info, message, Some(additional))
    }

    pub fn warning_with<T>(
        &self,
        message: impl Into<String>,
        additional: &T,
    ) -> Result<(), SerializationError>
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        self.emit(Severity::Warning, message, Some(additional))
    }

    pub fn error_with<T>(
        &self,
        message: impl Into<String>,
        additional: &T,
    ) -> Result<(), SerializationError>
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        self.emit(Severity::Error, message, Some(additional))
    }

    pub fn critical_with<T>(
        &self,
        message: impl Into<String>,
        additional: &T,
    ) -> Result<(), SerializationError>
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        self.emit(Severity::Critical, message, Some(additional))
    }

    // Enrichment happens here so every record gets it regardless of call site.
    fn dispatch(&self, level: Severity, message: String, additional: Option<Additional>) {
        self.sink.write(LogRecord {
            level,
            message,
            environment: context::current_environment(),
            additional,
            timestamp: Utc::now(),
            trace_id: trace_context::current_trace_id(),
            span_id: trace_context::current_span_id(),
        });
    }
}

static MAIN_LOGGER: Lazy<EventEmitter> = Lazy::new(|| EventEmitter::new(Arc::new(TracingSink)));

/// Process-wide emitter writing to the installed `tracing` subscriber.
pub fn logger() -> &'static EventEmitter {
    &MAIN_LOGGER
}

/// Writes records as `tracing` events so the subscriber's formatter turns
/// them into JSON lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

macro_rules! record_event {
    ($level:expr, $record:expr) => {{
        let record = $record;
        tracing::event!(
            target: "telemetry_core::emitter",
            $level,
            severity = record.level.as_str(),
            environment = record.environment.as_ref().map(Environment::as_str).unwrap_or(""),
            trace_id = record.trace_id.as_deref().unwrap_or(""),
            span_id = record.span_id.as_deref().unwrap_or(""),
            additional = record.additional.as_ref().map(Additional::as_str),
            "{}",
            record.message
        )
    }};
}

impl LogSink for TracingSink {
    fn write(&self, record: LogRecord) {
        match record.level {
            Severity::Debug => record_event!(tracing::Level::DEBUG, &record),
            Severity::Info => record_event!(tracing::Level::INFO, &record),
            Severity::Warning => record_event!(tracing::Level::WARN, &record),
            // tracing has no level above ERROR; `severity` keeps CRITICAL apart.
            Severity::Error | Severity::Critical => record_event!(tracing::Level::ERROR, &record),
        }
    }
}

/// Keeps records in memory. Used by tests and local tooling.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn write(&self, record: LogRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}
