//! Test support: an in-memory span exporter and a subscriber wired to it.

use crate::observability::logging::{otel_layer, simple_tracer_provider};
use futures::future::BoxFuture;
use opentelemetry::KeyValue;
use opentelemetry::trace::TraceError;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use opentelemetry_sdk::trace::TracerProvider;
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;

/// Collects finished spans in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
    fail: bool,
}

impl RecordingExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records spans like [`RecordingExporter::new`] but reports every
    /// export as failed, the way an unreachable collector does.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn finished_spans(&self) -> Vec<SpanData> {
        self.spans
            .lock()
            .map(|spans| spans.clone())
            .unwrap_or_default()
    }

    /// The finished span called `name`, if exactly one exists.
    pub fn span_named(&self, name: &str) -> Option<SpanData> {
        let mut matching = self
            .finished_spans()
            .into_iter()
            .filter(|span| span.name == name);
        let span = matching.next()?;
        matching.next().is_none().then_some(span)
    }
}

impl SpanExporter for RecordingExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        if let Ok(mut spans) = self.spans.lock() {
            spans.extend(batch);
        }
        let result = if self.fail {
            Err(TraceError::from("collector unavailable"))
        } else {
            Ok(())
        };
        Box::pin(std::future::ready(result))
    }
}

/// A subscriber that exports every span into a [`RecordingExporter`].
///
/// Keep the returned provider alive for as long as spans are created.
pub fn recording_subscriber() -> (
    impl tracing::Subscriber + Send + Sync,
    RecordingExporter,
    TracerProvider,
) {
    subscriber_for(RecordingExporter::new())
}

/// Like [`recording_subscriber`], with every export reported as failed.
pub fn failing_subscriber() -> (
    impl tracing::Subscriber + Send + Sync,
    RecordingExporter,
    TracerProvider,
) {
    subscriber_for(RecordingExporter::failing())
}

fn subscriber_for(
    exporter: RecordingExporter,
) -> (
    impl tracing::Subscriber + Send + Sync,
    RecordingExporter,
    TracerProvider,
) {
    let provider = simple_tracer_provider(
        exporter.clone(),
        Resource::new(vec![KeyValue::new("service.name", "test")]),
    );
    let subscriber = tracing_subscriber::registry().with(otel_layer(&provider));
    (subscriber, exporter, provider)
}
