//! Trace context of the current span and W3C propagation over HTTP headers.
//!
//! The current span is whatever `tracing` span is entered on this task. Its
//! OpenTelemetry context only carries real ids when the OpenTelemetry layer
//! is installed, so outside exporting environments the accessors here return
//! `None` and propagation writes nothing.
//!
//! See: https://www.w3.org/TR/trace-context/

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector};
use opentelemetry::trace::{SpanContext, TraceContextExt};
use opentelemetry::{Context, global};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Header name for W3C traceparent
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Header name for W3C tracestate
pub const TRACESTATE_HEADER: &str = "tracestate";

fn span_context(span: &Span) -> Option<SpanContext> {
    let context = span.context();
    let span_context = context.span().span_context().clone();
    span_context.is_valid().then_some(span_context)
}

/// Trace id of the current span as 32 lowercase hex characters.
///
/// Returns `None` when no span is active or spans are not being traced.
pub fn current_trace_id() -> Option<String> {
    trace_id_of(&Span::current())
}

/// Span id of the current span as 16 lowercase hex characters.
pub fn current_span_id() -> Option<String> {
    span_id_of(&Span::current())
}

pub(crate) fn trace_id_of(span: &Span) -> Option<String> {
    span_context(span).map(|cx| cx.trace_id().to_string())
}

pub(crate) fn span_id_of(span: &Span) -> Option<String> {
    span_context(span).map(|cx| cx.span_id().to_string())
}

/// Inject the current span's context into outgoing HTTP headers using the
/// globally configured propagator.
///
/// # Example
///
/// ```ignore
/// let mut headers = http::HeaderMap::new();
/// inject_trace_context(&mut headers);
/// ```
pub fn inject_trace_context(headers: &mut HeaderMap) {
    let context = Span::current().context();
    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&context, &mut HeaderInjector(headers))
    });
}

/// Extract the remote parent context from incoming HTTP headers.
pub fn extract_trace_context(headers: &HeaderMap) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}

/// Extract the raw traceparent header value if present.
pub fn extract_traceparent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TRACEPARENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|key| key.as_str()).collect()
    }
}

struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}
