//! Span tracking for application functions.
//!
//! Spans are `tracing` spans. Entering one makes it the current span for the
//! calling task until it is dropped; its parent is whatever span was current
//! when it was opened. When the OpenTelemetry layer is installed each span is
//! exported as it closes, otherwise spans stay local.
//!
//! Usage pattern:
//! ```rust,ignore
//! let tracer = get_tracer();
//! let _span = tracer.start_span("Do something");
//! // work recorded inside the span
//! ```
//!
//! Whole functions are wrapped with [`wrap_with_span`], [`traced`] or
//! [`wrap_async_with_span`].

use crate::observability::trace_context;
use once_cell::sync::OnceCell;
use std::any::type_name;
use std::borrow::Cow;
use std::fmt::Display;
use std::future::Future;
use tracing::Span;
use tracing::instrument::{Instrument, Instrumented};
use tracing::span::EnteredSpan;

/// Instrumentation scope reported for spans created through [`Tracer`].
pub const INSTRUMENTATION_SCOPE: &str = "telemetry_core";

fn new_span(name: &str) -> Span {
    tracing::info_span!(
        target: "telemetry_core::spans",
        "trace_span",
        otel.name = name,
        otel.status_code = tracing::field::Empty,
        otel.status_message = tracing::field::Empty,
    )
}

/// An entered span. Dropping it closes the span and restores the span that
/// was current before it was opened, including while unwinding.
#[must_use = "the span closes as soon as the handle is dropped"]
pub struct SpanHandle {
    name: Cow<'static, str>,
    parent: Span,
    entered: EnteredSpan,
}

impl SpanHandle {
    fn open(name: Cow<'static, str>) -> Self {
        let parent = Span::current();
        let entered = new_span(&name).entered();
        Self {
            name,
            parent,
            entered,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 32-character hex trace id, `None` when spans are not traced.
    pub fn trace_id(&self) -> Option<String> {
        trace_context::trace_id_of(&self.entered)
    }

    /// 16-character hex span id, `None` when spans are not traced.
    pub fn span_id(&self) -> Option<String> {
        trace_context::span_id_of(&self.entered)
    }

    /// Span id of the span that was current when this one opened, `None`
    /// for a root span.
    pub fn parent_span_id(&self) -> Option<String> {
        trace_context::span_id_of(&self.parent)
    }

    /// Marks the span as failed with `error` as its status message.
    pub fn record_error(&self, error: &dyn Display) {
        self.entered.record("otel.status_code", "ERROR");
        self.entered
            .record("otel.status_message", error.to_string().as_str());
    }

    /// Closes the span now.
    pub fn end(self) {}
}

/// Factory for spans. Obtain the process-wide instance with [`get_tracer`].
#[derive(Debug)]
pub struct Tracer {
    scope: &'static str,
}

impl Tracer {
    pub fn new(scope: &'static str) -> Self {
        tracing::debug!(scope, "Tracer constructed");
        Self { scope }
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }

    /// Opens a child of the current span and makes it current.
    pub fn start_span(&self, name: impl Into<Cow<'static, str>>) -> SpanHandle {
        SpanHandle::open(name.into())
    }

    /// Runs `f` inside a new span.
    pub fn in_span<F, R>(&self, name: impl Into<Cow<'static, str>>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _span = self.start_span(name);
        f()
    }

    /// Runs `f` inside a new span and marks the span failed if `f` errors.
    pub fn try_in_span<F, T, E>(&self, name: impl Into<Cow<'static, str>>, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Display,
    {
        let span = self.start_span(name);
        let result = f();
        if let Err(err) = &result {
            span.record_error(err);
        }
        result
    }

    /// Attaches `future` to a new span that is current only while the future
    /// is being polled.
    pub fn in_span_async<F>(&self, name: impl Into<Cow<'static, str>>, future: F) -> Instrumented<F>
    where
        F: Future,
    {
        let name = name.into();
        future.instrument(new_span(&name))
    }
}

/// Lazily constructed tracer shared by every caller.
///
/// Construction runs at most once even under concurrent first access.
pub(crate) struct TracerCell {
    cell: OnceCell<Tracer>,
}

impl TracerCell {
    pub(crate) const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub(crate) fn get_or_init<F>(&self, init: F) -> &Tracer
    where
        F: FnOnce() -> Tracer,
    {
        self.cell.get_or_init(init)
    }
}

static TRACER: TracerCell = TracerCell::new();

/// The process-wide tracer, built on first use and reused afterwards.
pub fn get_tracer() -> &'static Tracer {
    TRACER.get_or_init(|| Tracer::new(INSTRUMENTATION_SCOPE))
}

/// Wraps `f` so every call runs inside a span named `name`.
///
/// The span is a child of whatever span is current at call time and closes
/// before the result (or a panic) reaches the caller.
pub fn wrap_with_span<A, R, F>(name: impl Into<Cow<'static, str>>, f: F) -> impl Fn(A) -> R
where
    F: Fn(A) -> R,
{
    let name = name.into();
    move |args| {
        let _span = SpanHandle::open(name.clone());
        f(args)
    }
}

/// [`wrap_with_span`] named after the wrapped function's path.
pub fn traced<A, R, F>(f: F) -> impl Fn(A) -> R
where
    F: Fn(A) -> R,
{
    wrap_with_span(type_name::<F>(), f)
}

/// Async counterpart of [`wrap_with_span`].
pub fn wrap_async_with_span<A, Fut, F>(
    name: impl Into<Cow<'static, str>>,
    f: F,
) -> impl Fn(A) -> Instrumented<Fut>
where
    F: Fn(A) -> Fut,
    Fut: Future,
{
    let name = name.into();
    move |args| f(args).instrument(new_span(&name))
}
