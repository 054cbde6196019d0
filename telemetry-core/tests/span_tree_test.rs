use opentelemetry::trace::SpanId;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::panic::AssertUnwindSafe;
use telemetry_core::Environment;
use telemetry_core::middleware::tracing::make_request_span;
use telemetry_core::observability::{context, current_span_id, inject_trace_context};
use telemetry_core::testing::{failing_subscriber, recording_subscriber};
use telemetry_core::{current_trace_id, get_tracer, wrap_async_with_span, wrap_with_span};

fn is_lower_hex(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

#[test]
fn nested_wrapped_functions_form_a_chain() {
    let (subscriber, exporter, provider) = recording_subscriber();

    tracing::subscriber::with_default(subscriber, || {
        let c = wrap_with_span("C", |value: u32| value + 1);
        let b = wrap_with_span("B", |value: u32| c(value) * 2);
        let a = wrap_with_span("A", |value: u32| b(value) + 3);
        assert_eq!(a(1), 7);
    });
    let _ = provider.force_flush();

    let a = exporter.span_named("A").expect("A exported once");
    let b = exporter.span_named("B").expect("B exported once");
    let c = exporter.span_named("C").expect("C exported once");

    assert_eq!(a.parent_span_id, SpanId::INVALID);
    assert_eq!(b.parent_span_id, a.span_context.span_id());
    assert_eq!(c.parent_span_id, b.span_context.span_id());

    let children_of = |id: SpanId| {
        exporter
            .finished_spans()
            .iter()
            .filter(|span| span.parent_span_id == id)
            .count()
    };
    assert_eq!(children_of(a.span_context.span_id()), 1);
    assert_eq!(children_of(b.span_context.span_id()), 1);
    assert_eq!(children_of(c.span_context.span_id()), 0);

    let trace_id = a.span_context.trace_id();
    assert_eq!(b.span_context.trace_id(), trace_id);
    assert_eq!(c.span_context.trace_id(), trace_id);
}

#[test]
fn panicking_child_closes_before_parent_resumes() {
    let (subscriber, exporter, provider) = recording_subscriber();

    tracing::subscriber::with_default(subscriber, || {
        get_tracer().in_span("A", || {
            let parent = tracing::Span::current().id();
            let b = wrap_with_span("B", |_: ()| -> u32 { panic!("boom") });

            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| b(())));
            assert!(outcome.is_err());

            let _ = provider.force_flush();
            assert!(exporter.span_named("B").is_some());
            assert!(exporter.span_named("A").is_none());
            assert_eq!(tracing::Span::current().id(), parent);
        });
    });
    let _ = provider.force_flush();

    let a = exporter.span_named("A").expect("A exported once");
    let b = exporter.span_named("B").expect("B exported once");
    assert_eq!(b.parent_span_id, a.span_context.span_id());
}

#[test]
fn trace_id_is_32_lower_hex_inside_a_span() {
    let (subscriber, exporter, provider) = recording_subscriber();

    let (trace_id, span_id) = tracing::subscriber::with_default(subscriber, || {
        assert_eq!(current_trace_id(), None);

        let handle = get_tracer().start_span("root");
        let trace_id = current_trace_id().expect("trace id inside span");
        assert_eq!(handle.trace_id().as_deref(), Some(trace_id.as_str()));
        assert_eq!(handle.name(), "root");

        let nested = get_tracer().in_span("child", current_trace_id);
        assert_eq!(nested.as_deref(), Some(trace_id.as_str()));

        let span_id = current_span_id().expect("span id inside span");
        handle.end();
        assert_eq!(current_trace_id(), None);
        (trace_id, span_id)
    });
    let _ = provider.force_flush();

    assert_eq!(trace_id.len(), 32);
    assert!(is_lower_hex(&trace_id));
    assert_eq!(span_id.len(), 16);

    let root = exporter.span_named("root").expect("root exported once");
    assert_eq!(root.span_context.trace_id().to_string(), trace_id);
    assert_eq!(root.span_context.span_id().to_string(), span_id);
}

#[test]
fn handle_reports_the_span_it_was_opened_under() {
    let (subscriber, exporter, provider) = recording_subscriber();

    let (outer_id, inner_parent) = tracing::subscriber::with_default(subscriber, || {
        let outer = get_tracer().start_span("outer");
        assert_eq!(outer.parent_span_id(), None);

        let inner = get_tracer().start_span("inner");
        let ids = (outer.span_id(), inner.parent_span_id());
        inner.end();
        outer.end();
        ids
    });
    let _ = provider.force_flush();

    let outer = exporter.span_named("outer").expect("outer exported once");
    let inner = exporter.span_named("inner").expect("inner exported once");
    assert!(outer_id.is_some());
    assert_eq!(inner_parent, outer_id);
    assert_eq!(inner_parent, Some(inner.parent_span_id.to_string()));
    assert_eq!(inner.parent_span_id, outer.span_context.span_id());
}

#[test]
fn export_failures_leave_results_and_nesting_intact() {
    let (subscriber, exporter, provider) = failing_subscriber();

    tracing::subscriber::with_default(subscriber, || {
        let first = wrap_with_span("first", |value: u32| value * 3);
        assert_eq!(first(5), 15);

        let inner = wrap_with_span("inner", |value: u32| value + 1);
        let outer = wrap_with_span("outer", |value: u32| inner(value));
        assert_eq!(outer(1), 2);
    });
    let _ = provider.force_flush();

    let first = exporter.span_named("first").expect("first handed to exporter");
    let outer = exporter.span_named("outer").expect("outer handed to exporter");
    let inner = exporter.span_named("inner").expect("inner handed to exporter");
    assert_eq!(first.parent_span_id, SpanId::INVALID);
    assert_eq!(outer.parent_span_id, SpanId::INVALID);
    assert_eq!(inner.parent_span_id, outer.span_context.span_id());
    assert_ne!(outer.span_context.trace_id(), first.span_context.trace_id());
}

#[test]
fn failed_result_marks_span_status() {
    let (subscriber, exporter, provider) = recording_subscriber();

    tracing::subscriber::with_default(subscriber, || {
        let result: Result<(), String> =
            get_tracer().try_in_span("fallible", || Err("upstream refused".to_string()));
        assert!(result.is_err());
    });
    let _ = provider.force_flush();

    let span = exporter.span_named("fallible").expect("span exported once");
    assert!(matches!(span.status, opentelemetry::trace::Status::Error { .. }));
}

#[test]
fn incoming_traceparent_is_continued_and_propagated() {
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
    let (subscriber, _exporter, _provider) = recording_subscriber();

    tracing::subscriber::with_default(subscriber, || {
        let request = http::Request::builder()
            .uri("/")
            .header(
                "traceparent",
                "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01",
            )
            .body(())
            .unwrap();

        let span = make_request_span(&request);
        let _entered = span.enter();
        assert_eq!(
            current_trace_id().as_deref(),
            Some("0af7651916cd43dd8448eb211c80319c")
        );

        let mut headers = http::HeaderMap::new();
        inject_trace_context(&mut headers);
        let traceparent = headers
            .get("traceparent")
            .and_then(|value| value.to_str().ok())
            .expect("traceparent injected");
        assert!(traceparent.starts_with("00-0af7651916cd43dd8448eb211c80319c-"));
        assert!(!traceparent.contains("b7ad6b7169203331"));
    });
}

#[tokio::test]
async fn concurrent_tasks_keep_their_own_span_and_environment() {
    let (subscriber, exporter, provider) = recording_subscriber();
    let _guard = tracing::subscriber::set_default(subscriber);

    let handle = wrap_async_with_span("request", |_: ()| async move {
        let before = current_trace_id();
        tokio::task::yield_now().await;
        (before, current_trace_id(), context::current_environment())
    });

    let first = tokio::spawn(context::scope(
        Environment::Production,
        handle(()),
    ));
    let second = tokio::spawn(context::scope(
        Environment::Staging,
        handle(()),
    ));

    let (first_before, first_after, first_env) = first.await.unwrap();
    let (second_before, second_after, second_env) = second.await.unwrap();

    assert!(first_before.is_some());
    assert_eq!(first_before, first_after);
    assert_eq!(second_before, second_after);
    assert_ne!(first_before, second_before);
    assert_eq!(first_env, Some(Environment::Production));
    assert_eq!(second_env, Some(Environment::Staging));

    let _ = provider.force_flush();
    let roots = exporter
        .finished_spans()
        .into_iter()
        .filter(|span| span.name == "request" && span.parent_span_id == SpanId::INVALID)
        .count();
    assert_eq!(roots, 2);
}
