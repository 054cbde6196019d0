use crate::config::Environment;
use crate::observability::context;
use crate::observability::trace_context::{extract_trace_context, extract_traceparent};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Makes `environment` the ambient environment for the rest of the request.
pub async fn environment_middleware(
    State(environment): State<Environment>,
    req: Request,
    next: Next,
) -> Response {
    context::scope(environment, next.run(req)).await
}

/// Request span for `TraceLayer::make_span_with`.
///
/// When the caller sent a W3C `traceparent`, the span continues that trace.
pub fn make_request_span<B>(request: &http::Request<B>) -> Span {
    let span = tracing::info_span!(
        "http_request",
        otel.name = %format!("{} {}", request.method(), request.uri().path()),
        otel.kind = "server",
        method = %request.method(),
        uri = %request.uri(),
        version = ?request.version(),
    );

    if let Some(traceparent) = extract_traceparent(request.headers()) {
        tracing::debug!(traceparent = %traceparent, "Received trace context");
    }
    span.set_parent(extract_trace_context(request.headers()));

    span
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, middleware::from_fn_with_state, routing::get};
    use tower::util::ServiceExt;

    async fn report_environment() -> String {
        context::current_environment()
            .map(|environment| environment.to_string())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_environment_is_scoped_to_request() {
        let app = Router::new()
            .route("/", get(report_environment))
            .layer(from_fn_with_state(
                Environment::Production,
                environment_middleware,
            ));

        let response = app
            .oneshot(
                http::Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        assert_eq!(&body[..], b"production");
        assert_eq!(report_environment().await, "");
    }
}
