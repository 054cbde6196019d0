use axum::{http::HeaderMap, Json};
use serde_json::{json, Value};
use telemetry_core::{get_tracer, logger, wrap_with_span, AppError};

/// Route for `/`. The whole function body runs inside the `handler` span.
pub async fn main_route(headers: HeaderMap) -> Result<Json<Value>, AppError> {
    wrap_with_span("handler", handler)(&headers)
}

/// Entry point of the function.
fn handler(_headers: &HeaderMap) -> Result<Json<Value>, AppError> {
    logger().info_with("Start main", &json!({ "key": "value" }))?;

    let tracer = get_tracer();
    {
        let _first = tracer.start_span("first");
        logger().info("in first");

        let _second = tracer.start_span("second");
        logger().info("in second");
    }

    tracer.in_span("third", || logger().info("in third"));

    Ok(Json(json!({ "message": "Hello World!!" })))
}
