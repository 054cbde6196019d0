use crate::domain::Strategy;
use axum::{
    http::{header::USER_AGENT, HeaderMap},
    Json,
};
use serde_json::{json, Value};
use telemetry_core::{get_tracer, logger, AppError};

pub async fn get_root(headers: HeaderMap) -> Result<Json<Value>, AppError> {
    get_tracer()
        .in_span_async("get_root", async move {
            let user_agent = headers
                .get(USER_AGENT)
                .and_then(|value| value.to_str().ok());
            logger().info_with("Start get_root", &json!({ "http-headers": user_agent }))?;

            let result = Strategy.run();
            Ok::<_, AppError>(Json(json!({ "strategy-result": result })))
        })
        .await
}
