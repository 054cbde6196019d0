use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// A log payload contained a value with no JSON-safe representation.
///
/// Carries the first error the encoder hit.
#[derive(Debug, Error)]
#[error("JSON Unserializable Object: {0}")]
pub struct SerializationError(#[from] pub serde_json::Error);

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("Tracing initialization error: {0}")]
    TracingInit(#[from] opentelemetry::trace::TraceError),

    #[error("Subscriber initialization error: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let (error_message, details) = match &self {
            AppError::Serialization(err) => ("Logging error".to_string(), Some(err.to_string())),
            AppError::ConfigError(err) => {
                ("Configuration error".to_string(), Some(err.to_string()))
            }
            AppError::TracingInit(err) => ("Tracing error".to_string(), Some(err.to_string())),
            AppError::SubscriberInit(err) => {
                ("Tracing error".to_string(), Some(err.to_string()))
            }
            AppError::InternalError(err) => (
                "Internal server error".to_string(),
                Some(format!("{:#?}", err)),
            ),
        };

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: error_message,
                details,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_error_maps_to_500() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = AppError::from(SerializationError(source));
        assert!(err.to_string().starts_with("JSON Unserializable Object"));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
