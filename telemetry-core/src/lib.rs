//! telemetry-core: environment-aware structured logging and span tracking
//! shared by the cloud services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod shutdown;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use crate::config::Environment;
pub use error::{AppError, SerializationError};
pub use observability::emitter::{logger, EventEmitter, Opaque, Severity};
pub use observability::spans::{get_tracer, traced, wrap_async_with_span, wrap_with_span, Tracer};
pub use observability::trace_context::current_trace_id;

pub use axum;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
