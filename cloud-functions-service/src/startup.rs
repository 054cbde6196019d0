use axum::{body::Body, http::Request, middleware::from_fn_with_state, routing::get, Router};
use telemetry_core::middleware::tracing::{environment_middleware, make_request_span};
use telemetry_core::Environment;
use tower_http::trace::TraceLayer;

use crate::handlers::{function::main_route, health::health_check};

pub fn build_router(environment: Environment) -> Router {
    Router::new()
        .route("/", get(main_route))
        .route("/health", get(health_check))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| make_request_span(request)),
        )
        // Outermost, so the request span and everything below see the environment
        .layer(from_fn_with_state(environment, environment_middleware))
}
