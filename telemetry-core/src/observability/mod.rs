pub mod context;
pub mod emitter;
pub mod logging;
pub mod spans;
pub mod trace_context;

pub use logging::{TelemetryGuard, init_telemetry};
pub use trace_context::{
    TRACEPARENT_HEADER, TRACESTATE_HEADER, current_span_id, current_trace_id,
    extract_trace_context, extract_traceparent, inject_trace_context,
};
