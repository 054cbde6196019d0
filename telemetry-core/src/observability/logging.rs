use crate::config::{LogFormat, LoggingSettings, TelemetrySettings};
use crate::error::AppError;
use crate::observability::context;
use crate::observability::spans::INSTRUMENTATION_SCOPE;
use opentelemetry::trace::{TraceError, TracerProvider as _};
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::export::trace::SpanExporter;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::{Resource, trace as sdktrace};
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the span pipeline alive. Dropping it shuts the global tracer
/// provider down, flushing anything still in flight.
#[must_use = "dropping the guard shuts span export down"]
pub struct TelemetryGuard {
    exporting: bool,
}

impl TelemetryGuard {
    pub fn is_exporting(&self) -> bool {
        self.exporting
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self.exporting {
            global::shutdown_tracer_provider();
        }
    }
}

/// Resource attached to every exported span.
pub fn service_resource(settings: &TelemetrySettings) -> Resource {
    Resource::new(vec![
        KeyValue::new("service.name", settings.service_name.clone()),
        KeyValue::new("service.environment", settings.environment.to_string()),
    ])
}

/// Provider that exports each span synchronously as it ends.
///
/// Batching is not used: the hosting platform may stop the process between
/// requests, taking any queued spans with it.
pub fn simple_tracer_provider<E>(exporter: E, resource: Resource) -> sdktrace::TracerProvider
where
    E: SpanExporter + 'static,
{
    sdktrace::TracerProvider::builder()
        .with_simple_exporter(exporter)
        .with_config(sdktrace::config().with_resource(resource))
        .build()
}

/// Builds the span pipeline for `settings`, or `None` when its environment
/// is not in the export allow-list. In that case `make_exporter` is never
/// called.
pub fn build_tracer_provider<E, F>(
    settings: &TelemetrySettings,
    make_exporter: F,
) -> Result<Option<sdktrace::TracerProvider>, TraceError>
where
    E: SpanExporter + 'static,
    F: FnOnce() -> Result<E, TraceError>,
{
    if !settings.exports_spans() {
        return Ok(None);
    }

    let exporter = make_exporter()?;
    Ok(Some(simple_tracer_provider(
        exporter,
        service_resource(settings),
    )))
}

/// Layer turning `tracing` spans into OpenTelemetry spans of `provider`.
pub fn otel_layer<S>(provider: &sdktrace::TracerProvider) -> OpenTelemetryLayer<S, sdktrace::Tracer>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    tracing_opentelemetry::layer().with_tracer(provider.tracer(INSTRUMENTATION_SCOPE))
}

fn fmt_layer<S>(logging: &LoggingSettings) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_file(logging.with_file)
        .with_line_number(logging.with_line_number);

    match logging.format {
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
    }
}

fn otlp_exporter(endpoint: &str) -> Result<opentelemetry_otlp::SpanExporter, TraceError> {
    opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .build_span_exporter()
}

/// Installs the global subscriber and, in exporting environments, the
/// OpenTelemetry span pipeline.
///
/// Also records `settings.environment` as the process default ambient
/// environment.
pub fn init_telemetry(
    settings: &TelemetrySettings,
    logging: &LoggingSettings,
) -> Result<TelemetryGuard, AppError> {
    // A second init keeps the first environment.
    let _ = context::set_process_environment(settings.environment.clone());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let provider = build_tracer_provider(settings, || otlp_exporter(&settings.otlp_endpoint))?;
    let exporting = provider.is_some();

    let telemetry = provider.map(|provider| {
        global::set_text_map_propagator(TraceContextPropagator::new());
        let layer = otel_layer(&provider);
        global::set_tracer_provider(provider);
        layer
    });

    tracing_subscriber::registry()
        .with(fmt_layer(logging))
        .with(telemetry)
        .with(env_filter)
        .try_init()?;

    tracing::info!(
        service.name = %settings.service_name,
        service.environment = %settings.environment,
        otel.enabled = exporting,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { exporting })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::testing::RecordingExporter;
    use std::cell::Cell;

    fn settings(environment: Environment) -> TelemetrySettings {
        TelemetrySettings {
            service_name: "test-service".to_string(),
            environment,
            otlp_endpoint: "http://localhost:4317".to_string(),
            export_environments: vec![Environment::Staging, Environment::Production],
        }
    }

    #[test]
    fn test_development_never_builds_an_exporter() {
        let called = Cell::new(false);
        let provider = build_tracer_provider(&settings(Environment::Development), || {
            called.set(true);
            Ok(RecordingExporter::new())
        })
        .unwrap();

        assert!(provider.is_none());
        assert!(!called.get());
    }

    #[test]
    fn test_allow_listed_environment_builds_pipeline() {
        let called = Cell::new(false);
        let provider = build_tracer_provider(&settings(Environment::Staging), || {
            called.set(true);
            Ok(RecordingExporter::new())
        })
        .unwrap();

        assert!(provider.is_some());
        assert!(called.get());
    }

    #[test]
    fn test_exporter_failure_is_reported() {
        let result = build_tracer_provider::<RecordingExporter, _>(
            &settings(Environment::Production),
            || Err(TraceError::from("exporter unavailable")),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_resource_carries_service_and_environment() {
        let resource = service_resource(&settings(Environment::Production));
        assert_eq!(
            resource
                .get("service.name".into())
                .map(|value| value.to_string()),
            Some("test-service".to_string())
        );
        assert_eq!(
            resource
                .get("service.environment".into())
                .map(|value| value.to_string()),
            Some("production".to_string())
        );
    }
}
