use crate::app_env;
use anyhow::Context;
use axum::Router;
use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use opentelemetry::trace::TracerProvider;
use opentelemetry::{KeyValue, global};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::Tracer;
use opentelemetry_sdk::{Resource, runtime};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing::{Span, debug, info_span, field};
use tracing_opentelemetry::{MetricsLayer, OpenTelemetryLayer, OpenTelemetrySpanExt};
use tracing_subscriber::{EnvFilter, prelude::*, registry};

const SERVICE_NAME: &str = "task-tracker";

pub struct OtelExporters {
    pub tracer: Tracer,
    pub meter: SdkMeterProvider,
}

/// Wraps every request in a span named after its route template, continuing any trace
/// started by the caller.
pub fn attach_tracing_http<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            // Route templates keep task IDs out of span names
            let route = request
                .extensions()
                .get::<MatchedPath>()
                .map(MatchedPath::as_str)
                .unwrap_or_else(|| request.uri().path());

            let req_span = info_span!(
                "request",
                method = request.method().as_str(),
                route,
                response_status = field::Empty,
                latency_ms = field::Empty,
            );
            req_span.set_parent(global::get_text_map_propagator(|propagator| {
                propagator.extract(&HeaderExtractor(request.headers()))
            }));

            req_span
        })
        .on_response(|response: &Response<Body>, latency: Duration, span: &Span| {
            span.record("response_status", field::display(response.status()));
            span.record("latency_ms", latency.as_millis() as u64);
            debug!("finished handling request");
        });

    router.layer(trace_layer)
}

/// Builds OTLP exporters which ship spans and metrics over gRPC in the background
pub fn init_exporters(
    otlp_traces_endpoint: &str,
    otlp_metrics_endpoint: &str,
) -> Result<OtelExporters, anyhow::Error> {
    let resource = Resource::new([KeyValue::new("service.name", SERVICE_NAME)]);

    let span_export = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_traces_endpoint)
        .build()
        .context("building the span exporter")?;
    let meter_export = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_metrics_endpoint)
        .build()
        .context("building the metric exporter")?;

    let tracer = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(span_export, runtime::Tokio)
        .with_resource(resource.clone())
        .build()
        .tracer(SERVICE_NAME);
    let meter = SdkMeterProvider::builder()
        .with_reader(PeriodicReader::builder(meter_export, runtime::Tokio).build())
        .with_resource(resource)
        .build();

    Ok(OtelExporters { tracer, meter })
}

/// Per-module log filter read from [app_env::LOG_LEVEL], "info" when unset
pub fn init_env_filter() -> Result<EnvFilter, anyhow::Error> {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(app_env::LOG_LEVEL)
        .from_env()
        .context("parsing the log filter")
}

/// Installs the global subscriber. Stdout gets JSON lines filtered by `env_filter`; when
/// exporters are present, everything at debug and above also goes to OpenTelemetry.
pub fn setup_logging_and_tracing(env_filter: EnvFilter, otel_exporters: Option<OtelExporters>) {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_filter(env_filter);
    let otel_layers = otel_exporters.map(|exporters| {
        OpenTelemetryLayer::new(exporters.tracer).and_then(MetricsLayer::new(exporters.meter))
    });

    registry()
        .with(LevelFilter::DEBUG)
        .with(stdout_layer)
        .with(otel_layers)
        .init();
}
