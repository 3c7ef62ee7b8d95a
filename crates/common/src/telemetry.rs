use crate::Environment;
use crate::logging::{install_subscriber, setup_logging};
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    propagation::TraceContextPropagator,
    trace::{Sampler, SdkTracerProvider},
};
use std::time::Duration;
use tokio::runtime::Runtime;

/// Initializes tracing and metrics providers on creation and shuts them down
/// gracefully when dropped.
///
/// # Example
/// ```ignore
/// let _telemetry = TelemetryGuard::init("producer", "http://localhost:4317", Environment::Production)?;
/// // Telemetry is flushed when the guard is dropped
/// ```
pub struct TelemetryGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl TelemetryGuard {
    /// Initialize OpenTelemetry with OTLP export and install the tracing
    /// subscriber bridging `tracing` spans to it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn init(
        service_name: &str,
        endpoint: &str,
        environment: Environment,
    ) -> anyhow::Result<Self> {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let resource = Resource::builder()
            .with_attributes([
                KeyValue::new(
                    opentelemetry_semantic_conventions::attribute::SERVICE_NAME,
                    service_name.to_string(),
                ),
                KeyValue::new(
                    opentelemetry_semantic_conventions::attribute::SERVICE_VERSION,
                    env!("CARGO_PKG_VERSION"),
                ),
            ])
            .build();

        let span_exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?;

        let tracer_provider = SdkTracerProvider::builder()
            .with_resource(resource.clone())
            .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
            .with_batch_exporter(span_exporter)
            .build();

        global::set_tracer_provider(tracer_provider.clone());

        let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?;

        let reader = PeriodicReader::builder(metric_exporter)
            .with_interval(Duration::from_secs(10))
            .build();

        let meter_provider = SdkMeterProvider::builder()
            .with_resource(resource)
            .with_reader(reader)
            .build();

        global::set_meter_provider(meter_provider.clone());

        let otel_layer =
            tracing_opentelemetry::layer().with_tracer(global::tracer(service_name.to_string()));
        install_subscriber(environment, otel_layer);

        Ok(Self {
            tracer_provider,
            meter_provider,
        })
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            eprintln!("Failed to shutdown tracer provider: {:?}", e);
        }
        if let Err(e) = self.meter_provider.shutdown() {
            eprintln!("Failed to shutdown meter provider: {:?}", e);
        }
    }
}

/// Logging plus optional OTLP export for a synchronous binary.
///
/// The exporters run on a Tokio runtime owned here, so keep this value
/// alive for as long as the process should report.
pub struct Observability {
    telemetry: Option<TelemetryGuard>,
    runtime: Option<Runtime>,
}

impl Observability {
    /// With an endpoint, start a runtime and export traces and metrics to it;
    /// otherwise only install the log subscriber.
    pub fn init(
        service_name: &str,
        environment: Environment,
        otel_endpoint: Option<&str>,
    ) -> anyhow::Result<Self> {
        let Some(endpoint) = otel_endpoint else {
            setup_logging(environment);
            return Ok(Self {
                telemetry: None,
                runtime: None,
            });
        };

        let runtime = Runtime::new()?;
        let guard =
            runtime.block_on(async { TelemetryGuard::init(service_name, endpoint, environment) })?;
        tracing::info!(endpoint, "OpenTelemetry export enabled");

        Ok(Self {
            telemetry: Some(guard),
            runtime: Some(runtime),
        })
    }
}

impl Drop for Observability {
    fn drop(&mut self) {
        // Exporters flush through the runtime's reactor
        if let Some(runtime) = &self.runtime {
            let _enter = runtime.enter();
            drop(self.telemetry.take());
        }
    }
}

/// Creates a debug-level span and enters it.
#[macro_export]
macro_rules! span_debug {
    ($name:literal) => {
        tracing::debug_span!($name).entered()
    };
}
