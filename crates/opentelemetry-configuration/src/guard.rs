//! OpenTelemetry provider lifecycle management.
//!
//! The [`OtelGuard`] owns the tracer, meter and logger providers. Dropping
//! it flushes pending data and shuts the providers down.

use crate::config::{OtelSdkConfig, Protocol};
use crate::error::SdkError;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Meter, MeterProvider as _};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig, WithTonicConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::{
    BatchConfigBuilder as LogBatchConfigBuilder, BatchLogProcessor, SdkLoggerProvider,
};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::{
    BatchConfigBuilder as TraceBatchConfigBuilder, BatchSpanProcessor, SdkTracerProvider,
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use std::collections::HashMap;
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_SCOPE: &str = "opentelemetry-configuration";

/// Builds an OTLP exporter for one signal, honouring the configured protocol.
///
/// HTTP transports post to `<endpoint><path>`; gRPC uses the base endpoint
/// and carries the configured headers as request metadata.
macro_rules! otlp_exporter {
    ($exporter:ty, $config:expr, $path:literal, $err:path) => {{
        let config: &OtelSdkConfig = $config;
        match config.endpoint.protocol {
            Protocol::Grpc => {
                let mut builder = <$exporter>::builder()
                    .with_tonic()
                    .with_endpoint(config.effective_endpoint())
                    .with_timeout(config.endpoint.timeout);
                if !config.endpoint.headers.is_empty() {
                    builder = builder.with_metadata(grpc_metadata(&config.endpoint.headers));
                }
                builder.build().map_err($err)?
            }
            Protocol::HttpBinary | Protocol::HttpJson => {
                let protocol = if config.endpoint.protocol == Protocol::HttpJson {
                    opentelemetry_otlp::Protocol::HttpJson
                } else {
                    opentelemetry_otlp::Protocol::HttpBinary
                };
                <$exporter>::builder()
                    .with_http()
                    .with_endpoint(config.signal_endpoint($path))
                    .with_timeout(config.endpoint.timeout)
                    .with_protocol(protocol)
                    .with_headers(config.endpoint.headers.clone())
                    .build()
                    .map_err($err)?
            }
        }
    }};
}

/// Guard that manages OpenTelemetry provider lifecycle.
///
/// The guard is the single owner of SDK state: components that need to
/// record telemetry receive handles derived from it (see [`OtelGuard::meter`])
/// rather than looking providers up globally.
///
/// # Example
///
/// ```no_run
/// use opentelemetry_configuration::{OtelSdkBuilder, SdkError};
///
/// # async fn run() -> Result<(), SdkError> {
/// let guard = OtelSdkBuilder::new()
///     .service_name("log-generator")
///     .build()?;
///
/// let meter = guard.meter("log-generator");
/// let counter = meter.u64_counter("requests").build();
/// counter.add(1, &[]);
///
/// guard.shutdown()?;
/// # Ok(())
/// # }
/// ```
pub struct OtelGuard {
    tracer_provider: Option<SdkTracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
    logger_provider: Option<SdkLoggerProvider>,
}

impl OtelGuard {
    /// Creates an OtelGuard from configuration.
    ///
    /// This is typically called by [`OtelSdkBuilder::build`](super::OtelSdkBuilder::build).
    pub(crate) fn from_config(
        config: OtelSdkConfig,
        custom_resource: Option<Resource>,
    ) -> Result<Self, SdkError> {
        let resource = custom_resource.unwrap_or_else(|| build_resource(&config));

        let tracer_provider = if config.traces.enabled {
            Some(build_tracer_provider(&config, resource.clone())?)
        } else {
            None
        };

        let meter_provider = if config.metrics.enabled {
            Some(build_meter_provider(&config, resource.clone())?)
        } else {
            None
        };

        let logger_provider = if config.logs.enabled {
            Some(build_logger_provider(&config, resource)?)
        } else {
            None
        };

        if config.init_tracing_subscriber {
            let scope = config
                .resource
                .service_name
                .clone()
                .unwrap_or_else(|| DEFAULT_SCOPE.to_string());
            init_subscriber(scope, &tracer_provider, &logger_provider)?;
        }

        Ok(Self {
            tracer_provider,
            meter_provider,
            logger_provider,
        })
    }

    /// Returns the tracer provider if configured.
    pub fn tracer_provider(&self) -> Option<&SdkTracerProvider> {
        self.tracer_provider.as_ref()
    }

    /// Returns the meter provider if configured.
    pub fn meter_provider(&self) -> Option<&SdkMeterProvider> {
        self.meter_provider.as_ref()
    }

    /// Returns the logger provider if configured.
    pub fn logger_provider(&self) -> Option<&SdkLoggerProvider> {
        self.logger_provider.as_ref()
    }

    /// Returns a meter for the given instrumentation scope.
    ///
    /// When metrics are disabled the meter comes from the global provider,
    /// which is a no-op unless something else installed one.
    pub fn meter(&self, scope: &'static str) -> Meter {
        match &self.meter_provider {
            Some(provider) => provider.meter(scope),
            None => opentelemetry::global::meter(scope),
        }
    }

    /// Flushes all configured providers.
    ///
    /// Flush errors are logged via `tracing::warn!` with target
    /// `otel_lifecycle` and otherwise ignored.
    pub fn flush(&self) {
        if let Some(provider) = &self.tracer_provider
            && let Err(e) = provider.force_flush()
        {
            tracing::warn!(target: "otel_lifecycle", error = %e, "Failed to flush tracer provider");
        }

        if let Some(provider) = &self.meter_provider
            && let Err(e) = provider.force_flush()
        {
            tracing::warn!(target: "otel_lifecycle", error = %e, "Failed to flush meter provider");
        }

        if let Some(provider) = &self.logger_provider
            && let Err(e) = provider.force_flush()
        {
            tracing::warn!(target: "otel_lifecycle", error = %e, "Failed to flush logger provider");
        }
    }

    /// Flushes and shuts down all configured providers.
    ///
    /// Every provider is shut down even if an earlier one fails; the first
    /// error encountered is returned.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Flush`] or [`SdkError::Shutdown`].
    pub fn shutdown(mut self) -> Result<(), SdkError> {
        let mut first_error = None;

        if let Some(provider) = self.tracer_provider.take() {
            let result = provider
                .force_flush()
                .map_err(SdkError::Flush)
                .and(provider.shutdown().map_err(SdkError::Shutdown));
            first_error = first_error.or(result.err());
        }

        if let Some(provider) = self.logger_provider.take() {
            let result = provider
                .force_flush()
                .map_err(SdkError::Flush)
                .and(provider.shutdown().map_err(SdkError::Shutdown));
            first_error = first_error.or(result.err());
        }

        if let Some(provider) = self.meter_provider.take() {
            let result = provider
                .force_flush()
                .map_err(SdkError::Flush)
                .and(provider.shutdown().map_err(SdkError::Shutdown));
            first_error = first_error.or(result.err());
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            let _ = provider.force_flush();
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {e}");
            }
        }

        if let Some(provider) = self.logger_provider.take() {
            let _ = provider.force_flush();
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down logger provider: {e}");
            }
        }

        if let Some(provider) = self.meter_provider.take() {
            let _ = provider.force_flush();
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down meter provider: {e}");
            }
        }
    }
}

pub(crate) fn build_resource(config: &OtelSdkConfig) -> Resource {
    let mut attributes: Vec<KeyValue> = config
        .resource
        .attributes
        .iter()
        .map(|(k, v)| KeyValue::new(k.clone(), v.clone()))
        .collect();

    if let Some(name) = &config.resource.service_name {
        attributes.push(KeyValue::new(SERVICE_NAME, name.clone()));
    }

    if let Some(version) = &config.resource.service_version {
        attributes.push(KeyValue::new(SERVICE_VERSION, version.clone()));
    }

    if let Some(env) = &config.resource.deployment_environment {
        attributes.push(KeyValue::new("deployment.environment.name", env.clone()));
    }

    Resource::builder().with_attributes(attributes).build()
}

/// Converts configured headers into gRPC metadata.
///
/// Entries that are not valid ASCII metadata are skipped with a warning.
fn grpc_metadata(headers: &HashMap<String, String>) -> MetadataMap {
    let mut metadata = MetadataMap::new();
    for (key, value) in headers {
        match (
            key.parse::<MetadataKey<_>>(),
            value.parse::<MetadataValue<_>>(),
        ) {
            (Ok(k), Ok(v)) => {
                metadata.insert(k, v);
            }
            _ => tracing::warn!(
                target: "otel_lifecycle",
                header = %key,
                "Skipping header that is not valid gRPC metadata"
            ),
        }
    }
    metadata
}

fn build_tracer_provider(
    config: &OtelSdkConfig,
    resource: Resource,
) -> Result<SdkTracerProvider, SdkError> {
    let exporter = otlp_exporter!(
        opentelemetry_otlp::SpanExporter,
        config,
        "/v1/traces",
        SdkError::TraceExporter
    );

    let batch_config = TraceBatchConfigBuilder::default()
        .with_max_queue_size(config.traces.batch.max_queue_size)
        .with_max_export_batch_size(config.traces.batch.max_export_batch_size)
        .with_scheduled_delay(config.traces.batch.scheduled_delay)
        .build();

    let span_processor = BatchSpanProcessor::builder(exporter)
        .with_batch_config(batch_config)
        .build();

    Ok(SdkTracerProvider::builder()
        .with_span_processor(span_processor)
        .with_resource(resource)
        .build())
}

fn build_meter_provider(
    config: &OtelSdkConfig,
    resource: Resource,
) -> Result<SdkMeterProvider, SdkError> {
    let exporter = otlp_exporter!(
        opentelemetry_otlp::MetricExporter,
        config,
        "/v1/metrics",
        SdkError::MetricExporter
    );

    let reader = PeriodicReader::builder(exporter)
        .with_interval(config.metrics.batch.scheduled_delay)
        .build();

    Ok(SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build())
}

fn build_logger_provider(
    config: &OtelSdkConfig,
    resource: Resource,
) -> Result<SdkLoggerProvider, SdkError> {
    let exporter = otlp_exporter!(
        opentelemetry_otlp::LogExporter,
        config,
        "/v1/logs",
        SdkError::LogExporter
    );

    let batch_config = LogBatchConfigBuilder::default()
        .with_max_queue_size(config.logs.batch.max_queue_size)
        .with_max_export_batch_size(config.logs.batch.max_export_batch_size)
        .with_scheduled_delay(config.logs.batch.scheduled_delay)
        .build();

    let log_processor = BatchLogProcessor::builder(exporter)
        .with_batch_config(batch_config)
        .build();

    Ok(SdkLoggerProvider::builder()
        .with_log_processor(log_processor)
        .with_resource(resource)
        .build())
}

fn init_subscriber(
    scope: String,
    tracer_provider: &Option<SdkTracerProvider>,
    logger_provider: &Option<SdkLoggerProvider>,
) -> Result<(), SdkError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .without_time();

    let telemetry_layer = tracer_provider
        .as_ref()
        .map(|tp| tracing_opentelemetry::layer().with_tracer(tp.tracer(scope)));
    let log_layer = logger_provider
        .as_ref()
        .map(OpenTelemetryTracingBridge::new);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(telemetry_layer)
        .with(log_layer)
        .try_init()?;

    Ok(())
}
