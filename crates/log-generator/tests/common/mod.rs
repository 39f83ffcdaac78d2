//! In-memory OpenTelemetry pipeline for observing what the generator emits.

#![allow(dead_code)]

use log_generator::Severity;
use log_generator::telemetry::{ERRORS_GENERATED, LOGS_GENERATED, SPAN_NAME};
use opentelemetry::logs::{AnyValue, Severity as OtelSeverity};
use opentelemetry::metrics::{Meter, MeterProvider};
use opentelemetry::trace::TracerProvider;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_sdk::logs::{InMemoryLogExporter, SdkLoggerProvider};
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};
use serde_json::Value;
use std::collections::HashMap;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;

/// A generated event as it reached the log exporter.
#[derive(Debug, Clone)]
pub struct ExportedEvent {
    pub severity: Severity,
    pub payload: Value,
}

/// Span, log and metric providers backed by in-memory exporters, with a
/// thread-local subscriber routing `tracing` into them.
pub struct Pipeline {
    spans: InMemorySpanExporter,
    logs: InMemoryLogExporter,
    metrics: InMemoryMetricExporter,
    tracer_provider: SdkTracerProvider,
    logger_provider: SdkLoggerProvider,
    meter_provider: SdkMeterProvider,
    _subscriber: DefaultGuard,
}

impl Pipeline {
    /// Builds the providers and installs the subscriber for the current
    /// thread. Use with the current-thread test runtime.
    pub fn install() -> Self {
        let spans = InMemorySpanExporter::default();
        let logs = InMemoryLogExporter::default();
        let metrics = InMemoryMetricExporter::default();

        let tracer_provider = SdkTracerProvider::builder()
            .with_simple_exporter(spans.clone())
            .build();
        let logger_provider = SdkLoggerProvider::builder()
            .with_simple_exporter(logs.clone())
            .build();
        let meter_provider = SdkMeterProvider::builder()
            .with_reader(PeriodicReader::builder(metrics.clone()).build())
            .build();

        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(tracer_provider.tracer("test")))
            .with(OpenTelemetryTracingBridge::new(&logger_provider));

        Self {
            spans,
            logs,
            metrics,
            tracer_provider,
            logger_provider,
            meter_provider,
            _subscriber: tracing::subscriber::set_default(subscriber),
        }
    }

    /// Meter bound to the in-memory metric reader.
    pub fn meter(&self) -> Meter {
        self.meter_provider.meter(log_generator::METER_NAME)
    }

    /// Finished iteration spans in close order.
    pub fn iteration_spans(&self) -> Vec<SpanData> {
        self.spans
            .get_finished_spans()
            .unwrap()
            .into_iter()
            .filter(|span| span.name == SPAN_NAME)
            .collect()
    }

    /// Generated events, in emission order. Other log output is skipped.
    pub fn events(&self) -> Vec<ExportedEvent> {
        self.logs
            .get_emitted_logs()
            .unwrap()
            .into_iter()
            .filter_map(|log| {
                let Some(AnyValue::String(body)) = log.record.body() else {
                    return None;
                };
                let payload: Value = serde_json::from_str(body.as_str()).ok()?;
                payload.get("message")?;
                let severity = match log.record.severity_number()? {
                    OtelSeverity::Info => Severity::Info,
                    OtelSeverity::Warn => Severity::Warn,
                    OtelSeverity::Error => Severity::Error,
                    _ => return None,
                };
                Some(ExportedEvent { severity, payload })
            })
            .collect()
    }

    /// Bodies of all non-payload log records.
    pub fn messages(&self) -> Vec<String> {
        self.logs
            .get_emitted_logs()
            .unwrap()
            .into_iter()
            .filter_map(|log| match log.record.body() {
                Some(AnyValue::String(body)) => Some(body.as_str().to_string()),
                _ => None,
            })
            .collect()
    }

    /// Cumulative counter values keyed by `(name, level)`.
    pub fn counters(&self) -> HashMap<(String, String), u64> {
        self.meter_provider.force_flush().unwrap();

        let exported = self.metrics.get_finished_metrics().unwrap();
        let mut totals = HashMap::new();
        let Some(last) = exported.last() else {
            return totals;
        };

        for scope in last.scope_metrics() {
            for metric in scope.metrics() {
                let AggregatedMetrics::U64(MetricData::Sum(sum)) = metric.data() else {
                    continue;
                };
                for point in sum.data_points() {
                    let level = point
                        .attributes()
                        .find(|kv| kv.key.as_str() == "level")
                        .map(|kv| kv.value.as_str().into_owned())
                        .unwrap_or_default();
                    *totals
                        .entry((metric.name().to_string(), level))
                        .or_insert(0) += point.value();
                }
            }
        }
        totals
    }

    /// Sum of the total-logs counter across levels.
    pub fn logs_generated(&self) -> u64 {
        self.counter_sum(LOGS_GENERATED)
    }

    /// Sum of the error counter across levels.
    pub fn errors_generated(&self) -> u64 {
        self.counter_sum(ERRORS_GENERATED)
    }

    fn counter_sum(&self, name: &str) -> u64 {
        self.counters()
            .into_iter()
            .filter(|((metric, _), _)| metric == name)
            .map(|(_, value)| value)
            .sum()
    }
}

/// Value of a span attribute rendered as a string.
pub fn span_attribute(span: &SpanData, key: &str) -> Vec<String> {
    span.attributes
        .iter()
        .filter(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.as_str().into_owned())
        .collect()
}
