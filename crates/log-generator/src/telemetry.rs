//! Emission of synthesised records through the OpenTelemetry pipeline.
//!
//! Spans and log records go through `tracing`; the subscriber installed by
//! `opentelemetry-configuration` bridges them to the SDK. Counters use the
//! OTel metrics API directly.

use crate::catalog::Severity;
use crate::record::SynthesizedRecord;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Meter};
use tracing::Span;
use tracing::field::Empty;

/// Target used for every generated log event.
pub const EVENT_TARGET: &str = "log_generator::events";

/// Name of the span opened for each loop iteration.
pub const SPAN_NAME: &str = "generate_log_batch";

/// Span attribute carrying the record's severity.
pub const LOG_LEVEL_ATTRIBUTE: &str = "log.level";

/// Span attribute carrying the 1-based iteration ordinal.
pub const ITERATION_ATTRIBUTE: &str = "iteration";

/// Counter incremented once per generated record.
pub const LOGS_GENERATED: &str = "log_generator.logs_generated";

/// Counter incremented once per ERROR record.
pub const ERRORS_GENERATED: &str = "log_generator.errors_generated";

/// The two monotonic counters maintained by the generator.
#[derive(Debug, Clone)]
pub struct EmissionCounters {
    logs: Counter<u64>,
    errors: Counter<u64>,
}

impl EmissionCounters {
    /// Registers both counters on `meter`.
    pub fn new(meter: &Meter) -> Self {
        let logs = meter
            .u64_counter(LOGS_GENERATED)
            .with_description("Number of logs generated")
            .build();
        let errors = meter
            .u64_counter(ERRORS_GENERATED)
            .with_description("Number of error logs generated")
            .build();

        Self { logs, errors }
    }

    /// Counts one record of the given severity. Only the total is labelled.
    pub fn record(&self, severity: Severity) {
        self.logs.add(1, &[KeyValue::new("level", severity.label())]);
        if severity == Severity::Error {
            self.errors.add(1, &[]);
        }
    }
}

/// Opens the per-iteration span. Attributes are filled in by [`tag_span`].
pub fn iteration_span() -> Span {
    tracing::info_span!("generate_log_batch", log.level = Empty, iteration = Empty)
}

/// Sets the severity and iteration ordinal on an iteration span.
pub fn tag_span(span: &Span, severity: Severity, iteration: u64) {
    span.record(LOG_LEVEL_ATTRIBUTE, severity.as_str());
    span.record(ITERATION_ATTRIBUTE, iteration);
}

/// Emits the record's JSON payload as a log event at its severity.
pub fn emit_record(record: &SynthesizedRecord) {
    let payload = record.to_payload();
    match record.severity() {
        Severity::Info => tracing::info!(target: EVENT_TARGET, "{payload}"),
        Severity::Warn => tracing::warn!(target: EVENT_TARGET, "{payload}"),
        Severity::Error => tracing::error!(target: EVENT_TARGET, "{payload}"),
    }
}
