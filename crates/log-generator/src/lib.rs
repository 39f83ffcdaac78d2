//! Synthetic telemetry emitter.
//!
//! Runs forever producing a stream of realistic application log events, each
//! wrapped in its own span and counted by two monotonic counters, all exported
//! over OTLP. Useful for exercising collectors, pipelines and dashboards
//! without a real workload.
//!
//! Each iteration picks one [`EventTemplate`] from the [`Catalog`] uniformly at
//! random, materialises it into a [`SynthesizedRecord`] and hands it to the
//! OpenTelemetry pipeline before sleeping for a random pause.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod generator;
pub mod record;
pub mod shutdown;
pub mod telemetry;

pub use catalog::{
    Catalog, CatalogError, EventTemplate, FieldGenerator, FieldSpec, FieldValue, Severity,
};
pub use config::{Config, IntervalConfig, ServiceConfig};
pub use error::{GeneratorError, Result};
pub use generator::{GenerationSummary, Generator, Interval, LoopState};
pub use record::SynthesizedRecord;
pub use shutdown::{shutdown_telemetry, spawn_signal_handlers};
pub use telemetry::EmissionCounters;

/// Default `service.name` resource attribute.
pub const SERVICE_NAME: &str = "log-generator";

/// Default `service.version` resource attribute.
pub const SERVICE_VERSION: &str = "1.0.0";

/// Instrumentation scope for the generator's meter.
pub const METER_NAME: &str = "log-generator";
