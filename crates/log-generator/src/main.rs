//! Log generator binary.
//!
//! Emits synthetic logs, spans and counters over OTLP until interrupted.
//!
//! # Configuration
//!
//! Generator settings come from `log-generator.toml` (or the file named by
//! `LOG_GENERATOR_CONFIG_FILE`) and `LOG_GENERATOR_*` variables. Exporter
//! settings come from `otel.toml` and the standard `OTEL_*` variables:
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` - collector URL
//! - `OTEL_EXPORTER_OTLP_PROTOCOL` - `grpc`, `http/protobuf` or `http/json`
//! - `RUST_LOG` - console filter, `info` by default

use anyhow::{Context, Result};
use log_generator::{
    Catalog, Config, Generator, Interval, METER_NAME, shutdown_telemetry, spawn_signal_handlers,
};
use opentelemetry_configuration::OtelSdkBuilder;
use tokio_util::sync::CancellationToken;

const OTEL_CONFIG_PATH: &str = "otel.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let interval = Interval::try_from(config.interval).context("invalid pause interval")?;

    let guard = OtelSdkBuilder::new()
        .service_name(config.service.name.as_str())
        .service_version(config.service.version.as_str())
        .with_file(OTEL_CONFIG_PATH)
        .with_standard_env()
        .build()
        .context("failed to initialise OpenTelemetry")?;

    tracing::info!("Log generator service starting...");
    tracing::debug!(?config, "Configuration loaded");

    let shutdown = CancellationToken::new();
    spawn_signal_handlers(shutdown.clone()).context("failed to install signal handlers")?;

    let meter = guard.meter(METER_NAME);
    let mut generator = Generator::new(Catalog::standard(), &meter, interval, config.seed);

    println!("Log generator service started. Generating logs...");

    let summary = generator.run(shutdown).await;
    tracing::info!(
        iterations = summary.iterations,
        errors = summary.errors,
        "Generation finished"
    );

    shutdown_telemetry(guard);

    println!("Log generator service stopped.");
    Ok(())
}
