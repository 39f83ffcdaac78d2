//! Opinionated OpenTelemetry SDK configuration and lifecycle management.
//!
//! This crate wires together the OpenTelemetry SDK, OTLP exporters, and the
//! `tracing` crate ecosystem into a cohesive configuration system. It handles
//! initialisation, flushing, and shutdown of all signal providers (traces,
//! metrics, logs).
//!
//! # Features
//!
//! - **Layered configuration** - Combine defaults, config files, environment
//!   variables, and programmatic overrides using [figment](https://docs.rs/figment)
//! - **Sensible defaults** - gRPC to `localhost:4317`, or `localhost:4318`
//!   with per-signal paths for the HTTP protocols
//! - **Drop-based lifecycle** - Automatic flush and shutdown when guard goes out
//!   of scope
//! - **Tracing integration** - Automatic setup of `tracing-opentelemetry` and
//!   `opentelemetry-appender-tracing` layers
//!
//! # Example
//!
//! ```no_run
//! use opentelemetry_configuration::{OtelSdkBuilder, Protocol, SdkError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SdkError> {
//!     let guard = OtelSdkBuilder::new()
//!         .with_file("otel.toml")                    // Layer config file
//!         .with_standard_env()                       // Standard OTEL_* env vars
//!         .endpoint("http://collector:4317")         // Override endpoint
//!         .protocol(Protocol::Grpc)
//!         .service_name("my-service")
//!         .service_version("1.0.0")
//!         .build()?;
//!
//!     tracing::info!("Application running");
//!
//!     guard.shutdown()
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod error;
mod guard;

pub use builder::OtelSdkBuilder;
pub use config::{
    BatchConfig, EndpointConfig, OtelSdkConfig, Protocol, ResourceConfig, SignalConfig,
};
pub use error::SdkError;
pub use guard::OtelGuard;

// Re-export figment for callers that want to add their own providers
pub use figment;
