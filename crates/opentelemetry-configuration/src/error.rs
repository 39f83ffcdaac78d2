//! Error types for SDK initialisation and lifecycle.

use opentelemetry_otlp::ExporterBuildError;
use opentelemetry_sdk::error::OTelSdkError;
use thiserror::Error;

/// Errors raised while configuring, starting or stopping the SDK.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SdkError {
    /// Layered configuration could not be extracted.
    #[error("invalid OpenTelemetry configuration")]
    Config(#[source] Box<figment::Error>),

    /// The OTLP span exporter could not be built.
    #[error("failed to build trace exporter")]
    TraceExporter(#[source] ExporterBuildError),

    /// The OTLP metric exporter could not be built.
    #[error("failed to build metric exporter")]
    MetricExporter(#[source] ExporterBuildError),

    /// The OTLP log exporter could not be built.
    #[error("failed to build log exporter")]
    LogExporter(#[source] ExporterBuildError),

    /// A global `tracing` subscriber was already installed.
    #[error("failed to initialise tracing subscriber")]
    TracingSubscriber(#[from] tracing_subscriber::util::TryInitError),

    /// A provider failed to flush pending telemetry.
    #[error("failed to flush provider")]
    Flush(#[source] OTelSdkError),

    /// A provider failed to shut down.
    #[error("failed to shut down provider")]
    Shutdown(#[source] OTelSdkError),
}

impl From<figment::Error> for SdkError {
    fn from(err: figment::Error) -> Self {
        SdkError::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_config_error_keeps_source() {
        let err: SdkError = figment::Error::from("bad value".to_string()).into();

        assert!(err.to_string().contains("configuration"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_flush_error_display() {
        let err = SdkError::Flush(OTelSdkError::AlreadyShutdown);
        assert_eq!(err.to_string(), "failed to flush provider");
    }
}
