//! Configuration model for the OpenTelemetry SDK.
//!
//! Every struct here is `serde`-compatible so that it can be layered with
//! figment: compiled defaults first, then an optional TOML file, then the
//! standard `OTEL_*` environment variables, then programmatic overrides from
//! [`OtelSdkBuilder`](crate::OtelSdkBuilder).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_GRPC_ENDPOINT: &str = "http://localhost:4317";
const DEFAULT_HTTP_ENDPOINT: &str = "http://localhost:4318";

/// OTLP transport protocol.
///
/// The serialised names follow the values accepted by
/// `OTEL_EXPORTER_OTLP_PROTOCOL`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Protocol {
    /// OTLP over gRPC (port 4317).
    #[default]
    #[serde(rename = "grpc")]
    Grpc,
    /// OTLP over HTTP with protobuf bodies (port 4318).
    #[serde(rename = "http/protobuf")]
    HttpBinary,
    /// OTLP over HTTP with JSON bodies (port 4318).
    #[serde(rename = "http/json")]
    HttpJson,
}

impl Protocol {
    /// Parses a protocol name as found in `OTEL_EXPORTER_OTLP_PROTOCOL`.
    ///
    /// A bare `http` is treated as `http/protobuf`.
    pub fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "grpc" => Some(Protocol::Grpc),
            "http/protobuf" | "http" => Some(Protocol::HttpBinary),
            "http/json" => Some(Protocol::HttpJson),
            _ => None,
        }
    }

    /// Returns the collector endpoint used when none is configured.
    pub fn default_endpoint(self) -> &'static str {
        match self {
            Protocol::Grpc => DEFAULT_GRPC_ENDPOINT,
            Protocol::HttpBinary | Protocol::HttpJson => DEFAULT_HTTP_ENDPOINT,
        }
    }
}

/// Complete SDK configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OtelSdkConfig {
    /// Collector endpoint settings shared by all signals.
    pub endpoint: EndpointConfig,
    /// Resource attributes identifying the service.
    pub resource: ResourceConfig,
    /// Trace pipeline settings.
    pub traces: SignalConfig,
    /// Metric pipeline settings.
    pub metrics: SignalConfig,
    /// Log pipeline settings.
    pub logs: SignalConfig,
    /// Whether to install a global `tracing` subscriber bridged to the
    /// configured providers.
    pub init_tracing_subscriber: bool,
}

impl Default for OtelSdkConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            resource: ResourceConfig::default(),
            traces: SignalConfig::default(),
            metrics: SignalConfig {
                enabled: true,
                batch: BatchConfig {
                    scheduled_delay: Duration::from_secs(60),
                    ..BatchConfig::default()
                },
            },
            logs: SignalConfig::default(),
            init_tracing_subscriber: true,
        }
    }
}

impl OtelSdkConfig {
    /// Returns the configured endpoint, or the protocol default.
    pub fn effective_endpoint(&self) -> String {
        self.endpoint
            .url
            .clone()
            .unwrap_or_else(|| self.endpoint.protocol.default_endpoint().to_string())
    }

    /// Returns the per-signal URL for HTTP transports, e.g. `/v1/traces`.
    pub fn signal_endpoint(&self, path: &str) -> String {
        let base = self.effective_endpoint();
        format!("{}{}", base.trim_end_matches('/'), path)
    }
}

/// Collector endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL of the collector. `None` selects the protocol default.
    pub url: Option<String>,
    /// Transport protocol.
    pub protocol: Protocol,
    /// Export request timeout in milliseconds.
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    /// Extra headers sent with HTTP export requests.
    pub headers: HashMap<String, String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: None,
            protocol: Protocol::default(),
            timeout: Duration::from_secs(10),
            headers: HashMap::new(),
        }
    }
}

/// Resource attributes attached to every exported signal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// `service.name`.
    pub service_name: Option<String>,
    /// `service.version`.
    pub service_version: Option<String>,
    /// `deployment.environment.name`.
    pub deployment_environment: Option<String>,
    /// Additional free-form attributes.
    pub attributes: HashMap<String, String>,
}

/// Per-signal pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Whether the signal is exported at all.
    pub enabled: bool,
    /// Batching parameters.
    pub batch: BatchConfig,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch: BatchConfig::default(),
        }
    }
}

/// Batch processor parameters.
///
/// For metrics only `scheduled_delay` is used, as the periodic reader's
/// export interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of items buffered before new ones are dropped.
    pub max_queue_size: usize,
    /// Maximum number of items per export request.
    pub max_export_batch_size: usize,
    /// Delay between scheduled exports, in milliseconds.
    #[serde(with = "duration_ms")]
    pub scheduled_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 2048,
            max_export_batch_size: 512,
            scheduled_delay: Duration::from_secs(5),
        }
    }
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
