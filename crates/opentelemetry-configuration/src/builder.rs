//! Fluent builder layering figment providers into an [`OtelSdkConfig`].

use crate::config::{OtelSdkConfig, Protocol};
use crate::error::SdkError;
use crate::guard::OtelGuard;
use figment::Figment;
use figment::providers::{Format, Serialized, Toml};
use opentelemetry_sdk::Resource;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Builder for an OpenTelemetry SDK setup.
///
/// Sources are merged in call order, so later calls win:
///
/// ```no_run
/// use opentelemetry_configuration::{OtelSdkBuilder, Protocol, SdkError};
///
/// # fn main() -> Result<(), SdkError> {
/// let _guard = OtelSdkBuilder::new()
///     .with_file("otel.toml")
///     .with_standard_env()
///     .protocol(Protocol::Grpc)
///     .service_name("log-generator")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[must_use = "builders do nothing unless .build() is called"]
pub struct OtelSdkBuilder {
    figment: Figment,
    custom_resource: Option<Resource>,
}

impl OtelSdkBuilder {
    /// Creates a builder seeded with [`OtelSdkConfig::default`].
    pub fn new() -> Self {
        Self {
            figment: Figment::from(Serialized::defaults(OtelSdkConfig::default())),
            custom_resource: None,
        }
    }

    /// Merges a TOML file if it exists. A missing file is not an error.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        if path.as_ref().exists() {
            self.figment = self.figment.merge(Toml::file(path));
        }
        self
    }

    /// Merges the standard `OTEL_*` environment variables.
    ///
    /// Supported: `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_EXPORTER_OTLP_PROTOCOL`,
    /// `OTEL_EXPORTER_OTLP_TIMEOUT` (milliseconds), `OTEL_EXPORTER_OTLP_HEADERS`
    /// and `OTEL_SERVICE_NAME`. The gRPC exporter additionally reads
    /// `OTEL_EXPORTER_OTLP_HEADERS` itself.
    pub fn with_standard_env(mut self) -> Self {
        self.figment = self.figment.merge(standard_otel_env());
        self
    }

    /// Merges an arbitrary figment provider.
    pub fn with_provider<T: figment::Provider>(mut self, provider: T) -> Self {
        self.figment = self.figment.merge(provider);
        self
    }

    /// Sets the collector base URL.
    pub fn endpoint(self, url: impl Into<String>) -> Self {
        self.set("endpoint.url", url.into())
    }

    /// Sets the transport protocol.
    pub fn protocol(self, protocol: Protocol) -> Self {
        self.set("endpoint.protocol", protocol)
    }

    /// Sets the export request timeout.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.set("endpoint.timeout", timeout.as_millis() as u64)
    }

    /// Adds a header sent with HTTP export requests.
    pub fn header(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let headers = HashMap::from([(key.into(), value.into())]);
        self.set("endpoint.headers", headers)
    }

    /// Sets `service.name`.
    pub fn service_name(self, name: impl Into<String>) -> Self {
        self.set("resource.service_name", name.into())
    }

    /// Sets `service.version`.
    pub fn service_version(self, version: impl Into<String>) -> Self {
        self.set("resource.service_version", version.into())
    }

    /// Sets `deployment.environment.name`.
    pub fn deployment_environment(self, environment: impl Into<String>) -> Self {
        self.set("resource.deployment_environment", environment.into())
    }

    /// Adds a free-form resource attribute.
    pub fn resource_attribute(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let attributes = HashMap::from([(key.into(), value.into())]);
        self.set("resource.attributes", attributes)
    }

    /// Enables or disables trace export.
    pub fn traces(self, enabled: bool) -> Self {
        self.set("traces.enabled", enabled)
    }

    /// Enables or disables metric export.
    pub fn metrics(self, enabled: bool) -> Self {
        self.set("metrics.enabled", enabled)
    }

    /// Enables or disables log export.
    pub fn logs(self, enabled: bool) -> Self {
        self.set("logs.enabled", enabled)
    }

    /// Sets the periodic metric export interval.
    pub fn metrics_interval(self, interval: Duration) -> Self {
        self.set(
            "metrics.batch.scheduled_delay",
            interval.as_millis() as u64,
        )
    }

    /// Controls whether a global `tracing` subscriber is installed.
    pub fn init_tracing_subscriber(self, enabled: bool) -> Self {
        self.set("init_tracing_subscriber", enabled)
    }

    /// Replaces the resource built from configuration entirely.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.custom_resource = Some(resource);
        self
    }

    /// Extracts the merged configuration without starting any provider.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`] if a source holds an invalid value.
    pub fn extract(&self) -> Result<OtelSdkConfig, SdkError> {
        Ok(self.figment.extract()?)
    }

    /// Builds the providers and returns the guard owning them.
    ///
    /// Must be called from within a Tokio runtime when the gRPC protocol is
    /// selected.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration extraction, exporter construction
    /// or subscriber installation fails.
    pub fn build(self) -> Result<OtelGuard, SdkError> {
        let config = self.extract()?;
        OtelGuard::from_config(config, self.custom_resource)
    }

    fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.figment = self.figment.merge(Serialized::default(key, value));
        self
    }
}

impl Default for OtelSdkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial endpoint config for standard OTEL env var overrides.
#[derive(Debug, Default, Serialize)]
struct PartialEndpointConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    protocol: Option<Protocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    headers: HashMap<String, String>,
}

#[derive(Debug, Default, Serialize)]
struct PartialResourceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    service_name: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct PartialConfig {
    endpoint: PartialEndpointConfig,
    resource: PartialResourceConfig,
}

fn standard_otel_env() -> Serialized<PartialConfig> {
    let mut config = PartialConfig::default();

    if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.endpoint.url = Some(endpoint);
    }

    if let Ok(protocol) = std::env::var("OTEL_EXPORTER_OTLP_PROTOCOL") {
        config.endpoint.protocol = Protocol::from_env_value(&protocol);
    }

    if let Ok(timeout) = std::env::var("OTEL_EXPORTER_OTLP_TIMEOUT") {
        config.endpoint.timeout = timeout.trim().parse().ok();
    }

    if let Ok(headers) = std::env::var("OTEL_EXPORTER_OTLP_HEADERS") {
        for pair in headers.split(',') {
            if let Some((key, value)) = pair.split_once('=') {
                config
                    .endpoint
                    .headers
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }
    }

    if let Ok(name) = std::env::var("OTEL_SERVICE_NAME") {
        config.resource.service_name = Some(name);
    }

    Serialized::defaults(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const OTEL_VARS: [&str; 5] = [
        "OTEL_EXPORTER_OTLP_ENDPOINT",
        "OTEL_EXPORTER_OTLP_PROTOCOL",
        "OTEL_EXPORTER_OTLP_TIMEOUT",
        "OTEL_EXPORTER_OTLP_HEADERS",
        "OTEL_SERVICE_NAME",
    ];

    fn cleared_env() -> Vec<(&'static str, Option<&'static str>)> {
        OTEL_VARS.iter().map(|name| (*name, None)).collect()
    }

    #[test]
    fn test_programmatic_overrides() {
        let config = OtelSdkBuilder::new()
            .endpoint("http://collector:4318")
            .protocol(Protocol::HttpJson)
            .timeout(Duration::from_millis(750))
            .header("x-api-key", "secret")
            .service_name("log-generator")
            .service_version("1.0.0")
            .resource_attribute("team", "observability")
            .metrics(false)
            .metrics_interval(Duration::from_secs(15))
            .init_tracing_subscriber(false)
            .extract()
            .unwrap();

        assert_eq!(
            config.endpoint.url.as_deref(),
            Some("http://collector:4318")
        );
        assert_eq!(config.endpoint.protocol, Protocol::HttpJson);
        assert_eq!(config.endpoint.timeout, Duration::from_millis(750));
        assert_eq!(
            config.endpoint.headers.get("x-api-key").map(String::as_str),
            Some("secret")
        );
        assert_eq!(
            config.resource.service_name.as_deref(),
            Some("log-generator")
        );
        assert_eq!(config.resource.service_version.as_deref(), Some("1.0.0"));
        assert_eq!(
            config.resource.attributes.get("team").map(String::as_str),
            Some("observability")
        );
        assert!(!config.metrics.enabled);
        assert!(config.traces.enabled);
        assert_eq!(
            config.metrics.batch.scheduled_delay,
            Duration::from_secs(15)
        );
        assert!(!config.init_tracing_subscriber);
    }

    #[test]
    fn test_load_from_toml() {
        let toml_content = r#"
[endpoint]
url = "http://file-collector:4317"
protocol = "grpc"
timeout = 2500

[resource]
service_name = "from-file"

[logs]
enabled = false

[traces.batch]
max_export_batch_size = 64
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = OtelSdkBuilder::new()
            .with_file(temp_file.path())
            .extract()
            .unwrap();

        assert_eq!(
            config.endpoint.url.as_deref(),
            Some("http://file-collector:4317")
        );
        assert_eq!(config.endpoint.timeout, Duration::from_millis(2500));
        assert_eq!(config.resource.service_name.as_deref(), Some("from-file"));
        assert!(!config.logs.enabled);
        assert_eq!(config.traces.batch.max_export_batch_size, 64);
        assert_eq!(config.traces.batch.max_queue_size, 2048);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = OtelSdkBuilder::new()
            .with_file("/nonexistent/otel.toml")
            .extract()
            .unwrap();

        assert!(config.endpoint.url.is_none());
        assert_eq!(config.endpoint.protocol, Protocol::Grpc);
    }

    #[test]
    fn test_invalid_file_value_is_config_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[endpoint]\nprotocol = \"smoke-signals\"\n")
            .unwrap();

        let result = OtelSdkBuilder::new().with_file(temp_file.path()).extract();

        assert!(matches!(result, Err(SdkError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_standard_env_vars() {
        let mut vars = cleared_env();
        vars.extend([
            ("OTEL_EXPORTER_OTLP_ENDPOINT", Some("http://env-collector:4318")),
            ("OTEL_EXPORTER_OTLP_PROTOCOL", Some("http/protobuf")),
            ("OTEL_EXPORTER_OTLP_TIMEOUT", Some("1200")),
            ("OTEL_EXPORTER_OTLP_HEADERS", Some("a=1, b = 2")),
            ("OTEL_SERVICE_NAME", Some("env-service")),
        ]);

        temp_env::with_vars(vars, || {
            let config = OtelSdkBuilder::new()
                .with_standard_env()
                .extract()
                .unwrap();

            assert_eq!(
                config.endpoint.url.as_deref(),
                Some("http://env-collector:4318")
            );
            assert_eq!(config.endpoint.protocol, Protocol::HttpBinary);
            assert_eq!(config.endpoint.timeout, Duration::from_millis(1200));
            assert_eq!(config.endpoint.headers.get("a").map(String::as_str), Some("1"));
            assert_eq!(config.endpoint.headers.get("b").map(String::as_str), Some("2"));
            assert_eq!(
                config.resource.service_name.as_deref(),
                Some("env-service")
            );
        });
    }

    #[test]
    #[serial]
    fn test_programmatic_values_override_env() {
        let mut vars = cleared_env();
        vars.push(("OTEL_SERVICE_NAME", Some("env-service")));

        temp_env::with_vars(vars, || {
            let config = OtelSdkBuilder::new()
                .with_standard_env()
                .service_name("log-generator")
                .extract()
                .unwrap();

            assert_eq!(
                config.resource.service_name.as_deref(),
                Some("log-generator")
            );
        });
    }

    #[test]
    #[serial]
    fn test_unknown_env_protocol_is_ignored() {
        let mut vars = cleared_env();
        vars.push(("OTEL_EXPORTER_OTLP_PROTOCOL", Some("carrier-pigeon")));

        temp_env::with_vars(vars, || {
            let config = OtelSdkBuilder::new()
                .with_standard_env()
                .extract()
                .unwrap();

            assert_eq!(config.endpoint.protocol, Protocol::Grpc);
        });
    }
}
