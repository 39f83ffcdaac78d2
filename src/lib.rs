//! Log generator workspace.
//!
//! This package only hosts the workspace-level end-to-end tests. The
//! functionality lives in the member crates:
//!
//! - `log-generator`: the template catalog, record synthesis and generation loop
//! - `opentelemetry-configuration`: OTLP exporter configuration and provider lifecycle
