//! Error types for the log generator.

use crate::catalog::CatalogError;
use opentelemetry_configuration::SdkError;
use std::time::Duration;
use thiserror::Error;

/// A specialised Result type for generator operations.
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Errors raised while setting the generator up.
///
/// The loop itself has no failure path once running.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Configuration error.
    #[error("configuration error")]
    Config(#[source] Box<figment::Error>),

    /// The pause bounds are inverted.
    #[error("interval minimum {min:?} exceeds maximum {max:?}")]
    InvalidInterval {
        /// Configured minimum.
        min: Duration,
        /// Configured maximum.
        max: Duration,
    },

    /// The template catalog was rejected.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// OpenTelemetry SDK setup failed.
    #[error(transparent)]
    Sdk(#[from] SdkError),
}

impl From<figment::Error> for GeneratorError {
    fn from(err: figment::Error) -> Self {
        GeneratorError::Config(Box::new(err))
    }
}
