//! The fixed catalog of log event templates.
//!
//! Each template pairs a severity and message with an ordered list of fields.
//! A field is either a literal copied into every record or a generator that
//! draws a fresh value from the random source on each emission.

use rand::{Rng, RngCore};
use std::borrow::Cow;
use std::fmt;

/// Field names the record reserves for itself.
pub const RESERVED_FIELDS: [&str; 3] = ["level", "message", "timestamp"];

/// Severity of a generated log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Something degraded but still working.
    Warn,
    /// A failed operation.
    Error,
}

impl Severity {
    /// Uppercase name, as used for the `log.level` span attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    /// Lowercase name, as used for the `level` counter label.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Free text.
    Text(Cow<'static, str>),
    /// Whole number.
    Int(i64),
    /// Decimal number.
    Float(f64),
}

impl FieldValue {
    /// Returns the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text.as_ref()),
            _ => None,
        }
    }

    /// Returns the integer content, if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the float content, if this is a float value.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<FieldValue> for serde_json::Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(text) => serde_json::Value::String(text.into_owned()),
            FieldValue::Int(value) => serde_json::Value::from(value),
            FieldValue::Float(value) => serde_json::Value::from(value),
        }
    }
}

/// Draws one field value from the random source.
pub type FieldGenerator = fn(&mut dyn RngCore) -> FieldValue;

/// How a template field obtains its value.
#[derive(Clone)]
pub enum FieldSpec {
    /// Copied verbatim into every record.
    Fixed(FieldValue),
    /// Invoked once per record.
    Generator(FieldGenerator),
}

impl FieldSpec {
    /// Produces the value for one record.
    pub fn resolve(&self, rng: &mut dyn RngCore) -> FieldValue {
        match self {
            FieldSpec::Fixed(value) => value.clone(),
            FieldSpec::Generator(generate) => generate(rng),
        }
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSpec::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            FieldSpec::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// An immutable log event template.
///
/// Templates can only be obtained from [`Catalog::standard`]; callers narrow
/// a catalog by picking templates out of it.
#[derive(Debug, Clone, Copy)]
pub struct EventTemplate {
    severity: Severity,
    message: &'static str,
    fields: &'static [(&'static str, FieldSpec)],
}

impl EventTemplate {
    /// The template's severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The fixed message.
    pub fn message(&self) -> &'static str {
        self.message
    }

    /// Field names and their specs, in emission order.
    pub fn fields(&self) -> &'static [(&'static str, FieldSpec)] {
        self.fields
    }
}

/// Errors raised when assembling a catalog.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// No templates were supplied.
    #[error("catalog must contain at least one template")]
    Empty,

    /// A template declares a field the record reserves.
    #[error("template {message:?} declares reserved field {field:?}")]
    ReservedField {
        /// Message of the offending template.
        message: &'static str,
        /// The reserved field name.
        field: &'static str,
    },
}

/// A non-empty, read-only collection of templates.
#[derive(Debug, Clone)]
pub struct Catalog {
    templates: Vec<EventTemplate>,
}

impl Catalog {
    /// The built-in catalog of eight templates.
    pub fn standard() -> Self {
        Self {
            templates: STANDARD_TEMPLATES.to_vec(),
        }
    }

    /// Builds a catalog from the given templates.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Empty`] for an empty list and
    /// [`CatalogError::ReservedField`] when a template declares `level`,
    /// `message` or `timestamp`.
    pub fn new(templates: Vec<EventTemplate>) -> Result<Self, CatalogError> {
        if templates.is_empty() {
            return Err(CatalogError::Empty);
        }

        for template in &templates {
            if let Some(&(field, _)) = template
                .fields
                .iter()
                .find(|(name, _)| RESERVED_FIELDS.contains(name))
            {
                return Err(CatalogError::ReservedField {
                    message: template.message,
                    field,
                });
            }
        }

        Ok(Self { templates })
    }

    /// Picks one template uniformly at random, with replacement.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &EventTemplate {
        &self.templates[rng.random_range(0..self.templates.len())]
    }

    /// Returns the template at `index`.
    pub fn get(&self, index: usize) -> Option<&EventTemplate> {
        self.templates.get(index)
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Iterates over the templates in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &EventTemplate> {
        self.templates.iter()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Routes served by the fake API.
pub const ENDPOINTS: [&str; 3] = ["/api/users", "/api/products", "/api/orders"];

/// Failure codes reported by the fake payment processor.
pub const PAYMENT_ERROR_CODES: [&str; 3] = ["INSUFFICIENT_FUNDS", "CARD_DECLINED", "TIMEOUT"];

const STANDARD_TEMPLATES: [EventTemplate; 8] = [
    EventTemplate {
        severity: Severity::Info,
        message: "User login successful",
        fields: &[("user_id", FieldSpec::Generator(user_id))],
    },
    EventTemplate {
        severity: Severity::Info,
        message: "API request processed",
        fields: &[
            ("endpoint", FieldSpec::Generator(endpoint)),
            ("response_time_ms", FieldSpec::Generator(response_time_ms)),
        ],
    },
    EventTemplate {
        severity: Severity::Warn,
        message: "Slow query detected",
        fields: &[("query_time_ms", FieldSpec::Generator(query_time_ms))],
    },
    EventTemplate {
        severity: Severity::Error,
        message: "Database connection failed",
        fields: &[("retry_count", FieldSpec::Generator(retry_count))],
    },
    EventTemplate {
        severity: Severity::Error,
        message: "Payment processing failed",
        fields: &[("error_code", FieldSpec::Generator(error_code))],
    },
    EventTemplate {
        severity: Severity::Info,
        message: "Cache hit",
        fields: &[("cache_key", FieldSpec::Generator(cache_key))],
    },
    EventTemplate {
        severity: Severity::Warn,
        message: "Rate limit approaching",
        fields: &[
            ("current_rate", FieldSpec::Generator(current_rate)),
            ("limit", FieldSpec::Fixed(FieldValue::Int(100))),
        ],
    },
    EventTemplate {
        severity: Severity::Info,
        message: "Order placed",
        fields: &[
            ("order_id", FieldSpec::Generator(order_id)),
            ("amount", FieldSpec::Generator(amount)),
        ],
    },
];

fn user_id(rng: &mut dyn RngCore) -> FieldValue {
    FieldValue::Text(format!("user_{}", rng.random_range(1000..=9999)).into())
}

fn endpoint(rng: &mut dyn RngCore) -> FieldValue {
    FieldValue::Text(Cow::Borrowed(ENDPOINTS[rng.random_range(0..ENDPOINTS.len())]))
}

fn response_time_ms(rng: &mut dyn RngCore) -> FieldValue {
    FieldValue::Int(rng.random_range(10..=500))
}

fn query_time_ms(rng: &mut dyn RngCore) -> FieldValue {
    FieldValue::Int(rng.random_range(1000..=3000))
}

fn retry_count(rng: &mut dyn RngCore) -> FieldValue {
    FieldValue::Int(rng.random_range(1..=5))
}

fn error_code(rng: &mut dyn RngCore) -> FieldValue {
    FieldValue::Text(Cow::Borrowed(
        PAYMENT_ERROR_CODES[rng.random_range(0..PAYMENT_ERROR_CODES.len())],
    ))
}

fn cache_key(rng: &mut dyn RngCore) -> FieldValue {
    FieldValue::Text(format!("key_{}", rng.random_range(1..=100)).into())
}

fn current_rate(rng: &mut dyn RngCore) -> FieldValue {
    FieldValue::Int(rng.random_range(80..=95))
}

fn order_id(rng: &mut dyn RngCore) -> FieldValue {
    FieldValue::Text(format!("ORD-{}", rng.random_range(10000..=99999)).into())
}

fn amount(rng: &mut dyn RngCore) -> FieldValue {
    let raw: f64 = rng.random_range(10.0..=500.0);
    FieldValue::Float((raw * 100.0).round() / 100.0)
}
