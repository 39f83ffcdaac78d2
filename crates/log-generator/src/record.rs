//! Materialising templates into concrete log records.

use crate::catalog::{EventTemplate, FieldValue, Severity};
use chrono::{DateTime, SecondsFormat, Utc};
use rand::RngCore;
use serde_json::{Map, Value};

/// One concrete log event, produced per loop iteration and dropped once it
/// has been handed to the telemetry pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedRecord {
    severity: Severity,
    timestamp: DateTime<Utc>,
    message: &'static str,
    fields: Vec<(&'static str, FieldValue)>,
}

impl SynthesizedRecord {
    /// Resolves every field of `template`, stamping the record with the
    /// current UTC time.
    pub fn synthesize(template: &EventTemplate, rng: &mut dyn RngCore) -> Self {
        Self::synthesize_at(template, rng, Utc::now())
    }

    /// Like [`synthesize`](Self::synthesize) with an explicit timestamp.
    pub fn synthesize_at(
        template: &EventTemplate,
        rng: &mut dyn RngCore,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let fields = template
            .fields()
            .iter()
            .map(|(name, spec)| (*name, spec.resolve(rng)))
            .collect();

        Self {
            severity: template.severity(),
            timestamp,
            message: template.message(),
            fields,
        }
    }

    /// Severity copied from the template.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Instant the record was synthesised.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Message copied from the template.
    pub fn message(&self) -> &'static str {
        self.message
    }

    /// Resolved fields in template order.
    pub fn fields(&self) -> &[(&'static str, FieldValue)] {
        &self.fields
    }

    /// Looks up a resolved field by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Renders the record as a flat JSON object: `timestamp`, `message`, then
    /// each field in template order.
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 2);
        map.insert(
            "timestamp".to_string(),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        map.insert("message".to_string(), Value::String(self.message.to_string()));
        for (name, value) in &self.fields {
            map.insert((*name).to_string(), value.clone().into());
        }
        Value::Object(map)
    }

    /// The serialised payload handed to the log pipeline.
    pub fn to_payload(&self) -> String {
        self.to_json().to_string()
    }
}
