//! Destination schema model and sampled type inference.
//!
//! The destination store knows a closed set of attribute types. Anything else
//! it reports (emails, datetimes, relationships...) is carried as
//! [`AttributeType::Other`] and passed through untouched by the transformer.

mod analyzer;

pub use analyzer::SchemaAnalyzer;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::connectors::SourceRecord;

/// Source-only system fields, never created as attributes or written as data.
pub const SYSTEM_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

/// Default `size` for string attributes when the sample gives no length.
pub const DEFAULT_STRING_SIZE: usize = 255;

/// Returns true if `name` is one of the source system fields.
#[must_use]
pub fn is_system_field(name: &str) -> bool {
    SYSTEM_FIELDS.contains(&name)
}

/// Destination attribute type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttributeType {
    /// Text. Composite source values are serialized to JSON text.
    String,
    /// Whole number.
    Integer,
    /// Floating point number.
    Double,
    /// Logical true/false.
    Boolean,
    /// Any other type the destination reports.
    Other(String),
}

impl AttributeType {
    /// Route segment / wire name of this type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for AttributeType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "string" => Self::String,
            "integer" => Self::Integer,
            "double" => Self::Double,
            "boolean" => Self::Boolean,
            _ => Self::Other(name),
        }
    }
}

impl From<AttributeType> for String {
    fn from(attr_type: AttributeType) -> Self {
        attr_type.as_str().to_string()
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attribute as reported by the live destination schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationAttribute {
    /// Attribute key.
    pub key: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Whether the attribute is required.
    #[serde(default)]
    pub required: bool,
    /// Maximum length (string attributes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

impl DestinationAttribute {
    /// Creates an optional attribute with no size.
    pub fn new(key: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            key: key.into(),
            attr_type,
            required: false,
            size: None,
        }
    }
}

/// Maps a sampled source value to a destination attribute type.
///
/// Total: null, lists and nested objects all map to [`AttributeType::String`]
/// and are serialized to text on write.
#[must_use]
pub fn map_type(value: &Value) -> AttributeType {
    match value {
        Value::String(_) => AttributeType::String,
        Value::Number(n) => {
            let whole = n.is_i64()
                || n.is_u64()
                || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0);
            if whole {
                AttributeType::Integer
            } else {
                AttributeType::Double
            }
        }
        Value::Bool(_) => AttributeType::Boolean,
        Value::Null | Value::Array(_) | Value::Object(_) => AttributeType::String,
    }
}

/// A field inferred from a sampled source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredField {
    /// Field name.
    pub name: String,
    /// Inferred destination type.
    pub field_type: AttributeType,
    /// True when the sampled value was null.
    pub nullable: bool,
    /// `max(observed length, 255)` for text samples. Length is counted in
    /// UTF-16 code units, so a character outside the BMP counts twice.
    pub max_length: Option<usize>,
}

impl InferredField {
    /// Infers a field from one sampled value.
    #[must_use]
    pub fn from_sample(name: &str, value: &Value) -> Self {
        Self {
            name: name.to_string(),
            field_type: map_type(value),
            nullable: value.is_null(),
            max_length: value
                .as_str()
                .map(|s| s.encode_utf16().count().max(DEFAULT_STRING_SIZE)),
        }
    }

    /// Builds the attribute-creation body for this field.
    #[must_use]
    pub fn to_attribute_request(&self) -> AttributeRequest {
        let size = match (&self.field_type, self.max_length) {
            (_, Some(len)) => Some(len),
            (AttributeType::String, None) => Some(DEFAULT_STRING_SIZE),
            _ => None,
        };
        AttributeRequest {
            key: self.name.clone(),
            required: !self.nullable,
            size,
        }
    }
}

/// Body of a create-attribute request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeRequest {
    /// Attribute key.
    pub key: String,
    /// Whether documents must carry this attribute.
    pub required: bool,
    /// Maximum length (string attributes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

/// Derives the field list from a sample record, in the record's key order.
///
/// System fields are included; callers decide whether to create them.
#[must_use]
pub fn infer_fields(sample: &SourceRecord) -> Vec<InferredField> {
    sample
        .iter()
        .map(|(name, value)| InferredField::from_sample(name, value))
        .collect()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
