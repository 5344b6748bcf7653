//! Source record → destination document transformation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::connectors::SourceRecord;
use crate::schema::{is_system_field, AttributeType, DestinationAttribute};

/// A document ready to be created in the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedDocument {
    /// Destination document ID.
    #[serde(rename = "documentId")]
    pub document_id: String,
    /// Coerced field values, keyed by attribute.
    pub data: Map<String, Value>,
}

/// Transforms a source record against the live destination attributes.
///
/// System fields are removed, fields unknown to the destination are dropped,
/// null values are omitted and every other value is coerced to its
/// attribute's declared type. Never fails.
#[must_use]
pub fn transform(record: &SourceRecord, attributes: &[DestinationAttribute]) -> TransformedDocument {
    let data = record
        .iter()
        .filter(|(key, value)| !is_system_field(key) && !value.is_null())
        .filter_map(|(key, value)| {
            attributes
                .iter()
                .find(|attr| &attr.key == key)
                .map(|attr| (key.clone(), coerce_value(value, &attr.attr_type)))
        })
        .collect();

    TransformedDocument {
        document_id: document_id(record),
        data,
    }
}

/// The record's `id` as text, or a fresh UUID when it is absent or empty.
#[must_use]
pub fn document_id(record: &SourceRecord) -> String {
    let id = match record.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(stringify(other)),
    };

    id.filter(|s| !s.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Coerces a value to the given attribute type.
#[must_use]
pub fn coerce_value(value: &Value, attr_type: &AttributeType) -> Value {
    match attr_type {
        AttributeType::String => Value::String(stringify(value)),
        AttributeType::Integer | AttributeType::Double => to_number(value),
        AttributeType::Boolean => Value::Bool(to_bool(value)),
        AttributeType::Other(_) => value.clone(),
    }
}

/// Text form of a value: strings verbatim, everything else as JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numeric form of a value, as JavaScript's `Number()` computes it. Lists
/// convert through their joined text; anything that is not a finite number
/// becomes `null`.
fn to_number(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::Bool(b) => Value::from(u8::from(*b)),
        Value::Null => Value::from(0),
        Value::String(s) => parse_number(s),
        Value::Array(_) => parse_number(&element_text(value)),
        Value::Object(_) => Value::Null,
    }
}

fn parse_number(text: &str) -> Value {
    let text = text.trim();
    if text.is_empty() {
        return Value::from(0);
    }
    if let Ok(int) = text.parse::<i64>() {
        return Value::from(int);
    }
    if let Some(prefixed) = parse_prefixed(text) {
        return prefixed;
    }
    // `inf` and `nan` spellings parse but are not finite
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

/// `0x`, `0o` and `0b` literals.
fn parse_prefixed(text: &str) -> Option<Value> {
    let radix = match text.get(..2)?.to_ascii_lowercase().as_str() {
        "0x" => 16,
        "0o" => 8,
        "0b" => 2,
        _ => return None,
    };
    let digits = &text[2..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Some(Value::Null);
    }
    Some(u64::from_str_radix(digits, radix).map_or(Value::Null, Value::from))
}

/// Text of a list element when a list is joined: `null` is empty, nested
/// lists are joined with commas, objects are opaque.
fn element_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(element_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
    }
}

/// Logical form of a value, as JavaScript's `Boolean()` computes it: any
/// non-empty string is true.
fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}
