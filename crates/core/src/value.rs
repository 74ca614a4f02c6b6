//! Property values and their REST encoding
//!
//! | Value | JSON |
//! |-------|------|
//! | Null | `{"nullValue": null}` |
//! | Boolean | `{"booleanValue": b}` |
//! | Integer | `{"integerValue": "<decimal>"}` |
//! | Double | `{"doubleValue": f}`, or `"NaN"`, `"Infinity"`, `"-Infinity"` |
//! | String | `{"stringValue": s}`, or a blob when longer than 1500 bytes |
//! | Blob | `{"blobValue": "<base64url>"}` |
//! | Key | `{"keyValue": {...}}` |
//! | Array | `{"arrayValue": {"values": [...]}}` |
//! | Timestamp | `{"timestampValue": "<RFC 3339>"}` |

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::{json, Value as JsonValue};

use crate::error::ValueError;
use crate::key::Key;

/// Longest string stored as `stringValue`; longer strings become unindexed blobs
pub const MAX_STRING_LENGTH: usize = 1500;

/// A property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null
    Null,
    /// Boolean
    Boolean(bool),
    /// 64-bit integer
    Integer(i64),
    /// Double precision float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Blob(Vec<u8>),
    /// Reference to another entity
    Key(Key),
    /// Ordered list of values
    Array(Vec<Value>),
    /// RFC 3339 timestamp, kept as the server formatted it
    Timestamp(String),
}

impl Value {
    /// Encode as a REST value object
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => json!({"nullValue": null}),
            Value::Boolean(b) => json!({"booleanValue": b}),
            Value::Integer(i) => json!({"integerValue": i.to_string()}),
            Value::Double(f) => json!({"doubleValue": double_to_json(*f)}),
            Value::String(s) if s.len() > MAX_STRING_LENGTH => json!({
                "excludeFromIndexes": true,
                "blobValue": URL_SAFE_NO_PAD.encode(s.as_bytes()),
            }),
            Value::String(s) => json!({"stringValue": s}),
            Value::Blob(b) => json!({"blobValue": URL_SAFE_NO_PAD.encode(b)}),
            Value::Key(k) => json!({"keyValue": k.to_json()}),
            Value::Array(values) => json!({
                "arrayValue": {"values": values.iter().map(Value::to_json).collect::<Vec<_>>()}
            }),
            Value::Timestamp(ts) => json!({"timestampValue": ts}),
        }
    }

    /// Decode a REST value object
    ///
    /// Blobs that hold valid UTF-8 come back as strings, matching how long
    /// strings are written. Embedded entities are not modelled and decode to
    /// `Null`.
    pub fn from_json(value: &JsonValue) -> Result<Value, ValueError> {
        let unsupported = || ValueError::Unsupported(value.to_string());
        let obj = value.as_object().ok_or_else(unsupported)?;

        if obj.contains_key("nullValue") {
            return Ok(Value::Null);
        }
        if let Some(b) = obj.get("booleanValue") {
            return b.as_bool().map(Value::Boolean).ok_or_else(unsupported);
        }
        if let Some(i) = obj.get("integerValue") {
            return parse_integer(i).map(Value::Integer);
        }
        if let Some(f) = obj.get("doubleValue") {
            return double_from_json(f).map(Value::Double).ok_or_else(unsupported);
        }
        if let Some(s) = obj.get("stringValue") {
            return s
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(unsupported);
        }
        if let Some(k) = obj.get("keyValue") {
            return Ok(Value::Key(Key::from_json(k)?));
        }
        if let Some(arr) = obj.get("arrayValue") {
            let values = match arr.get("values").and_then(JsonValue::as_array) {
                Some(values) => values
                    .iter()
                    .map(Value::from_json)
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            return Ok(Value::Array(values));
        }
        if let Some(ts) = obj.get("timestampValue") {
            return ts
                .as_str()
                .map(|ts| Value::Timestamp(ts.to_string()))
                .ok_or_else(unsupported);
        }
        if let Some(blob) = obj.get("blobValue") {
            let encoded = blob.as_str().ok_or_else(unsupported)?;
            let bytes = decode_blob(encoded)?;
            return Ok(match String::from_utf8(bytes) {
                Ok(s) => Value::String(s),
                Err(e) => Value::Blob(e.into_bytes()),
            });
        }
        if obj.contains_key("entityValue") {
            return Ok(Value::Null);
        }

        Err(unsupported())
    }

    /// Plain JSON for display or export; keys become key strings
    pub fn to_plain_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Boolean(b) => json!(b),
            Value::Integer(i) => json!(i),
            Value::Double(f) => json!(f),
            Value::String(s) | Value::Timestamp(s) => json!(s),
            Value::Blob(b) => json!(URL_SAFE_NO_PAD.encode(b)),
            Value::Key(k) => match k.ks() {
                Ok(ks) => json!(ks),
                Err(_) => k.to_json(),
            },
            Value::Array(values) => {
                JsonValue::Array(values.iter().map(Value::to_plain_json).collect())
            }
        }
    }
}

fn parse_integer(value: &JsonValue) -> Result<i64, ValueError> {
    match value {
        JsonValue::String(s) => s
            .parse::<i64>()
            .map_err(|_| ValueError::InvalidInteger(s.clone())),
        JsonValue::Number(n) => n
            .as_i64()
            .ok_or_else(|| ValueError::InvalidInteger(n.to_string())),
        other => Err(ValueError::InvalidInteger(other.to_string())),
    }
}

/// Decode a blob in either alphabet, padded or not.
fn decode_blob(encoded: &str) -> Result<Vec<u8>, ValueError> {
    let mut standard: String = encoded
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    while standard.len() % 4 != 0 {
        standard.push('=');
    }
    STANDARD
        .decode(standard.as_bytes())
        .map_err(|e| ValueError::InvalidBlob(e.to_string()))
}

// Non-finite doubles have no JSON number form.
fn double_to_json(f: f64) -> JsonValue {
    if f.is_nan() {
        json!("NaN")
    } else if f == f64::INFINITY {
        json!("Infinity")
    } else if f == f64::NEG_INFINITY {
        json!("-Infinity")
    } else {
        json!(f)
    }
}

fn double_from_json(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        other => other.as_f64(),
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Key> for Value {
    fn from(k: Key) -> Self {
        Value::Key(k)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(values)
    }
}
