//! Decode strategies for response content.
//!
//! Callers pick one of a closed set of [`Expected`] shapes. The decoded value
//! is a [`Payload`]; business schemas are applied on top with
//! [`Payload::deserialize_into`].

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::crypto::SessionKey;
use crate::error::{ProtocolError, Result};

/// The shape a caller expects the plaintext content to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expected {
    /// A JSON array, e.g. the per-item results of a goods upload.
    Array,
    /// A JSON object, e.g. an invoice or a paged query result.
    #[default]
    Record,
    /// The raw plaintext, not parsed.
    Text,
}

impl Expected {
    /// Decodes non-empty plaintext into this shape.
    pub fn decode(self, plaintext: &str) -> Result<Payload> {
        match self {
            Expected::Text => Ok(Payload::Text(plaintext.to_string())),
            Expected::Array => match serde_json::from_str::<Value>(plaintext)? {
                Value::Array(items) => Ok(Payload::Array(items)),
                other => Err(ProtocolError::Deserialization(format!(
                    "expected a JSON array, found {}",
                    kind(&other)
                ))),
            },
            Expected::Record => match serde_json::from_str::<Value>(plaintext)? {
                Value::Object(fields) => Ok(Payload::Record(fields)),
                other => Err(ProtocolError::Deserialization(format!(
                    "expected a JSON object, found {}",
                    kind(&other)
                ))),
            },
        }
    }
}

impl std::str::FromStr for Expected {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "array" => Ok(Expected::Array),
            "record" | "object" => Ok(Expected::Record),
            "text" | "string" => Ok(Expected::Text),
            other => Err(format!("unknown decode strategy: {}", other)),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A decoded response value.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No content at all.
    Empty,
    /// Raw plaintext; also the result for empty encrypted content.
    Text(String),
    /// Content decoded as [`Expected::Array`].
    Array(Vec<Value>),
    /// Content decoded as [`Expected::Record`].
    Record(Map<String, Value>),
    /// Plain content decoded without a declared shape.
    Untyped(Value),
    /// The key recovered by a key-exchange response.
    SessionKey(SessionKey),
}

impl Payload {
    /// Returns the payload as a JSON value, if it has one.
    ///
    /// Session keys are never exposed this way.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Payload::Empty => None,
            Payload::Text(text) => Some(Value::String(text.clone())),
            Payload::Array(items) => Some(Value::Array(items.clone())),
            Payload::Record(fields) => Some(Value::Object(fields.clone())),
            Payload::Untyped(value) => Some(value.clone()),
            Payload::SessionKey(_) => None,
        }
    }

    /// Deserializes a JSON payload into a business schema.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.to_json().ok_or_else(|| {
            ProtocolError::Deserialization("payload carries no JSON value".to_string())
        })?;
        Ok(serde_json::from_value(value)?)
    }

    /// Whether this payload is empty or empty text.
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Empty => true,
            Payload::Text(text) => text.is_empty(),
            _ => false,
        }
    }
}
