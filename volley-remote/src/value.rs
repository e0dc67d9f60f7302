//! Typed-value wire format for the remote document store.
//!
//! The document protocol carries every field as a single-key object naming
//! its type (`{"stringValue": "x"}`, `{"integerValue": "42"}`, …), with
//! arrays and maps nesting recursively. Integers travel as decimal strings.
//! A closed tagged union with explicit converters is safer than passing
//! untyped JSON maps around.

use crate::error::{RemoteError, RemoteResult};
use serde_json::json;
use std::collections::BTreeMap;

/// A single typed value in a remote document.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Encode to the wire's single-key typed-object form.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            Value::Null => json!({ "nullValue": null }),
            Value::Bool(b) => json!({ "booleanValue": b }),
            Value::Integer(i) => json!({ "integerValue": i.to_string() }),
            Value::Double(d) => json!({ "doubleValue": d }),
            Value::String(s) => json!({ "stringValue": s }),
            Value::Array(items) => {
                let values: Vec<serde_json::Value> = items.iter().map(Value::to_wire).collect();
                json!({ "arrayValue": { "values": values } })
            }
            Value::Map(fields) => {
                let mut wire = serde_json::Map::new();
                for (k, v) in fields {
                    wire.insert(k.clone(), v.to_wire());
                }
                json!({ "mapValue": { "fields": wire } })
            }
        }
    }

    /// Decode from the wire form. Unknown type keys are decode errors.
    pub fn from_wire(wire: &serde_json::Value) -> RemoteResult<Self> {
        let obj = wire
            .as_object()
            .ok_or_else(|| RemoteError::Decode(format!("value is not an object: {wire}")))?;
        let (kind, inner) = obj
            .iter()
            .next()
            .ok_or_else(|| RemoteError::Decode("empty value object".into()))?;

        match kind.as_str() {
            "nullValue" => Ok(Value::Null),
            "booleanValue" => inner
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| RemoteError::Decode(format!("booleanValue not a bool: {inner}"))),
            "integerValue" => {
                // The wire carries integers as decimal strings, but be
                // tolerant of plain numbers
                if let Some(s) = inner.as_str() {
                    s.parse::<i64>()
                        .map(Value::Integer)
                        .map_err(|e| RemoteError::Decode(format!("bad integerValue '{s}': {e}")))
                } else if let Some(i) = inner.as_i64() {
                    Ok(Value::Integer(i))
                } else {
                    Err(RemoteError::Decode(format!("bad integerValue: {inner}")))
                }
            }
            "doubleValue" => inner
                .as_f64()
                .map(Value::Double)
                .ok_or_else(|| RemoteError::Decode(format!("doubleValue not a number: {inner}"))),
            "stringValue" => inner
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(|| RemoteError::Decode(format!("stringValue not a string: {inner}"))),
            "arrayValue" => {
                // A missing "values" key means an empty array
                let values = inner.get("values").and_then(|v| v.as_array());
                let items = match values {
                    Some(arr) => arr.iter().map(Value::from_wire).collect::<RemoteResult<_>>()?,
                    None => Vec::new(),
                };
                Ok(Value::Array(items))
            }
            "mapValue" => {
                let fields = inner.get("fields").and_then(|v| v.as_object());
                let mut map = BTreeMap::new();
                if let Some(obj) = fields {
                    for (k, v) in obj {
                        map.insert(k.clone(), Value::from_wire(v)?);
                    }
                }
                Ok(Value::Map(map))
            }
            other => Err(RemoteError::Decode(format!("unknown value kind: {other}"))),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
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

/// A remote document: a flat-or-shallow-nested map of typed values.
/// The document id is carried separately (it is the URL path segment).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub fields: BTreeMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.fields.get(name) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.fields.get(name) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Encode as the wire's `{"fields": {...}}` body.
    pub fn to_wire(&self) -> serde_json::Value {
        let mut wire = serde_json::Map::new();
        for (k, v) in &self.fields {
            wire.insert(k.clone(), v.to_wire());
        }
        json!({ "fields": wire })
    }

    /// Decode from a wire document body. A missing `fields` key is an
    /// empty document (the wire omits it for documents with no fields).
    pub fn from_wire(wire: &serde_json::Value) -> RemoteResult<Self> {
        let mut fields = BTreeMap::new();
        if let Some(obj) = wire.get("fields").and_then(|f| f.as_object()) {
            for (k, v) in obj {
                fields.insert(k.clone(), Value::from_wire(v)?);
            }
        }
        Ok(Self { fields })
    }
}
