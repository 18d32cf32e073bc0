use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::TypeError;

/// Store-native representation of a record: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, Value>;

/// A decoded entity plus the names of fields that fell back to defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded<T> {
    pub value: T,
    /// Fields that were missing or had the wrong type.
    pub defaulted: Vec<&'static str>,
}

impl<T> Decoded<T> {
    /// Returns `true` if every field decoded as written.
    pub fn is_clean(&self) -> bool {
        self.defaulted.is_empty()
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Parse a document from raw JSON bytes.
pub fn parse_document(bytes: &[u8]) -> Result<Document, TypeError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| TypeError::Serialization(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(TypeError::NotAnObject(value_kind(&other))),
    }
}

/// Encode a document as pretty-printed JSON bytes.
pub fn encode_document(document: &Document) -> Result<Vec<u8>, TypeError> {
    serde_json::to_vec_pretty(document).map_err(|e| TypeError::Serialization(e.to_string()))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Lenient field extraction. Each accessor substitutes a default when the
/// field is absent or mistyped and remembers the field name.
pub(crate) struct FieldReader<'a> {
    document: &'a Document,
    defaulted: Vec<&'static str>,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(document: &'a Document) -> Self {
        Self {
            document,
            defaulted: Vec::new(),
        }
    }

    pub(crate) fn string(&mut self, key: &'static str) -> String {
        match self.document.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => {
                self.defaulted.push(key);
                String::new()
            }
        }
    }

    pub(crate) fn u64(&mut self, key: &'static str) -> u64 {
        let parsed = self.document.get(key).and_then(|v| match v {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            }),
            _ => None,
        });
        parsed.unwrap_or_else(|| {
            self.defaulted.push(key);
            0
        })
    }

    pub(crate) fn i64(&mut self, key: &'static str) -> i64 {
        let parsed = self.document.get(key).and_then(|v| match v {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| {
                        f.is_finite()
                            && f.fract() == 0.0
                            && *f >= i64::MIN as f64
                            && *f <= i64::MAX as f64
                    })
                    .map(|f| f as i64)
            }),
            _ => None,
        });
        parsed.unwrap_or_else(|| {
            self.defaulted.push(key);
            0
        })
    }

    pub(crate) fn bool(&mut self, key: &'static str) -> bool {
        match self.document.get(key) {
            Some(Value::Bool(b)) => *b,
            _ => {
                self.defaulted.push(key);
                false
            }
        }
    }

    pub(crate) fn object(&mut self, key: &'static str) -> BTreeMap<String, Value> {
        match self.document.get(key) {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => {
                self.defaulted.push(key);
                BTreeMap::new()
            }
        }
    }

    pub(crate) fn finish<T>(self, value: T) -> Decoded<T> {
        Decoded {
            value,
            defaulted: self.defaulted,
        }
    }
}
