//! Document value model
//!
//! Documents are flat string-keyed maps of tagged values. The store keeps
//! its own timestamp representation (`Timestamp`) next to the native chrono
//! date type so callers can hand over either before persistence.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A stored document: field name → value, deterministically ordered.
pub type Document = BTreeMap<String, Value>;

/// Store-native timestamp (seconds + nanoseconds since the Unix epoch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos(),
        }
    }

    /// Converts back to a chrono date. Returns `None` when out of range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanos).single()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}.{:09}", self.seconds, self.nanos),
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    /// Store-native timestamp
    Timestamp(Timestamp),
    /// Native date supplied by a caller
    DateTime(DateTime<Utc>),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::DateTime(_) => "datetime",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Whether this value, or any value nested in it, is NaN or infinite.
    pub fn has_non_finite_number(&self) -> bool {
        match self {
            Value::Number(n) => !n.is_finite(),
            Value::Array(items) => items.iter().any(Value::has_non_finite_number),
            Value::Map(map) => map.values().any(Value::has_non_finite_number),
            _ => false,
        }
    }

    /// Converts plain JSON into a value.
    ///
    /// Two object shapes are recognized as dates:
    /// - `{"$date": "<rfc3339>"}` becomes `Value::DateTime`
    /// - `{"$timestamp": {"seconds": s, "nanos": n}}` becomes `Value::Timestamp`
    ///
    /// Anything else maps structurally; no string is ever coerced.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(obj) => {
                if let Some(value) = date_from_json(&obj) {
                    return value;
                }
                Value::Map(
                    obj.into_iter()
                        .map(|(k, v)| (k, Value::from_json(v)))
                        .collect(),
                )
            }
        }
    }

    /// Converts the value to plain JSON, using the same date shapes
    /// `from_json` accepts.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => json!(b),
            Value::Number(n) => json!(n),
            Value::String(s) => json!(s),
            Value::Timestamp(ts) => json!({
                "$timestamp": { "seconds": ts.seconds, "nanos": ts.nanos }
            }),
            Value::DateTime(dt) => json!({ "$date": dt.to_rfc3339() }),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

fn date_from_json(obj: &serde_json::Map<String, serde_json::Value>) -> Option<Value> {
    if obj.len() != 1 {
        return None;
    }

    if let Some(raw) = obj.get("$date").and_then(|v| v.as_str()) {
        let dt = DateTime::parse_from_rfc3339(raw).ok()?;
        return Some(Value::DateTime(dt.with_timezone(&Utc)));
    }

    let ts = obj.get("$timestamp")?.as_object()?;
    let seconds = ts.get("seconds")?.as_i64()?;
    let nanos = ts.get("nanos").and_then(|n| n.as_u64()).unwrap_or(0);
    let nanos = u32::try_from(nanos).ok()?;
    Some(Value::Timestamp(Timestamp { seconds, nanos }))
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

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

/// Converts a JSON object into a document. Non-object input yields `None`.
pub fn document_from_json(json: serde_json::Value) -> Option<Document> {
    match Value::from_json(json) {
        Value::Map(map) => Some(map),
        _ => None,
    }
}

/// Converts a document into a JSON object.
pub fn document_to_json(doc: &Document) -> serde_json::Value {
    serde_json::Value::Object(doc.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
}

/// Location of a document: collection + document id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentPath {
    pub collection: String,
    pub id: String,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
