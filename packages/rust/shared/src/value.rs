//! Field values carried by exported Firestore documents.
//!
//! The export reader hands us loosely-typed values (JSON-like data plus native
//! timestamps). Everything is normalized into the closed [`Value`] variant
//! so JSON output, search, and CSV rendering share one set of rules.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered field mapping. Iteration order is insertion order.
pub type Fields = IndexMap<String, Value>;

/// A single document field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// A UTC instant. Serialized as an RFC 3339 string.
    Timestamp(DateTime<Utc>),
    List(Vec<Value>),
    Map(Fields),
}

impl Value {
    /// Build a number value from a float.
    ///
    /// NaN and infinities have no JSON form; they are kept as their string
    /// spelling instead of being dropped.
    pub fn from_f64(f: f64) -> Self {
        match serde_json::Number::from_f64(f) {
            Some(n) => Self::Number(n),
            None => Self::String(f.to_string()),
        }
    }

    /// Short type label used by the viewer.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Timestamp(_) => "timestamp",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Convert into a `serde_json::Value`, turning timestamps into strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Timestamp(t) => serde_json::Value::String(format_timestamp(t)),
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Self::Map(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Compact JSON text for this value (insertion-ordered maps).
    pub fn to_compact_json(&self) -> String {
        // Serializing a `serde_json::Value` into a String cannot fail.
        serde_json::to_string(&self.to_json()).unwrap_or_default()
    }
}

/// Format a timestamp as RFC 3339 with a `Z` suffix, keeping sub-second
/// digits only when they are non-zero.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Text coercion used for searching and display.
///
/// Strings render verbatim, lists and maps as compact JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Timestamp(t) => f.write_str(&format_timestamp(t)),
            Self::List(_) | Self::Map(_) => f.write_str(&self.to_compact_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Timestamp(t) => serializer.serialize_str(&format_timestamp(t)),
            Self::List(items) => serializer.collect_seq(items),
            Self::Map(fields) => serializer.collect_map(fields),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::from_f64(f)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

impl From<Fields> for Value {
    fn from(fields: Fields) -> Self {
        Self::Map(fields)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_map() -> Value {
        let mut inner = Fields::new();
        inner.insert("zeta".into(), Value::from(1));
        inner.insert("alpha".into(), Value::from("a"));
        Value::Map(inner)
    }

    #[test]
    fn timestamp_serializes_as_iso_string() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let json = serde_json::to_string(&Value::Timestamp(t)).unwrap();
        assert_eq!(json, "\"2024-03-01T12:30:00Z\"");
    }

    #[test]
    fn timestamp_keeps_subsecond_digits() {
        let t = Utc.timestamp_millis_opt(1_700_000_000_250).unwrap();
        assert_eq!(format_timestamp(&t), "2023-11-14T22:13:20.250Z");
    }

    #[test]
    fn non_finite_floats_become_strings() {
        assert_eq!(Value::from_f64(f64::NAN), Value::String("NaN".into()));
        assert_eq!(Value::from_f64(f64::INFINITY), Value::String("inf".into()));
        assert!(matches!(Value::from_f64(1.5), Value::Number(_)));
    }

    #[test]
    fn map_order_survives_json() {
        let json = serde_json::to_string(&sample_map()).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":"a"}"#);

        let parsed: Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<_> = parsed.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn display_coercion() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::from("The Beatles").to_string(), "The Beatles");
        assert_eq!(
            Value::List(vec![Value::from(1), Value::from("x")]).to_string(),
            r#"[1,"x"]"#
        );
        assert_eq!(sample_map().to_string(), r#"{"zeta":1,"alpha":"a"}"#);
    }

    #[test]
    fn to_json_converts_nested_timestamps() {
        let t = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        let v = Value::List(vec![Value::Timestamp(t), Value::Null]);
        assert_eq!(v.to_json(), serde_json::json!(["2020-01-02T03:04:05Z", null]));
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
