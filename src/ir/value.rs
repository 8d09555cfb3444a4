//! Semantic values produced by the expression evaluator.
//!
//! Besides the usual JSON-like shapes there are two sentinels:
//! - [`Value::Unknown`]: depends on a variable or local with no resolvable value
//! - [`Value::Computed`]: depends on something only known at apply time
//!   (resource references, function calls, conditionals, splats, ...)
//!
//! Neither sentinel is an error, and both are distinct from an attribute
//! being absent.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

pub type Attributes = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Object(Attributes),
    Unknown,
    Computed,
}

impl Value {
    /// Unknown or Computed.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Unknown | Self::Computed)
    }

    /// Unknown/Computed anywhere inside the value.
    pub fn contains_indeterminate(&self) -> bool {
        match self {
            Self::Unknown | Self::Computed => true,
            Self::List(items) => items.iter().any(Value::contains_indeterminate),
            Self::Object(map) => map.values().any(Value::contains_indeterminate),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view. Strings that parse as numbers count.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// String form of a scalar. Containers, Null and the sentinels have none.
    pub fn to_scalar_string(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Object(_) => "object",
            Self::Unknown => "unknown",
            Self::Computed => "computed",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<Attributes> for Value {
    fn from(value: Attributes) -> Self {
        Self::Object(value)
    }
}

impl From<&hcl::Number> for Value {
    fn from(value: &hcl::Number) -> Self {
        if let Some(int) = value.as_i64() {
            return Self::Int(int);
        }
        match value.as_f64() {
            Some(float) => Self::Float(float),
            None => Self::Computed,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(int) => Self::Int(int),
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::List(items.into_iter().map(Into::into).collect()),
            Json::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::String(value) => serializer.serialize_str(value),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut ser = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    ser.serialize_entry(key, value)?;
                }
                ser.end()
            }
            Self::Unknown => serializer.serialize_str("(unknown)"),
            Self::Computed => serializer.serialize_str("(computed)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_indeterminate() {
        assert!(Value::Unknown.is_indeterminate());
        assert!(Value::Computed.is_indeterminate());
        assert!(!Value::Null.is_indeterminate());
        assert!(Value::List(vec![Value::Int(1), Value::Computed]).contains_indeterminate());
        let nested = Value::List(vec![Value::List(vec![Value::Unknown])]);
        assert!(!nested.is_indeterminate());
        assert!(nested.contains_indeterminate());
    }

    #[test]
    fn numeric_strings_have_numeric_view() {
        assert_eq!(Value::from("8080").as_f64(), Some(8080.0));
        assert_eq!(Value::from("http").as_f64(), None);
        assert_eq!(Value::Bool(true).as_f64(), None);
    }

    #[test]
    fn json_conversion_keeps_integers() {
        let value = Value::from(serde_json::json!({"port": 22, "ratio": 0.5, "tags": ["a"]}));
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        assert_eq!(map["port"], Value::Int(22));
        assert_eq!(map["ratio"], Value::Float(0.5));
        assert_eq!(map["tags"], Value::List(vec![Value::from("a")]));
    }

    #[test]
    fn serializes_sentinels_as_markers() {
        let json = serde_json::to_string(&Value::List(vec![Value::Unknown, Value::Computed]))
            .unwrap();
        assert_eq!(json, r#"["(unknown)","(computed)"]"#);
    }
}
