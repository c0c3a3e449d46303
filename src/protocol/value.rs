//! Primitive values carried by boxes, options and the capture buffer.
//!
//! The wire is loosely typed: any JSON value may show up where a primitive is
//! expected. These types are the closed set the rest of the crate works with;
//! conversion from raw JSON happens once, at the protocol boundary.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};
use std::fmt;

/// A primitive value: string, number or boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean primitive.
    Bool(bool),
    /// Numeric primitive. Integers stay integers on the wire.
    Number(Number),
    /// String primitive.
    String(String),
}

impl Value {
    /// Convert a raw JSON value, returning `None` for null, arrays and objects.
    #[must_use]
    pub fn from_json(raw: &JsonValue) -> Option<Self> {
        match raw {
            JsonValue::Bool(b) => Some(Value::Bool(*b)),
            JsonValue::Number(n) => Some(Value::Number(n.clone())),
            JsonValue::String(s) => Some(Value::String(s.clone())),
            _ => None,
        }
    }

    /// Build a numeric value from an `f64`.
    ///
    /// Non-finite inputs have no JSON representation and yield `None`.
    #[must_use]
    pub fn from_f64(n: f64) -> Option<Self> {
        Number::from_f64(n).map(Value::Number)
    }

    /// Numeric view of this value, if it is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// String view of this value, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value is a number.
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// Whether this value is a string.
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write_number(f, n),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

/// Largest magnitude an `f64` holds without losing integer precision (2^53).
const MAX_EXACT_F64: f64 = 9_007_199_254_740_992.0;

/// Integral floats print without a fraction, so `2.0` reads `2`.
fn write_number(f: &mut fmt::Formatter<'_>, n: &Number) -> fmt::Result {
    if n.is_f64()
        && let Some(x) = n.as_f64()
        && x.fract() == 0.0
        && x.abs() <= MAX_EXACT_F64
    {
        return write!(f, "{}", x as i64);
    }
    write!(f, "{}", n)
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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

/// The content of one capture-buffer slot, or a box's `value` attribute.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// No value.
    #[default]
    Null,
    /// A single primitive.
    Scalar(Value),
    /// A list of primitives (multi-select, ranges, tags).
    List(Vec<Value>),
}

impl FieldValue {
    /// Convert a raw JSON value.
    ///
    /// Returns `None` for objects and for arrays holding anything other than
    /// primitives.
    #[must_use]
    pub fn from_json(raw: &JsonValue) -> Option<Self> {
        match raw {
            JsonValue::Null => Some(FieldValue::Null),
            JsonValue::Array(items) => items
                .iter()
                .map(Value::from_json)
                .collect::<Option<Vec<_>>>()
                .map(FieldValue::List),
            other => Value::from_json(other).map(FieldValue::Scalar),
        }
    }

    /// The scalar held by this slot, if any.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// The list held by this slot, if any.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            FieldValue::List(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this slot holds nothing.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Scalar(v)
    }
}

impl From<Vec<Value>> for FieldValue {
    fn from(v: Vec<Value>) -> Self {
        FieldValue::List(v)
    }
}

/// JavaScript-style truthiness of a raw JSON value.
///
/// Used where the wire accepts "absent or falsy" as "nothing".
#[must_use]
pub fn is_falsy(raw: &JsonValue) -> bool {
    match raw {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64().is_none_or(|f| f == 0.0 || f.is_nan()),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_from_json_rejects_containers() {
        assert_eq!(Value::from_json(&json!("a")), Some(Value::from("a")));
        assert_eq!(Value::from_json(&json!(true)), Some(Value::Bool(true)));
        assert!(Value::from_json(&json!(3)).unwrap().is_number());
        assert!(Value::from_json(&json!(null)).is_none());
        assert!(Value::from_json(&json!([1])).is_none());
        assert!(Value::from_json(&json!({"a": 1})).is_none());
    }

    #[test]
    fn test_value_display_matches_wire_text() {
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::from_f64(1.5).unwrap().to_string(), "1.5");
        assert_eq!(Value::from_f64(2.0).unwrap().to_string(), "2");
        assert_eq!(Value::from_f64(-0.0).unwrap().to_string(), "0");
        assert_eq!(Value::from_f64(1e300).unwrap().to_string(), "1e300");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::from("red").to_string(), "red");
    }

    #[test]
    fn test_integers_stay_integers() {
        let v = Value::from_json(&json!(7)).unwrap();
        assert_eq!(serde_json::to_string(&v).unwrap(), "7");
    }

    #[test]
    fn test_field_value_serialization() {
        let buffer = vec![
            FieldValue::Scalar(Value::from(1)),
            FieldValue::Null,
            FieldValue::List(vec![Value::from("a"), Value::from("b")]),
        ];
        assert_eq!(
            serde_json::to_value(&buffer).unwrap(),
            json!([1, null, ["a", "b"]])
        );

        let back: Vec<FieldValue> = serde_json::from_value(json!([1, null, ["a", "b"]])).unwrap();
        assert_eq!(back, buffer);
    }

    #[test]
    fn test_field_value_from_json() {
        assert_eq!(FieldValue::from_json(&json!(null)), Some(FieldValue::Null));
        assert_eq!(
            FieldValue::from_json(&json!([3, 7])),
            Some(FieldValue::List(vec![Value::from(3), Value::from(7)]))
        );
        assert!(FieldValue::from_json(&json!([1, [2]])).is_none());
        assert!(FieldValue::from_json(&json!({"x": 1})).is_none());
    }

    #[test]
    fn test_falsy() {
        assert!(is_falsy(&json!(null)));
        assert!(is_falsy(&json!(false)));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!("")));
        assert!(!is_falsy(&json!("a b")));
        assert!(!is_falsy(&json!([])));
        assert!(!is_falsy(&json!({})));
    }
}
