//! Runtime value representation
//!
//! This module defines the [`Value`] enum, the closed set of values an MPL
//! program can compute with.
//!
//! # Value Types
//!
//! - [`Value::Number`]: 64-bit float (all arithmetic is floating point)
//! - [`Value::Str`]: UTF-8 string
//! - [`Value::Array`]: ordered list of values
//! - [`Value::Object`]: string-keyed record that keeps insertion order
//!
//! # Numeric coercion
//!
//! Arithmetic on non-numbers goes through [`Value::to_number`], the single
//! place the coercion rules live:
//!
//! | value  | number                                            |
//! |--------|---------------------------------------------------|
//! | number | itself                                            |
//! | string | parsed value, or the string length when not numeric |
//! | array  | first element (recursively), or 0 when empty      |
//! | object | first property (recursively), or 0 when empty    |
//!
//! # Serialization
//!
//! Values serialize untagged. JSON has no spelling for non-finite numbers,
//! so those are written as the strings `"Infinity"`, `"-Infinity"` and
//! `"NaN"` and read back as numbers. A string value with exactly one of
//! those spellings therefore comes back as a number.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime values in the interpreter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(#[serde(with = "number_repr")] f64),
    Str(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Number(0.0)
    }
}

impl Value {
    /// Numeric view of any value.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return 0.0;
                }
                match trimmed.parse::<f64>() {
                    Ok(n) if !n.is_nan() => n,
                    _ => s.chars().count() as f64,
                }
            }
            Value::Array(items) => items.first().map_or(0.0, Value::to_number),
            Value::Object(fields) => {
                fields.values().next().map_or(0.0, Value::to_number)
            }
        }
    }

    /// Truthiness used by `if`, `while` and `for` conditions.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// Type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Whether the value is an aggregate (array or object).
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// Rough in-memory footprint in bytes, used by the timeline estimate.
    pub fn estimated_size(&self) -> usize {
        match self {
            Value::Number(_) => 8,
            Value::Str(s) => s.len() * 2,
            Value::Array(items) => {
                items.iter().map(Value::estimated_size).sum::<usize>() + 8
            }
            Value::Object(fields) => {
                fields
                    .iter()
                    .map(|(k, v)| k.len() * 2 + v.estimated_size())
                    .sum::<usize>()
                    + 8
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Number(if b { 1.0 } else { 0.0 })
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// Format a number the way scripts expect to see it: integers without a
/// fractional part, `Infinity`/`NaN` spelled out.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

mod number_repr {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if n.is_finite() {
            serializer.serialize_f64(*n)
        } else {
            serializer.serialize_str(&super::format_number(*n))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(NumberVisitor)
    }

    struct NumberVisitor;

    impl<'de> Visitor<'de> for NumberVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number, \"Infinity\", \"-Infinity\" or \"NaN\"")
        }

        fn visit_f64<E: de::Error>(self, n: f64) -> Result<f64, E> {
            Ok(n)
        }

        fn visit_i64<E: de::Error>(self, n: i64) -> Result<f64, E> {
            Ok(n as f64)
        }

        fn visit_u64<E: de::Error>(self, n: u64) -> Result<f64, E> {
            Ok(n as f64)
        }

        fn visit_str<E: de::Error>(self, s: &str) -> Result<f64, E> {
            match s {
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                "NaN" => Ok(f64::NAN),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Object(fields) => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match value {
                        Value::Str(s) => write!(f, "{}: \"{}\"", key, s)?,
                        other => write!(f, "{}: {}", key, other)?,
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::from("42").to_number(), 42.0);
        assert_eq!(Value::from("hello").to_number(), 5.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert_eq!(Value::Array(vec![]).to_number(), 0.0);
        assert_eq!(
            Value::Array(vec![Value::from("7"), Value::Number(1.0)]).to_number(),
            7.0
        );

        let mut fields = IndexMap::new();
        fields.insert("b".to_string(), Value::Number(2.0));
        fields.insert("a".to_string(), Value::Number(1.0));
        assert_eq!(Value::Object(fields).to_number(), 2.0);
        assert_eq!(Value::Object(IndexMap::new()).to_number(), 0.0);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(
            Value::Array(vec![Value::Number(1.0), Value::from("x")]).to_string(),
            "1,x"
        );

        let mut fields = IndexMap::new();
        fields.insert("a".to_string(), Value::Number(1.0));
        fields.insert("b".to_string(), Value::from("s"));
        assert_eq!(Value::Object(fields).to_string(), "{a: 1, b: \"s\"}");
    }

    #[test]
    fn test_non_finite_numbers_survive_json() {
        let values = Value::Array(vec![
            Value::Number(f64::INFINITY),
            Value::Number(f64::NEG_INFINITY),
            Value::Number(2.5),
            Value::from("inf"),
        ]);
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"["Infinity","-Infinity",2.5,"inf"]"#);
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), values);

        let nan: Value = serde_json::from_str(r#""NaN""#).unwrap();
        assert!(matches!(nan, Value::Number(n) if n.is_nan()));
        assert_eq!(
            serde_json::from_str::<Value>("3").unwrap(),
            Value::Number(3.0)
        );
    }
}
