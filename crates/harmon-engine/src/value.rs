//! Scalar values flowing through rule evaluation.
//!
//! "Could not resolve" is represented as `Option::None` everywhere in the
//! engine: resolution, group evaluation, and the compiled row function all
//! return `Option<Value>`, so MISSING is an inspectable return value rather
//! than control flow.

use polars::prelude::AnyValue;
use serde_json::Value as Json;

use harmon_ingest::{any_to_string_non_empty, format_numeric, parse_f64};

/// A resolved scalar: numeric, textual, or boolean.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    /// Converts a frame cell. Null or blank cells are MISSING; numeric text
    /// reads as a number, the way the source tables type their columns.
    pub fn from_any(value: AnyValue<'_>) -> Option<Self> {
        match value {
            AnyValue::Null => None,
            AnyValue::Boolean(b) => Some(Self::Bool(b)),
            AnyValue::Float32(v) => Some(Self::Num(f64::from(v))),
            AnyValue::Float64(v) => Some(Self::Num(v)),
            AnyValue::Int8(v) => Some(Self::Num(f64::from(v))),
            AnyValue::Int16(v) => Some(Self::Num(f64::from(v))),
            AnyValue::Int32(v) => Some(Self::Num(f64::from(v))),
            AnyValue::Int64(v) => Some(Self::Num(v as f64)),
            AnyValue::UInt8(v) => Some(Self::Num(f64::from(v))),
            AnyValue::UInt16(v) => Some(Self::Num(f64::from(v))),
            AnyValue::UInt32(v) => Some(Self::Num(f64::from(v))),
            AnyValue::UInt64(v) => Some(Self::Num(v as f64)),
            other => any_to_string_non_empty(other)
                .map(|s| parse_f64(&s).map_or(Self::Text(s), Self::Num)),
        }
    }

    /// Converts a rule literal. JSON null is MISSING; numeric strings are
    /// read as numbers so authored literals like "5" behave like 5.
    pub fn from_json(value: &Json) -> Option<Self> {
        match value {
            Json::Null => None,
            Json::Bool(b) => Some(Self::Bool(*b)),
            Json::Number(n) => n.as_f64().map(Self::Num),
            Json::String(s) => {
                if s.trim().is_empty() {
                    None
                } else if let Some(n) = parse_f64(s) {
                    Some(Self::Num(n))
                } else {
                    Some(Self::Text(s.clone()))
                }
            }
            other => Some(Self::Text(other.to_string())),
        }
    }

    /// Numeric view, parsing text on demand.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            Self::Text(s) => parse_f64(s),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        }
    }

    /// Truthiness matching the original engine: nonzero numbers, non-empty
    /// text, and `true` are truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Num(n) => *n != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::Bool(b) => *b,
        }
    }

    /// The string written back into a frame column.
    pub fn render(&self) -> String {
        match self {
            Self::Num(n) => format_numeric(*n),
            Self::Text(s) => s.clone(),
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_literals_coerce() {
        assert_eq!(Value::from_json(&serde_json::json!(5)), Some(Value::Num(5.0)));
        assert_eq!(
            Value::from_json(&serde_json::json!("5")),
            Some(Value::Num(5.0))
        );
        assert_eq!(
            Value::from_json(&serde_json::json!("yes")),
            Some(Value::Text("yes".to_string()))
        );
        assert_eq!(Value::from_json(&serde_json::json!(null)), None);
        assert_eq!(Value::from_json(&serde_json::json!("")), None);
    }

    #[test]
    fn truthiness() {
        assert!(Value::Num(3.0).is_truthy());
        assert!(!Value::Num(0.0).is_truthy());
        assert!(Value::Text("0".to_string()).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
    }

    #[test]
    fn renders_whole_numbers_without_fraction() {
        assert_eq!(Value::Num(68.0).render(), "68");
        assert_eq!(Value::Num(0.6).render(), "0.6");
        assert_eq!(Value::Bool(true).render(), "1");
    }
}
