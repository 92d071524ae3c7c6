//! Conversion resolution against a frame row.

use polars::prelude::{AnyValue, DataFrame};

use harmon_ingest::qualified_column;
use harmon_model::Conversion;

use crate::value::Value;

/// Resolves a conversion for one row, `None` meaning MISSING.
///
/// Resolution and missing-detection are fused: a single absent input
/// anywhere in a group must abort that group's computation, so the caller
/// treats `None` as a short-circuit, never as a computed value.
pub fn resolve(conversion: &Conversion, frame: &DataFrame, row: usize, project: &str) -> Option<Value> {
    match conversion {
        Conversion::ByVariable {
            schema, attribute, ..
        } => {
            let column = qualified_column(project, schema, attribute);
            let series = frame.column(&column).ok()?;
            Value::from_any(series.get(row).unwrap_or(AnyValue::Null))
        }
        Conversion::ByValue { value, .. } => Value::from_json(value),
    }
}
