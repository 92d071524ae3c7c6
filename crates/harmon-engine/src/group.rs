//! Group evaluation: conversion chaining plus the logic block.

use polars::prelude::DataFrame;

use harmon_model::Group;

use crate::operators::{apply_binary, reduce_logic};
use crate::resolve::resolve;
use crate::value::Value;

/// Evaluates one group for one row.
///
/// The first conversion seeds the candidate (its operator is ignored);
/// every subsequent conversion is resolved and combined via its operator.
/// Any MISSING resolution aborts the whole group: there is no partial
/// result, and the logic block never runs.
///
/// Without a logic block (or with an empty imputations list) the raw
/// candidate is returned; with one, each imputation compares the candidate
/// against its literal and the booleans are reduced with the logic
/// operator (default ALL).
pub fn evaluate_group(group: &Group, frame: &DataFrame, row: usize, project: &str) -> Option<Value> {
    let mut conversions = group.conversions.iter();
    let seed = conversions.next()?;
    let mut current = resolve(seed, frame, row, project)?;

    for conversion in conversions {
        let next = resolve(conversion, frame, row, project)?;
        let Some(op) = conversion.operator() else {
            // Wire-parsed rules reject this shape at deserialization; this
            // guards groups assembled in code.
            return None;
        };
        current = apply_binary(op, &current, &next)?;
    }

    let Some(logic) = group.logic.as_ref().filter(|logic| !logic.imputations.is_empty()) else {
        return Some(current);
    };

    let mut checks = Vec::with_capacity(logic.imputations.len());
    for imputation in &logic.imputations {
        let threshold = Value::from_json(&imputation.value)?;
        let outcome = apply_binary(imputation.operator, &current, &threshold)?;
        checks.push(outcome.is_truthy());
    }
    Some(Value::Bool(reduce_logic(
        logic.operator.unwrap_or_default(),
        checks,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use harmon_model::{BinaryOp, Conversion, Imputation, Logic, LogicOp};
    use polars::prelude::{NamedFrom, Series};

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("p_vitals_x".into(), vec![Some("3")]).into(),
            Series::new("p_vitals_absent".into(), vec![None::<&str>]).into(),
        ])
        .unwrap()
    }

    fn by_variable(attribute: &str) -> Conversion {
        Conversion::ByVariable {
            schema: "vitals".to_string(),
            attribute: attribute.to_string(),
            operator: None,
        }
    }

    fn by_value(value: i64, op: BinaryOp) -> Conversion {
        Conversion::ByValue {
            value: serde_json::json!(value),
            operator: Some(op),
        }
    }

    #[test]
    fn empty_conversions_is_missing() {
        let group = Group::default();
        assert_eq!(evaluate_group(&group, &frame(), 0, "p"), None);
    }

    #[test]
    fn missing_seed_aborts_group() {
        let group = Group {
            conversions: vec![by_variable("absent"), by_value(5, BinaryOp::Add)],
            logic: None,
        };
        assert_eq!(evaluate_group(&group, &frame(), 0, "p"), None);
    }

    #[test]
    fn arithmetic_chain() {
        let cases = [
            (BinaryOp::Add, 8.0),
            (BinaryOp::Sub, -2.0),
            (BinaryOp::Mul, 15.0),
            (BinaryOp::Div, 0.6),
        ];
        for (op, expected) in cases {
            let group = Group {
                conversions: vec![by_variable("x"), by_value(5, op)],
                logic: None,
            };
            assert_eq!(
                evaluate_group(&group, &frame(), 0, "p"),
                Some(Value::Num(expected)),
                "{op:?}"
            );
        }
    }

    #[test]
    fn logic_block_reduces_to_boolean() {
        let group = Group {
            conversions: vec![by_variable("x")],
            logic: Some(Logic {
                operator: Some(LogicOp::All),
                imputations: vec![Imputation {
                    operator: BinaryOp::Lt,
                    value: serde_json::json!(5),
                }],
            }),
        };
        assert_eq!(
            evaluate_group(&group, &frame(), 0, "p"),
            Some(Value::Bool(true))
        );

        let group = Group {
            conversions: vec![by_variable("x")],
            logic: Some(Logic {
                operator: Some(LogicOp::All),
                imputations: vec![Imputation {
                    operator: BinaryOp::Gt,
                    value: serde_json::json!(5),
                }],
            }),
        };
        assert_eq!(
            evaluate_group(&group, &frame(), 0, "p"),
            Some(Value::Bool(false))
        );
    }

    #[test]
    fn empty_logic_returns_raw_scalar() {
        let group = Group {
            conversions: vec![by_variable("x")],
            logic: Some(Logic {
                operator: None,
                imputations: vec![],
            }),
        };
        assert_eq!(evaluate_group(&group, &frame(), 0, "p"), Some(Value::Num(3.0)));
    }
}
