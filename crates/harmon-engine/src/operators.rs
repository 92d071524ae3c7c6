//! The fixed operator library.
//!
//! Binary comparisons and arithmetic over two scalars, plus the ANY/ALL/ID
//! reductions over an ordered sequence. Tokens are closed enums from
//! `harmon-model`, so there is no unknown-operator path at evaluation time.

use harmon_model::{BinaryOp, Condition, LogicOp};

use crate::value::Value;

/// Applies a binary operator.
///
/// Comparisons compare numerically when both operands coerce to f64 and
/// lexically otherwise. Arithmetic requires numeric operands; a non-numeric
/// operand or a zero divisor yields MISSING, which aborts the enclosing
/// group.
pub fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Value> {
    if op.is_comparison() {
        return Some(Value::Bool(compare(op, lhs, rhs)));
    }
    let left = lhs.as_f64()?;
    let right = rhs.as_f64()?;
    let result = match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => {
            if right == 0.0 {
                return None;
            }
            left / right
        }
        // Comparisons handled above.
        _ => unreachable!("comparison operator in arithmetic path"),
    };
    Some(Value::Num(result))
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> bool {
    if let (Some(left), Some(right)) = (lhs.as_f64(), rhs.as_f64()) {
        return match op {
            BinaryOp::Eq => left == right,
            BinaryOp::Ne => left != right,
            BinaryOp::Lt => left < right,
            BinaryOp::Lte => left <= right,
            BinaryOp::Gt => left > right,
            BinaryOp::Gte => left >= right,
            _ => unreachable!("arithmetic operator in comparison path"),
        };
    }
    let left = lhs.render();
    let right = rhs.render();
    match op {
        BinaryOp::Eq => left == right,
        BinaryOp::Ne => left != right,
        BinaryOp::Lt => left < right,
        BinaryOp::Lte => left <= right,
        BinaryOp::Gt => left > right,
        BinaryOp::Gte => left >= right,
        _ => unreachable!("arithmetic operator in comparison path"),
    }
}

/// Reduces an ordered sequence of group results with the rule condition.
///
/// `ANY([]) = false` and `ALL([]) = true` (the standard empty-sequence
/// identities); `ID` returns the first element, MISSING over empty input.
pub fn reduce_condition(
    condition: Condition,
    values: impl IntoIterator<Item = Value>,
) -> Option<Value> {
    let mut iter = values.into_iter();
    match condition {
        Condition::Any => Some(Value::Bool(iter.any(|value| value.is_truthy()))),
        Condition::All => Some(Value::Bool(iter.all(|value| value.is_truthy()))),
        Condition::Id => iter.next(),
    }
}

/// Reduces a group's per-imputation booleans with its logic operator.
pub fn reduce_logic(op: LogicOp, values: impl IntoIterator<Item = bool>) -> bool {
    let mut iter = values.into_iter();
    match op {
        LogicOp::Any => iter.any(|value| value),
        LogicOp::All => iter.all(|value| value),
    }
}
