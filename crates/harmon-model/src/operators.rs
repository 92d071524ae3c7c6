//! Operator tokens used by imputation rules.
//!
//! These are closed enumerations so that an unknown token in a persisted
//! rule fails at deserialization, not deep inside evaluation.

use serde::{Deserialize, Serialize};

/// Binary comparison and arithmetic operators applied between two scalars.
///
/// Used both to chain conversions into a candidate value and to compare the
/// candidate against threshold values in a group's logic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "EQ")]
    Eq,
    #[serde(rename = "NE")]
    Ne,
    #[serde(rename = "LT")]
    Lt,
    #[serde(rename = "LTE")]
    Lte,
    #[serde(rename = "GT")]
    Gt,
    #[serde(rename = "GTE")]
    Gte,
    #[serde(rename = "ADD")]
    Add,
    #[serde(rename = "SUB")]
    Sub,
    #[serde(rename = "MUL")]
    Mul,
    #[serde(rename = "DIV")]
    Div,
}

impl BinaryOp {
    /// True for EQ/NE/LT/LTE/GT/GTE, which produce booleans.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Lte | Self::Gt | Self::Gte
        )
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Lt => "LT",
            Self::Lte => "LTE",
            Self::Gt => "GT",
            Self::Gte => "GTE",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
        }
    }
}

/// Boolean reduction over a group's per-imputation comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogicOp {
    #[serde(rename = "ANY")]
    Any,
    /// Default when a logic block omits the operator.
    #[default]
    #[serde(rename = "ALL")]
    All,
}

/// Top-level rule condition combining all group results.
///
/// `ANY`/`ALL` gate a fixed target choice; `ID` passes the first group's
/// raw scalar through as the computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Condition {
    #[serde(rename = "ANY")]
    Any,
    #[default]
    #[serde(rename = "ALL")]
    All,
    #[serde(rename = "ID")]
    Id,
}

impl Condition {
    pub fn token(self) -> &'static str {
        match self {
            Self::Any => "ANY",
            Self::All => "ALL",
            Self::Id => "ID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        let op: BinaryOp = serde_json::from_str("\"LTE\"").unwrap();
        assert_eq!(op, BinaryOp::Lte);
        assert_eq!(serde_json::to_string(&BinaryOp::Div).unwrap(), "\"DIV\"");

        let cond: Condition = serde_json::from_str("\"ID\"").unwrap();
        assert_eq!(cond, Condition::Id);
    }

    #[test]
    fn unknown_token_is_rejected() {
        assert!(serde_json::from_str::<BinaryOp>("\"MOD\"").is_err());
        assert!(serde_json::from_str::<LogicOp>("\"ID\"").is_err());
    }
}
