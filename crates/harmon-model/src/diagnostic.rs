use serde::{Deserialize, Serialize};

/// A structured run-log entry: which target the problem concerns and why.
///
/// Diagnostics never halt a pipeline run; they are collected and published
/// so an operator can correct the rule or data and re-trigger manually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub schema: String,
    pub variable: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        schema: impl Into<String>,
        variable: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            variable: variable.into(),
            message: message.into(),
        }
    }
}
