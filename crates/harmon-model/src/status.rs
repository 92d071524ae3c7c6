use serde::{Deserialize, Serialize};

/// Review state of a mapping rule.
///
/// Only approved rules are executed by the pipeline; everything else is
/// reported as skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewStatus {
    #[default]
    Review,
    InProgress,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::InProgress => "in-progress",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}
