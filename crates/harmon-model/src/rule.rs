//! Mapping-rule wire format.
//!
//! Rules are persisted as semi-structured JSON authored by the mapping UI.
//! Field names and nesting are a compatibility contract and must be kept
//! exactly as written by the authoring side: `source_schema`,
//! `source_variable`, `target_schema`, `target_variable`, `choices_mapping`,
//! `condition`, `groups`, `conversions` (with `byVariable`/`byValue` flags),
//! `target_choice`, `forms`.
//!
//! The dict-shaped payload is converted into tagged variants here, at the
//! boundary, so the evaluator can match exhaustively instead of probing
//! keys at runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::ModelError;
use crate::operators::{BinaryOp, Condition, LogicOp};
use crate::status::ReviewStatus;

pub const DEFAULT_COLLECT_DATE_COLUMN: &str = "collect_date";

fn default_collect_date() -> String {
    DEFAULT_COLLECT_DATE_COLUMN.to_string()
}

/// A persisted mapping: review metadata plus the rule logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawMapping", into = "RawMapping")]
pub struct Mapping {
    /// Source project (study) the rule belongs to.
    pub study: String,
    pub status: ReviewStatus,
    pub description: Option<String>,
    pub rule: Rule,
}

/// The two kinds of mapping logic.
#[derive(Debug, Clone)]
pub enum Rule {
    Direct(DirectRule),
    Imputation(ImputationRule),
}

impl Rule {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Direct(_) => "direct",
            Self::Imputation(_) => "imputation",
        }
    }

    pub fn target_schema(&self) -> &str {
        match self {
            Self::Direct(rule) => &rule.target_schema,
            Self::Imputation(rule) => &rule.target_schema,
        }
    }

    pub fn target_variable(&self) -> &str {
        match self {
            Self::Direct(rule) => &rule.target_variable,
            Self::Imputation(rule) => &rule.target_variable,
        }
    }
}

/// One source choice code translated to one target choice code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceMap {
    pub source: String,
    pub target: String,
}

/// A 1:1 variable transform: value copy or choice-code translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectRule {
    pub source_schema: String,
    pub source_variable: String,
    pub target_schema: String,
    pub target_variable: String,
    /// Explicit source-code to target-code translation table. When absent
    /// the applier falls back to choice-to-value flattening or identity.
    #[serde(default)]
    pub choices_mapping: Option<Vec<ChoiceMap>>,
    #[serde(default = "default_collect_date")]
    pub source_collect_date: String,
    #[serde(default = "default_collect_date")]
    pub target_collect_date: String,
}

/// Target choice selected for an imputation rule.
///
/// The authoring UI writes an empty object when no choice is selected, so
/// both fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetChoice {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// A computed target value derived from one or more rule groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputationRule {
    pub target_schema: String,
    pub target_variable: String,
    #[serde(default)]
    pub target_choice: Option<TargetChoice>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub groups: Vec<Group>,
    /// (schema, variable) pairs referenced by the groups; used for
    /// collect-date reconciliation.
    #[serde(default)]
    pub forms: Vec<(String, String)>,
}

impl ImputationRule {
    /// The configured target choice code, treating an empty object or empty
    /// string the same as no choice at all.
    pub fn target_choice_name(&self) -> Option<&str> {
        self.target_choice
            .as_ref()
            .and_then(|choice| choice.name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

/// One candidate computation plus its threshold checks.
///
/// Every conversion after the first must carry an operator; a chained
/// conversion without one has no way to combine into the running candidate,
/// so it is rejected at deserialization rather than failing mid-evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "RawGroup")]
pub struct Group {
    pub conversions: Vec<Conversion>,
    pub logic: Option<Logic>,
}

/// Threshold checks applied to a group's computed candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Logic {
    #[serde(default)]
    pub operator: Option<LogicOp>,
    #[serde(default)]
    pub imputations: Vec<Imputation>,
}

/// A single comparison of the candidate value against a literal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputation {
    pub operator: BinaryOp,
    pub value: Json,
}

/// A single conversion step of a group.
///
/// The first conversion of a group seeds the candidate value; its operator,
/// if present, is ignored. Every subsequent conversion is combined into the
/// running candidate via its operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawConversion", into = "RawConversion")]
pub enum Conversion {
    /// Resolve from the current row by `{project}_{schema}_{attribute}`.
    ByVariable {
        schema: String,
        attribute: String,
        operator: Option<BinaryOp>,
    },
    /// A literal combined into the running candidate.
    ByValue {
        value: Json,
        operator: Option<BinaryOp>,
    },
}

impl Conversion {
    pub fn operator(&self) -> Option<BinaryOp> {
        match self {
            Self::ByVariable { operator, .. } | Self::ByValue { operator, .. } => *operator,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NamedRef {
    name: String,
}

/// Wire shape of a conversion entry.
///
/// Two shapes exist in persisted data: a flat one with `schema`/`attribute`
/// beside the flags, and a nested one where both live under `value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawConversion {
    #[serde(rename = "byVariable", default, skip_serializing_if = "is_false")]
    by_variable: bool,
    #[serde(rename = "byValue", default, skip_serializing_if = "is_false")]
    by_value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operator: Option<BinaryOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attribute: Option<NamedRef>,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Wire shape of a group; validated into [`Group`].
#[derive(Debug, Clone, Deserialize)]
struct RawGroup {
    #[serde(default)]
    conversions: Vec<Conversion>,
    #[serde(default)]
    logic: Option<Logic>,
}

impl TryFrom<RawGroup> for Group {
    type Error = ModelError;

    fn try_from(raw: RawGroup) -> Result<Self, Self::Error> {
        if raw
            .conversions
            .iter()
            .skip(1)
            .any(|conversion| conversion.operator().is_none())
        {
            return Err(ModelError::Rule(
                "chained conversion is missing an operator".into(),
            ));
        }
        Ok(Group {
            conversions: raw.conversions,
            logic: raw.logic,
        })
    }
}

fn nested_name(value: &Json, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|obj| obj.get("name"))
        .and_then(Json::as_str)
        .map(str::to_string)
}

impl TryFrom<RawConversion> for Conversion {
    type Error = ModelError;

    fn try_from(raw: RawConversion) -> Result<Self, Self::Error> {
        if raw.by_variable {
            let (schema, attribute) = match (raw.schema, raw.attribute) {
                (Some(schema), Some(attribute)) => (schema.name, attribute.name),
                _ => {
                    let value = raw.value.ok_or_else(|| {
                        ModelError::Rule(
                            "byVariable conversion has no schema/attribute reference".into(),
                        )
                    })?;
                    let schema = nested_name(&value, "schema").ok_or_else(|| {
                        ModelError::Rule("byVariable conversion has no schema name".into())
                    })?;
                    let attribute = nested_name(&value, "attribute").ok_or_else(|| {
                        ModelError::Rule("byVariable conversion has no attribute name".into())
                    })?;
                    (schema, attribute)
                }
            };
            Ok(Conversion::ByVariable {
                schema,
                attribute,
                operator: raw.operator,
            })
        } else if raw.by_value {
            let value = raw
                .value
                .ok_or_else(|| ModelError::Rule("byValue conversion has no value".into()))?;
            Ok(Conversion::ByValue {
                value,
                operator: raw.operator,
            })
        } else {
            Err(ModelError::Rule(
                "conversion is neither byVariable nor byValue".into(),
            ))
        }
    }
}

impl From<Conversion> for RawConversion {
    fn from(conversion: Conversion) -> Self {
        match conversion {
            Conversion::ByVariable {
                schema,
                attribute,
                operator,
            } => RawConversion {
                by_variable: true,
                by_value: false,
                value: None,
                operator,
                schema: Some(NamedRef { name: schema }),
                attribute: Some(NamedRef { name: attribute }),
            },
            Conversion::ByValue { value, operator } => RawConversion {
                by_variable: false,
                by_value: true,
                value: Some(value),
                operator,
                schema: None,
                attribute: None,
            },
        }
    }
}

/// Wire shape of a persisted mapping: a `type` tag selects which fields of
/// the `logic` payload are meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawMapping {
    study: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    logic: Json,
}

impl TryFrom<RawMapping> for Mapping {
    type Error = ModelError;

    fn try_from(raw: RawMapping) -> Result<Self, Self::Error> {
        let rule = match raw.kind.as_str() {
            "direct" => Rule::Direct(serde_json::from_value(raw.logic)?),
            "imputation" => Rule::Imputation(serde_json::from_value(raw.logic)?),
            other => {
                return Err(ModelError::Rule(format!(
                    "unsupported mapping type: {other}"
                )));
            }
        };
        Ok(Mapping {
            study: raw.study,
            status: raw.status,
            description: raw.description,
            rule,
        })
    }
}

impl From<Mapping> for RawMapping {
    fn from(mapping: Mapping) -> Self {
        let (kind, logic) = match mapping.rule {
            Rule::Direct(rule) => ("direct", serde_json::to_value(rule)),
            Rule::Imputation(rule) => ("imputation", serde_json::to_value(rule)),
        };
        RawMapping {
            study: mapping.study,
            kind: kind.to_string(),
            status: mapping.status,
            description: mapping.description,
            // Serialization of plain data structs cannot fail.
            logic: logic.unwrap_or(Json::Null),
        }
    }
}
