//! Data model for the CRF harmonization pipeline.
//!
//! Holds the persisted rule wire format, codebook metadata types, operator
//! token enums, review status, and run-log diagnostics. This crate is kept
//! free of frame/engine dependencies so every other crate can depend on it.

pub mod diagnostic;
pub mod error;
pub mod metadata;
pub mod operators;
pub mod rule;
pub mod status;

pub use diagnostic::Diagnostic;
pub use error::{ModelError, Result};
pub use metadata::{Attribute, AttributeType, Choice, Schema};
pub use operators::{BinaryOp, Condition, LogicOp};
pub use rule::{
    ChoiceMap, Conversion, DEFAULT_COLLECT_DATE_COLUMN, DirectRule, Group, Imputation,
    ImputationRule, Logic, Mapping, Rule, TargetChoice,
};
pub use status::ReviewStatus;
