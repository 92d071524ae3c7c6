//! Target-value validation against codebook attribute constraints.

use chrono::NaiveDate;

use harmon_ingest::parse_f64;
use harmon_model::{Attribute, AttributeType};

const DATE_FORMAT: &str = "%Y-%m-%d";
const BOOLEAN_TOKENS: [&str; 4] = ["0", "1", "true", "false"];

/// Checks a computed value against its target attribute.
///
/// The error string is the operator-facing reason, used verbatim in the
/// run-log diagnostic.
pub fn validate_value(attribute: &Attribute, value: &str) -> Result<(), String> {
    match attribute.attr_type {
        AttributeType::Text => Ok(()),
        AttributeType::Number => {
            if parse_f64(value).is_some() {
                Ok(())
            } else {
                Err(format!("value {value:?} is not numeric"))
            }
        }
        AttributeType::Date => {
            if NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).is_ok() {
                Ok(())
            } else {
                Err(format!("value {value:?} is not a {DATE_FORMAT} date"))
            }
        }
        AttributeType::Boolean => {
            if BOOLEAN_TOKENS.contains(&value.trim().to_ascii_lowercase().as_str()) {
                Ok(())
            } else {
                Err(format!("value {value:?} is not a boolean"))
            }
        }
        AttributeType::Choice => {
            if attribute.has_choice(value) {
                Ok(())
            } else {
                Err(format!("value {value:?} is not a declared choice code"))
            }
        }
    }
}
