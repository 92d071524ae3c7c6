//! Codebook metadata: schemas (forms), attributes (variables), choices.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Value type of an attribute, from the codebook data dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Choice,
    Number,
    #[default]
    #[serde(rename = "string")]
    Text,
    Date,
    Boolean,
}

/// A single coded choice of a choice attribute.
///
/// `name` is the stored code (e.g. "003"), `title` the display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub title: String,
}

/// A variable collected on a form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub attr_type: AttributeType,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl Attribute {
    pub fn is_choice(&self) -> bool {
        self.attr_type == AttributeType::Choice
    }

    /// Display label for a choice code, if the code is declared.
    pub fn choice_title(&self, code: &str) -> Option<&str> {
        self.choices
            .iter()
            .find(|choice| choice.name == code)
            .map(|choice| choice.title.as_str())
    }

    pub fn has_choice(&self, code: &str) -> bool {
        self.choices.iter().any(|choice| choice.name == code)
    }
}

/// A named, publish-dated form definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub publish_date: Option<NaiveDate>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|attr| attr.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codebook_schema() {
        let json = r#"{
            "name": "demographics",
            "publish_date": "2015-08-11",
            "attributes": [
                {"name": "gender", "type": "choice", "choices": [
                    {"name": "0", "title": "Female"},
                    {"name": "1", "title": "Male"}
                ]},
                {"name": "age", "type": "number"}
            ]
        }"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.name, "demographics");
        let gender = schema.attribute("gender").unwrap();
        assert!(gender.is_choice());
        assert_eq!(gender.choice_title("1"), Some("Male"));
        assert!(!schema.attribute("age").unwrap().is_choice());
        assert!(schema.attribute("weight").is_none());
    }
}
