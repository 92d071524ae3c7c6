//! Codebook metadata repository.
//!
//! Schemas are keyed by name; when the same form is published more than
//! once, the most recently published version wins, matching how mapped
//! variables are resolved against the current codebook.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use harmon_model::{Attribute, Schema};

#[derive(Debug, Default)]
pub struct MetadataRepository {
    schemas: BTreeMap<String, Schema>,
}

impl MetadataRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_schemas(schemas: impl IntoIterator<Item = Schema>) -> Self {
        let mut repository = Self::new();
        for schema in schemas {
            repository.insert(schema);
        }
        repository
    }

    /// Loads every `*.json` codebook file in a directory, in name order.
    pub fn load_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .with_context(|| format!("reading codebook directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut repository = Self::new();
        for path in paths {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading codebook {}", path.display()))?;
            let schema: Schema = serde_json::from_str(&text)
                .with_context(|| format!("parsing codebook {}", path.display()))?;
            debug!(schema = schema.name, path = %path.display(), "loaded codebook");
            repository.insert(schema);
        }
        Ok(repository)
    }

    /// Registers a schema version, keeping the most recently published one.
    /// A version without a publish date never displaces a dated one.
    pub fn insert(&mut self, schema: Schema) {
        match self.schemas.get(&schema.name) {
            Some(existing) if schema.publish_date <= existing.publish_date => {}
            _ => {
                self.schemas.insert(schema.name.clone(), schema);
            }
        }
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn attribute(&self, schema: &str, variable: &str) -> Option<&Attribute> {
        self.schema(schema)?.attribute(variable)
    }

    pub fn is_choice(&self, schema: &str, variable: &str) -> bool {
        self.attribute(schema, variable)
            .is_some_and(Attribute::is_choice)
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn schema(name: &str, published: Option<&str>, attrs: Vec<Attribute>) -> Schema {
        Schema {
            name: name.to_string(),
            title: None,
            publish_date: published
                .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            attributes: attrs,
        }
    }

    fn attribute(name: &str) -> Attribute {
        Attribute {
            name: name.to_string(),
            title: None,
            attr_type: harmon_model::AttributeType::Text,
            choices: vec![],
        }
    }

    #[test]
    fn later_publish_date_wins() {
        let mut repo = MetadataRepository::new();
        repo.insert(schema("vitals", Some("2015-01-01"), vec![attribute("old")]));
        repo.insert(schema("vitals", Some("2016-01-01"), vec![attribute("new")]));
        repo.insert(schema("vitals", Some("2014-01-01"), vec![attribute("stale")]));
        let vitals = repo.schema("vitals").unwrap();
        assert!(vitals.attribute("new").is_some());
        assert!(vitals.attribute("old").is_none());
    }

    #[test]
    fn undated_version_never_displaces_a_dated_one() {
        let mut repo = MetadataRepository::new();
        repo.insert(schema("vitals", Some("2015-01-01"), vec![attribute("dated")]));
        repo.insert(schema("vitals", None, vec![attribute("undated")]));
        assert!(repo.schema("vitals").unwrap().attribute("dated").is_some());
    }

    #[test]
    fn loads_codebooks_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("demographics.json"),
            r#"{"name": "demographics", "attributes": [
                {"name": "gender", "type": "choice",
                 "choices": [{"name": "0", "title": "Female"}]}
            ]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let repo = MetadataRepository::load_dir(dir.path()).unwrap();
        assert!(repo.is_choice("demographics", "gender"));
        assert!(!repo.is_choice("demographics", "age"));
    }
}
