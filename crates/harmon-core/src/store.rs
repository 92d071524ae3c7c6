//! Persistence seam for harmonized target records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One harmonized record: the validated values of a single target schema
/// for one (pid, visit) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub pid: String,
    pub visit: String,
    pub schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collect_date: Option<String>,
    pub values: BTreeMap<String, String>,
}

/// Where the pipeline persists harmonized records.
pub trait EntityStore {
    fn write_record(&mut self, record: TargetRecord) -> anyhow::Result<()>;
}

/// Collects records in memory, to be serialized by the caller afterwards.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<TargetRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[TargetRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TargetRecord> {
        self.records
    }
}

impl EntityStore for MemoryStore {
    fn write_record(&mut self, record: TargetRecord) -> anyhow::Result<()> {
        self.records.push(record);
        Ok(())
    }
}
