//! The sequential harmonization run.
//!
//! Rules are applied one at a time, in the order given, against a single
//! consolidated frame. A broken rule never aborts the run: failures at the
//! rule boundary become diagnostics and processing moves on, so one bad
//! mapping cannot hold back every other approved rule. After the last rule,
//! the computed target columns are validated and persisted as records.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use harmon_engine::{CompiledDirect, CompiledImputation, OverwritePolicy};
use harmon_ingest::{
    PID_COLUMN, ProjectFrame, VISIT_COLUMN, cell_string, collect_date_column, qualified_column,
};
use harmon_model::{Diagnostic, Mapping, Rule};

use crate::metadata::MetadataRepository;
use crate::progress::StatusChannel;
use crate::store::{EntityStore, TargetRecord};
use crate::validate::validate_value;

/// Run behavior the caller chooses up front.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Project name target columns are written under.
    pub target_project: String,
    /// What direct rules do when the target column already has values.
    pub overwrite: OverwritePolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            target_project: "drsc".to_string(),
            overwrite: OverwritePolicy::default(),
        }
    }
}

/// The operator-facing run log.
#[derive(Debug, Default, Serialize)]
pub struct PipelineReport {
    pub total_rules: usize,
    pub applied: usize,
    pub skipped: usize,
    pub records_written: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl PipelineReport {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Applies every approved rule to the frame, then validates and persists
/// the harmonized target records.
pub fn run_pipeline(
    frame: &mut ProjectFrame,
    mappings: &[Mapping],
    metadata: &MetadataRepository,
    store: &mut dyn EntityStore,
    channel: &dyn StatusChannel,
    options: &PipelineOptions,
) -> anyhow::Result<PipelineReport> {
    let total = mappings.len();
    let mut report = PipelineReport {
        total_rules: total,
        ..PipelineReport::default()
    };
    channel.send_reset(total);

    // Target (schema -> variables) written during this run; only these are
    // validated and persisted afterwards.
    let mut targets: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for (index, mapping) in mappings.iter().enumerate() {
        if !mapping.status.is_approved() {
            let note = Diagnostic::new(
                mapping.rule.target_schema(),
                mapping.rule.target_variable(),
                format!("skipped: review status is {}", mapping.status.as_str()),
            );
            channel.send_message(&note);
            report.skipped += 1;
            channel.send_progress(index + 1, total);
            continue;
        }

        // With codebooks loaded, a rule naming a target the codebooks do not
        // declare is a lookup failure: fatal to that rule, surfaced to the
        // operator. Without codebooks every target is accepted as-is.
        if !metadata.is_empty()
            && metadata
                .attribute(mapping.rule.target_schema(), mapping.rule.target_variable())
                .is_none()
        {
            let diagnostic = Diagnostic::new(
                mapping.rule.target_schema(),
                mapping.rule.target_variable(),
                "target attribute not declared in any codebook; rule skipped",
            );
            channel.send_message(&diagnostic);
            report.diagnostics.push(diagnostic);
            report.skipped += 1;
            channel.send_progress(index + 1, total);
            continue;
        }

        match apply_rule(frame, mapping, metadata, options) {
            Ok(diagnostics) => {
                report.applied += 1;
                for diagnostic in &diagnostics {
                    channel.send_message(diagnostic);
                }
                report.diagnostics.extend(diagnostics);
                targets
                    .entry(mapping.rule.target_schema().to_string())
                    .or_default()
                    .insert(mapping.rule.target_variable().to_string());
            }
            Err(error) => {
                let diagnostic = Diagnostic::new(
                    mapping.rule.target_schema(),
                    mapping.rule.target_variable(),
                    format!("rule failed: {error:#}"),
                );
                channel.send_message(&diagnostic);
                report.diagnostics.push(diagnostic);
            }
        }
        channel.send_progress(index + 1, total);
    }

    let persisted = populate_targets(frame, metadata, &targets, options, store, channel)?;
    report.records_written = persisted.0;
    report.diagnostics.extend(persisted.1);

    info!(
        total,
        applied = report.applied,
        skipped = report.skipped,
        records = report.records_written,
        diagnostics = report.diagnostics.len(),
        "pipeline run finished"
    );
    Ok(report)
}

fn apply_rule(
    frame: &mut ProjectFrame,
    mapping: &Mapping,
    metadata: &MetadataRepository,
    options: &PipelineOptions,
) -> anyhow::Result<Vec<Diagnostic>> {
    let target_is_choice = metadata.is_choice(
        mapping.rule.target_schema(),
        mapping.rule.target_variable(),
    );
    match &mapping.rule {
        Rule::Direct(rule) => {
            let source_attribute = metadata.attribute(&rule.source_schema, &rule.source_variable);
            let outcome =
                CompiledDirect::new(rule, source_attribute, target_is_choice, options.overwrite)
                    .apply(&mut frame.data, &mapping.study, &options.target_project)
                    .with_context(|| {
                        format!(
                            "direct rule {} -> {}",
                            rule.source_variable, rule.target_variable
                        )
                    })?;
            Ok(outcome.diagnostics)
        }
        Rule::Imputation(rule) => {
            CompiledImputation::new(rule, target_is_choice)
                .apply(&mut frame.data, &mapping.study, &options.target_project)
                .with_context(|| format!("imputation rule -> {}", rule.target_variable))?;
            Ok(Vec::new())
        }
    }
}

/// Persists one record per (pid, visit, target schema) holding the
/// non-missing computed values. Values failing validation become
/// diagnostics and are left out of the record.
fn populate_targets(
    frame: &ProjectFrame,
    metadata: &MetadataRepository,
    targets: &BTreeMap<String, BTreeSet<String>>,
    options: &PipelineOptions,
    store: &mut dyn EntityStore,
    channel: &dyn StatusChannel,
) -> anyhow::Result<(usize, Vec<Diagnostic>)> {
    let mut written = 0;
    let mut diagnostics = Vec::new();
    let data = &frame.data;

    for row in 0..data.height() {
        for (schema, variables) in targets {
            let mut values = BTreeMap::new();
            for variable in variables {
                let column = qualified_column(&options.target_project, schema, variable);
                let Some(value) = cell_string(data, &column, row) else {
                    continue;
                };
                match metadata.attribute(schema, variable) {
                    Some(attribute) => match validate_value(attribute, &value) {
                        Ok(()) => {
                            values.insert(variable.clone(), value);
                        }
                        Err(reason) => {
                            let diagnostic = Diagnostic::new(schema, variable, reason);
                            channel.send_message(&diagnostic);
                            diagnostics.push(diagnostic);
                        }
                    },
                    // Only reachable without codebooks; undeclared targets
                    // are otherwise skipped at the rule boundary.
                    None => {
                        values.insert(variable.clone(), value);
                    }
                }
            }
            if values.is_empty() {
                continue;
            }
            let record = TargetRecord {
                pid: cell_string(data, PID_COLUMN, row).unwrap_or_default(),
                visit: cell_string(data, VISIT_COLUMN, row).unwrap_or_default(),
                schema: schema.clone(),
                collect_date: cell_string(
                    data,
                    &collect_date_column(&options.target_project, schema),
                    row,
                ),
                values,
            };
            store
                .write_record(record)
                .with_context(|| format!("persisting {schema} record"))?;
            written += 1;
        }
    }
    Ok((written, diagnostics))
}
