use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::Table;
use polars::prelude::{CsvWriter, SerWriter};
use tracing::{info, trace};

use harmon_core::{MemoryStore, MetadataRepository, PipelineOptions, run_pipeline};
use harmon_engine::OverwritePolicy;
use harmon_ingest::{ProjectFrame, discover_uploads, load_project_frame_with_codebooks};
use harmon_model::{Mapping, Schema};

use crate::cli::{OverwriteArg, RulesArgs, RunArgs};
use crate::progress::BarChannel;
use crate::summary::apply_table_style;
use crate::types::RunResult;
use harmon_cli::logging::redact_value;

pub fn run_project(args: &RunArgs) -> Result<RunResult> {
    let project = derive_project_name(&args.project_dir);
    let started = Instant::now();

    let uploads = discover_uploads(&project, &args.project_dir.join("uploads"))?;
    let mappings = load_mappings(&args.project_dir.join("rules"))?;
    let metadata = load_metadata(&args.project_dir.join("codebooks"))?;

    let codebooks: BTreeMap<String, Schema> = metadata
        .schemas()
        .map(|schema| (schema.name.clone(), schema.clone()))
        .collect();
    let mut frame = load_project_frame_with_codebooks(&project, &uploads, &codebooks)?;
    info!(
        project,
        forms = frame.forms.len(),
        rows = frame.record_count(),
        rules = mappings.len(),
        "project loaded"
    );

    let options = PipelineOptions {
        target_project: args.target_project.clone(),
        overwrite: match args.direct_overwrite {
            OverwriteArg::Overwrite => OverwritePolicy::Overwrite,
            OverwriteArg::SkipExisting => OverwritePolicy::SkipExisting,
        },
    };
    let mut store = MemoryStore::new();
    let channel = BarChannel::new();
    let report = run_pipeline(
        &mut frame,
        &mappings,
        &metadata,
        &mut store,
        &channel,
        &options,
    )?;
    channel.finish();

    let records = store.into_records();
    for record in &records {
        trace!(
            pid = redact_value(&record.pid),
            visit = %record.visit,
            schema = %record.schema,
            values = record.values.len(),
            "harmonized record"
        );
    }
    info!(
        duration_ms = started.elapsed().as_millis(),
        records = records.len(),
        "run complete"
    );

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.project_dir.join("output"));
    let mut written = Vec::new();
    if !args.dry_run {
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("creating output directory {}", output_dir.display()))?;
        written.push(write_consolidated(&output_dir, &mut frame)?);

        let records_path = output_dir.join("records.json");
        let file = fs::File::create(&records_path)
            .with_context(|| format!("creating {}", records_path.display()))?;
        serde_json::to_writer_pretty(file, &records).context("writing records.json")?;
        written.push(records_path);

        let runlog_path = output_dir.join("runlog.json");
        let file = fs::File::create(&runlog_path)
            .with_context(|| format!("creating {}", runlog_path.display()))?;
        serde_json::to_writer_pretty(file, &report).context("writing runlog.json")?;
        written.push(runlog_path);
    }

    Ok(RunResult {
        project,
        output_dir,
        report,
        written,
        dry_run: args.dry_run,
    })
}

pub fn run_rules(args: &RulesArgs) -> Result<()> {
    let mappings = load_mappings(&args.project_dir.join("rules"))?;
    let mut table = Table::new();
    table.set_header(vec!["Study", "Type", "Target", "Status", "Description"]);
    apply_table_style(&mut table);
    for mapping in &mappings {
        table.add_row(vec![
            mapping.study.clone(),
            mapping.rule.kind().to_string(),
            format!(
                "{}.{}",
                mapping.rule.target_schema(),
                mapping.rule.target_variable()
            ),
            mapping.status.as_str().to_string(),
            mapping.description.clone().unwrap_or_default(),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn derive_project_name(dir: &Path) -> String {
    dir.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("project")
        .to_string()
}

/// Loads every `rules/*.json` file, in name order. A file holds either one
/// mapping object or an array of them.
fn load_mappings(dir: &Path) -> Result<Vec<Mapping>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading rules directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut mappings = Vec::new();
    for path in paths {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading rule file {}", path.display()))?;
        if let Ok(batch) = serde_json::from_str::<Vec<Mapping>>(&text) {
            mappings.extend(batch);
        } else {
            let mapping: Mapping = serde_json::from_str(&text)
                .with_context(|| format!("parsing rule file {}", path.display()))?;
            mappings.push(mapping);
        }
    }
    Ok(mappings)
}

fn load_metadata(dir: &Path) -> Result<MetadataRepository> {
    if dir.is_dir() {
        MetadataRepository::load_dir(dir)
    } else {
        Ok(MetadataRepository::new())
    }
}

fn write_consolidated(dir: &Path, frame: &mut ProjectFrame) -> Result<PathBuf> {
    let path = dir.join("consolidated.csv");
    let mut file =
        fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .finish(&mut frame.data)
        .context("writing consolidated.csv")?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_single_and_batched_rule_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b_direct.json"),
            r#"{"study": "ucsd", "type": "direct", "status": "approved",
                "logic": {"source_schema": "a", "source_variable": "b",
                          "target_schema": "c", "target_variable": "d"}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a_batch.json"),
            r#"[{"study": "cctg", "type": "direct", "status": "review",
                 "logic": {"source_schema": "a", "source_variable": "b",
                           "target_schema": "c", "target_variable": "e"}}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

        let mappings = load_mappings(dir.path()).unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].study, "cctg");
        assert_eq!(mappings[1].study, "ucsd");
    }

    #[test]
    fn project_name_is_the_folder_name() {
        assert_eq!(derive_project_name(Path::new("/data/ucsd")), "ucsd");
    }
}
