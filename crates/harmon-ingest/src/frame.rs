//! Consolidated project frame construction.
//!
//! Each upload file is parsed into a per-form frame keyed by (pid, visit),
//! with every non-key column renamed to `{project}_{form}_{column}` so names
//! stay unique across forms. The per-form frames are then merged with a
//! progressive outer join on (pid, visit): the result contains the union of
//! all source columns, and a (pid, visit) pair that appears in only one form
//! has nulls for the other forms' columns.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use polars::prelude::{
    Column, DataFrame, IntoLazy, JoinArgs, JoinCoalesce, JoinType, NamedFrom, Series, col,
};
use tracing::{debug, warn};

use harmon_model::{DEFAULT_COLLECT_DATE_COLUMN, Schema};

use crate::error::{IngestError, Result};
use crate::upload::Upload;

pub const PID_COLUMN: &str = "pid";
pub const VISIT_COLUMN: &str = "visit";

/// The column name a (project, form, variable) triple maps to in the
/// consolidated frame.
pub fn qualified_column(project: &str, schema: &str, variable: &str) -> String {
    format!("{project}_{schema}_{variable}")
}

/// The collect-date column for a form in the consolidated frame.
pub fn collect_date_column(project: &str, schema: &str) -> String {
    qualified_column(project, schema, DEFAULT_COLLECT_DATE_COLUMN)
}

/// The consolidated per-project table: one row per (pid, visit) pair.
///
/// Owned by the pipeline run that built it and discarded afterwards.
#[derive(Debug, Clone)]
pub struct ProjectFrame {
    pub project: String,
    pub data: DataFrame,
    /// Form names that contributed columns, in upload order.
    pub forms: Vec<String>,
}

impl ProjectFrame {
    pub fn record_count(&self) -> usize {
        self.data.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.data.column(name).is_ok()
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

fn normalize_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses one upload stream into a per-form frame.
///
/// Key columns `pid` and `visit` keep their names; every other column,
/// including `collect_date`, is renamed to `{project}_{form}_{column}`.
/// When a codebook schema is supplied, non-key columns not declared in it
/// are dropped.
pub fn read_form_frame(
    project: &str,
    form: &str,
    reader: impl Read,
    origin: &str,
    codebook: Option<&Schema>,
) -> Result<DataFrame> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|e| IngestError::Csv {
            origin: origin.to_string(),
            source: e,
        })?
        .iter()
        .map(normalize_header)
        .collect();

    let key_index = |key: &str| {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(key))
    };
    let pid_idx = key_index(PID_COLUMN).ok_or_else(|| IngestError::MissingKeyColumn {
        origin: origin.to_string(),
        column: PID_COLUMN.to_string(),
    })?;
    let visit_idx = key_index(VISIT_COLUMN).ok_or_else(|| IngestError::MissingKeyColumn {
        origin: origin.to_string(),
        column: VISIT_COLUMN.to_string(),
    })?;
    if key_index(DEFAULT_COLLECT_DATE_COLUMN).is_none() {
        warn!(form, origin, "upload has no collect_date column");
    }

    // Which columns survive: keys always, declared variables when a
    // codebook is supplied, everything otherwise.
    let keep: Vec<bool> = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            if idx == pid_idx || idx == visit_idx {
                return true;
            }
            if header.eq_ignore_ascii_case(DEFAULT_COLLECT_DATE_COLUMN) {
                return true;
            }
            match codebook {
                Some(schema) => schema.attribute(header).is_some(),
                None => true,
            }
        })
        .collect();

    let mut values: Vec<Vec<Option<String>>> = headers.iter().map(|_| Vec::new()).collect();
    let mut seen_keys: BTreeMap<(String, String), ()> = BTreeMap::new();

    for record in csv_reader.records() {
        let record = record.map_err(|e| IngestError::Csv {
            origin: origin.to_string(),
            source: e,
        })?;
        let cells: Vec<Option<String>> = (0..headers.len())
            .map(|idx| record.get(idx).and_then(normalize_cell))
            .collect();

        let pid = cells[pid_idx].clone().unwrap_or_default();
        let visit = cells[visit_idx].clone().unwrap_or_default();
        if seen_keys.insert((pid.clone(), visit.clone()), ()).is_some() {
            return Err(IngestError::DuplicateKey {
                form: form.to_string(),
                pid,
                visit,
            });
        }

        for (column, cell) in values.iter_mut().zip(cells) {
            column.push(cell);
        }
    }

    let mut columns: Vec<Column> = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        if !keep[idx] {
            continue;
        }
        let name = if idx == pid_idx {
            PID_COLUMN.to_string()
        } else if idx == visit_idx {
            VISIT_COLUMN.to_string()
        } else {
            qualified_column(project, form, header)
        };
        columns.push(Series::new(name.into(), std::mem::take(&mut values[idx])).into());
    }

    Ok(DataFrame::new(columns)?)
}

/// Parses one upload file into a per-form frame.
pub fn load_form_frame(upload: &Upload, codebook: Option<&Schema>) -> Result<DataFrame> {
    let file = std::fs::File::open(&upload.path).map_err(|e| IngestError::FileRead {
        path: upload.path.clone(),
        source: e,
    })?;
    read_form_frame(
        &upload.project,
        &upload.form,
        file,
        &upload.path.display().to_string(),
        codebook,
    )
}

/// Builds the consolidated frame for a project from its uploads.
///
/// Zero uploads is a fatal precondition failure: no frame can be built.
pub fn load_project_frame(project: &str, uploads: &[Upload]) -> Result<ProjectFrame> {
    load_project_frame_with_codebooks(project, uploads, &BTreeMap::new())
}

/// Like [`load_project_frame`], subsetting each form's columns to the
/// variables its codebook declares (when one is present).
pub fn load_project_frame_with_codebooks(
    project: &str,
    uploads: &[Upload],
    codebooks: &BTreeMap<String, Schema>,
) -> Result<ProjectFrame> {
    if uploads.is_empty() {
        return Err(IngestError::NoUploads {
            project: project.to_string(),
        });
    }

    let mut forms = Vec::with_capacity(uploads.len());
    let mut frames = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let frame = load_form_frame(upload, codebooks.get(&upload.form))?;
        debug!(
            form = upload.form,
            rows = frame.height(),
            columns = frame.width(),
            "loaded form frame"
        );
        forms.push(upload.form.clone());
        frames.push(frame);
    }

    let mut iter = frames.into_iter();
    // Non-empty by the precondition check above.
    let first = iter.next().ok_or_else(|| IngestError::NoUploads {
        project: project.to_string(),
    })?;
    let mut joined = first.lazy();
    for frame in iter {
        joined = joined.join(
            frame.lazy(),
            [col(PID_COLUMN), col(VISIT_COLUMN)],
            [col(PID_COLUMN), col(VISIT_COLUMN)],
            JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
        );
    }
    let data = joined.collect()?;

    debug!(
        project,
        rows = data.height(),
        columns = data.width(),
        "consolidated project frame"
    );

    Ok(ProjectFrame {
        project: project.to_string(),
        data,
        forms,
    })
}
