//! Upload discovery.

use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};

/// A discovered per-form data upload for a project.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Project (study) the upload belongs to.
    pub project: String,
    /// Form (schema) name the file was collected against.
    pub form: String,
    pub path: PathBuf,
}

/// Lists the CSV uploads in a directory, sorted by filename.
///
/// The form name is the file stem, e.g. `uploads/vitals.csv` is the data
/// for the `vitals` form.
pub fn discover_uploads(project: &str, dir: &Path) -> Result<Vec<Upload>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut uploads = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv {
            continue;
        }
        let Some(form) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        uploads.push(Upload {
            project: project.to_string(),
            form: form.to_string(),
            path,
        });
    }

    uploads.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(uploads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn discovers_csv_uploads_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["vitals.csv", "demographics.csv", "notes.txt"] {
            std::fs::write(dir.path().join(name), "pid,visit\n").unwrap();
        }

        let uploads = discover_uploads("ucsd", dir.path()).unwrap();
        let forms: Vec<&str> = uploads.iter().map(|u| u.form.as_str()).collect();
        assert_eq!(forms, vec!["demographics", "vitals"]);
        assert!(uploads.iter().all(|u| u.project == "ucsd"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            discover_uploads("ucsd", &missing),
            Err(IngestError::DirectoryNotFound { .. })
        ));
    }
}
