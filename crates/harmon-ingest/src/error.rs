use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// No upload files exist for the project; nothing can be computed.
    #[error("no uploads found for project '{project}'")]
    NoUploads { project: String },

    #[error("upload directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },

    /// An upload is missing one of the key columns (pid, visit, collect_date).
    #[error("upload '{origin}' has no '{column}' column")]
    MissingKeyColumn { origin: String, column: String },

    /// (pid, visit) must be unique within a single form upload.
    #[error("duplicate (pid, visit) key ({pid}, {visit}) in form '{form}'")]
    DuplicateKey {
        form: String,
        pid: String,
        visit: String,
    },

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
