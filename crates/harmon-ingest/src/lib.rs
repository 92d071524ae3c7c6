//! Upload ingestion and consolidated project frame construction.

pub mod error;
pub mod frame;
pub mod polars_utils;
pub mod upload;

pub use error::{IngestError, Result};
pub use frame::{
    PID_COLUMN, ProjectFrame, VISIT_COLUMN, collect_date_column, load_form_frame,
    load_project_frame, load_project_frame_with_codebooks, qualified_column, read_form_frame,
};
pub use polars_utils::{
    any_to_f64, any_to_string, any_to_string_non_empty, cell_f64, cell_string, format_numeric,
    parse_f64,
};
pub use upload::{Upload, discover_uploads};
