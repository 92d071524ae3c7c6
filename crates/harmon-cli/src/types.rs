use std::path::PathBuf;

use harmon_core::PipelineReport;

/// Everything a finished `run` invocation produced, for summary printing
/// and exit-code selection.
pub struct RunResult {
    pub project: String,
    pub output_dir: PathBuf,
    pub report: PipelineReport,
    /// Files actually written (empty on --dry-run).
    pub written: Vec<PathBuf>,
    pub dry_run: bool,
}
