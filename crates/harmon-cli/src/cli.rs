//! CLI argument definitions for the harmonization pipeline.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "harmon",
    version,
    about = "Harmonize clinical CRF uploads against approved mapping rules",
    long_about = "Consolidate a project's per-form CSV uploads into one table\n\
                  keyed by (pid, visit), apply the project's approved direct and\n\
                  imputation mapping rules, and persist validated target records."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow row-level patient values in trace logs.
    ///
    /// Off by default: row-level values are PHI and logged as [REDACTED]
    /// unless this flag is passed.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Consolidate a project's uploads and apply its mapping rules.
    Run(RunArgs),

    /// List a project's mapping rules with type, target, and review status.
    Rules(RulesArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Project folder containing uploads/, rules/, and optionally codebooks/.
    #[arg(value_name = "PROJECT_DIR")]
    pub project_dir: PathBuf,

    /// Project name harmonized target columns are written under.
    #[arg(long = "target-project", default_value = "drsc")]
    pub target_project: String,

    /// Output directory for generated files (default: <PROJECT_DIR>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// What direct rules do when the target column already holds values.
    #[arg(long = "direct-overwrite", value_enum, default_value = "overwrite")]
    pub direct_overwrite: OverwriteArg,

    /// Run the pipeline and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct RulesArgs {
    /// Project folder containing a rules/ directory.
    #[arg(value_name = "PROJECT_DIR")]
    pub project_dir: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OverwriteArg {
    /// Replace target values wholesale; later rules win.
    Overwrite,
    /// Only fill target cells that are still empty.
    SkipExisting,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
