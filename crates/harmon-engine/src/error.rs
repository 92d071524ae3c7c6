use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while applying rules to a consolidated frame.
///
/// These are infrastructure failures only. A value that cannot be computed
/// is MISSING, not an error, and never surfaces here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
