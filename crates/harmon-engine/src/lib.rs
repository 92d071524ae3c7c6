//! Rule execution over consolidated project frames.
//!
//! Direct rules copy (and optionally translate) one source variable into one
//! target variable; imputation rules compute a target value from one or more
//! conversion groups. Both write qualified target columns into the same
//! frame the sources were read from, so later rules can observe earlier
//! results.

mod direct;
mod error;
mod group;
mod imputation;
mod operators;
mod resolve;
mod value;

pub use direct::{CompiledDirect, DirectOutcome, OverwritePolicy};
pub use error::{EngineError, Result};
pub use group::evaluate_group;
pub use imputation::{COLLECT_DATE_FORMAT, CompiledImputation, ImputationOutcome};
pub use operators::{apply_binary, reduce_condition, reduce_logic};
pub use resolve::resolve;
pub use value::Value;
