//! Pipeline driver and collaborator seams for the harmonization run.

pub mod metadata;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod validate;

pub use metadata::MetadataRepository;
pub use pipeline::{PipelineOptions, PipelineReport, run_pipeline};
pub use progress::{BoundedChannel, LogChannel, MemoryChannel, ProgressEvent, StatusChannel};
pub use store::{EntityStore, MemoryStore, TargetRecord};
pub use validate::validate_value;
