//! CLI library components for the harmonization pipeline.

pub mod logging;
