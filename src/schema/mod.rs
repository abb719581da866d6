//! Schema module - Dataset, configuration and result types for ELEFAN analyses.

mod config;
mod dataset;
mod search;

pub use config::*;
pub use dataset::*;
pub use search::*;
