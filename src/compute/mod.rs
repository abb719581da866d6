//! Compute module - Restructuring, growth model, fit scoring and search.

mod growth;
mod restructure;
mod score;

pub mod search;

pub use growth::*;
pub use restructure::*;
pub use score::*;
