//! ELEFAN - Growth estimation from length-frequency data.
//!
//! This crate fits seasonal von Bertalanffy growth curves to catch-at-length
//! samples. Raw counts are restructured into a score surface that is positive
//! on modal peaks, and growth parameters are chosen to maximize the share of
//! those peaks the curve passes through.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Dataset, configuration, and result types
//! - `compute`: Restructuring, growth model, fit scoring, and search
//!
//! # Example
//!
//! ```rust,no_run
//! use elefan::{
//!     compute::{restructure, search::fit_growth},
//!     schema::{LfqDataset, RestructureConfig, SearchConfig},
//! };
//!
//! # fn load() -> LfqDataset { unimplemented!() }
//! let dataset = load();
//!
//! // Restructure the catch matrix
//! let data = restructure(&dataset, RestructureConfig::default()).unwrap();
//!
//! // Fit growth with the default genetic algorithm
//! let config = SearchConfig {
//!     random_seed: Some(42),
//!     ..Default::default()
//! };
//! let result = fit_growth(&data, &config).unwrap();
//!
//! println!(
//!     "Linf = {:.1}, K = {:.2}, Rn = {:.3}",
//!     result.best.params.linf, result.best.params.k, result.best.score.rn
//! );
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::search::{FitReport, fit_growth};
pub use compute::{FitEvaluator, RestructuredDataset, restructure};
pub use schema::{AnalysisConfig, ElefanError, GrowthParams, LfqDataset, SearchConfig};
