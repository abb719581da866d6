//! Configuration types for an ELEFAN analysis run.

use serde::{Deserialize, Serialize};

use super::SearchConfig;

fn default_moving_average() -> usize {
    5
}

/// Restructuring parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RestructureConfig {
    /// Moving-average window in length classes. Must be odd.
    #[serde(default = "default_moving_average")]
    pub moving_average: usize,
    /// Down-weight positive scores of sparsely sampled bins by `sqrt(1 + 2 / n)`.
    #[serde(default)]
    pub sqrt_damping: bool,
}

impl Default for RestructureConfig {
    fn default() -> Self {
        Self {
            moving_average: default_moving_average(),
            sqrt_damping: false,
        }
    }
}

impl RestructureConfig {
    /// Create a configuration with the given window and damping flag.
    pub fn new(moving_average: usize, sqrt_damping: bool) -> Self {
        Self {
            moving_average,
            sqrt_damping,
        }
    }

    /// Validate restructuring parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.moving_average == 0 || self.moving_average % 2 == 0 {
            return Err(ConfigError::InvalidWindow {
                window: self.moving_average,
            });
        }
        Ok(())
    }
}

/// Top-level configuration for a complete analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Restructuring parameters.
    #[serde(default)]
    pub restructure: RestructureConfig,
    /// Growth curve search settings.
    #[serde(default)]
    pub search: SearchConfig,
    /// Repeat the search once per omitted sampling date.
    #[serde(default)]
    pub jackknife: bool,
}

impl AnalysisConfig {
    /// Validate all nested settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.restructure.validate()?;
        self.search.validate()
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Moving average window must be odd and at least 1, got {window}")]
    InvalidWindow { window: usize },
    #[error("Growth parameter {name} = {value} is outside its valid domain")]
    InvalidGrowthParameter { name: &'static str, value: f64 },
    #[error("Invalid parameter bounds: {0}")]
    InvalidBounds(String),
    #[error("Search grid for {0} is empty")]
    EmptyGrid(&'static str),
    #[error("Grid value {value} for {name} must be positive and finite")]
    InvalidGridValue { name: &'static str, value: f64 },
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("Cooling rate must be within (0, 1), got {0}")]
    InvalidCooling(f64),
    #[error("Initial temperature must be positive, got {0}")]
    InvalidTemperature(f64),
    #[error("Search budget for {0} must be positive")]
    ZeroBudget(&'static str),
    #[error("Maximum age must be positive and at most 1000 years, got {0}")]
    InvalidAgeLimit(f64),
}

/// Dataset validation errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DatasetError {
    #[error("Dataset has no length classes or no sampling dates")]
    Empty,
    #[error("Catch matrix has {cells} cells, expected {lengths} lengths x {dates} dates")]
    ShapeMismatch {
        lengths: usize,
        dates: usize,
        cells: usize,
    },
    #[error("Catch column {column} has {actual} entries, expected {expected}")]
    ColumnLength {
        column: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Length midpoints must be finite and strictly increasing (index {index})")]
    UnorderedLengths { index: usize },
    #[error("Sampling dates must be strictly increasing (index {index})")]
    UnorderedDates { index: usize },
    #[error("Catch at length {row}, date {col} is {value}; counts must be finite and non-negative")]
    InvalidCount { row: usize, col: usize, value: f64 },
    #[error("Operation needs at least {required} sampling dates, dataset has {actual}")]
    TooFewDates { required: usize, actual: usize },
    #[error("Date index {index} out of range for {dates} dates")]
    DateIndex { index: usize, dates: usize },
}

/// Errors surfaced by analysis entry points.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ElefanError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(#[from] ConfigError),
    #[error("Invalid dataset: {0}")]
    InvalidDataset(#[from] DatasetError),
}
