//! Growth parameter and search configuration types.
//!
//! This module provides the parameter vector fitted by ELEFAN, the box
//! constraints of the search space, the settings of each optimizer, and the
//! result types returned to reporting code.

use serde::{Deserialize, Serialize};

use super::ConfigError;

// ============================================================================
// Growth Parameters
// ============================================================================

/// Parameters of the (seasonal) von Bertalanffy growth function.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GrowthParams {
    /// Asymptotic length.
    pub linf: f64,
    /// Growth coefficient (per year).
    pub k: f64,
    /// Fraction of the year at which a cohort has length zero.
    pub t_anchor: f64,
    /// Amplitude of seasonal oscillation (0 = no seasonality).
    #[serde(default)]
    pub c: f64,
    /// Seasonal phase offset (fraction of the year).
    #[serde(default)]
    pub ts: f64,
}

impl GrowthParams {
    /// Non-seasonal parameter set.
    pub fn new(linf: f64, k: f64, t_anchor: f64) -> Self {
        Self {
            linf,
            k,
            t_anchor,
            c: 0.0,
            ts: 0.0,
        }
    }

    /// Seasonal parameter set.
    pub fn seasonal(linf: f64, k: f64, t_anchor: f64, c: f64, ts: f64) -> Self {
        Self {
            linf,
            k,
            t_anchor,
            c,
            ts,
        }
    }

    /// Whether the seasonal term is active.
    #[inline]
    pub fn is_seasonal(&self) -> bool {
        self.c != 0.0
    }

    /// Growth performance index phi' = log10(K) + 2 log10(Linf).
    pub fn phi_prime(&self) -> f64 {
        self.k.log10() + 2.0 * self.linf.log10()
    }

    /// Read one parameter.
    #[inline]
    pub fn get(&self, param: Param) -> f64 {
        match param {
            Param::Linf => self.linf,
            Param::K => self.k,
            Param::TAnchor => self.t_anchor,
            Param::C => self.c,
            Param::Ts => self.ts,
        }
    }

    /// Overwrite one parameter.
    #[inline]
    pub fn set(&mut self, param: Param, value: f64) {
        match param {
            Param::Linf => self.linf = value,
            Param::K => self.k = value,
            Param::TAnchor => self.t_anchor = value,
            Param::C => self.c = value,
            Param::Ts => self.ts = value,
        }
    }

    /// Validate parameter domains.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name, value| Err(ConfigError::InvalidGrowthParameter { name, value });
        if !(self.linf.is_finite() && self.linf > 0.0) {
            return invalid("Linf", self.linf);
        }
        if !(self.k.is_finite() && self.k > 0.0) {
            return invalid("K", self.k);
        }
        if !self.t_anchor.is_finite() {
            return invalid("t_anchor", self.t_anchor);
        }
        if !(0.0..=1.0).contains(&self.c) {
            return invalid("C", self.c);
        }
        if !self.ts.is_finite() {
            return invalid("ts", self.ts);
        }
        Ok(())
    }
}

/// Identifier of a single growth parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Param {
    Linf,
    K,
    TAnchor,
    C,
    Ts,
}

impl Param {
    /// Parameters searched for a non-seasonal fit.
    pub const NON_SEASONAL: [Param; 3] = [Param::Linf, Param::K, Param::TAnchor];
    /// Parameters searched for a seasonal fit.
    pub const SEASONAL: [Param; 5] = [Param::Linf, Param::K, Param::TAnchor, Param::C, Param::Ts];

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Param::Linf => "Linf",
            Param::K => "K",
            Param::TAnchor => "t_anchor",
            Param::C => "C",
            Param::Ts => "ts",
        }
    }
}

// ============================================================================
// Search Space
// ============================================================================

/// Box constraints of the growth parameter search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterBounds {
    /// Bounds for Linf. Derived from the largest length class when absent.
    #[serde(default)]
    pub linf: Option<(f64, f64)>,
    /// Bounds for K.
    #[serde(default = "default_k_bounds")]
    pub k: (f64, f64),
    /// Bounds for t_anchor.
    #[serde(default = "default_unit_bounds")]
    pub t_anchor: (f64, f64),
    /// Bounds for C.
    #[serde(default = "default_unit_bounds")]
    pub c: (f64, f64),
    /// Bounds for ts.
    #[serde(default = "default_unit_bounds")]
    pub ts: (f64, f64),
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self {
            linf: None,
            k: default_k_bounds(),
            t_anchor: default_unit_bounds(),
            c: default_unit_bounds(),
            ts: default_unit_bounds(),
        }
    }
}

fn default_k_bounds() -> (f64, f64) {
    (0.01, 1.0)
}
fn default_unit_bounds() -> (f64, f64) {
    (0.0, 1.0)
}

/// Linf bounds relative to the largest length class when none are given.
pub const DEFAULT_LINF_FACTORS: (f64, f64) = (0.8, 1.2);

impl ParameterBounds {
    /// Bounds of one parameter, deriving Linf from `max_length` if unset.
    pub fn range(&self, param: Param, max_length: f64) -> (f64, f64) {
        match param {
            Param::Linf => self.linf.unwrap_or((
                DEFAULT_LINF_FACTORS.0 * max_length,
                DEFAULT_LINF_FACTORS.1 * max_length,
            )),
            Param::K => self.k,
            Param::TAnchor => self.t_anchor,
            Param::C => self.c,
            Param::Ts => self.ts,
        }
    }

    /// Validate bound ordering and domains.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check = |bounds: (f64, f64), name: &str, min: f64, max: f64| {
            if !bounds.0.is_finite() || !bounds.1.is_finite() || bounds.0 > bounds.1 {
                return Err(ConfigError::InvalidBounds(format!(
                    "{} min ({}) > max ({})",
                    name, bounds.0, bounds.1
                )));
            }
            if bounds.0 < min || bounds.1 > max {
                return Err(ConfigError::InvalidBounds(format!(
                    "{} bounds ({}, {}) outside [{}, {}]",
                    name, bounds.0, bounds.1, min, max
                )));
            }
            Ok(())
        };

        if let Some(linf) = self.linf {
            check(linf, "Linf", f64::MIN_POSITIVE, f64::MAX)?;
        }
        check(self.k, "K", f64::MIN_POSITIVE, f64::MAX)?;
        check(self.t_anchor, "t_anchor", 0.0, 1.0)?;
        check(self.c, "C", 0.0, 1.0)?;
        check(self.ts, "ts", 0.0, 1.0)?;
        Ok(())
    }
}

/// How crossed cells are aggregated into the explained sum of peaks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ScoringMode {
    /// Each sampling date contributes its single best crossed cell.
    #[default]
    ColumnBest,
    /// Every crossed cell counts, but a positive peak only once.
    PeakFlagging,
}

/// Options of the fit-score evaluator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ScoringOptions {
    /// Aggregation mode.
    #[serde(default)]
    pub mode: ScoringMode,
    /// Maximum cohort age in years. Defaults to the age at 0.95 Linf.
    #[serde(default)]
    pub max_age: Option<f64>,
}

/// Most cohorts traced through one sampling date. Curves that would need
/// more score `Rn = 0`.
pub const MAX_COHORTS_PER_DATE: usize = 1000;

impl ScoringOptions {
    /// Validate scoring options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(age) = self.max_age
            && !(age.is_finite() && age > 0.0 && age <= MAX_COHORTS_PER_DATE as f64)
        {
            return Err(ConfigError::InvalidAgeLimit(age));
        }
        Ok(())
    }
}

// ============================================================================
// Search Configuration
// ============================================================================

/// Top-level configuration for the growth curve search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search algorithm to use.
    #[serde(default)]
    pub algorithm: SearchAlgorithm,
    /// Box constraints.
    #[serde(default)]
    pub bounds: ParameterBounds,
    /// Include C and ts in the search. When false both are fixed at 0.
    #[serde(default)]
    pub seasonal: bool,
    /// Fit-score options.
    #[serde(default)]
    pub scoring: ScoringOptions,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            algorithm: SearchAlgorithm::default(),
            bounds: ParameterBounds::default(),
            seasonal: false,
            scoring: ScoringOptions::default(),
            random_seed: None,
        }
    }
}

impl SearchConfig {
    /// Parameters that take part in the search.
    pub fn active_params(&self) -> &'static [Param] {
        if self.seasonal {
            &Param::SEASONAL
        } else {
            &Param::NON_SEASONAL
        }
    }

    /// Validate the search configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bounds.validate()?;
        self.scoring.validate()?;
        self.algorithm.validate()
    }
}

/// Search algorithm selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SearchAlgorithm {
    /// Exhaustive Linf x K grid with a t_anchor line search per cell.
    ResponseSurface(ResponseSurfaceConfig),
    /// K grid at a fixed Linf.
    KScan(KScanConfig),
    /// Simulated annealing over the continuous parameter space.
    SimulatedAnnealing(AnnealingConfig),
    /// Genetic algorithm over the continuous parameter space.
    GeneticAlgorithm(GeneticAlgorithmConfig),
}

impl Default for SearchAlgorithm {
    fn default() -> Self {
        Self::GeneticAlgorithm(GeneticAlgorithmConfig::default())
    }
}

impl SearchAlgorithm {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            SearchAlgorithm::ResponseSurface(cfg) => {
                if let Some(linf) = &cfg.linf {
                    linf.validate("Linf")?;
                }
                cfg.k.validate("K")?;
                cfg.t_anchor_search.validate()?;
                validate_fixed_seasonal(cfg.c, cfg.ts)
            }
            SearchAlgorithm::KScan(cfg) => {
                if let Some(linf) = cfg.linf
                    && !(linf.is_finite() && linf > 0.0)
                {
                    return Err(ConfigError::InvalidGridValue {
                        name: "Linf",
                        value: linf,
                    });
                }
                cfg.k.validate("K")?;
                cfg.t_anchor_search.validate()?;
                validate_fixed_seasonal(cfg.c, cfg.ts)
            }
            SearchAlgorithm::SimulatedAnnealing(cfg) => cfg.validate(),
            SearchAlgorithm::GeneticAlgorithm(cfg) => cfg.validate(),
        }
    }
}

fn validate_fixed_seasonal(c: f64, ts: f64) -> Result<(), ConfigError> {
    for (name, value) in [("C", c), ("ts", ts)] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::InvalidGrowthParameter { name, value });
        }
    }
    Ok(())
}

/// Evenly spaced grid axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridAxis {
    /// First value.
    pub start: f64,
    /// Last value (inclusive).
    pub end: f64,
    /// Number of values.
    pub steps: usize,
    /// Space values evenly in log space.
    #[serde(default)]
    pub log_scale: bool,
}

impl GridAxis {
    /// Linear axis.
    pub fn linear(start: f64, end: f64, steps: usize) -> Self {
        Self {
            start,
            end,
            steps,
            log_scale: false,
        }
    }

    /// Logarithmic axis.
    pub fn log(start: f64, end: f64, steps: usize) -> Self {
        Self {
            start,
            end,
            steps,
            log_scale: true,
        }
    }

    /// Materialize the axis values.
    pub fn values(&self) -> Vec<f64> {
        if self.steps <= 1 {
            return vec![self.start];
        }
        let last = (self.steps - 1) as f64;
        (0..self.steps)
            .map(|i| {
                let f = i as f64 / last;
                if self.log_scale {
                    (self.start.ln() + f * (self.end.ln() - self.start.ln())).exp()
                } else {
                    self.start + f * (self.end - self.start)
                }
            })
            .collect()
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.steps == 0 {
            return Err(ConfigError::EmptyGrid(name));
        }
        for value in [self.start, self.end] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidGridValue { name, value });
            }
        }
        if self.start > self.end {
            return Err(ConfigError::InvalidBounds(format!(
                "{} grid start ({}) > end ({})",
                name, self.start, self.end
            )));
        }
        Ok(())
    }
}

/// One-dimensional t_anchor search run inside each grid cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LineSearchConfig {
    /// Evenly spaced trial values across the t_anchor bounds.
    #[serde(default = "default_coarse_steps")]
    pub coarse_steps: usize,
    /// Trial values in the refinement pass around the coarse optimum.
    #[serde(default = "default_refine_steps")]
    pub refine_steps: usize,
}

impl Default for LineSearchConfig {
    fn default() -> Self {
        Self {
            coarse_steps: default_coarse_steps(),
            refine_steps: default_refine_steps(),
        }
    }
}

fn default_coarse_steps() -> usize {
    20
}
fn default_refine_steps() -> usize {
    10
}

impl LineSearchConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.coarse_steps == 0 {
            return Err(ConfigError::EmptyGrid("t_anchor"));
        }
        Ok(())
    }
}

/// Response surface (Linf x K grid) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSurfaceConfig {
    /// Linf axis. Spans the Linf bounds in 10 steps when absent.
    #[serde(default)]
    pub linf: Option<GridAxis>,
    /// K axis.
    #[serde(default = "default_k_axis")]
    pub k: GridAxis,
    /// t_anchor line search per cell.
    #[serde(default)]
    pub t_anchor_search: LineSearchConfig,
    /// Fixed seasonal amplitude.
    #[serde(default)]
    pub c: f64,
    /// Fixed seasonal phase.
    #[serde(default)]
    pub ts: f64,
}

impl Default for ResponseSurfaceConfig {
    fn default() -> Self {
        Self {
            linf: None,
            k: default_k_axis(),
            t_anchor_search: LineSearchConfig::default(),
            c: 0.0,
            ts: 0.0,
        }
    }
}

fn default_k_axis() -> GridAxis {
    GridAxis::log(0.1, 2.0, 20)
}

/// Linf steps used when the response surface has no explicit Linf axis.
pub const DEFAULT_LINF_STEPS: usize = 10;

/// K-scan configuration: K grid at fixed Linf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KScanConfig {
    /// Fixed Linf. Uses the centre of the Linf bounds when absent.
    #[serde(default)]
    pub linf: Option<f64>,
    /// K axis.
    #[serde(default = "default_k_axis")]
    pub k: GridAxis,
    /// t_anchor line search per K value.
    #[serde(default)]
    pub t_anchor_search: LineSearchConfig,
    /// Fixed seasonal amplitude.
    #[serde(default)]
    pub c: f64,
    /// Fixed seasonal phase.
    #[serde(default)]
    pub ts: f64,
}

impl Default for KScanConfig {
    fn default() -> Self {
        Self {
            linf: None,
            k: default_k_axis(),
            t_anchor_search: LineSearchConfig::default(),
            c: 0.0,
            ts: 0.0,
        }
    }
}

/// Simulated annealing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnealingConfig {
    /// Starting temperature.
    #[serde(default = "default_initial_temperature")]
    pub initial_temperature: f64,
    /// Geometric cooling factor per temperature step.
    #[serde(default = "default_cooling_rate")]
    pub cooling_rate: f64,
    /// Number of temperature steps.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Proposals evaluated at each temperature.
    #[serde(default = "default_moves_per_temperature")]
    pub moves_per_temperature: usize,
    /// Proposal standard deviation as a fraction of each bound width at T0.
    #[serde(default = "default_step_fraction")]
    pub step_fraction: f64,
    /// Lower limit of the proposal width fraction as the system cools.
    #[serde(default = "default_min_step_fraction")]
    pub min_step_fraction: f64,
    /// Wall-clock budget in seconds.
    #[serde(default)]
    pub time_limit_secs: Option<f64>,
    /// Starting point. Centre of the bounds when absent.
    #[serde(default)]
    pub init: Option<GrowthParams>,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            initial_temperature: default_initial_temperature(),
            cooling_rate: default_cooling_rate(),
            max_iterations: default_max_iterations(),
            moves_per_temperature: default_moves_per_temperature(),
            step_fraction: default_step_fraction(),
            min_step_fraction: default_min_step_fraction(),
            time_limit_secs: None,
            init: None,
        }
    }
}

fn default_initial_temperature() -> f64 {
    1.0
}
fn default_cooling_rate() -> f64 {
    0.95
}
fn default_max_iterations() -> usize {
    500
}
fn default_moves_per_temperature() -> usize {
    20
}
fn default_step_fraction() -> f64 {
    0.2
}
fn default_min_step_fraction() -> f64 {
    0.01
}

impl AnnealingConfig {
    /// Validate annealing settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_temperature.is_finite() && self.initial_temperature > 0.0) {
            return Err(ConfigError::InvalidTemperature(self.initial_temperature));
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return Err(ConfigError::InvalidCooling(self.cooling_rate));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroBudget("max_iterations"));
        }
        if self.moves_per_temperature == 0 {
            return Err(ConfigError::ZeroBudget("moves_per_temperature"));
        }
        if let Some(limit) = self.time_limit_secs
            && !(limit.is_finite() && limit > 0.0)
        {
            return Err(ConfigError::ZeroBudget("time_limit_secs"));
        }
        check_rate("step_fraction", self.step_fraction)?;
        check_rate("min_step_fraction", self.min_step_fraction)?;
        if let Some(init) = &self.init {
            init.validate()?;
        }
        Ok(())
    }
}

/// Genetic Algorithm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticAlgorithmConfig {
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Selection method.
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Crossover probability (0.0-1.0).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Mutation probability per gene (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Mutation strength (standard deviation relative to the bound width).
    #[serde(default = "default_mutation_strength")]
    pub mutation_strength: f64,
    /// Elitism: number of best individuals to preserve unchanged.
    #[serde(default = "default_elitism")]
    pub elitism: usize,
}

impl Default for GeneticAlgorithmConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            selection: SelectionMethod::default(),
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
            mutation_strength: default_mutation_strength(),
            elitism: default_elitism(),
        }
    }
}

fn default_crossover_rate() -> f64 {
    0.8
}
fn default_mutation_rate() -> f64 {
    0.1
}
fn default_mutation_strength() -> f64 {
    0.1
}
fn default_elitism() -> usize {
    2
}

impl GeneticAlgorithmConfig {
    /// Validate genetic algorithm settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population.size < 2 {
            return Err(ConfigError::PopulationTooSmall);
        }
        if self.population.max_generations == 0 {
            return Err(ConfigError::ZeroBudget("max_generations"));
        }
        check_rate("crossover_rate", self.crossover_rate)?;
        check_rate("mutation_rate", self.mutation_rate)?;
        if !(self.mutation_strength.is_finite() && self.mutation_strength >= 0.0) {
            return Err(ConfigError::InvalidRate {
                name: "mutation_strength",
                value: self.mutation_strength,
            });
        }
        if let SelectionMethod::Tournament { size: 0 } = self.selection {
            return Err(ConfigError::ZeroBudget("tournament size"));
        }
        Ok(())
    }
}

fn check_rate(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidRate { name, value });
    }
    Ok(())
}

/// Selection method for genetic algorithm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// Tournament selection with configurable size.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Rank-based selection.
    RankBased,
    /// Roulette wheel (fitness-proportionate) selection.
    RouletteWheel,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Tournament {
            size: default_tournament_size(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Maximum number of generations.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Target Rn to stop early.
    #[serde(default)]
    pub target_fitness: Option<f64>,
    /// Stagnation limit: stop if no improvement for N generations.
    #[serde(default)]
    pub stagnation_limit: Option<usize>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            target_fitness: None,
            stagnation_limit: None,
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_max_generations() -> usize {
    100
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Fit score of one growth curve against a restructured dataset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct FitScore {
    /// Explained sum of peaks.
    pub esp: f64,
    /// Available sum of peaks.
    pub asp: f64,
    /// Normalized score ESP / ASP.
    pub rn: f64,
}

/// Best parameter set found by a search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BestFit {
    /// Growth parameters.
    pub params: GrowthParams,
    /// Score at those parameters.
    pub score: FitScore,
    /// Growth performance index.
    pub phi_prime: f64,
}

impl BestFit {
    /// Bundle parameters with their score.
    pub fn new(params: GrowthParams, score: FitScore) -> Self {
        Self {
            params,
            score,
            phi_prime: params.phi_prime(),
        }
    }
}

/// Search history for diagnosing convergence.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SearchHistory {
    /// Best Rn seen so far, per iteration or generation.
    pub best_score: Vec<f64>,
    /// Mean Rn of the iteration's proposals or generation's population.
    pub mean_score: Vec<f64>,
    /// Standard deviation of Rn within the generation (GA only).
    #[serde(default)]
    pub score_std: Vec<f64>,
    /// Mean pairwise parameter distance within the generation (GA only).
    #[serde(default)]
    pub diversity: Vec<f64>,
    /// Temperature at each iteration (annealing only).
    #[serde(default)]
    pub temperature: Vec<f64>,
}

/// Progress update passed to search callbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProgress {
    /// Current iteration or generation.
    pub iteration: usize,
    /// Planned iterations or generations.
    pub total_iterations: usize,
    /// Best Rn seen so far.
    pub best_score: f64,
    /// Mean Rn of the current iteration or generation.
    pub mean_score: f64,
    /// Current temperature (annealing only).
    pub temperature: Option<f64>,
    /// Iterations since the best score last improved.
    pub stagnation_count: usize,
    /// Best parameters seen so far.
    pub best: Option<GrowthParams>,
}

/// Rn grid produced by response surface and K-scan searches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreSurface {
    /// Linf axis values.
    pub linf: Vec<f64>,
    /// K axis values.
    pub k: Vec<f64>,
    /// Best Rn per cell, row-major with Linf as the row index.
    pub rn: Vec<f64>,
    /// t_anchor achieving each cell's Rn.
    pub t_anchor: Vec<f64>,
}

impl ScoreSurface {
    /// Rn at (Linf index, K index).
    #[inline]
    pub fn get(&self, linf_idx: usize, k_idx: usize) -> f64 {
        self.rn[linf_idx * self.k.len() + k_idx]
    }

    /// Best t_anchor at (Linf index, K index).
    #[inline]
    pub fn t_anchor_at(&self, linf_idx: usize, k_idx: usize) -> f64 {
        self.t_anchor[linf_idx * self.k.len() + k_idx]
    }

    /// Index pair of the highest-scoring cell.
    pub fn argmax(&self) -> Option<(usize, usize)> {
        self.rn
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| (i / self.k.len(), i % self.k.len()))
    }
}

/// Statistics from a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStats {
    /// Iterations, generations or grid cells processed.
    pub iterations: usize,
    /// Fit-score evaluations performed.
    pub evaluations: u64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason a search stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Every grid cell was evaluated.
    GridExhausted,
    /// Reached the iteration budget.
    MaxIterations,
    /// Reached the wall-clock budget.
    TimeLimit,
    /// Reached maximum generations.
    MaxGenerations,
    /// Reached target fitness.
    TargetReached,
    /// Stagnation limit hit.
    Stagnation,
    /// User cancelled.
    Cancelled,
}

/// Final result of a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Best parameters ever evaluated.
    pub best: BestFit,
    /// Convergence history.
    pub history: SearchHistory,
    /// Run statistics.
    pub stats: SearchStats,
    /// Score surface (grid searches only).
    #[serde(default)]
    pub surface: Option<ScoreSurface>,
}
