//! Growth parameter search.
//!
//! Every optimizer maximizes the normalized fit score Rn of a
//! [`FitEvaluator`](super::FitEvaluator) over a box-constrained parameter
//! space and returns the best parameters ever evaluated.
//!
//! # Overview
//!
//! - **Grid searches** (`grid`): response surface over Linf x K, and K-scan at
//!   fixed Linf, each with a t_anchor line search per cell
//! - **Simulated annealing** (`annealing`): Metropolis walk with geometric
//!   cooling
//! - **Genetic algorithm** (`genetic`): elitist GA with tournament, rank or
//!   roulette selection
//! - **Jackknife** (`jackknife`): refits with each sampling date left out
//! - **Reports** (`report`): JSON export of fits
//!
//! # Example
//!
//! ```rust,no_run
//! use elefan::compute::restructure;
//! use elefan::compute::search::fit_growth;
//! use elefan::schema::{LfqDataset, RestructureConfig, SearchConfig};
//!
//! # fn run(dataset: LfqDataset) -> Result<(), elefan::schema::ElefanError> {
//! let data = restructure(&dataset, RestructureConfig::default())?;
//! let result = fit_growth(&data, &SearchConfig::default())?;
//! println!(
//!     "Linf = {:.1}, K = {:.2}, Rn = {:.3}",
//!     result.best.params.linf, result.best.params.k, result.best.score.rn
//! );
//! # Ok(())
//! # }
//! ```

mod annealing;
mod genetic;
mod grid;
mod jackknife;
mod params;
mod report;

pub use annealing::AnnealingSearch;
pub use genetic::{Candidate, GeneticSearch};
pub use grid::{CellFit, k_scan, line_search_t_anchor, response_surface};
pub use jackknife::{Estimate, JackknifeRun, JackknifeSummary, jackknife};
pub use params::{ParamRng, ParamSpace, reflect};
pub use report::{DatasetSummary, FitReport};

use crate::schema::{
    ElefanError, Param, SearchAlgorithm, SearchConfig, SearchProgress, SearchResult,
};

use super::restructure::RestructuredDataset;
use super::score::FitEvaluator;

/// Fit growth parameters with the configured algorithm.
pub fn fit_growth(
    data: &RestructuredDataset,
    config: &SearchConfig,
) -> Result<SearchResult, ElefanError> {
    fit_growth_with_callback(data, config, |_| {})
}

/// Fit growth parameters, reporting progress after every iteration or
/// generation. Grid searches report once, when the grid is complete.
pub fn fit_growth_with_callback<F>(
    data: &RestructuredDataset,
    config: &SearchConfig,
    callback: F,
) -> Result<SearchResult, ElefanError>
where
    F: Fn(&SearchProgress),
{
    config.validate()?;
    let evaluator = FitEvaluator::new(data, config.scoring)?;
    let max_length = data.dataset.max_length();
    let linf_bounds = config.bounds.range(Param::Linf, max_length);
    let t_anchor_bounds = config.bounds.range(Param::TAnchor, max_length);

    log::info!(
        "Fitting growth over {} dates x {} length classes (Linf bounds {:.1}-{:.1})",
        data.n_dates(),
        data.n_lengths(),
        linf_bounds.0,
        linf_bounds.1
    );

    let result = match &config.algorithm {
        SearchAlgorithm::ResponseSurface(cfg) => {
            let result = response_surface(&evaluator, cfg, linf_bounds, t_anchor_bounds);
            callback(&grid_progress(&result));
            result
        }
        SearchAlgorithm::KScan(cfg) => {
            let result = k_scan(&evaluator, cfg, linf_bounds, t_anchor_bounds);
            callback(&grid_progress(&result));
            result
        }
        SearchAlgorithm::SimulatedAnnealing(cfg) => {
            let space = ParamSpace::from_config(config, max_length);
            AnnealingSearch::new(evaluator, space, cfg.clone(), config.random_seed)?
                .run_with_callback(callback)
        }
        SearchAlgorithm::GeneticAlgorithm(cfg) => {
            let space = ParamSpace::from_config(config, max_length);
            GeneticSearch::new(evaluator, space, cfg.clone(), config.random_seed)?
                .run_with_callback(callback)
        }
    };
    Ok(result)
}

fn grid_progress(result: &SearchResult) -> SearchProgress {
    SearchProgress {
        iteration: result.stats.iterations,
        total_iterations: result.stats.iterations,
        best_score: result.best.score.rn,
        mean_score: result.history.mean_score.iter().sum::<f64>()
            / result.history.mean_score.len().max(1) as f64,
        temperature: None,
        stagnation_count: 0,
        best: Some(result.best.params),
    }
}
