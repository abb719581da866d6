//! Simulated annealing over the growth parameter space.
//!
//! Minimizes -Rn with Metropolis acceptance and geometric cooling. The best
//! state ever visited is kept separately from the current state, so the
//! result never regresses even when worse moves are accepted late.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::schema::{
    AnnealingConfig, BestFit, ElefanError, FitScore, GrowthParams, SearchHistory,
    SearchProgress, SearchResult, SearchStats, StopReason,
};

use super::super::score::FitEvaluator;
use super::params::{ParamRng, ParamSpace};

/// Simulated annealing engine.
pub struct AnnealingSearch<'a> {
    evaluator: FitEvaluator<'a>,
    space: ParamSpace,
    config: AnnealingConfig,
    rng: ParamRng,
    cancelled: Arc<AtomicBool>,
}

/// Mutable state of one annealing run.
struct Chain {
    current: GrowthParams,
    current_score: FitScore,
    best: BestFit,
    temperature: f64,
    stagnation_count: usize,
    evaluations: u64,
}

impl<'a> AnnealingSearch<'a> {
    /// Create an engine. Draws a random seed when `seed` is `None`.
    pub fn new(
        evaluator: FitEvaluator<'a>,
        space: ParamSpace,
        config: AnnealingConfig,
        seed: Option<u64>,
    ) -> Result<Self, ElefanError> {
        config.validate()?;
        let rng = match seed {
            Some(seed) => ParamRng::new(seed),
            None => ParamRng::random(),
        };
        Ok(Self {
            evaluator,
            space,
            config,
            rng,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Proposal width relative to the bound widths at a temperature.
    fn step_scale(&self, temperature: f64) -> f64 {
        let ratio = temperature / self.config.initial_temperature;
        (self.config.step_fraction * ratio).max(self.config.min_step_fraction)
    }

    /// Metropolis criterion on the cost -Rn.
    fn accept(&mut self, current: f64, proposed: f64, temperature: f64) -> bool {
        let delta = current - proposed;
        delta <= 0.0 || self.rng.next_f64() < (-delta / temperature).exp()
    }

    /// Run one temperature level; returns the mean Rn of its proposals.
    fn anneal_level(&mut self, chain: &mut Chain) -> f64 {
        let scale = self.step_scale(chain.temperature);
        let mut sum = 0.0;
        let mut improved = false;

        for _ in 0..self.config.moves_per_temperature {
            let proposal = self.rng.perturb(&chain.current, &self.space, scale);
            let score = self.evaluator.evaluate(&proposal);
            chain.evaluations += 1;
            sum += score.rn;

            if self.accept(chain.current_score.rn, score.rn, chain.temperature) {
                chain.current = proposal;
                chain.current_score = score;
            }
            if score.rn > chain.best.score.rn {
                chain.best = BestFit::new(proposal, score);
                improved = true;
            }
        }

        if improved {
            chain.stagnation_count = 0;
        } else {
            chain.stagnation_count += 1;
        }
        sum / self.config.moves_per_temperature as f64
    }

    fn start(&self) -> GrowthParams {
        match &self.config.init {
            Some(init) => self.space.clamp(init),
            None => self.space.center(),
        }
    }

    /// Run the search with progress callback.
    pub fn run_with_callback<F>(&mut self, callback: F) -> SearchResult
    where
        F: Fn(&SearchProgress),
    {
        let start_time = Instant::now();
        let time_limit = self.config.time_limit_secs;

        let current = self.start();
        let current_score = self.evaluator.evaluate(&current);
        let mut chain = Chain {
            current,
            current_score,
            best: BestFit::new(current, current_score),
            temperature: self.config.initial_temperature,
            stagnation_count: 0,
            evaluations: 1,
        };
        let mut history = SearchHistory::default();
        let mut iterations = 0;

        let stop_reason = loop {
            if self.cancelled.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            if iterations >= self.config.max_iterations {
                break StopReason::MaxIterations;
            }
            if let Some(limit) = time_limit
                && start_time.elapsed().as_secs_f64() >= limit
            {
                break StopReason::TimeLimit;
            }

            let mean = self.anneal_level(&mut chain);
            history.best_score.push(chain.best.score.rn);
            history.mean_score.push(mean);
            history.temperature.push(chain.temperature);
            iterations += 1;

            callback(&SearchProgress {
                iteration: iterations,
                total_iterations: self.config.max_iterations,
                best_score: chain.best.score.rn,
                mean_score: mean,
                temperature: Some(chain.temperature),
                stagnation_count: chain.stagnation_count,
                best: Some(chain.best.params),
            });

            chain.temperature *= self.config.cooling_rate;
        };

        let elapsed = start_time.elapsed().as_secs_f64();
        log::info!(
            "Annealing stopped after {} temperature steps ({:?}): best Rn = {:.4}",
            iterations,
            stop_reason,
            chain.best.score.rn
        );

        SearchResult {
            best: chain.best,
            history,
            stats: SearchStats {
                iterations,
                evaluations: chain.evaluations,
                elapsed_seconds: elapsed,
                stop_reason,
            },
            surface: None,
        }
    }

    /// Run the search (blocking).
    pub fn run(&mut self) -> SearchResult {
        self.run_with_callback(|_| {})
    }
}
