//! Genetic algorithm over the growth parameter space.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::schema::{
    BestFit, ElefanError, FitScore, GeneticAlgorithmConfig, GrowthParams, SearchHistory,
    SearchProgress, SearchResult, SearchStats, SelectionMethod, StopReason,
};

use super::super::score::FitEvaluator;
use super::params::{ParamRng, ParamSpace};

/// A candidate individual in the population.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Unique identifier.
    pub id: u64,
    /// Growth parameters.
    pub params: GrowthParams,
    /// Fit score, valid once evaluated.
    pub score: FitScore,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
    evaluated: bool,
}

impl Candidate {
    /// Fitness used for selection (Rn).
    #[inline]
    pub fn fitness(&self) -> f64 {
        self.score.rn
    }
}

/// Genetic algorithm engine.
pub struct GeneticSearch<'a> {
    evaluator: FitEvaluator<'a>,
    space: ParamSpace,
    config: GeneticAlgorithmConfig,
    rng: ParamRng,
    population: Vec<Candidate>,
    history: SearchHistory,
    generation: usize,
    best: Option<Candidate>,
    stagnation_count: usize,
    evaluations: u64,
    next_id: u64,
    cancelled: Arc<AtomicBool>,
}

impl<'a> GeneticSearch<'a> {
    /// Create an engine. Draws a random seed when `seed` is `None`.
    pub fn new(
        evaluator: FitEvaluator<'a>,
        space: ParamSpace,
        config: GeneticAlgorithmConfig,
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
            population: Vec::new(),
            history: SearchHistory::default(),
            generation: 0,
            best: None,
            stagnation_count: 0,
            evaluations: 0,
            next_id: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Current population, sorted by fitness after each evaluation.
    pub fn population(&self) -> &[Candidate] {
        &self.population
    }

    /// Initialize the population with uniform draws from the space.
    pub fn initialize(&mut self) {
        self.population.clear();
        self.history = SearchHistory::default();
        self.generation = 0;
        self.best = None;
        self.stagnation_count = 0;
        self.evaluations = 0;

        for _ in 0..self.config.population.size {
            let params = self.rng.random_params(&self.space);
            let candidate = self.new_candidate(params, Vec::new());
            self.population.push(candidate);
        }
    }

    fn new_candidate(&mut self, params: GrowthParams, parents: Vec<u64>) -> Candidate {
        let id = self.next_id;
        self.next_id += 1;
        Candidate {
            id,
            params,
            score: FitScore::default(),
            generation: self.generation,
            parents,
            evaluated: false,
        }
    }

    /// Evaluate every candidate that has not been scored yet.
    fn evaluate_population(&mut self) {
        let evaluator = &self.evaluator;
        let pending = self.population.iter().filter(|c| !c.evaluated).count();

        self.population
            .par_iter_mut()
            .filter(|c| !c.evaluated)
            .for_each(|candidate| {
                candidate.score = evaluator.evaluate(&candidate.params);
                candidate.evaluated = true;
            });

        self.evaluations += pending as u64;
    }

    /// Sort the evaluated population and append its statistics to the history.
    fn record_generation(&mut self) {
        self.population
            .sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));

        let gen_best = &self.population[0];
        let improved = self
            .best
            .as_ref()
            .is_none_or(|best| gen_best.fitness() > best.fitness());
        if improved {
            self.best = Some(gen_best.clone());
            self.stagnation_count = 0;
        } else {
            self.stagnation_count += 1;
        }

        let n = self.population.len() as f64;
        let avg_fitness = self.population.iter().map(Candidate::fitness).sum::<f64>() / n;
        let variance = self
            .population
            .iter()
            .map(|c| (c.fitness() - avg_fitness).powi(2))
            .sum::<f64>()
            / n;

        let best_score = self.best_score();
        let diversity = self.compute_diversity();
        self.history.best_score.push(best_score);
        self.history.mean_score.push(avg_fitness);
        self.history.score_std.push(variance.sqrt());
        self.history.diversity.push(diversity);
    }

    /// Breed the next generation from the current sorted population.
    fn step_generation(&mut self) {
        let size = self.config.population.size;
        let mut next_gen = Vec::with_capacity(size);

        // Elitism: keep best individuals with their scores
        for elite in self.population.iter().take(self.config.elitism.min(size)) {
            next_gen.push(elite.clone());
        }

        self.generation += 1;
        let selection = self.config.selection.clone();

        while next_gen.len() < size {
            let idx1 = self.select_index(&selection);
            let idx2 = self.select_index(&selection);
            let parent1 = self.population[idx1].params;
            let parent2 = self.population[idx2].params;
            let parents = vec![self.population[idx1].id, self.population[idx2].id];

            let mut child = if self.rng.next_f64() < self.config.crossover_rate {
                self.rng.crossover(&parent1, &parent2, &self.space)
            } else {
                parent1
            };
            self.rng.mutate(
                &mut child,
                self.config.mutation_rate,
                self.config.mutation_strength,
                &self.space,
            );

            let candidate = self.new_candidate(child, parents);
            next_gen.push(candidate);
        }

        self.population = next_gen;
    }

    /// Select a parent index from the sorted population.
    fn select_index(&mut self, method: &SelectionMethod) -> usize {
        let n = self.population.len();
        match method {
            SelectionMethod::Tournament { size } => {
                let mut best_idx = self.rng.index(n);
                for _ in 1..*size {
                    let idx = self.rng.index(n);
                    if self.population[idx].fitness() > self.population[best_idx].fitness() {
                        best_idx = idx;
                    }
                }
                best_idx
            }
            SelectionMethod::RankBased => {
                // Probability proportional to rank; index 0 is the best
                let total_rank = n * (n + 1) / 2;
                let mut target = self.rng.index(total_rank);
                for i in 0..n {
                    let rank = n - i;
                    if target < rank {
                        return i;
                    }
                    target -= rank;
                }
                0
            }
            SelectionMethod::RouletteWheel => {
                let total: f64 = self.population.iter().map(|c| c.fitness().max(0.0)).sum();
                if total <= 0.0 {
                    return self.rng.index(n);
                }
                let target = self.rng.next_f64() * total;
                let mut cumulative = 0.0;
                for (i, candidate) in self.population.iter().enumerate() {
                    cumulative += candidate.fitness().max(0.0);
                    if cumulative >= target {
                        return i;
                    }
                }
                n - 1
            }
        }
    }

    /// Mean pairwise parameter distance of the population.
    fn compute_diversity(&self) -> f64 {
        let n = self.population.len();
        if n < 2 {
            return 0.0;
        }
        let mut total = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                total += self
                    .space
                    .distance(&self.population[i].params, &self.population[j].params);
            }
        }
        total / (n * (n - 1) / 2) as f64
    }

    fn best_score(&self) -> f64 {
        self.best.as_ref().map_or(0.0, Candidate::fitness)
    }

    /// Get current progress.
    pub fn progress(&self) -> SearchProgress {
        SearchProgress {
            iteration: self.generation,
            total_iterations: self.config.population.max_generations,
            best_score: self.best_score(),
            mean_score: self.history.mean_score.last().copied().unwrap_or(0.0),
            temperature: None,
            stagnation_count: self.stagnation_count,
            best: self.best.as_ref().map(|c| c.params),
        }
    }

    /// Check if the search should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if let Some(target) = self.config.population.target_fitness
            && self.best_score() >= target
        {
            return Some(StopReason::TargetReached);
        }

        if let Some(limit) = self.config.population.stagnation_limit
            && self.stagnation_count >= limit
        {
            return Some(StopReason::Stagnation);
        }

        if self.generation >= self.config.population.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        None
    }

    /// Run the search with progress callback.
    pub fn run_with_callback<F>(&mut self, callback: F) -> SearchResult
    where
        F: Fn(&SearchProgress),
    {
        let start_time = Instant::now();

        self.initialize();
        self.evaluate_population();
        self.record_generation();
        callback(&self.progress());

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            self.step_generation();
            self.evaluate_population();
            self.record_generation();
            callback(&self.progress());
        };

        let elapsed = start_time.elapsed().as_secs_f64();
        log::info!(
            "Genetic search stopped after {} generations ({:?}): best Rn = {:.4}",
            self.generation,
            stop_reason,
            self.best_score()
        );

        let best = match &self.best {
            Some(c) => BestFit::new(c.params, c.score),
            None => BestFit::new(self.space.center(), FitScore::default()),
        };

        SearchResult {
            best,
            history: self.history.clone(),
            stats: SearchStats {
                iterations: self.generation,
                evaluations: self.evaluations,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::search::fixtures;
    use crate::schema::{PopulationConfig, ScoringOptions, SearchConfig};

    fn small_config(generations: usize) -> GeneticAlgorithmConfig {
        GeneticAlgorithmConfig {
            population: PopulationConfig {
                size: 12,
                max_generations: generations,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn engine<'a>(
        evaluator: FitEvaluator<'a>,
        config: GeneticAlgorithmConfig,
        seed: u64,
    ) -> GeneticSearch<'a> {
        let space = ParamSpace::from_config(&SearchConfig::default(), evaluator.data().dataset.max_length());
        GeneticSearch::new(evaluator, space, config, Some(seed)).unwrap()
    }

    #[test]
    fn test_engine_creation() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let mut engine = engine(evaluator, small_config(5), 1);
        engine.initialize();
        assert_eq!(engine.population().len(), 12);
    }

    #[test]
    fn test_rejects_tiny_population() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let mut config = small_config(5);
        config.population.size = 1;
        let space = ParamSpace::from_config(&SearchConfig::default(), 98.0);
        assert!(GeneticSearch::new(evaluator, space, config, Some(1)).is_err());
    }

    #[test]
    fn test_run_generations() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let result = engine(evaluator, small_config(3), 7).run();

        assert_eq!(result.stats.iterations, 3);
        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        // Initial population plus three bred generations.
        assert_eq!(result.history.best_score.len(), 4);
        assert!(result.best.score.rn >= 0.0);
    }

    #[test]
    fn test_best_ever_is_monotone() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let mut config = small_config(10);
        config.elitism = 0;
        let result = engine(evaluator, config, 11).run();

        assert!(result.history.best_score.windows(2).all(|w| w[1] >= w[0]));
        let last = *result.history.best_score.last().unwrap();
        assert_eq!(result.best.score.rn, last);
        assert_eq!(evaluator.rn(&result.best.params), result.best.score.rn);
    }

    #[test]
    fn test_seed_determinism() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let a = engine(evaluator, small_config(6), 42).run();
        let b = engine(evaluator, small_config(6), 42).run();

        assert_eq!(a.best.params, b.best.params);
        assert_eq!(a.history, b.history);
        assert_eq!(a.stats.evaluations, b.stats.evaluations);
    }

    #[test]
    fn test_selection_methods_run() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        for selection in [
            SelectionMethod::Tournament { size: 3 },
            SelectionMethod::RankBased,
            SelectionMethod::RouletteWheel,
        ] {
            let config = GeneticAlgorithmConfig {
                selection,
                ..small_config(3)
            };
            let result = engine(evaluator, config, 5).run();
            assert_eq!(result.history.mean_score.len(), 4);
        }
    }

    #[test]
    fn test_elites_not_reevaluated() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let result = engine(evaluator, small_config(4), 3).run();
        // 12 initial evaluations, then 10 offspring per generation.
        assert_eq!(result.stats.evaluations, 12 + 4 * 10);
    }

    #[test]
    fn test_target_reached() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let mut config = small_config(50);
        config.population.target_fitness = Some(0.0);
        let result = engine(evaluator, config, 2).run();
        assert_eq!(result.stats.stop_reason, StopReason::TargetReached);
        assert_eq!(result.stats.iterations, 0);
    }

    #[test]
    fn test_stagnation() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let mut config = small_config(1000);
        config.population.stagnation_limit = Some(3);
        let result = engine(evaluator, config, 9).run();
        assert_eq!(result.stats.stop_reason, StopReason::Stagnation);
    }

    #[test]
    fn test_cancellation() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let mut engine = engine(evaluator, small_config(100), 4);
        engine.cancel_handle().store(true, Ordering::Relaxed);
        let result = engine.run();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
    }
}
