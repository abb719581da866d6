//! Exhaustive grid searches.
//!
//! The response surface scores every (Linf, K) cell and the K-scan every K at
//! a fixed Linf. Inside each cell t_anchor is chosen by a coarse scan over its
//! bounds followed by a finer scan around the coarse optimum. Cells are
//! independent and evaluated in parallel.

use std::time::Instant;

use rayon::prelude::*;

use crate::schema::{
    BestFit, DEFAULT_LINF_STEPS, FitScore, GridAxis, GrowthParams, KScanConfig,
    LineSearchConfig, ResponseSurfaceConfig, ScoreSurface, SearchHistory, SearchResult,
    SearchStats, StopReason,
};

use super::super::score::FitEvaluator;

/// Best t_anchor of one cell and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellFit {
    pub t_anchor: f64,
    pub score: FitScore,
}

/// Fixed parts of a grid search.
#[derive(Debug, Clone, Copy)]
struct GridSetup {
    t_anchor_bounds: (f64, f64),
    line_search: LineSearchConfig,
    c: f64,
    ts: f64,
}

/// Scan t_anchor for fixed Linf, K, C and ts.
///
/// Ties keep the earliest trial value.
pub fn line_search_t_anchor(
    evaluator: &FitEvaluator<'_>,
    base: &GrowthParams,
    bounds: (f64, f64),
    config: &LineSearchConfig,
) -> (CellFit, u64) {
    let (lo, hi) = bounds;
    let width = hi - lo;
    let coarse = config.coarse_steps.max(1);
    let mut params = *base;
    let mut evaluations = 0;

    let mut score_at = |t: f64, evaluations: &mut u64| {
        params.t_anchor = t;
        *evaluations += 1;
        evaluator.evaluate(&params)
    };

    let mut best = CellFit {
        t_anchor: lo,
        score: score_at(lo, &mut evaluations),
    };
    for i in 1..coarse {
        let t = lo + width * i as f64 / coarse as f64;
        let score = score_at(t, &mut evaluations);
        if score.rn > best.score.rn {
            best = CellFit { t_anchor: t, score };
        }
    }

    // Refine within one coarse step on either side.
    let step = width / coarse as f64;
    let centre = best.t_anchor;
    let refine = config.refine_steps;
    if step > 0.0 {
        for j in 0..refine {
            let offset = step * (2.0 * (j + 1) as f64 / (refine + 1) as f64 - 1.0);
            let t = (centre + offset).clamp(lo, hi);
            let score = score_at(t, &mut evaluations);
            if score.rn > best.score.rn {
                best = CellFit { t_anchor: t, score };
            }
        }
    }

    (best, evaluations)
}

/// Score every (Linf, K) cell.
///
/// `linf_bounds` is used when the configuration has no explicit Linf axis.
pub fn response_surface(
    evaluator: &FitEvaluator<'_>,
    config: &ResponseSurfaceConfig,
    linf_bounds: (f64, f64),
    t_anchor_bounds: (f64, f64),
) -> SearchResult {
    let linf_axis = config
        .linf
        .clone()
        .unwrap_or_else(|| GridAxis::linear(linf_bounds.0, linf_bounds.1, DEFAULT_LINF_STEPS));
    let setup = GridSetup {
        t_anchor_bounds,
        line_search: config.t_anchor_search,
        c: config.c,
        ts: config.ts,
    };
    run_grid(evaluator, linf_axis.values(), config.k.values(), setup)
}

/// Score every K at a fixed Linf.
///
/// `linf_bounds` supplies the default Linf (their centre).
pub fn k_scan(
    evaluator: &FitEvaluator<'_>,
    config: &KScanConfig,
    linf_bounds: (f64, f64),
    t_anchor_bounds: (f64, f64),
) -> SearchResult {
    let linf = config
        .linf
        .unwrap_or(0.5 * (linf_bounds.0 + linf_bounds.1));
    let setup = GridSetup {
        t_anchor_bounds,
        line_search: config.t_anchor_search,
        c: config.c,
        ts: config.ts,
    };
    run_grid(evaluator, vec![linf], config.k.values(), setup)
}

fn run_grid(
    evaluator: &FitEvaluator<'_>,
    linf: Vec<f64>,
    k: Vec<f64>,
    setup: GridSetup,
) -> SearchResult {
    let start_time = Instant::now();
    let n_k = k.len();
    let cells = linf.len() * n_k;
    log::debug!("Scoring {} x {} grid cells", linf.len(), n_k);

    let fits: Vec<(CellFit, u64)> = (0..cells)
        .into_par_iter()
        .map(|idx| {
            let base = GrowthParams::seasonal(
                linf[idx / n_k],
                k[idx % n_k],
                setup.t_anchor_bounds.0,
                setup.c,
                setup.ts,
            );
            line_search_t_anchor(evaluator, &base, setup.t_anchor_bounds, &setup.line_search)
        })
        .collect();

    // Axes are never empty, so neither is `fits`.
    let best_idx = (1..fits.len()).fold(0, |best, i| {
        if fits[i].0.score.rn > fits[best].0.score.rn {
            i
        } else {
            best
        }
    });
    let best_fit = fits[best_idx].0;
    let best_params = GrowthParams::seasonal(
        linf[best_idx / n_k],
        k[best_idx % n_k],
        best_fit.t_anchor,
        setup.c,
        setup.ts,
    );

    let evaluations = fits.iter().map(|(_, n)| n).sum();
    let surface = ScoreSurface {
        rn: fits.iter().map(|(f, _)| f.score.rn).collect(),
        t_anchor: fits.iter().map(|(f, _)| f.t_anchor).collect(),
        linf,
        k,
    };

    let history = linf_history(&surface);
    let elapsed = start_time.elapsed().as_secs_f64();
    log::info!(
        "Grid search scored {} cells: best Rn = {:.4} at Linf = {:.2}, K = {:.3}",
        cells,
        best_fit.score.rn,
        best_params.linf,
        best_params.k
    );

    SearchResult {
        best: BestFit::new(best_params, best_fit.score),
        history,
        stats: SearchStats {
            iterations: cells,
            evaluations,
            elapsed_seconds: elapsed,
            stop_reason: StopReason::GridExhausted,
        },
        surface: Some(surface),
    }
}

/// Running best and mean Rn per Linf row.
fn linf_history(surface: &ScoreSurface) -> SearchHistory {
    let mut history = SearchHistory::default();
    let n_k = surface.k.len();
    if n_k == 0 {
        return history;
    }
    let mut best = f64::NEG_INFINITY;
    for row in surface.rn.chunks(n_k) {
        best = row.iter().copied().fold(best, f64::max);
        history.best_score.push(best);
        history.mean_score.push(row.iter().sum::<f64>() / n_k as f64);
    }
    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::search::fixtures;
    use crate::schema::ScoringOptions;

    #[test]
    fn test_history_on_negative_surface() {
        let surface = ScoreSurface {
            linf: vec![50.0, 60.0],
            k: vec![0.2, 0.4],
            rn: vec![-0.4, -0.3, -0.1, -0.2],
            t_anchor: vec![0.0; 4],
        };
        let history = linf_history(&surface);
        assert_eq!(history.best_score, vec![-0.3, -0.1]);
        assert!((history.mean_score[0] + 0.35).abs() < 1e-12);
    }

    fn surface_config() -> ResponseSurfaceConfig {
        ResponseSurfaceConfig {
            linf: Some(GridAxis::linear(80.0, 120.0, 9)),
            k: GridAxis::linear(0.1, 1.0, 10),
            ..Default::default()
        }
    }

    #[test]
    fn test_line_search_grid_points() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let config = LineSearchConfig {
            coarse_steps: 20,
            refine_steps: 0,
        };
        let (fit, evaluations) = line_search_t_anchor(
            &evaluator,
            &GrowthParams::new(100.0, 0.5, 0.0),
            (0.0, 1.0),
            &config,
        );
        assert_eq!(evaluations, 20);
        let brute = (0..20)
            .map(|i| evaluator.rn(&GrowthParams::new(100.0, 0.5, i as f64 / 20.0)))
            .fold(0.0, f64::max);
        assert_eq!(fit.score.rn, brute);
    }

    #[test]
    fn test_refinement_never_worse() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let base = GrowthParams::new(95.0, 0.45, 0.0);
        let coarse = LineSearchConfig {
            coarse_steps: 8,
            refine_steps: 0,
        };
        let refined = LineSearchConfig {
            coarse_steps: 8,
            refine_steps: 10,
        };
        let (a, _) = line_search_t_anchor(&evaluator, &base, (0.0, 1.0), &coarse);
        let (b, n) = line_search_t_anchor(&evaluator, &base, (0.0, 1.0), &refined);
        assert!(b.score.rn >= a.score.rn);
        assert_eq!(n, 18);
    }

    #[test]
    fn test_surface_cells_match_evaluator() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let result = response_surface(&evaluator, &surface_config(), (0.0, 0.0), (0.0, 1.0));
        let surface = result.surface.as_ref().unwrap();

        assert_eq!(surface.rn.len(), 90);
        for i in 0..surface.linf.len() {
            for j in 0..surface.k.len() {
                let params =
                    GrowthParams::new(surface.linf[i], surface.k[j], surface.t_anchor_at(i, j));
                assert_eq!(evaluator.rn(&params), surface.get(i, j));
            }
        }
    }

    #[test]
    fn test_surface_recovers_synthetic_growth() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let result = response_surface(&evaluator, &surface_config(), (0.0, 0.0), (0.0, 1.0));

        assert_eq!(result.stats.stop_reason, StopReason::GridExhausted);
        assert_eq!(result.stats.iterations, 90);
        assert!(result.best.score.rn > 0.7, "{:?}", result.best);
        let (i, j) = result.surface.as_ref().unwrap().argmax().unwrap();
        assert_eq!(result.best.score.rn, result.surface.as_ref().unwrap().get(i, j));
    }

    #[test]
    fn test_surface_repeatable() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let a = response_surface(&evaluator, &surface_config(), (0.0, 0.0), (0.0, 1.0));
        let b = response_surface(&evaluator, &surface_config(), (0.0, 0.0), (0.0, 1.0));
        assert_eq!(a.surface, b.surface);
        assert_eq!(a.best, b.best);
    }

    #[test]
    fn test_default_linf_axis() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let config = ResponseSurfaceConfig {
            k: GridAxis::linear(0.2, 0.8, 3),
            t_anchor_search: LineSearchConfig {
                coarse_steps: 4,
                refine_steps: 2,
            },
            ..Default::default()
        };
        let result = response_surface(&evaluator, &config, (80.0, 120.0), (0.0, 1.0));
        let surface = result.surface.unwrap();
        assert_eq!(surface.linf.len(), DEFAULT_LINF_STEPS);
        assert_eq!(surface.linf[0], 80.0);
        assert_eq!(result.stats.evaluations, (DEFAULT_LINF_STEPS * 3 * 6) as u64);
        assert_eq!(result.history.best_score.len(), DEFAULT_LINF_STEPS);
    }

    #[test]
    fn test_k_scan() {
        let data = fixtures::synthetic_restructured();
        let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
        let config = KScanConfig {
            linf: Some(100.0),
            k: GridAxis::linear(0.1, 1.0, 10),
            ..Default::default()
        };
        let result = k_scan(&evaluator, &config, (80.0, 120.0), (0.0, 1.0));
        let surface = result.surface.unwrap();
        assert_eq!(surface.linf, vec![100.0]);
        assert_eq!(surface.rn.len(), 10);
        assert_eq!(result.best.params.linf, 100.0);
        assert!(result.best.score.rn > 0.7);
    }
}
