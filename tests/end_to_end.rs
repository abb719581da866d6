//! End-to-end scenarios: dataset -> restructuring -> growth search.

use chrono::NaiveDate;
use elefan::compute::search::{FitReport, fit_growth, jackknife};
use elefan::compute::{FitEvaluator, length_at, restructure};
use elefan::schema::{
    AnalysisConfig, AnnealingConfig, ConfigError, ElefanError, GeneticAlgorithmConfig, GridAxis,
    GrowthParams, LfqDataset, PopulationConfig, ResponseSurfaceConfig, RestructureConfig,
    ScoringOptions, SearchAlgorithm, SearchConfig, StopReason, decimal_year,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One cohort (Linf = 100, K = 0.5, anchored at 0.25) sampled quarterly,
/// counts spread normally (sd = 4) around its length.
fn one_cohort_dataset() -> LfqDataset {
    let truth = GrowthParams::new(100.0, 0.5, 0.25);
    let mids: Vec<f64> = (0..25).map(|i| 2.0 + 4.0 * i as f64).collect();
    let dates = vec![date(2020, 1, 1), date(2020, 4, 1), date(2020, 7, 1), date(2020, 10, 1)];
    let columns: Vec<Vec<f64>> = dates
        .iter()
        .map(|d| {
            let mu = length_at(decimal_year(*d) - 2019.0, &truth);
            mids.iter()
                .map(|l| (1000.0 * (-(l - mu).powi(2) / 32.0).exp()).round())
                .collect()
        })
        .collect();
    LfqDataset::from_columns(mids, dates, &columns).unwrap()
}

fn grid_config() -> SearchConfig {
    SearchConfig {
        algorithm: SearchAlgorithm::ResponseSurface(ResponseSurfaceConfig {
            linf: Some(GridAxis::linear(80.0, 120.0, 9)),
            k: GridAxis::linear(0.1, 1.0, 10),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[test]
fn test_grid_recovers_synthetic_cohort() {
    let dataset = one_cohort_dataset();
    let data = restructure(&dataset, RestructureConfig::new(5, false)).unwrap();
    assert!(data.asp > 0.0);

    let result = fit_growth(&data, &grid_config()).unwrap();
    let surface = result.surface.as_ref().unwrap();

    // Linf = 100 and K = 0.5 are both on the grid.
    assert!((surface.linf[4] - 100.0).abs() < 1e-9);
    assert!((surface.k[4] - 0.5).abs() < 1e-9);
    assert!(surface.get(4, 4) > 0.7, "Rn at truth = {}", surface.get(4, 4));
    assert!(result.best.score.rn >= surface.get(4, 4));
    assert_eq!(result.stats.stop_reason, StopReason::GridExhausted);
}

#[test]
fn test_single_date_single_bin() {
    let dataset = LfqDataset::from_columns(
        vec![5.0, 7.0, 9.0, 11.0, 13.0],
        vec![date(2020, 1, 1)],
        &[vec![0.0, 0.0, 5.0, 0.0, 0.0]],
    )
    .unwrap();
    let data = restructure(&dataset, RestructureConfig::default()).unwrap();
    assert!((data.asp - data.rcount(2, 0)).abs() < 1e-12);

    let evaluator = FitEvaluator::new(&data, ScoringOptions::default()).unwrap();
    let params = GrowthParams::new(20.0, 0.5, 0.804);
    assert!(evaluator.crossings(&params).iter().any(|c| c.row == 2));
    assert!((evaluator.rn(&params) - 1.0).abs() < 1e-12);
}

#[test]
fn test_degenerate_column_absorbed() {
    let mut dataset = one_cohort_dataset();
    let n = dataset.n_lengths();
    for value in &mut dataset.catch[n..2 * n] {
        *value = 0.0;
    }
    let data = restructure(&dataset, RestructureConfig::default()).unwrap();
    assert!(data.column(1).iter().all(|&v| v == 0.0));
    assert_eq!(data.column_asp[1], 0.0);

    let result = fit_growth(&data, &grid_config()).unwrap();
    assert!(result.best.score.rn <= 1.0);
}

#[test]
fn test_even_window_rejected() {
    let dataset = one_cohort_dataset();
    assert!(matches!(
        restructure(&dataset, RestructureConfig::new(4, false)),
        Err(ElefanError::InvalidParameter(ConfigError::InvalidWindow { window: 4 }))
    ));
}

#[test]
fn test_stochastic_searches_reproducible() {
    let data = restructure(&one_cohort_dataset(), RestructureConfig::default()).unwrap();
    let algorithms = [
        SearchAlgorithm::SimulatedAnnealing(AnnealingConfig {
            max_iterations: 40,
            moves_per_temperature: 10,
            ..Default::default()
        }),
        SearchAlgorithm::GeneticAlgorithm(GeneticAlgorithmConfig {
            population: PopulationConfig {
                size: 16,
                max_generations: 10,
                ..Default::default()
            },
            ..Default::default()
        }),
    ];

    for algorithm in algorithms {
        let config = SearchConfig {
            algorithm,
            seasonal: true,
            random_seed: Some(2024),
            ..Default::default()
        };
        let a = fit_growth(&data, &config).unwrap();
        let b = fit_growth(&data, &config).unwrap();
        assert_eq!(a.best, b.best);
        assert_eq!(a.history, b.history);
        assert!(a.history.best_score.windows(2).all(|w| w[1] >= w[0]));
    }
}

#[test]
fn test_analysis_config_from_json() {
    let json = r#"{
        "restructure": { "moving_average": 7 },
        "search": {
            "algorithm": { "type": "KScan", "linf": 100.0, "k": { "start": 0.3, "end": 0.7, "steps": 5 } },
            "bounds": { "t_anchor": [0.0, 1.0] }
        },
        "jackknife": true
    }"#;
    let config: AnalysisConfig = serde_json::from_str(json).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.restructure.moving_average, 7);
    assert!(!config.restructure.sqrt_damping);

    let dataset = one_cohort_dataset();
    let data = restructure(&dataset, config.restructure).unwrap();
    let result = fit_growth(&data, &config.search).unwrap();
    let summary = jackknife(&dataset, config.restructure, &config.search).unwrap();
    assert_eq!(summary.runs.len(), 4);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.result.json");
    FitReport::new(&data, result)
        .with_jackknife(summary)
        .save(&path)
        .unwrap();
    let loaded = FitReport::load(&path).unwrap();
    assert_eq!(loaded.restructure.moving_average, 7);
    assert_eq!(loaded.jackknife.map(|j| j.runs.len()), Some(4));
}
