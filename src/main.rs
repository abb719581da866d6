//! ELEFAN CLI - Fit growth curves from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use elefan::{
    compute::{
        length_at, restructure,
        search::{FitReport, fit_growth_with_callback, jackknife},
    },
    schema::{
        AnalysisConfig, GridAxis, GrowthParams, LfqDataset, ResponseSurfaceConfig,
        SearchAlgorithm, SearchConfig,
    },
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json>", args[0]);
        eprintln!();
        eprintln!("Fit a von Bertalanffy growth curve to length-frequency data.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to analysis configuration file");
        eprintln!();
        eprintln!("The dataset is read from <config>.lfq.json and the report is");
        eprintln!("written to <config>.result.json.");
        eprintln!("Example files are generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: AnalysisConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    // Load dataset
    let data_path = config_path.with_extension("lfq.json");
    let data_str = fs::read_to_string(&data_path).unwrap_or_else(|e| {
        eprintln!("Error reading dataset {}: {}", data_path.display(), e);
        std::process::exit(1);
    });
    let dataset: LfqDataset = serde_json::from_str(&data_str).unwrap_or_else(|e| {
        eprintln!("Error parsing dataset: {}", e);
        std::process::exit(1);
    });

    println!("ELEFAN Growth Fit");
    println!("=================");
    println!(
        "Data: {} length classes x {} dates",
        dataset.n_lengths(),
        dataset.n_dates()
    );
    println!("Moving average: {}", config.restructure.moving_average);
    println!("Algorithm: {}", algorithm_name(&config.search.algorithm));
    println!("Seasonal: {}", config.search.seasonal);
    println!();

    let data = restructure(&dataset, config.restructure).unwrap_or_else(|e| {
        eprintln!("Error restructuring data: {}", e);
        std::process::exit(1);
    });

    println!("Running search...");
    let start = Instant::now();

    let result = fit_growth_with_callback(&data, &config.search, |progress| {
        let total = progress.total_iterations.max(1);
        // Print progress every 10%
        if progress.iteration % (total / 10).max(1) == 0 {
            println!(
                "  {}/{}: best Rn={:.4}, mean Rn={:.4}",
                progress.iteration, total, progress.best_score, progress.mean_score
            );
        }
    })
    .unwrap_or_else(|e| {
        eprintln!("Error fitting growth: {}", e);
        std::process::exit(1);
    });

    let mut report = FitReport::new(&data, result);

    if config.jackknife {
        println!("Running jackknife...");
        let summary = jackknife(&dataset, config.restructure, &config.search).unwrap_or_else(|e| {
            eprintln!("Error in jackknife: {}", e);
            std::process::exit(1);
        });
        report = report.with_jackknife(summary);
    }

    println!();
    print!("{}", report.summary());
    println!("Time: {:.2}s", start.elapsed().as_secs_f32());

    let result_path = config_path.with_extension("result.json");
    if let Err(e) = report.save(&result_path) {
        eprintln!("Error writing report: {}", e);
        std::process::exit(1);
    }
    println!("Report written to {}", result_path.display());
}

fn algorithm_name(algorithm: &SearchAlgorithm) -> &'static str {
    match algorithm {
        SearchAlgorithm::ResponseSurface(_) => "response surface",
        SearchAlgorithm::KScan(_) => "K-scan",
        SearchAlgorithm::SimulatedAnnealing(_) => "simulated annealing",
        SearchAlgorithm::GeneticAlgorithm(_) => "genetic algorithm",
    }
}

/// Quarterly samples of two cohorts growing with Linf = 60, K = 0.6.
fn example_dataset() -> Option<LfqDataset> {
    let params = GrowthParams::new(60.0, 0.6, 0.3);
    let mids: Vec<f64> = (0..30).map(|i| 1.0 + 2.0 * i as f64).collect();
    let dates = [(2021, 2), (2021, 5), (2021, 8), (2021, 11), (2022, 2)]
        .iter()
        .map(|&(y, m)| NaiveDate::from_ymd_opt(y, m, 15))
        .collect::<Option<Vec<_>>>()?;

    let columns: Vec<Vec<f64>> = dates
        .iter()
        .map(|date| {
            let t = elefan::schema::decimal_year(*date);
            mids.iter()
                .map(|&l| {
                    [1.0, 2.0]
                        .iter()
                        .map(|age| {
                            let mu = length_at(t - t.floor() + age, &params);
                            400.0 / age * (-(l - mu).powi(2) / 18.0).exp()
                        })
                        .sum::<f64>()
                        .round()
                })
                .collect()
        })
        .collect();

    LfqDataset::from_columns(mids, dates, &columns).ok()
}

fn print_example() {
    let config = AnalysisConfig {
        search: SearchConfig {
            algorithm: SearchAlgorithm::ResponseSurface(ResponseSurfaceConfig {
                linf: Some(GridAxis::linear(50.0, 70.0, 21)),
                k: GridAxis::log(0.2, 1.5, 25),
                ..Default::default()
            }),
            random_seed: Some(42),
            ..Default::default()
        },
        ..Default::default()
    };

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
    println!();
    println!("Example dataset (config.lfq.json):");
    match example_dataset().map(|d| serde_json::to_string_pretty(&d)) {
        Some(Ok(json)) => println!("{}", json),
        Some(Err(e)) => eprintln!("Error serializing dataset: {}", e),
        None => eprintln!("Error building example dataset"),
    }
}
