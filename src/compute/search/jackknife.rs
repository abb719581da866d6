//! Leave-one-date-out jackknife of growth fits.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{BestFit, DatasetError, ElefanError, LfqDataset, RestructureConfig, SearchConfig};

use super::super::restructure::restructure;
use super::fit_growth;

/// Fewest sampling dates for which a jackknife is attempted.
const MIN_JACKKNIFE_DATES: usize = 3;

/// Fit with one sampling date removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JackknifeRun {
    /// The date left out.
    pub omitted: NaiveDate,
    /// Best fit on the remaining dates.
    pub best: BestFit,
}

/// Jackknife mean and standard error of one quantity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Estimate {
    /// Mean over the leave-one-out fits.
    pub mean: f64,
    /// Jackknife standard error.
    pub std_error: f64,
}

impl Estimate {
    /// Jackknife estimate from leave-one-out values.
    ///
    /// SE = sqrt((n - 1) / n * sum (x_i - mean)^2).
    pub fn from_values(values: &[f64]) -> Self {
        let n = values.len() as f64;
        if values.is_empty() {
            return Self {
                mean: f64::NAN,
                std_error: f64::NAN,
            };
        }
        let mean = values.iter().sum::<f64>() / n;
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        Self {
            mean,
            std_error: ((n - 1.0) / n * ss).sqrt(),
        }
    }
}

/// Results of a jackknife over sampling dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JackknifeSummary {
    /// One fit per omitted sampling date, in date order.
    pub runs: Vec<JackknifeRun>,
    /// Asymptotic length.
    pub linf: Estimate,
    /// Growth coefficient.
    pub k: Estimate,
    /// Growth performance index.
    pub phi_prime: Estimate,
}

/// Refit the growth curve once per sampling date with that date removed.
///
/// Runs are independent and execute in parallel. With a fixed
/// `random_seed`, run `i` uses seed `random_seed + i`.
pub fn jackknife(
    dataset: &LfqDataset,
    restructure_config: RestructureConfig,
    search_config: &SearchConfig,
) -> Result<JackknifeSummary, ElefanError> {
    if dataset.n_dates() < MIN_JACKKNIFE_DATES {
        return Err(DatasetError::TooFewDates {
            required: MIN_JACKKNIFE_DATES,
            actual: dataset.n_dates(),
        }
        .into());
    }
    search_config.validate()?;

    log::info!("Jackknife over {} sampling dates", dataset.n_dates());

    let runs: Vec<JackknifeRun> = (0..dataset.n_dates())
        .into_par_iter()
        .map(|i| -> Result<JackknifeRun, ElefanError> {
            let subset = dataset.without_date(i)?;
            let data = restructure(&subset, restructure_config)?;
            let mut config = search_config.clone();
            config.random_seed = search_config
                .random_seed
                .map(|seed| seed.wrapping_add(i as u64));
            let result = fit_growth(&data, &config)?;
            log::debug!(
                "Jackknife without {}: Linf = {:.2}, K = {:.3}, Rn = {:.4}",
                dataset.dates[i],
                result.best.params.linf,
                result.best.params.k,
                result.best.score.rn
            );
            Ok(JackknifeRun {
                omitted: dataset.dates[i],
                best: result.best,
            })
        })
        .collect::<Result<_, ElefanError>>()?;

    let estimate = |f: fn(&BestFit) -> f64| {
        let values: Vec<f64> = runs.iter().map(|r| f(&r.best)).collect();
        Estimate::from_values(&values)
    };
    let linf = estimate(|b| b.params.linf);
    let k = estimate(|b| b.params.k);
    let phi_prime = estimate(|b| b.phi_prime);

    Ok(JackknifeSummary {
        runs,
        linf,
        k,
        phi_prime,
    })
}
