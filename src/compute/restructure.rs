//! Length-frequency restructuring.
//!
//! Converts raw catch-at-length columns into scores that are positive on
//! modal peaks and negative in the troughs between them. Each sampling date is
//! restructured independently.

use rayon::prelude::*;

use crate::schema::{ElefanError, LfqDataset, RestructureConfig};

/// Peak identifier stored for cells that are not part of a positive run.
pub const NO_PEAK: u32 = 0;

/// Restructured scores below `-1 + RESTRUCTURE_EPS` are treated as empty bins.
const RESTRUCTURE_EPS: f64 = 1e-8;

/// Dataset together with its restructured score matrix.
#[derive(Debug, Clone)]
pub struct RestructuredDataset {
    /// Source dataset.
    pub dataset: LfqDataset,
    /// Parameters used for restructuring.
    pub config: RestructureConfig,
    /// Restructured scores, column-major like the catch matrix.
    pub rcounts: Vec<f64>,
    /// Peak segment per cell, [`NO_PEAK`] for non-positive cells.
    pub peaks: Vec<u32>,
    /// Available sum of peaks per sampling date.
    pub column_asp: Vec<f64>,
    /// Available sum of peaks over all dates.
    pub asp: f64,
    /// Sampling dates as decimal years.
    pub times: Vec<f64>,
    /// Length-class boundaries.
    pub bin_edges: Vec<f64>,
}

impl RestructuredDataset {
    /// Number of length classes.
    #[inline]
    pub fn n_lengths(&self) -> usize {
        self.dataset.n_lengths()
    }

    /// Number of sampling dates.
    #[inline]
    pub fn n_dates(&self) -> usize {
        self.dataset.n_dates()
    }

    /// Restructured score of one cell.
    #[inline]
    pub fn rcount(&self, row: usize, col: usize) -> f64 {
        self.rcounts[col * self.n_lengths() + row]
    }

    /// Peak identifier of one cell.
    #[inline]
    pub fn peak(&self, row: usize, col: usize) -> u32 {
        self.peaks[col * self.n_lengths() + row]
    }

    /// Restructured scores of one sampling date.
    #[inline]
    pub fn column(&self, col: usize) -> &[f64] {
        let n = self.n_lengths();
        &self.rcounts[col * n..(col + 1) * n]
    }

    /// Moving-average window used for restructuring.
    #[inline]
    pub fn moving_average(&self) -> usize {
        self.config.moving_average
    }
}

/// Restructure every sampling date of a dataset.
pub fn restructure(
    dataset: &LfqDataset,
    config: RestructureConfig,
) -> Result<RestructuredDataset, ElefanError> {
    config.validate()?;
    dataset.validate()?;

    let n = dataset.n_lengths();
    let columns: Vec<Vec<f64>> = (0..dataset.n_dates())
        .into_par_iter()
        .map(|col| {
            let counts = dataset.column(col);
            if counts.iter().all(|&c| c == 0.0) {
                log::warn!(
                    "Sampling date {} has no catches; restructured scores set to zero",
                    dataset.dates[col]
                );
            }
            restructure_column(counts, config.moving_average, config.sqrt_damping)
        })
        .collect();

    let mut rcounts = Vec::with_capacity(n * columns.len());
    for column in &columns {
        rcounts.extend_from_slice(column);
    }

    let peaks = label_peaks(&rcounts, n);
    let column_asp: Vec<f64> = rcounts.chunks(n).map(column_peak_sum).collect();
    let asp = column_asp.iter().sum();

    log::debug!(
        "Restructured {} dates x {} lengths (MA = {}): ASP = {:.4}",
        dataset.n_dates(),
        n,
        config.moving_average,
        asp
    );

    Ok(RestructuredDataset {
        dataset: dataset.clone(),
        config,
        rcounts,
        peaks,
        column_asp,
        asp,
        times: dataset.decimal_times(),
        bin_edges: dataset.bin_edges(),
    })
}

/// Restructure a single catch column.
///
/// `window` must be odd. An all-zero column yields all-zero scores.
pub fn restructure_column(counts: &[f64], window: usize, sqrt_damping: bool) -> Vec<f64> {
    let n = counts.len();
    if n == 0 || counts.iter().all(|&c| c == 0.0) {
        return vec![0.0; n];
    }

    let radius = (window.max(1) - 1) / 2;
    let mut adjustment = vec![0.0f64; n];
    let mut zero_neighbours = vec![0i32; n];

    for j in 0..n {
        let lo = j.saturating_sub(radius);
        let hi = (j + radius).min(n - 1);
        // Positions cut off at either end count as empty neighbours.
        let clipped = (radius - (j - lo)) + (radius - (hi - j));

        let window_counts = &counts[lo..=hi];
        let zeros = window_counts
            .iter()
            .enumerate()
            .filter(|&(i, &c)| lo + i != j && c == 0.0)
            .count();
        zero_neighbours[j] = (zeros + clipped) as i32;

        let moving_avg = window_counts.iter().sum::<f64>() / window_counts.len() as f64;
        let af = if moving_avg > 0.0 {
            counts[j] / moving_avg
        } else {
            0.0
        };
        adjustment[j] = if af.is_finite() { af } else { 0.0 };
    }

    let mean_af = adjustment.iter().sum::<f64>() / n as f64;
    let mut fs: Vec<f64> = adjustment.iter().map(|af| af / mean_af - 1.0).collect();

    for (value, &nz) in fs.iter_mut().zip(&zero_neighbours) {
        if *value > 0.0 {
            *value *= 0.5f64.powi(nz);
        }
    }

    if fs[n - 1] < 0.0 {
        fs[n - 1] = 0.0;
    }
    if n >= 2 && fs[n - 2] < 0.0 {
        fs[n - 2] *= 0.5;
    }

    let spv: f64 = fs.iter().filter(|v| **v > 0.0).sum();
    let snv: f64 = fs.iter().filter(|v| **v < 0.0).sum();

    for value in fs.iter_mut() {
        if value.is_nan() || (*value + 1.0).abs() < RESTRUCTURE_EPS {
            *value = 0.0;
        }
    }

    if snv < 0.0 {
        let scale = spv / -snv;
        for value in fs.iter_mut().filter(|v| **v < 0.0) {
            *value *= scale;
        }
    }

    if sqrt_damping {
        for (value, &c) in fs.iter_mut().zip(counts) {
            if *value > 0.0 {
                *value /= (1.0 + 2.0 / c).sqrt();
            }
        }
    }

    fs
}

/// Number contiguous positive runs, unique across all columns.
///
/// Local run numbers start at 1 in every column and are offset by
/// `column * max_runs_per_column`.
pub fn label_peaks(rcounts: &[f64], n_lengths: usize) -> Vec<u32> {
    if n_lengths == 0 {
        return Vec::new();
    }

    let mut local = vec![NO_PEAK; rcounts.len()];
    let mut max_runs = 0u32;

    for (column, labels) in rcounts.chunks(n_lengths).zip(local.chunks_mut(n_lengths)) {
        let mut runs = 0u32;
        let mut in_run = false;
        for (value, label) in column.iter().zip(labels.iter_mut()) {
            if *value > 0.0 {
                if !in_run {
                    runs += 1;
                    in_run = true;
                }
                *label = runs;
            } else {
                in_run = false;
            }
        }
        max_runs = max_runs.max(runs);
    }

    for (col, labels) in local.chunks_mut(n_lengths).enumerate() {
        let offset = col as u32 * max_runs;
        for label in labels.iter_mut().filter(|l| **l != NO_PEAK) {
            *label += offset;
        }
    }

    local
}

/// Sum of the maxima of every positive run in a column.
pub fn column_peak_sum(column: &[f64]) -> f64 {
    let mut total = 0.0;
    let mut run_max: Option<f64> = None;

    for &value in column {
        if value > 0.0 {
            run_max = Some(run_max.map_or(value, |m| m.max(value)));
        } else if let Some(m) = run_max.take() {
            total += m;
        }
    }
    if let Some(m) = run_max {
        total += m;
    }

    total
}
