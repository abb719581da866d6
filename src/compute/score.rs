//! Fit-score evaluation of growth curves against restructured data.
//!
//! A growth curve is traced through the length/time grid: at every sampling
//! date each living cohort falls into one length class, and the restructured
//! scores of the crossed cells form the explained sum of peaks (ESP).

use crate::schema::{
    ElefanError, FitScore, GrowthParams, MAX_COHORTS_PER_DATE, ScoringMode, ScoringOptions,
};

use super::growth::{age_at_length, cohort_lengths_at, max_age};
use super::restructure::{NO_PEAK, RestructuredDataset};

/// Widens the age window so cohorts exactly on an outer edge are kept.
const AGE_SLACK: f64 = 1e-9;

/// One cell crossed by a cohort trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// Length class index.
    pub row: usize,
    /// Sampling date index.
    pub col: usize,
    /// Cohort number (anchored at `t_anchor + cohort`).
    pub cohort: i64,
    /// Predicted length at the sampling date.
    pub length: f64,
    /// Restructured score of the cell.
    pub score: f64,
    /// Peak identifier of the cell.
    pub peak: u32,
}

/// Scores growth parameters against a restructured dataset.
///
/// Evaluation only reads the dataset and allocates nothing, so one evaluator
/// can be shared between threads.
#[derive(Debug, Clone, Copy)]
pub struct FitEvaluator<'a> {
    data: &'a RestructuredDataset,
    options: ScoringOptions,
}

impl<'a> FitEvaluator<'a> {
    /// Create an evaluator.
    pub fn new(data: &'a RestructuredDataset, options: ScoringOptions) -> Result<Self, ElefanError> {
        options.validate()?;
        if data.asp <= 0.0 {
            log::warn!("Restructured data has no positive peaks; every fit scores Rn = 0");
        }
        Ok(Self { data, options })
    }

    /// Restructured dataset being scored against.
    pub fn data(&self) -> &'a RestructuredDataset {
        self.data
    }

    /// Scoring options.
    pub fn options(&self) -> ScoringOptions {
        self.options
    }

    /// Compute ESP, ASP and Rn for a parameter set.
    ///
    /// Parameters that cannot describe growth, curves that cross no observed
    /// cell, and curves so slow that more than [`MAX_COHORTS_PER_DATE`]
    /// cohorts overlap the length classes score `Rn = 0`.
    pub fn evaluate(&self, params: &GrowthParams) -> FitScore {
        let asp = self.data.asp;
        let empty = FitScore { esp: 0.0, asp, rn: 0.0 };
        let Some(ages) = self.age_window(params) else {
            return empty;
        };

        let mut esp = 0.0;
        let mut crossed = false;
        for (col, &t) in self.data.times.iter().enumerate() {
            let column = match self.options.mode {
                ScoringMode::ColumnBest => self.column_best(params, col, t, ages),
                ScoringMode::PeakFlagging => self.column_flagged(params, col, t, ages),
            };
            if let Some(value) = column {
                esp += value;
                crossed = true;
            }
        }

        if !crossed {
            return empty;
        }
        let rn = if asp > 0.0 { esp / asp } else { 0.0 };
        FitScore { esp, asp, rn }
    }

    /// Normalized score only.
    #[inline]
    pub fn rn(&self, params: &GrowthParams) -> f64 {
        self.evaluate(params).rn
    }

    /// Every cell crossed by the growth curve, ordered by date then length.
    pub fn crossings(&self, params: &GrowthParams) -> Vec<Crossing> {
        let mut crossings = Vec::new();
        let Some(ages) = self.age_window(params) else {
            return crossings;
        };
        for (col, &t) in self.data.times.iter().enumerate() {
            for (cohort, length) in cohort_lengths_at(t, params, ages) {
                if let Some(row) = self.locate(length) {
                    crossings.push(Crossing {
                        row,
                        col,
                        cohort,
                        length,
                        score: self.data.rcount(row, col),
                        peak: self.data.peak(row, col),
                    });
                }
            }
        }
        crossings
    }

    /// Ages at which a cohort can fall inside the length classes.
    ///
    /// `None` when no cohort can, or when too many would.
    fn age_window(&self, params: &GrowthParams) -> Option<(f64, f64)> {
        if !usable(params) {
            return None;
        }
        let age_at = |length: f64| age_at_length(length, params).map(|t| t - params.t_anchor);
        let first = *self.data.bin_edges.first()?;
        let last = *self.data.bin_edges.last()?;

        let youngest = age_at(first.max(0.0))?;
        let mut oldest = self.options.max_age.unwrap_or_else(|| max_age(params));
        if let Some(age) = age_at(last) {
            oldest = oldest.min(age);
        }

        let span = oldest - youngest;
        if !(0.0..=MAX_COHORTS_PER_DATE as f64).contains(&span) {
            return None;
        }
        Some((youngest - AGE_SLACK, oldest + AGE_SLACK))
    }

    /// Best crossed score of one column.
    fn column_best(&self, params: &GrowthParams, col: usize, t: f64, ages: (f64, f64)) -> Option<f64> {
        cohort_lengths_at(t, params, ages)
            .filter_map(|(_, length)| self.locate(length))
            .map(|row| self.data.rcount(row, col))
            .reduce(f64::max)
    }

    /// Sum of crossed scores of one column, each positive peak counted once.
    fn column_flagged(
        &self,
        params: &GrowthParams,
        col: usize,
        t: f64,
        ages: (f64, f64),
    ) -> Option<f64> {
        let mut total = None;
        // Cohorts come youngest first, so crossings of one peak are adjacent.
        let mut open_peak: Option<(u32, f64)> = None;

        for row in cohort_lengths_at(t, params, ages).filter_map(|(_, l)| self.locate(l)) {
            let score = self.data.rcount(row, col);
            let peak = self.data.peak(row, col);
            let sum = total.get_or_insert(0.0);

            if peak == NO_PEAK {
                *sum += score;
                continue;
            }
            match open_peak {
                Some((id, best)) if id == peak => open_peak = Some((id, best.max(score))),
                _ => {
                    if let Some((_, best)) = open_peak.replace((peak, score)) {
                        *sum += best;
                    }
                }
            }
        }

        if let Some((_, best)) = open_peak {
            *total.get_or_insert(0.0) += best;
        }
        total
    }

    /// Length class containing `length`, if any.
    #[inline]
    fn locate(&self, length: f64) -> Option<usize> {
        locate_bin(&self.data.bin_edges, length)
    }
}

#[inline]
fn usable(params: &GrowthParams) -> bool {
    params.linf.is_finite()
        && params.linf > 0.0
        && params.k.is_finite()
        && params.k > 0.0
        && params.t_anchor.is_finite()
        && (0.0..=1.0).contains(&params.c)
        && params.ts.is_finite()
}

/// Index of the class `[edges[i], edges[i + 1])` containing a positive length.
#[inline]
pub fn locate_bin(edges: &[f64], length: f64) -> Option<usize> {
    let n = edges.len();
    if n < 2 || !(length > 0.0) || length < edges[0] || length >= edges[n - 1] {
        return None;
    }
    Some(edges.partition_point(|e| *e <= length) - 1)
}
