//! JSON export of growth fits.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schema::{RestructureConfig, SearchResult};

use super::super::restructure::RestructuredDataset;
use super::jackknife::JackknifeSummary;

/// Shape and totals of the fitted dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetSummary {
    pub n_lengths: usize,
    pub n_dates: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub total_catch: f64,
    /// Available sum of peaks after restructuring.
    pub asp: f64,
}

impl From<&RestructuredDataset> for DatasetSummary {
    fn from(data: &RestructuredDataset) -> Self {
        Self {
            n_lengths: data.n_lengths(),
            n_dates: data.n_dates(),
            first_date: data.dataset.dates.first().copied(),
            last_date: data.dataset.dates.last().copied(),
            total_catch: data.dataset.total_catch(),
            asp: data.asp,
        }
    }
}

/// Complete record of one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    /// Dataset summary.
    pub dataset: DatasetSummary,
    /// Restructuring settings.
    pub restructure: RestructureConfig,
    /// Search outcome.
    pub result: SearchResult,
    /// Leave-one-date-out refits.
    #[serde(default)]
    pub jackknife: Option<JackknifeSummary>,
}

impl FitReport {
    /// Report for a search run on restructured data.
    pub fn new(data: &RestructuredDataset, result: SearchResult) -> Self {
        Self {
            dataset: DatasetSummary::from(data),
            restructure: data.config,
            result,
            jackknife: None,
        }
    }

    /// Attach jackknife results.
    pub fn with_jackknife(mut self, jackknife: JackknifeSummary) -> Self {
        self.jackknife = Some(jackknife);
        self
    }

    /// Save as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    /// Load from JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let best = &self.result.best;
        let stats = &self.result.stats;
        let mut out = String::new();

        let _ = writeln!(
            out,
            "Dataset: {} length classes x {} dates, total catch {:.0}, ASP {:.4}",
            self.dataset.n_lengths, self.dataset.n_dates, self.dataset.total_catch, self.dataset.asp
        );
        let _ = writeln!(
            out,
            "Best fit: Linf = {:.2}, K = {:.4}, t_anchor = {:.3}, C = {:.2}, ts = {:.3}",
            best.params.linf, best.params.k, best.params.t_anchor, best.params.c, best.params.ts
        );
        let _ = writeln!(
            out,
            "Score: Rn = {:.4} (ESP {:.4}), phi' = {:.3}",
            best.score.rn, best.score.esp, best.phi_prime
        );
        let _ = writeln!(
            out,
            "Search: {} iterations, {} evaluations in {:.2}s ({:?})",
            stats.iterations, stats.evaluations, stats.elapsed_seconds, stats.stop_reason
        );
        if let Some(jk) = &self.jackknife {
            let _ = writeln!(
                out,
                "Jackknife ({} runs): Linf = {:.2} +/- {:.2}, K = {:.4} +/- {:.4}, phi' = {:.3} +/- {:.3}",
                jk.runs.len(),
                jk.linf.mean,
                jk.linf.std_error,
                jk.k.mean,
                jk.k.std_error,
                jk.phi_prime.mean,
                jk.phi_prime.std_error
            );
        }
        out
    }
}
