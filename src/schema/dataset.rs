//! Length-frequency (LFQ) dataset: catch counts per length class and sampling date.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::DatasetError;

/// Catch-at-length samples for a single stock.
///
/// The catch matrix is stored column-major: all length classes of the first
/// sampling date, then all length classes of the second, and so on. This keeps
/// every date column contiguous, which is how the restructuring and scoring
/// code walks it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LfqDataset {
    /// Length-class midpoints, strictly increasing.
    pub mid_lengths: Vec<f64>,
    /// Sampling dates, strictly increasing, one per catch column.
    pub dates: Vec<NaiveDate>,
    /// Catch counts, column-major, `mid_lengths.len() * dates.len()` entries.
    pub catch: Vec<f64>,
}

impl LfqDataset {
    /// Create a validated dataset.
    pub fn new(
        mid_lengths: Vec<f64>,
        dates: Vec<NaiveDate>,
        catch: Vec<f64>,
    ) -> Result<Self, DatasetError> {
        let dataset = Self {
            mid_lengths,
            dates,
            catch,
        };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Build a dataset from one catch vector per sampling date.
    pub fn from_columns(
        mid_lengths: Vec<f64>,
        dates: Vec<NaiveDate>,
        columns: &[Vec<f64>],
    ) -> Result<Self, DatasetError> {
        let rows = mid_lengths.len();
        if let Some((col, column)) = columns.iter().enumerate().find(|(_, c)| c.len() != rows) {
            return Err(DatasetError::ColumnLength {
                column: col,
                expected: rows,
                actual: column.len(),
            });
        }
        let catch = columns.iter().flatten().copied().collect();
        Self::new(mid_lengths, dates, catch)
    }

    /// Number of length classes (matrix rows).
    #[inline]
    pub fn n_lengths(&self) -> usize {
        self.mid_lengths.len()
    }

    /// Number of sampling dates (matrix columns).
    #[inline]
    pub fn n_dates(&self) -> usize {
        self.dates.len()
    }

    /// Catch count for a length class and date.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.catch[col * self.n_lengths() + row]
    }

    /// Catch counts of one sampling date.
    #[inline]
    pub fn column(&self, col: usize) -> &[f64] {
        let n = self.n_lengths();
        &self.catch[col * n..(col + 1) * n]
    }

    /// Sampling dates as decimal years.
    pub fn decimal_times(&self) -> Vec<f64> {
        self.dates.iter().map(|d| decimal_year(*d)).collect()
    }

    /// Length-class boundaries (`n_lengths + 1` values).
    ///
    /// Inner edges sit halfway between neighbouring midpoints; the outer edges
    /// extend by half of the adjacent bin width.
    pub fn bin_edges(&self) -> Vec<f64> {
        bin_edges(&self.mid_lengths)
    }

    /// Largest length-class midpoint.
    pub fn max_length(&self) -> f64 {
        self.mid_lengths.last().copied().unwrap_or(0.0)
    }

    /// Total catch over all cells.
    pub fn total_catch(&self) -> f64 {
        self.catch.iter().sum()
    }

    /// Copy of the dataset with one sampling date removed.
    pub fn without_date(&self, col: usize) -> Result<Self, DatasetError> {
        if self.n_dates() < 2 {
            return Err(DatasetError::TooFewDates {
                required: 2,
                actual: self.n_dates(),
            });
        }
        if col >= self.n_dates() {
            return Err(DatasetError::DateIndex {
                index: col,
                dates: self.n_dates(),
            });
        }
        let n = self.n_lengths();
        let mut dates = self.dates.clone();
        dates.remove(col);
        let catch = self
            .catch
            .chunks(n)
            .enumerate()
            .filter(|(i, _)| *i != col)
            .flat_map(|(_, c)| c.iter().copied())
            .collect();

        Ok(Self {
            mid_lengths: self.mid_lengths.clone(),
            dates,
            catch,
        })
    }

    /// Check the shape and ordering invariants.
    pub fn validate(&self) -> Result<(), DatasetError> {
        if self.mid_lengths.is_empty() || self.dates.is_empty() {
            return Err(DatasetError::Empty);
        }
        let expected = self.mid_lengths.len() * self.dates.len();
        if self.catch.len() != expected {
            return Err(DatasetError::ShapeMismatch {
                lengths: self.mid_lengths.len(),
                dates: self.dates.len(),
                cells: self.catch.len(),
            });
        }
        if let Some(i) = self
            .mid_lengths
            .windows(2)
            .position(|w| !w[0].is_finite() || !w[1].is_finite() || w[1] <= w[0])
        {
            return Err(DatasetError::UnorderedLengths { index: i + 1 });
        }
        if let Some(i) = self.dates.windows(2).position(|w| w[1] <= w[0]) {
            return Err(DatasetError::UnorderedDates { index: i + 1 });
        }
        if let Some(i) = self.catch.iter().position(|c| !c.is_finite() || *c < 0.0) {
            let n = self.mid_lengths.len();
            return Err(DatasetError::InvalidCount {
                row: i % n,
                col: i / n,
                value: self.catch[i],
            });
        }
        Ok(())
    }
}

/// Convert a calendar date to a decimal year (1 January = `year + 0.0`).
pub fn decimal_year(date: NaiveDate) -> f64 {
    let days_in_year = if date.leap_year() { 366.0 } else { 365.0 };
    date.year() as f64 + date.ordinal0() as f64 / days_in_year
}

/// Length-class boundaries for a strictly increasing list of midpoints.
pub fn bin_edges(mids: &[f64]) -> Vec<f64> {
    match mids.len() {
        0 => Vec::new(),
        // A single class has no neighbour to take a width from.
        1 => vec![mids[0] - 0.5, mids[0] + 0.5],
        n => {
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(mids[0] - (mids[1] - mids[0]) / 2.0);
            for w in mids.windows(2) {
                edges.push((w[0] + w[1]) / 2.0);
            }
            edges.push(mids[n - 1] + (mids[n - 1] - mids[n - 2]) / 2.0);
            edges
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn small_dataset() -> LfqDataset {
        LfqDataset::from_columns(
            vec![5.0, 10.0, 15.0],
            vec![date(2020, 1, 1), date(2020, 7, 1)],
            &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_column_major_access() {
        let ds = small_dataset();
        assert_eq!(ds.column(1), &[4.0, 5.0, 6.0]);
        assert_eq!(ds.get(2, 0), 3.0);
        assert_eq!(ds.total_catch(), 21.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = LfqDataset::new(vec![1.0, 2.0], vec![date(2020, 1, 1)], vec![1.0]).unwrap_err();
        assert!(matches!(err, DatasetError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_unordered_inputs() {
        let err = LfqDataset::new(vec![2.0, 1.0], vec![date(2020, 1, 1)], vec![1.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, DatasetError::UnorderedLengths { index: 1 }));

        let err = LfqDataset::new(
            vec![1.0],
            vec![date(2020, 2, 1), date(2020, 1, 1)],
            vec![1.0, 1.0],
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::UnorderedDates { index: 1 }));
    }

    #[test]
    fn test_negative_count() {
        let err = LfqDataset::new(vec![1.0, 2.0], vec![date(2020, 1, 1)], vec![1.0, -3.0])
            .unwrap_err();
        assert!(matches!(err, DatasetError::InvalidCount { row: 1, col: 0, .. }));
    }

    #[test]
    fn test_decimal_year() {
        assert_eq!(decimal_year(date(2021, 1, 1)), 2021.0);
        assert!((decimal_year(date(2020, 7, 2)) - (2020.0 + 182.0 / 366.0)).abs() < 1e-12);
    }

    #[test]
    fn test_bin_edges() {
        assert_eq!(bin_edges(&[2.0, 6.0, 10.0]), vec![0.0, 4.0, 8.0, 12.0]);
        assert_eq!(bin_edges(&[3.0]), vec![2.5, 3.5]);
    }

    #[test]
    fn test_without_date() {
        let ds = small_dataset();
        let dropped = ds.without_date(0).unwrap();
        assert_eq!(dropped.n_dates(), 1);
        assert_eq!(dropped.column(0), &[4.0, 5.0, 6.0]);
        assert!(dropped.validate().is_ok());

        assert!(matches!(
            ds.without_date(5),
            Err(DatasetError::DateIndex { index: 5, .. })
        ));
    }
}
