//! Seasonal von Bertalanffy growth function (VBGF).
//!
//! Length of a cohort anchored at `t_anchor` (the time of year at which its
//! length is zero):
//!
//! L(t) = Linf * (1 - exp(-(K * (t - t_anchor) + S(t) - S(t_anchor))))
//!
//! with S(t) = C * K / (2 pi) * sin(2 pi (t - ts)). For C = 0 this is the
//! standard VBGF. For C <= 1 the exponent is non-decreasing in t, so every
//! length below Linf is reached exactly once per cohort.

use std::f64::consts::{PI, TAU};

use crate::schema::GrowthParams;

/// Fraction of Linf that defines the default maximum age.
pub const MAX_AGE_LENGTH_FRACTION: f64 = 0.95;

const BISECTION_ITERATIONS: usize = 100;

#[inline]
fn seasonal_term(t: f64, p: &GrowthParams) -> f64 {
    if p.c == 0.0 {
        0.0
    } else {
        p.c * p.k / TAU * (TAU * (t - p.ts)).sin()
    }
}

/// Growth exponent K (t - t_anchor) + S(t) - S(t_anchor).
#[inline]
fn exponent(t: f64, p: &GrowthParams) -> f64 {
    p.k * (t - p.t_anchor) + seasonal_term(t, p) - seasonal_term(p.t_anchor, p)
}

/// Length at time `t` (decimal years) of the cohort anchored at `p.t_anchor`.
#[inline]
pub fn length_at(t: f64, p: &GrowthParams) -> f64 {
    p.linf * (1.0 - (-exponent(t, p)).exp())
}

/// Length at a given age (years since the anchor).
#[inline]
pub fn length_at_age(age: f64, p: &GrowthParams) -> f64 {
    length_at(p.t_anchor + age, p)
}

/// Time at which the cohort anchored at `p.t_anchor` reaches `length`.
///
/// Returns `None` for lengths outside `[0, Linf)`.
pub fn age_at_length(length: f64, p: &GrowthParams) -> Option<f64> {
    if !(0.0..p.linf).contains(&length) {
        return None;
    }
    let target = -(1.0 - length / p.linf).ln();

    if p.c == 0.0 {
        return Some(p.t_anchor + target / p.k);
    }

    // |S(t) - S(t_anchor)| <= C K / pi brackets the root.
    let swing = p.c * p.k / PI;
    let mut lo = p.t_anchor + ((target - swing) / p.k).max(0.0);
    let mut hi = p.t_anchor + (target + swing) / p.k;
    for _ in 0..BISECTION_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if exponent(mid, p) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some(0.5 * (lo + hi))
}

/// Age (years since the anchor) at which a cohort reaches 0.95 Linf.
pub fn max_age(p: &GrowthParams) -> f64 {
    age_at_length(MAX_AGE_LENGTH_FRACTION * p.linf, p)
        .map(|t| t - p.t_anchor)
        .unwrap_or(0.0)
}

/// Lengths at time `t` of every cohort with age in `[min_age, max_age]`.
///
/// Cohorts are anchored at `t_anchor + n` for integer `n` and are yielded
/// youngest first, as `(n, length)`.
pub fn cohort_lengths_at(
    t: f64,
    p: &GrowthParams,
    (min_age, max_age): (f64, f64),
) -> impl Iterator<Item = (i64, f64)> + '_ {
    let newest = (t - p.t_anchor - min_age).floor() as i64;
    let oldest = (t - p.t_anchor - max_age).ceil() as i64;
    (oldest..=newest)
        .rev()
        .map(move |n| (n, length_at(t - n as f64, p)))
}

/// Sampled growth trajectory of one cohort.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortCurve {
    /// Time at which the cohort has length zero.
    pub birth: f64,
    /// (time, length) samples.
    pub points: Vec<(f64, f64)>,
}

/// Trajectories of all cohorts alive between `t_start` and `t_end`.
///
/// Each curve is sampled every `step` years from `max(birth, t_start)` until
/// the cohort exceeds `max_age` or the window ends.
pub fn cohort_curves(
    p: &GrowthParams,
    t_start: f64,
    t_end: f64,
    step: f64,
    max_age: f64,
) -> Vec<CohortCurve> {
    if !(step > 0.0) || t_end < t_start {
        return Vec::new();
    }
    let first = (t_start - p.t_anchor - max_age).ceil() as i64;
    let last = (t_end - p.t_anchor).floor() as i64;

    (first..=last)
        .map(|n| {
            let birth = p.t_anchor + n as f64;
            let from = birth.max(t_start);
            let to = (birth + max_age).min(t_end);
            let samples = ((to - from) / step).floor() as usize;
            let points = (0..=samples)
                .map(|i| {
                    let t = from + i as f64 * step;
                    (t, length_at(t - n as f64, p))
                })
                .collect();
            CohortCurve { birth, points }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_zero_at_anchor() {
        let p = GrowthParams::new(80.0, 0.5, 0.3);
        assert!(length_at(0.3, &p).abs() < 1e-12);

        let p = GrowthParams::seasonal(80.0, 0.5, 0.3, 0.7, 0.6);
        assert!(length_at(0.3, &p).abs() < 1e-12);
    }

    #[test]
    fn test_non_seasonal_formula() {
        let p = GrowthParams::new(100.0, 0.4, 0.25);
        let expected = 100.0 * (1.0 - (-0.4f64 * 2.0).exp());
        assert!((length_at_age(2.0, &p) - expected).abs() < 1e-10);
        assert!((length_at(60.0, &p) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_amplitude_matches_standard() {
        let standard = GrowthParams::new(60.0, 0.8, 0.1);
        let seasonal = GrowthParams::seasonal(60.0, 0.8, 0.1, 0.0, 0.45);
        for i in 0..20 {
            let t = 0.1 + i as f64 * 0.37;
            assert_eq!(length_at(t, &standard), length_at(t, &seasonal));
        }
    }

    #[test]
    fn test_seasonal_monotone() {
        let p = GrowthParams::seasonal(60.0, 1.2, 0.2, 1.0, 0.5);
        let mut prev = length_at(0.2, &p);
        for i in 1..400 {
            let t = 0.2 + i as f64 * 0.01;
            let l = length_at(t, &p);
            assert!(l >= prev - 1e-12, "decrease at t = {t}");
            prev = l;
        }
    }

    #[test]
    fn test_age_at_length_inverts() {
        for p in [
            GrowthParams::new(75.0, 0.35, 0.6),
            GrowthParams::seasonal(75.0, 0.35, 0.6, 0.8, 0.2),
        ] {
            for length in [1.0, 20.0, 50.0, 70.0] {
                let t = age_at_length(length, &p).unwrap();
                assert!(t >= p.t_anchor);
                assert!((length_at(t, &p) - length).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn test_age_at_length_out_of_range() {
        let p = GrowthParams::new(50.0, 0.5, 0.0);
        assert_eq!(age_at_length(50.0, &p), None);
        assert_eq!(age_at_length(-1.0, &p), None);
    }

    #[test]
    fn test_max_age() {
        let p = GrowthParams::new(50.0, 0.5, 0.4);
        assert!((max_age(&p) - 20.0f64.ln() / 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_cohort_lengths_at() {
        let p = GrowthParams::new(100.0, 0.5, 0.25);
        let cohorts: Vec<_> = cohort_lengths_at(2020.5, &p, (0.0, 3.0)).collect();
        // Ages 0.25, 1.25, 2.25.
        assert_eq!(cohorts.len(), 3);
        assert_eq!(cohorts[0].0, 2020);
        assert!((cohorts[0].1 - length_at_age(0.25, &p)).abs() < 1e-9);
        assert!(cohorts.windows(2).all(|w| w[0].1 < w[1].1));

        // Ages 1.25 and 2.25 only.
        let older: Vec<_> = cohort_lengths_at(2020.5, &p, (1.0, 3.0)).collect();
        assert_eq!(older.iter().map(|c| c.0).collect::<Vec<_>>(), vec![2019, 2018]);
    }

    #[test]
    fn test_cohort_curves() {
        let p = GrowthParams::new(100.0, 0.5, 0.25);
        let curves = cohort_curves(&p, 2020.0, 2021.0, 0.1, 2.0);
        // Births at 2018.25, 2019.25 and 2020.25.
        assert_eq!(curves.len(), 3);
        assert!((curves[2].birth - 2020.25).abs() < 1e-9);
        assert!(curves[2].points[0].1.abs() < 1e-9);
        assert!(
            curves
                .iter()
                .all(|c| c.points.iter().all(|(t, _)| *t >= 2020.0 && *t <= 2021.0 + 1e-9))
        );
    }
}
