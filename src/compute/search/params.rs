//! Parameter space and random operators shared by the stochastic searches.
//!
//! Provides random generation, perturbation, crossover, and mutation of
//! growth parameter vectors within box constraints.

use rand::prelude::*;

use crate::schema::{GrowthParams, Param, SearchConfig};

/// Box-constrained growth parameter space.
///
/// Only the active parameters are searched; the remaining ones keep the
/// values of `fixed`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpace {
    dims: Vec<(Param, (f64, f64))>,
    fixed: GrowthParams,
}

impl ParamSpace {
    /// Build the search space of a configuration.
    ///
    /// `max_length` is the largest length class, used when Linf bounds are
    /// not given explicitly.
    pub fn from_config(config: &SearchConfig, max_length: f64) -> Self {
        let dims = config
            .active_params()
            .iter()
            .map(|&p| (p, config.bounds.range(p, max_length)))
            .collect();
        Self::new(dims)
    }

    /// Space over explicit dimensions. Parameters without a dimension stay
    /// fixed, which for C and ts means 0.
    pub fn new(dims: Vec<(Param, (f64, f64))>) -> Self {
        let mut fixed = GrowthParams::new(1.0, 1.0, 0.0);
        for &(param, (lo, hi)) in &dims {
            fixed.set(param, 0.5 * (lo + hi));
        }
        Self { dims, fixed }
    }

    /// Active dimensions and their bounds.
    pub fn dims(&self) -> &[(Param, (f64, f64))] {
        &self.dims
    }

    /// Bounds of a parameter if it is searched.
    pub fn bounds(&self, param: Param) -> Option<(f64, f64)> {
        self.dims.iter().find(|(p, _)| *p == param).map(|(_, b)| *b)
    }

    /// Centre of the box.
    pub fn center(&self) -> GrowthParams {
        self.fixed
    }

    /// Whether all active parameters lie within bounds.
    pub fn contains(&self, params: &GrowthParams) -> bool {
        self.dims.iter().all(|&(p, (lo, hi))| {
            let v = params.get(p);
            v >= lo && v <= hi
        })
    }

    /// Clamp active parameters into bounds and reset inactive ones.
    pub fn clamp(&self, params: &GrowthParams) -> GrowthParams {
        let mut out = self.fixed;
        for &(p, (lo, hi)) in &self.dims {
            out.set(p, params.get(p).clamp(lo, hi));
        }
        out
    }

    /// Reflect active parameters back into bounds and reset inactive ones.
    pub fn reflect(&self, params: &GrowthParams) -> GrowthParams {
        let mut out = self.fixed;
        for &(p, bounds) in &self.dims {
            out.set(p, reflect(params.get(p), bounds));
        }
        out
    }

    /// Mean absolute difference of active parameters, relative to bound width.
    pub fn distance(&self, a: &GrowthParams, b: &GrowthParams) -> f64 {
        if self.dims.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .dims
            .iter()
            .map(|&(p, (lo, hi))| {
                let width = hi - lo;
                if width > 0.0 {
                    (a.get(p) - b.get(p)).abs() / width
                } else {
                    0.0
                }
            })
            .sum();
        total / self.dims.len() as f64
    }
}

/// Fold a value back into `[lo, hi]` by mirroring at the bounds.
pub fn reflect(value: f64, (lo, hi): (f64, f64)) -> f64 {
    let width = hi - lo;
    if !value.is_finite() || width <= 0.0 {
        return lo;
    }
    if (lo..=hi).contains(&value) {
        return value;
    }
    let folded = (value - lo).rem_euclid(2.0 * width);
    if folded > width {
        hi - (folded - width)
    } else {
        lo + folded
    }
}

/// Random number generator wrapper for parameter operations.
pub struct ParamRng {
    rng: StdRng,
}

impl ParamRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform draw from the parameter space.
    pub fn random_params(&mut self, space: &ParamSpace) -> GrowthParams {
        let mut params = space.center();
        for &(p, bounds) in space.dims() {
            params.set(p, self.uniform(bounds));
        }
        params
    }

    /// Gaussian step of every active parameter, reflected into bounds.
    ///
    /// `scale` is the step standard deviation relative to each bound width.
    pub fn perturb(&mut self, params: &GrowthParams, space: &ParamSpace, scale: f64) -> GrowthParams {
        let mut out = *params;
        for &(p, (lo, hi)) in space.dims() {
            let noise: f64 = self.rng.sample(rand_distr::StandardNormal);
            out.set(p, params.get(p) + noise * scale * (hi - lo));
        }
        space.reflect(&out)
    }

    /// Gaussian mutation: add noise to a value.
    pub fn gaussian_mutate(&mut self, value: f64, strength: f64, bounds: (f64, f64)) -> f64 {
        let noise: f64 = self.rng.sample(rand_distr::StandardNormal);
        let mutated = value + noise * strength * (bounds.1 - bounds.0);
        mutated.clamp(bounds.0, bounds.1)
    }

    /// Blend crossover of two parents.
    pub fn crossover(
        &mut self,
        parent1: &GrowthParams,
        parent2: &GrowthParams,
        space: &ParamSpace,
    ) -> GrowthParams {
        let mut child = *parent1;
        for &(p, _) in space.dims() {
            let t = self.rng.r#gen::<f64>();
            child.set(p, blend(parent1.get(p), parent2.get(p), t));
        }
        child
    }

    /// Mutate each active parameter with probability `rate`.
    pub fn mutate(&mut self, params: &mut GrowthParams, rate: f64, strength: f64, space: &ParamSpace) {
        for &(p, bounds) in space.dims() {
            if self.rng.r#gen::<f64>() < rate {
                let value = self.gaussian_mutate(params.get(p), strength, bounds);
                params.set(p, value);
            }
        }
    }

    /// Uniform draw from `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.rng.r#gen()
    }

    /// Uniform index below `n`.
    pub fn index(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// Uniform random in bounds.
    fn uniform(&mut self, bounds: (f64, f64)) -> f64 {
        if bounds.1 > bounds.0 {
            self.rng.gen_range(bounds.0..=bounds.1)
        } else {
            bounds.0
        }
    }
}

/// Linear blend between two values.
fn blend(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParameterBounds;

    fn space(seasonal: bool) -> ParamSpace {
        let config = SearchConfig {
            bounds: ParameterBounds {
                linf: Some((40.0, 80.0)),
                k: (0.1, 1.0),
                ..Default::default()
            },
            seasonal,
            ..Default::default()
        };
        ParamSpace::from_config(&config, 60.0)
    }

    #[test]
    fn test_non_seasonal_space_fixes_c_and_ts() {
        let space = space(false);
        assert_eq!(space.dims().len(), 3);
        let mut rng = ParamRng::new(42);
        for _ in 0..50 {
            let p = rng.random_params(&space);
            assert_eq!(p.c, 0.0);
            assert_eq!(p.ts, 0.0);
            assert!(space.contains(&p));
        }
    }

    #[test]
    fn test_seasonal_space() {
        let space = space(true);
        assert_eq!(space.dims().len(), 5);
        assert_eq!(space.bounds(Param::C), Some((0.0, 1.0)));
        assert_eq!(space.center().linf, 60.0);
    }

    #[test]
    fn test_reflect() {
        assert_eq!(reflect(0.5, (0.0, 1.0)), 0.5);
        assert!((reflect(1.2, (0.0, 1.0)) - 0.8).abs() < 1e-12);
        assert!((reflect(-0.3, (0.0, 1.0)) - 0.3).abs() < 1e-12);
        assert!((reflect(2.5, (0.0, 1.0)) - 0.5).abs() < 1e-12);
        assert_eq!(reflect(f64::NAN, (2.0, 3.0)), 2.0);
        assert_eq!(reflect(7.0, (2.0, 2.0)), 2.0);
    }

    #[test]
    fn test_perturb_stays_in_bounds() {
        let space = space(true);
        let mut rng = ParamRng::new(7);
        let mut p = space.center();
        for _ in 0..200 {
            p = rng.perturb(&p, &space, 0.8);
            assert!(space.contains(&p), "{p:?}");
        }
    }

    #[test]
    fn test_crossover_between_parents() {
        let space = space(false);
        let mut rng = ParamRng::new(1);
        let a = rng.random_params(&space);
        let b = rng.random_params(&space);
        let child = rng.crossover(&a, &b, &space);
        for &(p, _) in space.dims() {
            let (lo, hi) = (a.get(p).min(b.get(p)), a.get(p).max(b.get(p)));
            assert!(child.get(p) >= lo - 1e-12 && child.get(p) <= hi + 1e-12);
        }
    }

    #[test]
    fn test_mutation_respects_bounds() {
        let space = space(false);
        let mut rng = ParamRng::new(3);
        let mut p = rng.random_params(&space);
        rng.mutate(&mut p, 1.0, 5.0, &space);
        assert!(space.contains(&p));
    }

    #[test]
    fn test_distance() {
        let space = space(false);
        let a = GrowthParams::new(40.0, 0.1, 0.0);
        let b = GrowthParams::new(80.0, 1.0, 1.0);
        assert!(space.distance(&a, &a).abs() < 1e-12);
        assert!((space.distance(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_seeded_rng_repeatable() {
        let space = space(true);
        let mut r1 = ParamRng::new(99);
        let mut r2 = ParamRng::new(99);
        assert_eq!(r1.random_params(&space), r2.random_params(&space));
    }
}
