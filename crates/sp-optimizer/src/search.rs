//! Search space and proposal strategies over mixing-weight vectors.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::gp::{expected_improvement, GaussianProcess};

/// Independent per-coordinate bounds.  Mixing weights use the unit box; the
/// derived base coefficient is deliberately not constrained here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub low: Vec<f64>,
    pub high: Vec<f64>,
}

impl Bounds {
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> Self {
        debug_assert_eq!(low.len(), high.len());
        Self { low, high }
    }

    /// `[0, 1]` on every coordinate.
    pub fn unit(dims: usize) -> Self {
        Self {
            low: vec![0.0; dims],
            high: vec![1.0; dims],
        }
    }

    pub fn dims(&self) -> usize {
        self.low.len()
    }

    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.dims()
            && point
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (lo, hi))| v >= lo && v <= hi)
    }

    fn sample(&self, rng: &mut StdRng) -> Vec<f64> {
        self.low
            .iter()
            .zip(&self.high)
            .map(|(lo, hi)| rng.random_range(*lo..=*hi))
            .collect()
    }
}

/// Common trait for proposal strategies.
pub trait SearchStrategy: Send + Sync {
    /// Propose the next point to evaluate.
    fn suggest(&mut self) -> Vec<f64>;

    /// Report a completed trial so adaptive strategies can learn.
    fn report(&mut self, _point: &[f64], _objective: f64) {}

    /// Human-readable strategy name.
    fn name(&self) -> &str;
}

// ---- Random search ----

/// Independent uniform sampling, seeded for reproducible proposals.
#[derive(Debug)]
pub struct RandomSearch {
    bounds: Bounds,
    rng: StdRng,
}

impl RandomSearch {
    pub fn new(bounds: Bounds, seed: u64) -> Self {
        Self {
            bounds,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl SearchStrategy for RandomSearch {
    fn suggest(&mut self) -> Vec<f64> {
        self.bounds.sample(&mut self.rng)
    }

    fn name(&self) -> &str {
        "random"
    }
}

// ---- Gaussian-process search ----

/// Sequential model-based search: an RBF-kernel GP surrogate fit over all
/// reported trials, with the next point chosen by maximizing expected
/// improvement over a batch of uniform candidates.
///
/// Proposals are seeded and reproducible; the objective being optimized is
/// not, so identical seeds do not guarantee identical scores.
#[derive(Debug)]
pub struct GpSearch {
    bounds: Bounds,
    rng: StdRng,
    observations: Vec<(Vec<f64>, f64)>,
    n_startup: usize,
    n_candidates: usize,
    length_scale: f64,
    noise: f64,
    xi: f64,
}

impl GpSearch {
    pub fn new(bounds: Bounds, seed: u64) -> Self {
        Self {
            bounds,
            rng: StdRng::seed_from_u64(seed),
            observations: Vec::new(),
            n_startup: 2,
            n_candidates: 256,
            length_scale: 0.3,
            noise: 1e-4,
            xi: 0.01,
        }
    }

    /// Number of observations required before the surrogate takes over from
    /// uniform sampling.
    pub fn with_startup_trials(mut self, n: usize) -> Self {
        self.n_startup = n;
        self
    }

    pub fn with_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n.max(1);
        self
    }

    pub fn with_length_scale(mut self, length_scale: f64) -> Self {
        self.length_scale = length_scale;
        self
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    fn suggest_by_surrogate(&mut self) -> Option<Vec<f64>> {
        let x: Vec<Vec<f64>> = self.observations.iter().map(|(p, _)| p.clone()).collect();
        let y: Vec<f64> = self.observations.iter().map(|(_, v)| *v).collect();
        let best = y.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let gp = match GaussianProcess::fit(&x, &y, self.length_scale, self.noise) {
            Ok(gp) => gp,
            Err(e) => {
                tracing::warn!("Surrogate fit failed ({e}), falling back to random proposal");
                return None;
            }
        };

        let mut best_candidate = None;
        let mut best_ei = f64::NEG_INFINITY;
        for _ in 0..self.n_candidates {
            let candidate = self.bounds.sample(&mut self.rng);
            let (mean, variance) = gp.predict(&candidate);
            let ei = expected_improvement(mean, variance, best, self.xi);
            if ei > best_ei {
                best_ei = ei;
                best_candidate = Some(candidate);
            }
        }

        tracing::debug!(best_ei, "Surrogate proposal selected");
        best_candidate
    }
}

impl SearchStrategy for GpSearch {
    fn suggest(&mut self) -> Vec<f64> {
        if self.observations.len() < self.n_startup {
            return self.bounds.sample(&mut self.rng);
        }
        match self.suggest_by_surrogate() {
            Some(point) => point,
            None => self.bounds.sample(&mut self.rng),
        }
    }

    fn report(&mut self, point: &[f64], objective: f64) {
        self.observations.push((point.to_vec(), objective));
    }

    fn name(&self) -> &str {
        "gp"
    }
}
