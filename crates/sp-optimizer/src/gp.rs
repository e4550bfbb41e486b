//! Gaussian-process surrogate over observed trials.
//!
//! An RBF-kernel GP fit with a jittered Cholesky factorization.  Trial counts
//! here are tens, not thousands, so the dense solves are hand-rolled rather
//! than pulling in a linear-algebra stack.

use sp_types::{internal_error, SpResult};

/// RBF-kernel Gaussian process posterior over observed (point, objective)
/// pairs.
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    length_scale: f64,
    signal_variance: f64,
    noise: f64,
    x: Vec<Vec<f64>>,
    chol: Vec<Vec<f64>>,
    alpha: Vec<f64>,
    y_mean: f64,
}

impl GaussianProcess {
    /// Fit the posterior.  The objective values are centered before fitting;
    /// predictions add the mean back.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        length_scale: f64,
        noise: f64,
    ) -> SpResult<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(internal_error!(
                "GP fit needs matching non-empty inputs ({} points, {} targets)",
                x.len(),
                y.len()
            ));
        }

        let n = x.len();
        let y_mean = y.iter().sum::<f64>() / n as f64;
        let centered: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

        let signal_variance = 1.0;
        let mut k = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..=i {
                let v = rbf(&x[i], &x[j], length_scale, signal_variance);
                k[i][j] = v;
                k[j][i] = v;
            }
            k[i][i] += noise;
        }

        let chol = cholesky_with_jitter(k)?;
        let z = forward_solve(&chol, &centered);
        let alpha = backward_solve(&chol, &z);

        Ok(Self {
            length_scale,
            signal_variance,
            noise,
            x: x.to_vec(),
            chol,
            alpha,
            y_mean,
        })
    }

    /// Posterior mean and variance at a query point.
    pub fn predict(&self, point: &[f64]) -> (f64, f64) {
        let k_star: Vec<f64> = self
            .x
            .iter()
            .map(|xi| rbf(xi, point, self.length_scale, self.signal_variance))
            .collect();

        let mean = self.y_mean
            + k_star
                .iter()
                .zip(&self.alpha)
                .map(|(k, a)| k * a)
                .sum::<f64>();

        let v = forward_solve(&self.chol, &k_star);
        let prior = rbf(point, point, self.length_scale, self.signal_variance) + self.noise;
        let variance = (prior - v.iter().map(|x| x * x).sum::<f64>()).max(1e-12);

        (mean, variance)
    }
}

fn rbf(a: &[f64], b: &[f64], length_scale: f64, signal_variance: f64) -> f64 {
    let sq_dist: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    signal_variance * (-sq_dist / (2.0 * length_scale * length_scale)).exp()
}

/// Lower-triangular Cholesky factor, retrying with growing diagonal jitter
/// when the kernel matrix is numerically non-positive-definite (duplicated
/// observation points make this common).
fn cholesky_with_jitter(mut k: Vec<Vec<f64>>) -> SpResult<Vec<Vec<f64>>> {
    let n = k.len();
    let mut jitter = 0.0;
    for attempt in 0..6 {
        match cholesky(&k) {
            Some(l) => return Ok(l),
            None => {
                let bump = 1e-10 * 10f64.powi(attempt) - jitter;
                jitter += bump;
                for (i, row) in k.iter_mut().enumerate().take(n) {
                    row[i] += bump;
                }
            }
        }
    }
    Err(internal_error!(
        "Kernel matrix not positive definite after jittering"
    ))
}

fn cholesky(k: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = k.len();
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = k[i][j];
            for m in 0..j {
                sum -= l[i][m] * l[j][m];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Some(l)
}

/// Solve `L z = b` for lower-triangular L.
fn forward_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * z[j];
        }
        z[i] = sum / l[i][i];
    }
    z
}

/// Solve `L^T a = z` for lower-triangular L.
fn backward_solve(l: &[Vec<f64>], z: &[f64]) -> Vec<f64> {
    let n = z.len();
    let mut a = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = z[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * a[j];
        }
        a[i] = sum / l[i][i];
    }
    a
}

/// Expected improvement of a candidate over the best observed objective,
/// for maximization.
pub fn expected_improvement(mean: f64, variance: f64, best: f64, xi: f64) -> f64 {
    let std = variance.sqrt();
    if std < 1e-12 {
        return 0.0;
    }
    let improvement = mean - best - xi;
    let z = improvement / std;
    let ei = improvement * normal_cdf(z) + std * normal_pdf(z);
    ei.max(0.0)
}

fn normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

// Abramowitz & Stegun 7.1.26, max absolute error 1.5e-7.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    sign * (1.0 - poly * (-x * x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_gp() -> GaussianProcess {
        let x = vec![
            vec![0.0, 0.0],
            vec![0.5, 0.5],
            vec![1.0, 1.0],
            vec![0.25, 0.75],
        ];
        let y = vec![0.1, 0.6, 0.9, 0.4];
        GaussianProcess::fit(&x, &y, 0.5, 1e-6).unwrap()
    }

    #[test]
    fn posterior_mean_interpolates_observations() {
        let gp = sample_gp();
        let (mean, variance) = gp.predict(&[1.0, 1.0]);
        assert!((mean - 0.9).abs() < 0.05, "mean {mean}");
        assert!(variance < 0.01, "variance {variance}");
    }

    #[test]
    fn variance_grows_away_from_data() {
        let gp = sample_gp();
        let (_, var_near) = gp.predict(&[0.5, 0.5]);
        let (_, var_far) = gp.predict(&[4.0, 4.0]);
        assert!(var_far > var_near * 10.0);
    }

    #[test]
    fn fit_survives_duplicate_points() {
        let x = vec![vec![0.5], vec![0.5], vec![0.5]];
        let y = vec![0.2, 0.2, 0.2];
        let gp = GaussianProcess::fit(&x, &y, 1.0, 1e-6).unwrap();
        let (mean, _) = gp.predict(&[0.5]);
        assert!((mean - 0.2).abs() < 0.05);
    }

    #[test]
    fn fit_rejects_mismatched_inputs() {
        assert!(GaussianProcess::fit(&[vec![0.0]], &[0.1, 0.2], 1.0, 1e-6).is_err());
        assert!(GaussianProcess::fit(&[], &[], 1.0, 1e-6).is_err());
    }

    #[test]
    fn ei_is_nonnegative_and_rewards_upside() {
        assert!(expected_improvement(0.5, 0.01, 0.9, 0.01) >= 0.0);

        let promising = expected_improvement(0.95, 0.01, 0.9, 0.0);
        let hopeless = expected_improvement(0.1, 0.01, 0.9, 0.0);
        assert!(promising > hopeless);
    }

    #[test]
    fn ei_zero_at_degenerate_variance() {
        assert_eq!(expected_improvement(1.0, 0.0, 0.5, 0.0), 0.0);
    }

    #[test]
    fn erf_matches_known_values() {
        assert!((erf(0.0)).abs() < 1e-7);
        assert!((erf(1.0) - 0.8427007).abs() < 1e-5);
        assert!((erf(-1.0) + 0.8427007).abs() < 1e-5);
    }
}
