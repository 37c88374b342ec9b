/*!
Target densities over an unconstrained real parameter vector.

The sampler only needs three things from a model: its dimensionality, the log
density (up to an additive constant) and the gradient of the log density. The
[`LogDensity`] trait captures exactly that. Constrained parameters must be mapped
to the real line by the model before they reach the sampler.

# Examples

```rust
use adaptive_hmc::distributions::{IsotropicGaussian, LogDensity};

let target = IsotropicGaussian::new(2, 1.0);
let mut grad = vec![0.0; 2];
let logp = target.log_density_and_gradient(&[1.0, -1.0], &mut grad).unwrap();
assert_eq!(logp, -1.0);
assert_eq!(grad, vec![-1.0, 1.0]);
```
*/

use crate::error::DensityError;

/// A differentiable log density over `R^D`.
pub trait LogDensity {
    /// Number of unconstrained parameters.
    fn dim(&self) -> usize;

    /// Returns the log density at `q` and writes its gradient into `grad`.
    ///
    /// Return `Err` when the density is undefined at `q`. The sampler treats
    /// such a point as having zero density and rejects it.
    fn log_density_and_gradient(&self, q: &[f64], grad: &mut [f64]) -> Result<f64, DensityError>;

    /// Parameter names used for diagnostics and output headers.
    fn param_names(&self) -> Vec<String> {
        (0..self.dim()).map(|i| format!("theta_{i}")).collect()
    }
}

/**
A zero-mean Gaussian with covariance `std^2 * I` in `dim` dimensions.

The log density is unnormalized: `-0.5 * |q|^2 / std^2`.
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsotropicGaussian {
    pub dim: usize,
    pub std: f64,
}

impl IsotropicGaussian {
    pub fn new(dim: usize, std: f64) -> Self {
        Self { dim, std }
    }

    /// Standard normal in `dim` dimensions.
    pub fn standard(dim: usize) -> Self {
        Self::new(dim, 1.0)
    }
}

impl LogDensity for IsotropicGaussian {
    fn dim(&self) -> usize {
        self.dim
    }

    fn log_density_and_gradient(&self, q: &[f64], grad: &mut [f64]) -> Result<f64, DensityError> {
        let var = self.std * self.std;
        let mut sq = 0.0;
        for (g, &x) in grad.iter_mut().zip(q) {
            sq += x * x;
            *g = -x / var;
        }
        Ok(-0.5 * sq / var)
    }
}

/**
The 2D Rosenbrock "banana" density, `log p(x, y) = -((a - x)^2 + b (y - x^2)^2)`.

A standard stress test for gradient-based samplers: the density concentrates on
a thin curved ridge, so a step size that works in the tails is far too large
near the mode.
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rosenbrock2D {
    pub a: f64,
    pub b: f64,
}

impl LogDensity for Rosenbrock2D {
    fn dim(&self) -> usize {
        2
    }

    fn log_density_and_gradient(&self, q: &[f64], grad: &mut [f64]) -> Result<f64, DensityError> {
        let (x, y) = (q[0], q[1]);
        let r = y - x * x;
        grad[0] = 2.0 * (self.a - x) + 4.0 * self.b * x * r;
        grad[1] = -2.0 * self.b * r;
        Ok(-((self.a - x).powi(2) + self.b * r * r))
    }

    fn param_names(&self) -> Vec<String> {
        vec!["x".to_string(), "y".to_string()]
    }
}

#[cfg(test)]
mod distributions_tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn finite_difference<M: LogDensity>(model: &M, q: &[f64]) -> Vec<f64> {
        let h = 1e-6;
        let mut scratch = vec![0.0; q.len()];
        (0..q.len())
            .map(|i| {
                let mut plus = q.to_vec();
                let mut minus = q.to_vec();
                plus[i] += h;
                minus[i] -= h;
                let fp = model.log_density_and_gradient(&plus, &mut scratch).unwrap();
                let fm = model.log_density_and_gradient(&minus, &mut scratch).unwrap();
                (fp - fm) / (2.0 * h)
            })
            .collect()
    }

    #[test]
    fn test_iso_gauss_log_density() {
        let target = IsotropicGaussian::new(3, 2.0);
        let mut grad = vec![0.0; 3];
        let lp = target
            .log_density_and_gradient(&[1.0, 2.0, 3.0], &mut grad)
            .unwrap();
        assert_abs_diff_eq!(lp, -14.0 / 8.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[2], -0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_rosenbrock_gradient_matches_finite_difference() {
        let target = Rosenbrock2D { a: 1.0, b: 100.0 };
        let q = [0.3, -0.7];
        let mut grad = vec![0.0; 2];
        target.log_density_and_gradient(&q, &mut grad).unwrap();
        let fd = finite_difference(&target, &q);
        for (g, f) in grad.iter().zip(fd.iter()) {
            assert_abs_diff_eq!(g, f, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_default_param_names_are_indexed() {
        let target = IsotropicGaussian::standard(2);
        assert_eq!(target.param_names(), vec!["theta_0", "theta_1"]);
    }
}
