/*!
Log densities written with `burn` tensors.

Implement [`GradientTarget`] with ordinary tensor operations and wrap it in
[`AutodiffDensity`]; the gradient is then obtained by back-propagation instead
of by hand.

# Examples

```rust
use adaptive_hmc::autodiff::{AutodiffDensity, GradientTarget};
use adaptive_hmc::distributions::LogDensity;
use burn::backend::{Autodiff, NdArray};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

#[derive(Clone)]
struct StdNormal;

impl<B: AutodiffBackend> GradientTarget<B> for StdNormal {
    fn unnorm_logp(&self, position: Tensor<B, 1>) -> Tensor<B, 1> {
        -(position.powi_scalar(2).mul_scalar(0.5)).sum()
    }
}

let density = AutodiffDensity::<Autodiff<NdArray<f64>>, _>::new(StdNormal, 2);
let mut grad = vec![0.0; 2];
let logp = density.log_density_and_gradient(&[1.0, 2.0], &mut grad).unwrap();
assert!((logp + 2.5).abs() < 1e-12);
assert!((grad[1] + 2.0).abs() < 1e-12);
```
*/

use std::marker::PhantomData;

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::cast::ToElement;

use crate::distributions::LogDensity;
use crate::error::{DensityError, HmcError};

/// An unnormalized log density over a 1D position tensor.
pub trait GradientTarget<B: AutodiffBackend> {
    /// Returns a one-element tensor holding `log p(position)` up to a constant.
    fn unnorm_logp(&self, position: Tensor<B, 1>) -> Tensor<B, 1>;
}

/// Adapts a [`GradientTarget`] to [`LogDensity`].
#[derive(Debug, Clone)]
pub struct AutodiffDensity<B: AutodiffBackend, T> {
    target: T,
    dim: usize,
    device: B::Device,
    names: Option<Vec<String>>,
    _backend: PhantomData<fn() -> B>,
}

impl<B: AutodiffBackend, T: GradientTarget<B>> AutodiffDensity<B, T> {
    /// Wraps `target` over `dim` parameters on the backend's default device.
    pub fn new(target: T, dim: usize) -> Self {
        Self::with_device(target, dim, B::Device::default())
    }

    pub fn with_device(target: T, dim: usize, device: B::Device) -> Self {
        Self {
            target,
            dim,
            device,
            names: None,
            _backend: PhantomData,
        }
    }

    /// Replaces the default `theta_<i>` names.
    ///
    /// # Returns
    /// `HmcError::DimensionMismatch` unless there is exactly one name per parameter.
    pub fn with_param_names(mut self, names: Vec<String>) -> Result<Self, HmcError> {
        if names.len() != self.dim {
            return Err(HmcError::DimensionMismatch {
                expected: self.dim,
                found: names.len(),
            });
        }
        self.names = Some(names);
        Ok(self)
    }

    pub fn target(&self) -> &T {
        &self.target
    }
}

impl<B: AutodiffBackend, T: GradientTarget<B>> LogDensity for AutodiffDensity<B, T> {
    fn dim(&self) -> usize {
        self.dim
    }

    fn log_density_and_gradient(&self, q: &[f64], grad: &mut [f64]) -> Result<f64, DensityError> {
        let data = TensorData::new(q.to_vec(), [q.len()]).convert::<B::FloatElem>();
        let position = Tensor::<B, 1>::from_data(data, &self.device).require_grad();

        let logp = self.target.unnorm_logp(position.clone());
        let value = logp.clone().into_scalar().to_f64();

        // An untracked output does not depend on the position, and burn panics
        // when asked to back-propagate through it.
        if !logp.is_require_grad() {
            grad.fill(0.0);
            return Ok(value);
        }
        let grads = logp.backward();

        match position.grad(&grads) {
            Some(g) => {
                let g = g
                    .into_data()
                    .convert::<f64>()
                    .to_vec::<f64>()
                    .map_err(|e| DensityError::new(format!("failed to read gradient: {e:?}")))?;
                grad.copy_from_slice(&g);
            }
            None => grad.fill(0.0),
        }
        Ok(value)
    }

    fn param_names(&self) -> Vec<String> {
        match &self.names {
            Some(names) => names.clone(),
            None => (0..self.dim).map(|i| format!("theta_{i}")).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MetricKind, SamplerConfig};
    use crate::core::sample;
    use crate::distributions::Rosenbrock2D;
    use crate::error::StepSizeError;
    use approx::assert_abs_diff_eq;
    use burn::backend::{Autodiff, NdArray};

    type BackendType = Autodiff<NdArray<f64>>;

    #[derive(Clone)]
    struct BurnRosenbrock {
        a: f64,
        b: f64,
    }

    impl<B: AutodiffBackend> GradientTarget<B> for BurnRosenbrock {
        fn unnorm_logp(&self, position: Tensor<B, 1>) -> Tensor<B, 1> {
            let x = position.clone().slice([0..1]);
            let y = position.slice([1..2]);
            let term_1 = x.clone().neg().add_scalar(self.a).powi_scalar(2);
            let term_2 = (y - x.powi_scalar(2)).powi_scalar(2).mul_scalar(self.b);
            -(term_1 + term_2).sum()
        }
    }

    #[derive(Clone, Debug)]
    struct Constant;

    impl<B: AutodiffBackend> GradientTarget<B> for Constant {
        fn unnorm_logp(&self, position: Tensor<B, 1>) -> Tensor<B, 1> {
            Tensor::<B, 1>::from_floats([3.0], &position.device())
        }
    }

    #[test]
    fn test_matches_hand_written_rosenbrock() {
        let auto = AutodiffDensity::<BackendType, _>::new(BurnRosenbrock { a: 1.0, b: 100.0 }, 2);
        let exact = Rosenbrock2D { a: 1.0, b: 100.0 };

        for q in [[0.3, -0.7], [1.0, 1.0], [-1.2, 2.0]] {
            let mut g_auto = vec![0.0; 2];
            let mut g_exact = vec![0.0; 2];
            let lp_auto = auto.log_density_and_gradient(&q, &mut g_auto).unwrap();
            let lp_exact = exact.log_density_and_gradient(&q, &mut g_exact).unwrap();
            assert_abs_diff_eq!(lp_auto, lp_exact, epsilon = 1e-9);
            assert_abs_diff_eq!(g_auto[0], g_exact[0], epsilon = 1e-9);
            assert_abs_diff_eq!(g_auto[1], g_exact[1], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_constant_density_has_zero_gradient() {
        let density = AutodiffDensity::<BackendType, _>::new(Constant, 3);
        let mut grad = vec![1.0; 3];
        let lp = density
            .log_density_and_gradient(&[0.1, 0.2, 0.3], &mut grad)
            .unwrap();
        assert_eq!(lp, 3.0);
        assert_eq!(grad, vec![0.0; 3]);
    }

    #[test]
    fn test_constant_density_fails_each_chain_without_panicking() {
        let config = SamplerConfig {
            metric: MetricKind::Unit,
            n_chains: 2,
            n_warmup: 5,
            n_samples: 5,
            seed: Some(3),
            ..SamplerConfig::default()
        };
        let density = AutodiffDensity::<BackendType, _>::new(Constant, 2);
        let output = sample(density, &[0.0, 0.0], &config).unwrap();
        assert_eq!(output.failures().len(), 2);
        assert!(output.failures().iter().all(|(_, e)| matches!(
            e,
            HmcError::StepSize(StepSizeError::ImproperPosterior { .. })
        )));
    }

    #[test]
    fn test_custom_names_override_defaults() {
        let density = AutodiffDensity::<BackendType, _>::new(Constant, 2)
            .with_param_names(vec!["mu".into(), "sigma".into()])
            .unwrap();
        assert_eq!(density.param_names(), vec!["mu", "sigma"]);
        let plain = AutodiffDensity::<BackendType, _>::new(Constant, 2);
        assert_eq!(plain.param_names(), vec!["theta_0", "theta_1"]);
    }

    #[test]
    fn test_one_name_per_parameter() {
        let err = AutodiffDensity::<BackendType, _>::new(Constant, 2)
            .with_param_names(vec!["a".into(), "b".into(), "c".into()])
            .unwrap_err();
        assert!(matches!(err, HmcError::DimensionMismatch { expected: 2, found: 3 }));
    }
}
