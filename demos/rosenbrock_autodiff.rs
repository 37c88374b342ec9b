//! Samples the Rosenbrock density with gradients from burn's autodiff and
//! writes the draws to `rosenbrock_draws.csv` when the `csv` feature is on.

use adaptive_hmc::autodiff::{AutodiffDensity, GradientTarget};
use adaptive_hmc::config::{MetricKind, SamplerConfig};
use adaptive_hmc::core::sample;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use std::error::Error;

#[cfg(not(feature = "wgpu"))]
type BackendType = burn::backend::Autodiff<burn::backend::NdArray<f64>>;
#[cfg(feature = "wgpu")]
type BackendType = burn::backend::Autodiff<burn::backend::Wgpu>;

/// log p(x, y) = -[(a - x)^2 + b (y - x^2)^2]
#[derive(Clone, Copy)]
struct Rosenbrock {
    a: f64,
    b: f64,
}

impl<B: AutodiffBackend> GradientTarget<B> for Rosenbrock {
    fn unnorm_logp(&self, position: Tensor<B, 1>) -> Tensor<B, 1> {
        let x = position.clone().slice([0..1]);
        let y = position.slice([1..2]);
        let term_1 = x.clone().neg().add_scalar(self.a).powi_scalar(2);
        let term_2 = (y - x.powi_scalar(2)).powi_scalar(2).mul_scalar(self.b);
        -(term_1 + term_2).sum()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let density = AutodiffDensity::<BackendType, _>::new(Rosenbrock { a: 1.0, b: 20.0 }, 2)
        .with_param_names(vec!["x".into(), "y".into()])?;

    let config = SamplerConfig {
        metric: MetricKind::Diag,
        integration_time: 3.0,
        step_size_jitter: 0.2,
        n_chains: 4,
        n_warmup: 500,
        n_samples: 2_000,
        seed: Some(42),
        progress: true,
        ..SamplerConfig::default()
    };

    let output = sample(density, &[0.0, 0.0], &config)?;
    for chain in output.successful() {
        println!(
            "Chain {}: step size {:.4}, mean p(accept) {:.3}",
            chain.chain_id,
            chain.step_size,
            chain.mean_accept_stat()
        );
    }
    if let Some(summary) = output.summary() {
        println!("{summary}");
    }

    #[cfg(feature = "csv")]
    adaptive_hmc::io::csv::save_csv(&output, "rosenbrock_draws.csv")?;

    Ok(())
}
