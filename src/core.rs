/*!
Runs independent static HMC chains in parallel.

Each chain owns a clone of the model, its own Hamiltonian, integrator, phase
point and generator (`seed + chain_id`). Chains never communicate, so a chain
whose step-size search fails reports its error in its own slot while the others
keep going.

# Examples

```rust
use adaptive_hmc::config::{MetricKind, SamplerConfig};
use adaptive_hmc::core::sample;
use adaptive_hmc::distributions::IsotropicGaussian;

let config = SamplerConfig {
    metric: MetricKind::Unit,
    n_chains: 2,
    n_warmup: 50,
    n_samples: 100,
    seed: Some(42),
    ..SamplerConfig::default()
};
let output = sample(IsotropicGaussian::standard(2), &[0.0, 0.0], &config).unwrap();
assert!(output.failures().is_empty());
assert_eq!(output.draws().shape(), &[2, 100, 2]);
```
*/

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, Array3, ArrayView1, Axis};
use rand::rngs::SmallRng;
use rayon::prelude::*;

use crate::callbacks::{BufferWriter, LogLogger, Logger};
use crate::config::{MetricKind, SamplerConfig};
use crate::distributions::LogDensity;
use crate::error::{HmcError, Result};
use crate::hamiltonian::{DenseEMetric, DiagEMetric, Hamiltonian, UnitEMetric};
use crate::integrator::ExplLeapfrog;
use crate::point::{DenseEPoint, DiagEPoint};
use crate::rng::chain_rng;
use crate::sampler::{Sample, Sampler};
use crate::static_hmc::StaticHmc;
use crate::stats::{AcceptTracker, Summary};

/// Iterations between progress-bar message refreshes.
const MESSAGE_INTERVAL: usize = 50;

/// Everything recorded by one chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutput {
    pub chain_id: usize,
    /// Nominal step size after the step-size search.
    pub step_size: f64,
    /// Kept draws, `[n_samples, dim]`.
    pub draws: Array2<f64>,
    pub log_prob: Array1<f64>,
    pub accept_stat: Array1<f64>,
    pub sampler_param_names: Vec<String>,
    /// Sampler parameters per kept draw, `[n_samples, sampler_param_names.len()]`.
    pub sampler_params: Array2<f64>,
    /// Metric diagnostics after sampling.
    pub diagnostic_names: Vec<String>,
    pub diagnostics: Vec<f64>,
    /// Output of `write_sampler_state` before the first draw.
    pub state_lines: Vec<String>,
}

impl ChainOutput {
    pub fn mean_accept_stat(&self) -> f64 {
        self.accept_stat.mean().unwrap_or(f64::NAN)
    }
}

/// Result of [`sample`].
#[derive(Debug)]
pub struct SamplingOutput {
    /// Base seed actually used.
    pub seed: u64,
    pub param_names: Vec<String>,
    /// One entry per chain, in chain order.
    pub chains: Vec<Result<ChainOutput>>,
}

impl SamplingOutput {
    pub fn successful(&self) -> impl Iterator<Item = &ChainOutput> {
        self.chains.iter().filter_map(|c| c.as_ref().ok())
    }

    /// `(chain_id, error)` for every chain that stopped early.
    pub fn failures(&self) -> Vec<(usize, &HmcError)> {
        self.chains
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().err().map(|e| (i, e)))
            .collect()
    }

    /// Draws of the successful chains, `[n_chains_ok, n_samples, dim]`.
    pub fn draws(&self) -> Array3<f64> {
        let views: Vec<_> = self.successful().map(|c| c.draws.view()).collect();
        match ndarray::stack(Axis(0), &views) {
            Ok(draws) => draws,
            Err(_) => Array3::zeros((0, 0, self.param_names.len())),
        }
    }

    pub fn summary(&self) -> Option<Summary> {
        Summary::from_draws(self.param_names.clone(), self.draws().view())
    }
}

/// Samples `model` with `config.n_chains` static HMC chains started at
/// `initial_position`.
///
/// Errors that concern the whole run (invalid config, wrong dimension of the
/// start or of the model's parameter names, bad inverse metric, bad progress
/// template) are returned directly. Errors of a
/// single chain, such as an improper posterior found by the step-size search,
/// end up in that chain's slot of [`SamplingOutput::chains`].
pub fn sample<M>(model: M, initial_position: &[f64], config: &SamplerConfig) -> Result<SamplingOutput>
where
    M: LogDensity + Clone + Send + Sync,
{
    config.validate()?;
    let dim = model.dim();
    if initial_position.len() != dim {
        return Err(HmcError::DimensionMismatch {
            expected: dim,
            found: initial_position.len(),
        });
    }
    let inv_metric = checked_inv_metric(config, dim)?;

    let param_names = model.param_names();
    if param_names.len() != dim {
        return Err(HmcError::DimensionMismatch {
            expected: dim,
            found: param_names.len(),
        });
    }
    let seed = config.seed.unwrap_or_else(rand::random);

    let progress = if config.progress {
        let style = ProgressStyle::default_bar()
            .template("{prefix:8} {bar:40.cyan/blue} {pos}/{len} ({eta}) | {msg}")?
            .progress_chars("=>-");
        Some((MultiProgress::new(), style))
    } else {
        None
    };

    log::info!(
        "sampling {} chains of {} draws ({} warmup), seed {seed}",
        config.n_chains,
        config.n_samples,
        config.n_warmup
    );

    let chains: Vec<Result<ChainOutput>> = (0..config.n_chains)
        .into_par_iter()
        .map(|chain_id| {
            let pb = progress.as_ref().map(|(multi, style)| {
                let pb = multi.add(ProgressBar::new((config.n_warmup + config.n_samples) as u64));
                pb.set_prefix(format!("Chain {chain_id}"));
                pb.set_style(style.clone());
                pb
            });

            let rng = chain_rng(seed, chain_id);
            let run = ChainRun {
                chain_id,
                config,
                initial_position,
                model_names: &param_names,
                progress: pb.as_ref(),
            };
            let result = match (config.metric, &inv_metric) {
                (MetricKind::Unit, _) => {
                    run.execute(StaticHmc::new(UnitEMetric::new(model.clone()), ExplLeapfrog, rng), |_| Ok(()))
                }
                (MetricKind::Diag, m) => run.execute(
                    StaticHmc::new(DiagEMetric::new(model.clone()), ExplLeapfrog, rng),
                    |z: &mut DiagEPoint| match m {
                        Some(InvMetric::Diag(d)) => z.set_inv_metric(d),
                        _ => Ok(()),
                    },
                ),
                (MetricKind::Dense, m) => run.execute(
                    StaticHmc::new(DenseEMetric::new(model.clone()), ExplLeapfrog, rng),
                    |z: &mut DenseEPoint| match m {
                        Some(InvMetric::Dense(d)) => z.set_inv_metric(d.clone()),
                        _ => Ok(()),
                    },
                ),
            };

            if let Some(pb) = &pb {
                match &result {
                    Ok(_) => pb.finish_with_message("Done!"),
                    Err(e) => pb.abandon_with_message(format!("failed: {e}")),
                }
            }
            result
        })
        .collect();

    Ok(SamplingOutput {
        seed,
        param_names,
        chains,
    })
}

enum InvMetric {
    Diag(Vec<f64>),
    Dense(DMatrix<f64>),
}

fn checked_inv_metric(config: &SamplerConfig, dim: usize) -> Result<Option<InvMetric>> {
    let Some(values) = &config.inv_metric else {
        return Ok(None);
    };
    let expected = match config.metric {
        MetricKind::Unit => 0,
        MetricKind::Diag => dim,
        MetricKind::Dense => dim * dim,
    };
    if values.len() != expected {
        return Err(HmcError::DimensionMismatch {
            expected,
            found: values.len(),
        });
    }
    Ok(match config.metric {
        MetricKind::Unit => None,
        MetricKind::Diag => Some(InvMetric::Diag(values.clone())),
        MetricKind::Dense => Some(InvMetric::Dense(DMatrix::from_row_slice(dim, dim, values))),
    })
}

/// Per-chain settings shared by every metric.
struct ChainRun<'a> {
    chain_id: usize,
    config: &'a SamplerConfig,
    initial_position: &'a [f64],
    model_names: &'a [String],
    progress: Option<&'a ProgressBar>,
}

impl ChainRun<'_> {
    /// Runs the chain, reporting a failure on the chain's logger before returning it.
    fn execute<H, F>(&self, sampler: StaticHmc<H, ExplLeapfrog, SmallRng>, set_metric: F) -> Result<ChainOutput>
    where
        H: Hamiltonian,
        F: FnOnce(&mut H::Point) -> Result<()>,
    {
        let mut logger = LogLogger::for_chain(self.chain_id);
        let result = self.run(sampler, set_metric, &mut logger);
        if let Err(e) = &result {
            logger.error(&format!("stopped: {e}"));
        }
        result
    }

    fn run<H, F>(
        &self,
        mut sampler: StaticHmc<H, ExplLeapfrog, SmallRng>,
        set_metric: F,
        logger: &mut dyn Logger,
    ) -> Result<ChainOutput>
    where
        H: Hamiltonian,
        F: FnOnce(&mut H::Point) -> Result<()>,
    {
        let config = self.config;

        set_metric(sampler.base_mut().z_mut())?;
        sampler.set_t(config.integration_time);
        sampler.set_nominal_stepsize(config.step_size);
        sampler.set_stepsize_jitter(config.step_size_jitter);

        sampler.base_mut().seed(self.initial_position)?;
        sampler.base_mut().init_hamiltonian(logger);
        if config.init_step_size {
            sampler.base_mut().init_stepsize(logger)?;
        }
        let step_size = sampler.base().nominal_stepsize();
        log::debug!(
            "chain {}: step size {step_size}, {} leapfrog steps",
            self.chain_id,
            sampler.n_steps()
        );

        let mut writer = BufferWriter::new();
        sampler.write_sampler_state(&mut writer);

        let dim = self.initial_position.len();
        let n_samples = config.n_samples;
        let sampler_param_names = sampler.sampler_param_names();
        let mut draws = Array2::<f64>::zeros((n_samples, dim));
        let mut log_prob = Array1::<f64>::zeros(n_samples);
        let mut accept_stat = Array1::<f64>::zeros(n_samples);
        let mut sampler_params = Array2::<f64>::zeros((n_samples, sampler_param_names.len()));

        let mut tracker = AcceptTracker::default();
        let mut state = Sample::initial(self.initial_position.to_vec());

        for i in 0..config.n_warmup + n_samples {
            state = sampler.transition(&state, logger)?;
            tracker.step(state.accept_stat);

            if let Some(j) = i.checked_sub(config.n_warmup) {
                draws.row_mut(j).assign(&ArrayView1::from(&state.position[..]));
                log_prob[j] = state.log_prob;
                accept_stat[j] = state.accept_stat;
                sampler_params
                    .row_mut(j)
                    .assign(&Array1::from(sampler.sampler_params()));
            }

            if let Some(pb) = self.progress {
                pb.inc(1);
                if i % MESSAGE_INTERVAL == 0 {
                    pb.set_message(format!("p(accept)≈{:.2}", tracker.mean()));
                }
            }
        }

        Ok(ChainOutput {
            chain_id: self.chain_id,
            step_size,
            draws,
            log_prob,
            accept_stat,
            sampler_param_names,
            sampler_params,
            diagnostic_names: sampler.sampler_diagnostic_names(self.model_names),
            diagnostics: sampler.sampler_diagnostics(),
            state_lines: writer.lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::IsotropicGaussian;
    use crate::error::{DensityError, StepSizeError};

    #[derive(Clone)]
    struct Flat;

    impl LogDensity for Flat {
        fn dim(&self) -> usize {
            2
        }

        fn log_density_and_gradient(&self, _q: &[f64], grad: &mut [f64]) -> std::result::Result<f64, DensityError> {
            grad.fill(0.0);
            Ok(0.0)
        }
    }

    fn small_config(metric: MetricKind) -> SamplerConfig {
        SamplerConfig {
            metric,
            n_chains: 3,
            n_warmup: 20,
            n_samples: 30,
            seed: Some(9),
            ..SamplerConfig::default()
        }
    }

    #[test]
    fn test_shapes_follow_config() {
        let output = sample(IsotropicGaussian::standard(2), &[0.1, -0.1], &small_config(MetricKind::Diag)).unwrap();
        assert_eq!(output.seed, 9);
        assert_eq!(output.chains.len(), 3);
        for (i, chain) in output.successful().enumerate() {
            assert_eq!(chain.chain_id, i);
            assert_eq!(chain.draws.dim(), (30, 2));
            assert_eq!(chain.sampler_params.dim(), (30, 3));
            assert_eq!(chain.diagnostic_names, vec!["inv_metric[theta_0]", "inv_metric[theta_1]"]);
            assert_eq!(chain.state_lines[0], format!("Step size = {}", chain.step_size));
            assert!(chain.accept_stat.iter().all(|a| (0.0..=1.0).contains(a)));
        }
        assert_eq!(output.draws().shape(), &[3, 30, 2]);
    }

    #[test]
    fn test_same_seed_same_draws() {
        let config = small_config(MetricKind::Unit);
        let a = sample(IsotropicGaussian::standard(2), &[0.0, 0.0], &config).unwrap();
        let b = sample(IsotropicGaussian::standard(2), &[0.0, 0.0], &config).unwrap();
        assert_eq!(a.draws(), b.draws());
        let d = a.draws();
        assert_ne!(d.index_axis(Axis(0), 0), d.index_axis(Axis(0), 1));
    }

    #[test]
    fn test_improper_posterior_fails_every_chain_without_aborting_the_run() {
        let output = sample(Flat, &[0.0, 0.0], &small_config(MetricKind::Unit)).unwrap();
        let failures = output.failures();
        assert_eq!(failures.len(), 3);
        assert!(failures.iter().all(|(_, e)| matches!(
            e,
            HmcError::StepSize(StepSizeError::ImproperPosterior { .. })
        )));
        assert_eq!(output.draws().shape(), &[0, 0, 2]);
        assert!(output.summary().is_none());
    }

    #[test]
    fn test_wrong_initial_dimension_is_rejected() {
        let err = sample(IsotropicGaussian::standard(3), &[0.0], &small_config(MetricKind::Unit)).unwrap_err();
        assert!(matches!(err, HmcError::DimensionMismatch { expected: 3, found: 1 }));
    }

    #[derive(Clone)]
    struct MisnamedGaussian;

    impl LogDensity for MisnamedGaussian {
        fn dim(&self) -> usize {
            2
        }

        fn log_density_and_gradient(&self, q: &[f64], grad: &mut [f64]) -> std::result::Result<f64, DensityError> {
            IsotropicGaussian::standard(2).log_density_and_gradient(q, grad)
        }

        fn param_names(&self) -> Vec<String> {
            vec!["a".into(), "b".into(), "c".into()]
        }
    }

    #[test]
    fn test_parameter_names_must_match_dimension() {
        let err = sample(MisnamedGaussian, &[0.0, 0.0], &small_config(MetricKind::Diag)).unwrap_err();
        assert!(matches!(err, HmcError::DimensionMismatch { expected: 2, found: 3 }));
    }

    #[test]
    fn test_diagnostic_names_and_values_pair_up() {
        for metric in [MetricKind::Unit, MetricKind::Diag, MetricKind::Dense] {
            let output = sample(IsotropicGaussian::standard(3), &[0.0; 3], &small_config(metric)).unwrap();
            for chain in output.successful() {
                assert_eq!(chain.diagnostic_names.len(), chain.diagnostics.len());
            }
        }
    }

    #[test]
    fn test_dense_inverse_metric_is_applied() {
        let config = SamplerConfig {
            inv_metric: Some(vec![2.0, 0.5, 0.5, 1.0]),
            ..small_config(MetricKind::Dense)
        };
        let output = sample(IsotropicGaussian::standard(2), &[0.0, 0.0], &config).unwrap();
        for chain in output.successful() {
            assert_eq!(chain.diagnostics, vec![2.0, 0.5, 0.5, 1.0]);
            assert_eq!(chain.state_lines[1], "Elements of inverse mass matrix:");
            assert_eq!(chain.state_lines[2], "2, 0.5");
        }
        assert!(output.failures().is_empty());
    }

    #[test]
    fn test_inverse_metric_length_is_checked() {
        let config = SamplerConfig {
            inv_metric: Some(vec![1.0, 1.0, 1.0]),
            ..small_config(MetricKind::Diag)
        };
        assert!(matches!(
            sample(IsotropicGaussian::standard(2), &[0.0, 0.0], &config),
            Err(HmcError::DimensionMismatch { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_indefinite_inverse_metric_fails_the_chains() {
        let config = SamplerConfig {
            inv_metric: Some(vec![1.0, 2.0, 2.0, 1.0]),
            ..small_config(MetricKind::Dense)
        };
        let output = sample(IsotropicGaussian::standard(2), &[0.0, 0.0], &config).unwrap();
        assert_eq!(output.failures().len(), 3);
        assert!(matches!(output.failures()[0].1, HmcError::NotPositiveDefinite));
    }
}
