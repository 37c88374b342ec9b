/*!
HMC with a fixed integration time.

Every transition integrates `n_steps = max(1, floor(T / epsilon))` leapfrog steps
from a fresh momentum and applies a Metropolis correction. `n_steps` follows the
nominal step size, so it is recomputed whenever the step size changes, including
after [`BaseHmc::init_stepsize`].

# Examples

```rust
use adaptive_hmc::callbacks::BufferLogger;
use adaptive_hmc::distributions::IsotropicGaussian;
use adaptive_hmc::hamiltonian::UnitEMetric;
use adaptive_hmc::integrator::ExplLeapfrog;
use adaptive_hmc::sampler::{Sample, Sampler};
use adaptive_hmc::static_hmc::StaticHmc;
use rand::rngs::SmallRng;
use rand::SeedableRng;

let hamiltonian = UnitEMetric::new(IsotropicGaussian::standard(2));
let mut sampler = StaticHmc::new(hamiltonian, ExplLeapfrog, SmallRng::seed_from_u64(42));
sampler.set_nominal_stepsize_and_t(0.2, 1.0);
assert_eq!(sampler.n_steps(), 5);

let mut logger = BufferLogger::new();
let mut state = Sample::initial(vec![1.0, -1.0]);
for _ in 0..10 {
    state = sampler.transition(&state, &mut logger).unwrap();
}
assert_eq!(state.position.len(), 2);
assert!((0.0..=1.0).contains(&state.accept_stat));
```
*/

use rand::Rng;

use crate::base_hmc::{BaseHmc, TrajectoryLength};
use crate::callbacks::{Logger, Writer};
use crate::error::Result;
use crate::hamiltonian::Hamiltonian;
use crate::integrator::Integrator;
use crate::point::PhasePoint;
use crate::sampler::{Sample, Sampler};

/// Number of leapfrog steps derived from an integration time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticLength {
    integration_time: f64,
    n_steps: usize,
}

impl StaticLength {
    pub fn new(integration_time: f64) -> Self {
        Self {
            integration_time,
            n_steps: 1,
        }
    }

    pub fn integration_time(&self) -> f64 {
        self.integration_time
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }
}

impl TrajectoryLength for StaticLength {
    fn update_l(&mut self, nominal_step_size: f64) {
        let steps = (self.integration_time / nominal_step_size).floor();
        self.n_steps = if steps < 1.0 { 1 } else { steps as usize };
    }
}

/// Static-trajectory HMC built on [`BaseHmc`].
pub struct StaticHmc<H: Hamiltonian, I, R> {
    base: BaseHmc<H, I, R, StaticLength>,
    energy: f64,
}

impl<H, I, R> StaticHmc<H, I, R>
where
    H: Hamiltonian,
    I: Integrator<H>,
    R: Rng,
{
    /// Integration time 1 at the default step size 0.1, i.e. 10 steps.
    pub fn new(hamiltonian: H, integrator: I, rng: R) -> Self {
        let mut base = BaseHmc::new(hamiltonian, integrator, rng, StaticLength::new(1.0));
        base.update_l();
        Self { base, energy: 0.0 }
    }

    pub fn base(&self) -> &BaseHmc<H, I, R, StaticLength> {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut BaseHmc<H, I, R, StaticLength> {
        &mut self.base
    }

    /// Sets both values if both are positive. Otherwise nothing changes.
    pub fn set_nominal_stepsize_and_t(&mut self, e: f64, t: f64) {
        if e > 0.0 && t > 0.0 {
            self.base.strategy_mut().integration_time = t;
            self.base.set_nominal_stepsize(e);
        }
    }

    /// Fixes the number of steps at `l`, with integration time `e * l`.
    pub fn set_nominal_stepsize_and_l(&mut self, e: f64, l: usize) {
        if e > 0.0 && l > 0 {
            self.base.set_nominal_stepsize(e);
            let length = self.base.strategy_mut();
            length.integration_time = e * l as f64;
            length.n_steps = l;
        }
    }

    pub fn set_t(&mut self, t: f64) {
        if t > 0.0 {
            self.base.strategy_mut().integration_time = t;
            self.base.update_l();
        }
    }

    pub fn set_nominal_stepsize(&mut self, e: f64) {
        self.base.set_nominal_stepsize(e);
    }

    pub fn set_stepsize_jitter(&mut self, j: f64) {
        self.base.set_stepsize_jitter(j);
    }

    pub fn integration_time(&self) -> f64 {
        self.base.strategy().integration_time()
    }

    pub fn n_steps(&self) -> usize {
        self.base.strategy().n_steps()
    }

    /// Total energy at the end of the last transition.
    pub fn energy(&self) -> f64 {
        self.energy
    }
}

impl<H, I, R> Sampler for StaticHmc<H, I, R>
where
    H: Hamiltonian,
    I: Integrator<H>,
    R: Rng,
{
    fn transition(&mut self, init: &Sample, logger: &mut dyn Logger) -> Result<Sample> {
        self.base.sample_stepsize();
        self.base.seed(&init.position)?;

        self.base.sample_momentum();
        self.base.init_hamiltonian(logger);

        let z_init = self.base.z().ps().clone();
        let h0 = self.base.energy();

        let epsilon = self.base.current_stepsize();
        for _ in 0..self.n_steps() {
            self.base.evolve(epsilon, logger);
        }

        let mut h = self.base.energy();
        if h.is_nan() {
            h = f64::INFINITY;
        }

        // Both energies infinite: nothing to compare, so reject.
        let log_accept = h0 - h;
        let accept = if log_accept.is_nan() {
            0.0
        } else {
            log_accept.exp()
        };

        if accept < 1.0 && self.base.uniform() > accept {
            self.base.z_mut().ps_mut().clone_from(&z_init);
        }

        self.energy = self.base.energy();

        let ps = self.base.z().ps();
        Ok(Sample {
            position: ps.q.iter().copied().collect(),
            log_prob: -ps.potential,
            accept_stat: accept.min(1.0),
        })
    }

    fn sampler_param_names(&self) -> Vec<String> {
        vec![
            "stepsize__".to_string(),
            "int_time__".to_string(),
            "energy__".to_string(),
        ]
    }

    fn sampler_params(&self) -> Vec<f64> {
        vec![
            self.base.current_stepsize(),
            self.integration_time(),
            self.energy,
        ]
    }

    fn write_sampler_state(&self, writer: &mut dyn Writer) {
        self.base.write_sampler_state(writer);
    }

    fn sampler_diagnostic_names(&self, model_names: &[String]) -> Vec<String> {
        self.base.sampler_diagnostic_names(model_names)
    }

    fn sampler_diagnostics(&self) -> Vec<f64> {
        self.base.sampler_diagnostics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::BufferLogger;
    use crate::distributions::IsotropicGaussian;
    use crate::hamiltonian::{DiagEMetric, UnitEMetric};
    use crate::integrator::ExplLeapfrog;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn gaussian_sampler(dim: usize, seed: u64) -> StaticHmc<UnitEMetric<IsotropicGaussian>, ExplLeapfrog, SmallRng> {
        StaticHmc::new(
            UnitEMetric::new(IsotropicGaussian::standard(dim)),
            ExplLeapfrog,
            SmallRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn test_steps_follow_integration_time() {
        let mut length = StaticLength::new(1.0);
        length.update_l(0.3);
        assert_eq!(length.n_steps(), 3);
        length.update_l(2.0);
        assert_eq!(length.n_steps(), 1);
        length.update_l(0.001);
        assert_eq!(length.n_steps(), 1000);
    }

    #[test]
    fn test_defaults_to_ten_steps() {
        let sampler = gaussian_sampler(2, 0);
        assert_eq!(sampler.integration_time(), 1.0);
        assert_eq!(sampler.n_steps(), 10);
    }

    #[test]
    fn test_setters_keep_steps_in_sync() {
        let mut sampler = gaussian_sampler(2, 0);
        sampler.set_nominal_stepsize_and_l(0.05, 7);
        assert_eq!(sampler.n_steps(), 7);
        sampler.set_t(0.5);
        assert_eq!(sampler.n_steps(), 10);
        sampler.set_nominal_stepsize(0.25);
        assert_eq!(sampler.n_steps(), 2);
        sampler.set_nominal_stepsize_and_t(-1.0, 3.0);
        assert_eq!(sampler.integration_time(), 0.5);
    }

    #[test]
    fn test_step_size_search_updates_steps() {
        let mut sampler = gaussian_sampler(2, 5);
        sampler.set_nominal_stepsize_and_t(1.0, 3.0);
        sampler.base_mut().seed(&[0.0, 0.0]).unwrap();
        let mut logger = BufferLogger::new();
        let eps = sampler.base_mut().init_stepsize(&mut logger).unwrap();
        assert_eq!(sampler.n_steps(), ((3.0 / eps).floor() as usize).max(1));
    }

    #[test]
    fn test_transition_reports_sampler_params() {
        let mut sampler = gaussian_sampler(3, 1);
        sampler.set_nominal_stepsize_and_t(0.2, 1.0);
        let mut logger = BufferLogger::new();
        let next = sampler
            .transition(&Sample::initial(vec![0.5, 0.5, 0.5]), &mut logger)
            .unwrap();

        let names = sampler.sampler_param_names();
        let values = sampler.sampler_params();
        assert_eq!(names, vec!["stepsize__", "int_time__", "energy__"]);
        assert_eq!(values.len(), names.len());
        assert_eq!(values[0], 0.2);
        assert_eq!(values[1], 1.0);
        assert!(values[2].is_finite());

        let expected_lp = -0.5 * next.position.iter().map(|x| x * x).sum::<f64>();
        assert!((next.log_prob - expected_lp).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&next.accept_stat));
    }

    #[test]
    fn test_wildly_unstable_step_is_rejected() {
        let mut sampler = gaussian_sampler(2, 3);
        sampler.set_nominal_stepsize_and_l(50.0, 1);
        let mut logger = BufferLogger::new();
        let start = Sample::initial(vec![1.0, -1.0]);
        let next = sampler.transition(&start, &mut logger).unwrap();
        assert_eq!(next.position, start.position);
        assert!(next.accept_stat < 1e-10);
    }

    #[test]
    fn test_wrong_dimension_is_an_error() {
        let mut sampler = gaussian_sampler(2, 0);
        let mut logger = BufferLogger::new();
        assert!(sampler
            .transition(&Sample::initial(vec![1.0]), &mut logger)
            .is_err());
    }

    #[test]
    fn test_diagnostics_come_from_the_metric() {
        let sampler = StaticHmc::new(
            DiagEMetric::new(IsotropicGaussian::standard(2)),
            ExplLeapfrog,
            SmallRng::seed_from_u64(0),
        );
        let names = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            sampler.sampler_diagnostic_names(&names),
            vec!["inv_metric[a]", "inv_metric[b]"]
        );
        assert_eq!(sampler.sampler_diagnostics(), vec![1.0, 1.0]);
    }
}
