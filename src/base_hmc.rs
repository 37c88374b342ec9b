/*!
The state and step-size machinery shared by every HMC variant.

[`BaseHmc`] owns the phase-space point, the Hamiltonian, the integrator and the
chain's random generator. It knows how to find a usable step size from scratch
([`BaseHmc::init_stepsize`]), how to jitter it per iteration
([`BaseHmc::sample_stepsize`]) and how to report its state. It does not know how
to build a trajectory: that is left to a strategy such as
[`crate::static_hmc::StaticHmc`], which keeps its step-size dependent settings in
sync through the [`TrajectoryLength`] hook.

# Step-size initialization

Starting from the nominal step size, one leapfrog step is taken from a fresh
momentum and the energy change `delta_H = H0 - H1` is compared against
`ln(0.8)`. The first probe fixes a direction: if the step was accurate enough
the step size is doubled until it no longer is, otherwise it is halved until it
is. The position and momentum are restored after the search, whether it succeeds
or fails.
*/

use rand::Rng;

use crate::callbacks::{Logger, Writer};
use crate::error::{Result, StepSizeError, MAX_STEP_SIZE};
use crate::hamiltonian::Hamiltonian;
use crate::integrator::Integrator;
use crate::point::{PhasePoint, PsPoint};
use crate::rng::uniform_01;

/// Log acceptance threshold targeted by the step-size search, `ln(0.8)`.
pub const TARGET_LOG_ACCEPT: f64 = -0.223_143_551_314_209_7;

const DEFAULT_STEP_SIZE: f64 = 0.1;

/// Hook through which the core tells a trajectory strategy that the nominal
/// step size changed.
pub trait TrajectoryLength {
    /// Recomputes whatever trajectory-length parameter depends on the step size.
    fn update_l(&mut self, nominal_step_size: f64);
}

/// A strategy with nothing to recompute.
impl TrajectoryLength for () {
    fn update_l(&mut self, _nominal_step_size: f64) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Grow,
    Shrink,
}

/// Core of an HMC sampler.
///
/// # Type parameters
/// - `H`: the Hamiltonian, which also fixes the phase-space point type.
/// - `I`: the integrator.
/// - `R`: the random generator, owned exclusively by this sampler.
/// - `L`: the trajectory strategy notified when the nominal step size changes.
pub struct BaseHmc<H: Hamiltonian, I, R, L> {
    z: H::Point,
    hamiltonian: H,
    integrator: I,
    rng: R,
    strategy: L,
    nom_epsilon: f64,
    epsilon: f64,
    epsilon_jitter: f64,
}

impl<H, I, R, L> BaseHmc<H, I, R, L>
where
    H: Hamiltonian,
    I: Integrator<H>,
    R: Rng,
    L: TrajectoryLength,
{
    /// Creates a sampler with a zeroed point of the Hamiltonian's dimension,
    /// step size 0.1 and no jitter.
    pub fn new(hamiltonian: H, integrator: I, rng: R, strategy: L) -> Self {
        let z = H::Point::with_dim(hamiltonian.dim());
        Self {
            z,
            hamiltonian,
            integrator,
            rng,
            strategy,
            nom_epsilon: DEFAULT_STEP_SIZE,
            epsilon: DEFAULT_STEP_SIZE,
            epsilon_jitter: 0.0,
        }
    }

    /// Writes `Step size = <nominal>` as one record.
    pub fn write_sampler_stepsize(&self, writer: &mut dyn Writer) {
        writer.write_message(&format!("Step size = {}", self.nom_epsilon));
    }

    /// Writes the metric in the point's own format.
    pub fn write_sampler_metric(&self, writer: &mut dyn Writer) {
        self.z.write_metric(writer);
    }

    /// Step size line followed by the metric.
    pub fn write_sampler_state(&self, writer: &mut dyn Writer) {
        self.write_sampler_stepsize(writer);
        self.write_sampler_metric(writer);
    }

    /// Names of the sampler diagnostics, i.e. the metric entries.
    ///
    /// # Parameters
    /// * `model_names`: parameter names of the model, used to label each entry.
    ///
    /// # Returns
    /// One name per value of [`BaseHmc::sampler_diagnostics`], in the same order.
    pub fn sampler_diagnostic_names(&self, model_names: &[String]) -> Vec<String> {
        self.z.param_names(model_names)
    }

    /// Current values of the metric entries.
    pub fn sampler_diagnostics(&self) -> Vec<f64> {
        self.z.params()
    }

    /// Sets the position the chain starts from.
    ///
    /// # Returns
    /// `HmcError::DimensionMismatch` if `q` does not have the model's dimension.
    pub fn seed(&mut self, q: &[f64]) -> Result<()> {
        self.z.ps_mut().set_position(q)
    }

    /// Evaluates the potential and its gradient at the current position.
    pub fn init_hamiltonian(&mut self, logger: &mut dyn Logger) {
        self.hamiltonian.init(&mut self.z, logger);
    }

    /// Searches for a nominal step size whose single leapfrog step from a fresh
    /// momentum crosses the `ln(0.8)` energy-change threshold.
    ///
    /// A nominal step size of 0 (or NaN) or above [`MAX_STEP_SIZE`] is taken as
    /// already tuned and returned unchanged. On success the strategy hook is
    /// notified of the new value. In every case the position and momentum are
    /// left as they were before the call.
    ///
    /// # Parameters
    /// * `logger`: receives the Hamiltonian's messages during each probe.
    ///
    /// # Returns
    /// The tuned nominal step size, or [`StepSizeError::ImproperPosterior`] once
    /// it grows past [`MAX_STEP_SIZE`], or [`StepSizeError::NoAcceptableStepSize`]
    /// once it underflows to 0.
    pub fn init_stepsize(&mut self, logger: &mut dyn Logger) -> Result<f64, StepSizeError> {
        if self.nom_epsilon == 0.0 || self.nom_epsilon > MAX_STEP_SIZE || self.nom_epsilon.is_nan() {
            log::debug!("skipping step size search at {}", self.nom_epsilon);
            return Ok(self.nom_epsilon);
        }

        let z_init = self.z.ps().clone();

        let delta_h = self.probe(logger);
        let direction = if delta_h > TARGET_LOG_ACCEPT {
            Direction::Grow
        } else {
            Direction::Shrink
        };

        let outcome = loop {
            self.restore(&z_init);
            let delta_h = self.probe(logger);

            let done = match direction {
                Direction::Grow => !(delta_h > TARGET_LOG_ACCEPT),
                Direction::Shrink => !(delta_h < TARGET_LOG_ACCEPT),
            };
            if done {
                break Ok(self.nom_epsilon);
            }

            self.nom_epsilon = match direction {
                Direction::Grow => 2.0 * self.nom_epsilon,
                Direction::Shrink => 0.5 * self.nom_epsilon,
            };

            if self.nom_epsilon > MAX_STEP_SIZE {
                break Err(StepSizeError::ImproperPosterior {
                    step_size: self.nom_epsilon,
                });
            }
            if self.nom_epsilon == 0.0 {
                break Err(StepSizeError::NoAcceptableStepSize);
            }
        };

        self.restore(&z_init);
        match outcome {
            Ok(epsilon) => log::debug!("step size search settled at {epsilon}"),
            Err(e) => log::debug!("step size search failed: {e}"),
        }
        let epsilon = outcome?;
        self.update_l();
        Ok(epsilon)
    }

    /// One leapfrog step at the nominal step size from a fresh momentum.
    /// Returns `H0 - H1`, with a NaN `H1` read as `+inf`.
    fn probe(&mut self, logger: &mut dyn Logger) -> f64 {
        self.hamiltonian.sample_momentum(&mut self.z, &mut self.rng);
        self.hamiltonian.init(&mut self.z, logger);
        let h0 = self.hamiltonian.energy(&self.z);

        self.integrator
            .evolve(&mut self.z, &self.hamiltonian, self.nom_epsilon, logger);

        let mut h = self.hamiltonian.energy(&self.z);
        if h.is_nan() {
            h = f64::INFINITY;
        }
        let delta_h = h0 - h;
        log::debug!("step size probe at {}: delta_H = {delta_h}", self.nom_epsilon);
        delta_h
    }

    fn restore(&mut self, z_init: &PsPoint) {
        self.z.ps_mut().clone_from(z_init);
    }

    /// The phase-space point.
    pub fn z(&self) -> &H::Point {
        &self.z
    }

    /// Mutable access to the point, e.g. to set its metric.
    pub fn z_mut(&mut self) -> &mut H::Point {
        &mut self.z
    }

    /// Sets the nominal step size if `e` is positive, then notifies the strategy
    /// either way.
    pub fn set_nominal_stepsize(&mut self, e: f64) {
        if e > 0.0 {
            self.nom_epsilon = e;
        }
        self.update_l();
    }

    /// The tuned step size kept across iterations.
    pub fn nominal_stepsize(&self) -> f64 {
        self.nom_epsilon
    }

    /// Step size used by the current iteration, see [`BaseHmc::sample_stepsize`].
    pub fn current_stepsize(&self) -> f64 {
        self.epsilon
    }

    /// Sets the jitter fraction. Values outside `(0, 1)` are ignored.
    pub fn set_stepsize_jitter(&mut self, j: f64) {
        if j > 0.0 && j < 1.0 {
            self.epsilon_jitter = j;
        }
    }

    /// Jitter fraction, 0 when jitter is off.
    pub fn stepsize_jitter(&self) -> f64 {
        self.epsilon_jitter
    }

    /// Draws this iteration's step size uniformly from
    /// `nominal * [1 - jitter, 1 + jitter]`. Without jitter no random number is
    /// consumed and the nominal value is used as is.
    pub fn sample_stepsize(&mut self) {
        self.epsilon = self.nom_epsilon;
        if self.epsilon_jitter != 0.0 {
            let u = uniform_01(&mut self.rng);
            self.epsilon *= 1.0 + self.epsilon_jitter * (2.0 * u - 1.0);
        }
    }

    /// Forwards the nominal step size to the strategy hook.
    pub fn update_l(&mut self) {
        self.strategy.update_l(self.nom_epsilon);
    }

    /// The Hamiltonian shared by every trajectory of this chain.
    pub fn hamiltonian(&self) -> &H {
        &self.hamiltonian
    }

    /// The integrator used by [`BaseHmc::evolve`].
    pub fn integrator(&self) -> &I {
        &self.integrator
    }

    /// The trajectory strategy behind the [`TrajectoryLength`] hook.
    pub fn strategy(&self) -> &L {
        &self.strategy
    }

    /// Mutable access to the strategy. Changes that depend on the step size
    /// should be followed by [`BaseHmc::update_l`].
    pub fn strategy_mut(&mut self) -> &mut L {
        &mut self.strategy
    }

    /// Replaces the momentum with a fresh draw from the metric's distribution.
    pub fn sample_momentum(&mut self) {
        self.hamiltonian.sample_momentum(&mut self.z, &mut self.rng);
    }

    /// Advances the point by one integrator step of size `epsilon`.
    pub fn evolve(&mut self, epsilon: f64, logger: &mut dyn Logger) {
        self.integrator
            .evolve(&mut self.z, &self.hamiltonian, epsilon, logger);
    }

    /// Total energy of the current point, `+inf` instead of NaN.
    pub fn energy(&self) -> f64 {
        self.hamiltonian.energy(&self.z)
    }

    /// One `U[0, 1)` draw from the sampler's generator.
    pub fn uniform(&mut self) -> f64 {
        uniform_01(&mut self.rng)
    }
}
