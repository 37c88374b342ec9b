/*!
Euclidean Hamiltonians.

A Hamiltonian combines a model's potential energy `phi(q) = -log p(q)` with a
kinetic energy `tau(p)` defined by a metric. The three variants here differ only
in the metric: identity, diagonal or dense. The metric itself lives on the
phase-space point (see [`crate::point`]), so a Hamiltonian is stateless apart
from the model it wraps.
*/

use nalgebra::DVector;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::callbacks::Logger;
use crate::distributions::LogDensity;
use crate::point::{DenseEPoint, DiagEPoint, PhasePoint, PsPoint, UnitEPoint};

/// Energy function and momentum distribution driving the dynamics.
pub trait Hamiltonian {
    type Point: PhasePoint;

    fn dim(&self) -> usize;

    /// Kinetic energy.
    fn tau(&self, z: &Self::Point) -> f64;

    /// Potential energy, as cached by the last [`Hamiltonian::update_potential_gradient`].
    fn phi(&self, z: &Self::Point) -> f64 {
        z.ps().potential
    }

    /// Total energy `tau + phi`. A NaN energy is reported as `+inf`.
    fn energy(&self, z: &Self::Point) -> f64 {
        let h = self.tau(z) + self.phi(z);
        if h.is_nan() {
            f64::INFINITY
        } else {
            h
        }
    }

    fn dtau_dp(&self, z: &Self::Point) -> DVector<f64>;

    /// Gradient of the potential, as cached on the point.
    fn dphi_dq(&self, z: &Self::Point) -> DVector<f64> {
        z.ps().gradient.clone()
    }

    /// Draws a fresh momentum from the distribution implied by the point's metric.
    fn sample_momentum<R: Rng + ?Sized>(&self, z: &mut Self::Point, rng: &mut R);

    /// Prepares the point for evolution by evaluating the potential and its gradient.
    fn init(&self, z: &mut Self::Point, logger: &mut dyn Logger) {
        self.update_potential_gradient(z, logger);
    }

    /// Re-evaluates the potential and its gradient at the current position.
    fn update_potential_gradient(&self, z: &mut Self::Point, logger: &mut dyn Logger);
}

/// Evaluates `phi = -log p(q)` and its gradient into `ps`.
///
/// An undefined density is logged and gives an infinite potential, so the
/// proposal carrying it is rejected.
fn update_euclidean<M: LogDensity>(model: &M, ps: &mut PsPoint, logger: &mut dyn Logger) {
    match model.log_density_and_gradient(ps.q.as_slice(), ps.gradient.as_mut_slice()) {
        Ok(logp) => {
            ps.potential = -logp;
            ps.gradient.neg_mut();
        }
        Err(e) => {
            logger.info(&format!(
                "The current Metropolis proposal is about to be rejected because of the following issue: {e}"
            ));
            ps.potential = f64::INFINITY;
        }
    }
}

fn standard_normal<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> DVector<f64> {
    DVector::from_fn(dim, |_, _| rng.sample(StandardNormal))
}

/// Identity metric: `tau = p·p / 2`.
#[derive(Debug, Clone)]
pub struct UnitEMetric<M> {
    model: M,
}

impl<M: LogDensity> UnitEMetric<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: LogDensity> Hamiltonian for UnitEMetric<M> {
    type Point = UnitEPoint;

    fn dim(&self) -> usize {
        self.model.dim()
    }

    fn tau(&self, z: &UnitEPoint) -> f64 {
        0.5 * z.ps().p.norm_squared()
    }

    fn dtau_dp(&self, z: &UnitEPoint) -> DVector<f64> {
        z.ps().p.clone()
    }

    fn sample_momentum<R: Rng + ?Sized>(&self, z: &mut UnitEPoint, rng: &mut R) {
        let dim = z.ps().dim();
        z.ps_mut().p = standard_normal(dim, rng);
    }

    fn update_potential_gradient(&self, z: &mut UnitEPoint, logger: &mut dyn Logger) {
        update_euclidean(&self.model, z.ps_mut(), logger);
    }
}

/// Diagonal metric: `tau = sum(m_i^{-1} p_i^2) / 2`.
#[derive(Debug, Clone)]
pub struct DiagEMetric<M> {
    model: M,
}

impl<M: LogDensity> DiagEMetric<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: LogDensity> Hamiltonian for DiagEMetric<M> {
    type Point = DiagEPoint;

    fn dim(&self) -> usize {
        self.model.dim()
    }

    fn tau(&self, z: &DiagEPoint) -> f64 {
        let p = &z.ps().p;
        0.5 * p.dot(&z.inv_metric().component_mul(p))
    }

    fn dtau_dp(&self, z: &DiagEPoint) -> DVector<f64> {
        z.inv_metric().component_mul(&z.ps().p)
    }

    fn sample_momentum<R: Rng + ?Sized>(&self, z: &mut DiagEPoint, rng: &mut R) {
        let dim = z.ps().dim();
        let mut p = standard_normal(dim, rng);
        p.component_div_assign(&z.inv_metric().map(f64::sqrt));
        z.ps_mut().p = p;
    }

    fn update_potential_gradient(&self, z: &mut DiagEPoint, logger: &mut dyn Logger) {
        update_euclidean(&self.model, z.ps_mut(), logger);
    }
}

/// Dense metric: `tau = p^T M^{-1} p / 2`.
#[derive(Debug, Clone)]
pub struct DenseEMetric<M> {
    model: M,
}

impl<M: LogDensity> DenseEMetric<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: LogDensity> Hamiltonian for DenseEMetric<M> {
    type Point = DenseEPoint;

    fn dim(&self) -> usize {
        self.model.dim()
    }

    fn tau(&self, z: &DenseEPoint) -> f64 {
        let p = &z.ps().p;
        0.5 * p.dot(&(z.inv_metric() * p))
    }

    fn dtau_dp(&self, z: &DenseEPoint) -> DVector<f64> {
        z.inv_metric() * &z.ps().p
    }

    /// `p = L^{-T} u` with `u ~ N(0, I)` and `M^{-1} = L L^T`, so `Cov(p) = M`.
    fn sample_momentum<R: Rng + ?Sized>(&self, z: &mut DenseEPoint, rng: &mut R) {
        let dim = z.ps().dim();
        let mut p = standard_normal(dim, rng);
        let solved = z.inv_metric_cholesky().tr_solve_lower_triangular_mut(&mut p);
        debug_assert!(solved, "Cholesky factor has a zero on its diagonal");
        z.ps_mut().p = p;
    }

    fn update_potential_gradient(&self, z: &mut DenseEPoint, logger: &mut dyn Logger) {
        update_euclidean(&self.model, z.ps_mut(), logger);
    }
}
