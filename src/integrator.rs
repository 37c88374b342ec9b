//! Symplectic integrators advancing a phase-space point under a Hamiltonian.

use crate::callbacks::Logger;
use crate::hamiltonian::Hamiltonian;
use crate::point::PhasePoint;

/// Advances a point by one discrete step. Implementations are deterministic.
pub trait Integrator<H: Hamiltonian> {
    fn evolve(&self, z: &mut H::Point, hamiltonian: &H, epsilon: f64, logger: &mut dyn Logger);
}

/// The three sub-steps of a leapfrog scheme.
///
/// Each method receives the step size it should apply, so the momentum
/// updates are called with `epsilon / 2`.
pub trait Leapfrog<H: Hamiltonian> {
    fn begin_update_p(&self, z: &mut H::Point, hamiltonian: &H, epsilon: f64, logger: &mut dyn Logger);

    fn update_q(&self, z: &mut H::Point, hamiltonian: &H, epsilon: f64, logger: &mut dyn Logger);

    fn end_update_p(&self, z: &mut H::Point, hamiltonian: &H, epsilon: f64, logger: &mut dyn Logger);
}

impl<H: Hamiltonian, T: Leapfrog<H>> Integrator<H> for T {
    fn evolve(&self, z: &mut H::Point, hamiltonian: &H, epsilon: f64, logger: &mut dyn Logger) {
        self.begin_update_p(z, hamiltonian, 0.5 * epsilon, logger);
        self.update_q(z, hamiltonian, epsilon, logger);
        self.end_update_p(z, hamiltonian, 0.5 * epsilon, logger);
    }
}

/// Explicit leapfrog for metrics whose kinetic energy does not depend on `q`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplLeapfrog;

impl<H: Hamiltonian> Leapfrog<H> for ExplLeapfrog {
    fn begin_update_p(&self, z: &mut H::Point, hamiltonian: &H, epsilon: f64, _logger: &mut dyn Logger) {
        let g = hamiltonian.dphi_dq(z);
        z.ps_mut().p.axpy(-epsilon, &g, 1.0);
    }

    fn update_q(&self, z: &mut H::Point, hamiltonian: &H, epsilon: f64, logger: &mut dyn Logger) {
        let v = hamiltonian.dtau_dp(z);
        z.ps_mut().q.axpy(epsilon, &v, 1.0);
        hamiltonian.update_potential_gradient(z, logger);
    }

    fn end_update_p(&self, z: &mut H::Point, hamiltonian: &H, epsilon: f64, _logger: &mut dyn Logger) {
        let g = hamiltonian.dphi_dq(z);
        z.ps_mut().p.axpy(-epsilon, &g, 1.0);
    }
}
