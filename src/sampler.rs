//! Interface shared by trajectory strategies that drive a chain.

use crate::callbacks::{Logger, Writer};
use crate::error::Result;

/// One state of a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Unconstrained parameter vector.
    pub position: Vec<f64>,
    /// Log density at `position`, up to a constant.
    pub log_prob: f64,
    /// Acceptance statistic of the transition that produced this sample.
    pub accept_stat: f64,
}

impl Sample {
    /// A starting state that has not been evaluated yet.
    pub fn initial(position: Vec<f64>) -> Self {
        Self {
            position,
            log_prob: 0.0,
            accept_stat: 0.0,
        }
    }
}

/// A Markov transition kernel.
pub trait Sampler {
    /// Moves the chain one step away from `init`.
    fn transition(&mut self, init: &Sample, logger: &mut dyn Logger) -> Result<Sample>;

    /// Names of the per-iteration sampler parameters (e.g. `stepsize__`).
    fn sampler_param_names(&self) -> Vec<String>;

    /// Values matching [`Sampler::sampler_param_names`] for the last transition.
    fn sampler_params(&self) -> Vec<f64>;

    fn write_sampler_state(&self, writer: &mut dyn Writer);

    fn sampler_diagnostic_names(&self, model_names: &[String]) -> Vec<String>;

    fn sampler_diagnostics(&self) -> Vec<f64>;
}
