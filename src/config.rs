//! Run configuration, loadable from TOML.
//!
//! Every field has a default, so a config file only needs the values it changes:
//!
//! ```toml
//! step_size = 0.5
//! metric = "dense"
//! n_chains = 2
//! seed = 42
//! ```

use std::f64::consts::PI;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HmcError, Result};

/// Shape of the inverse mass matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Unit,
    #[default]
    Diag,
    Dense,
}

/// Settings for a multi-chain static HMC run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Starting nominal step size. Non-positive values keep the sampler's
    /// default of 0.1; values above `1e7` skip the step-size search.
    pub step_size: f64,
    /// Uniform multiplicative jitter fraction. Values outside `(0, 1)` are ignored.
    pub step_size_jitter: f64,
    /// Integration time of each trajectory.
    pub integration_time: f64,
    pub metric: MetricKind,
    /// Fixed inverse metric: the diagonal for `diag`, the full matrix in
    /// row-major order for `dense`. Identity when absent.
    pub inv_metric: Option<Vec<f64>>,
    pub n_chains: usize,
    /// Transitions run and discarded before recording draws.
    pub n_warmup: usize,
    pub n_samples: usize,
    /// Base seed. Chain `i` uses `seed + i`. Drawn from entropy when absent.
    pub seed: Option<u64>,
    /// Run the step-size search before sampling.
    pub init_step_size: bool,
    /// Show one progress bar per chain.
    pub progress: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            step_size: 1.0,
            step_size_jitter: 0.0,
            integration_time: 2.0 * PI,
            metric: MetricKind::Diag,
            inv_metric: None,
            n_chains: 4,
            n_warmup: 1000,
            n_samples: 1000,
            seed: None,
            init_step_size: true,
            progress: false,
        }
    }
}

impl SamplerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks the settings that would make a run meaningless. The step size and
    /// jitter are left to the sampler's own rules.
    pub fn validate(&self) -> Result<()> {
        if self.n_chains == 0 {
            return Err(HmcError::Config("n_chains must be at least 1".into()));
        }
        if self.n_samples == 0 {
            return Err(HmcError::Config("n_samples must be at least 1".into()));
        }
        if !(self.integration_time.is_finite() && self.integration_time > 0.0) {
            return Err(HmcError::Config(format!(
                "integration_time must be finite and positive, got {}",
                self.integration_time
            )));
        }
        if self.metric == MetricKind::Unit && self.inv_metric.is_some() {
            return Err(HmcError::Config(
                "inv_metric cannot be set for the unit metric".into(),
            ));
        }
        Ok(())
    }
}
