//! Error types shared by the sampler components.

use thiserror::Error;

/// Largest nominal step size the initialization search accepts before declaring
/// the posterior improper.
pub const MAX_STEP_SIZE: f64 = 1e7;

/// Fatal outcomes of the step-size initialization search.
///
/// Both variants halt the chain that produced them. Other chains are unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StepSizeError {
    /// The search kept doubling until the step size exceeded [`MAX_STEP_SIZE`].
    #[error("Posterior is improper. Please check your model. (step size grew to {step_size:e})")]
    ImproperPosterior { step_size: f64 },
    /// The search kept halving until the step size underflowed to zero.
    #[error("No acceptably small step size could be found. Perhaps the posterior is not continuous?")]
    NoAcceptableStepSize,
}

/// Error returned by a log-density when it is undefined at the requested point.
///
/// The Hamiltonian turns this into an infinite potential, so it only ever causes
/// a proposal to be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DensityError(String);

impl DensityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum HmcError {
    #[error(transparent)]
    StepSize(#[from] StepSizeError),

    #[error("dimension mismatch: expected {expected} values, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("inverse metric is not symmetric positive definite")]
    NotPositiveDefinite,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid progress bar template: {0}")]
    ProgressTemplate(#[from] indicatif::style::TemplateError),

    #[cfg(feature = "csv")]
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = HmcError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_messages_name_the_condition() {
        let improper = StepSizeError::ImproperPosterior { step_size: 1.6e7 }.to_string();
        assert!(improper.to_lowercase().contains("posterior is improper"));

        let underflow = StepSizeError::NoAcceptableStepSize.to_string();
        assert!(underflow
            .to_lowercase()
            .contains("no acceptably small step size could be found"));
    }

    #[test]
    fn test_step_size_errors_convert_into_hmc_error() {
        let err: HmcError = StepSizeError::NoAcceptableStepSize.into();
        assert!(matches!(
            err,
            HmcError::StepSize(StepSizeError::NoAcceptableStepSize)
        ));
    }
}
