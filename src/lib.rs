//! Hamiltonian Monte Carlo with automatic step-size initialization.
//!
//! The building blocks are a [`distributions::LogDensity`], a Euclidean
//! [`hamiltonian::Hamiltonian`], an [`integrator::Integrator`] and the shared
//! sampler core [`base_hmc::BaseHmc`]. [`static_hmc::StaticHmc`] builds fixed-length
//! trajectories on top of that core, and [`core::sample`] runs several of them in
//! parallel from a [`config::SamplerConfig`].
//!
//! ```rust
//! use adaptive_hmc::config::SamplerConfig;
//! use adaptive_hmc::core::sample;
//! use adaptive_hmc::distributions::IsotropicGaussian;
//!
//! let config = SamplerConfig {
//!     n_chains: 2,
//!     n_warmup: 100,
//!     n_samples: 200,
//!     seed: Some(7),
//!     ..SamplerConfig::default()
//! };
//! let output = sample(IsotropicGaussian::standard(3), &[0.5, 0.5, 0.5], &config)?;
//! for chain in output.successful() {
//!     println!("chain {}: step size {:.3}", chain.chain_id, chain.step_size);
//! }
//! if let Some(summary) = output.summary() {
//!     println!("{summary}");
//! }
//! # Ok::<(), adaptive_hmc::error::HmcError>(())
//! ```

pub mod autodiff;
pub mod base_hmc;
pub mod callbacks;
pub mod config;
pub mod core;
pub mod distributions;
pub mod error;
pub mod hamiltonian;
pub mod integrator;
pub mod io;
pub mod point;
pub mod rng;
pub mod sampler;
pub mod static_hmc;
pub mod stats;
