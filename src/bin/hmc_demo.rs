//! Samples a 2D isotropic Gaussian with static HMC and prints what each chain found.
//!
//! Usage: `hmc_demo [config.toml]`. Without an argument the default
//! configuration is used with a fixed seed.

use adaptive_hmc::config::SamplerConfig;
use adaptive_hmc::core::sample;
use adaptive_hmc::distributions::IsotropicGaussian;
use adaptive_hmc::stats::max_rhat;
use std::error::Error;
use tracing_subscriber::filter::LevelFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .with_target(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SamplerConfig::from_file(path)?,
        None => SamplerConfig {
            seed: Some(42),
            progress: true,
            ..SamplerConfig::default()
        },
    };

    let target = IsotropicGaussian::new(2, 1.5);
    let output = sample(target, &[3.0, -3.0], &config)?;

    for chain in output.successful() {
        println!(
            "Chain {}: mean p(accept) = {:.3}",
            chain.chain_id,
            chain.mean_accept_stat()
        );
        for line in &chain.state_lines {
            println!("  {line}");
        }
    }
    for (chain_id, err) in output.failures() {
        println!("Chain {chain_id} failed: {err}");
    }

    if let Some(summary) = output.summary() {
        println!("\n{summary}");
        if let Some(rhat) = max_rhat(&summary.rhat) {
            println!("max(rhat) = {rhat:.3}");
        }
    }
    Ok(())
}
