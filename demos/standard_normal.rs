//! Step-size search and static HMC on a standard normal, driven by hand.
//!
//! Shows what `core::sample` does for a single chain: seed the position,
//! search for a step size, report the sampler state, then run transitions.

use adaptive_hmc::callbacks::{LogLogger, StreamWriter};
use adaptive_hmc::distributions::IsotropicGaussian;
use adaptive_hmc::hamiltonian::DiagEMetric;
use adaptive_hmc::integrator::ExplLeapfrog;
use adaptive_hmc::sampler::{Sample, Sampler};
use adaptive_hmc::static_hmc::StaticHmc;
use adaptive_hmc::stats::AcceptTracker;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    const DIM: usize = 5;
    const N_SAMPLES: usize = 5_000;
    const SEED: u64 = 42;

    tracing_subscriber::fmt().with_target(false).init();

    let hamiltonian = DiagEMetric::new(IsotropicGaussian::standard(DIM));
    let mut sampler = StaticHmc::new(hamiltonian, ExplLeapfrog, SmallRng::seed_from_u64(SEED));
    sampler.set_nominal_stepsize_and_t(1.0, 3.0);
    sampler.set_stepsize_jitter(0.1);

    let mut logger = LogLogger::new();
    let initial = vec![1.0; DIM];
    sampler.base_mut().seed(&initial)?;
    sampler.base_mut().init_hamiltonian(&mut logger);
    let step_size = sampler.base_mut().init_stepsize(&mut logger)?;
    println!("Step size search settled at {step_size:.4} ({} leapfrog steps)", sampler.n_steps());

    let mut writer = StreamWriter::with_prefix(std::io::stdout(), "# ");
    sampler.write_sampler_state(&mut writer);

    let mut tracker = AcceptTracker::new(500);
    let mut state = Sample::initial(initial);
    let mut sum = [0.0; DIM];
    let mut sum_sq = [0.0; DIM];
    for _ in 0..N_SAMPLES {
        state = sampler.transition(&state, &mut logger)?;
        tracker.step(state.accept_stat);
        for (k, x) in state.position.iter().enumerate() {
            sum[k] += x;
            sum_sq[k] += x * x;
        }
    }

    println!("p(accept) over the last 500 draws: {:.3}", tracker.mean());
    for k in 0..DIM {
        let mean = sum[k] / N_SAMPLES as f64;
        let var = sum_sq[k] / N_SAMPLES as f64 - mean * mean;
        println!("theta_{k}: mean {mean:+.3}, var {var:.3}");
    }
    Ok(())
}
