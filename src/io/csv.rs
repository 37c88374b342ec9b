/*!
# Saving draws to CSV

Enable via the `csv` feature.
*/

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::core::SamplingOutput;
use crate::error::Result;

/**
Writes every kept draw of the successful chains to `path`.

The header is `chain,iteration,lp__,accept_stat__`, followed by the sampler
parameter names (e.g. `stepsize__`) and the model's parameter names. Each
subsequent row is one draw. Chains that failed are skipped.

# Examples

```rust
use adaptive_hmc::config::{MetricKind, SamplerConfig};
use adaptive_hmc::core::sample;
use adaptive_hmc::distributions::IsotropicGaussian;
use adaptive_hmc::io::csv::save_csv;

let config = SamplerConfig {
    metric: MetricKind::Unit,
    n_chains: 1,
    n_warmup: 10,
    n_samples: 20,
    seed: Some(1),
    ..SamplerConfig::default()
};
let output = sample(IsotropicGaussian::standard(2), &[0.0, 0.0], &config)?;
save_csv(&output, "/tmp/adaptive_hmc_draws.csv")?;
# Ok::<(), adaptive_hmc::error::HmcError>(())
```
*/
pub fn save_csv(output: &SamplingOutput, path: impl AsRef<Path>) -> Result<()> {
    let mut wtr = Writer::from_writer(File::create(path)?);

    let sampler_names = output
        .successful()
        .next()
        .map(|c| c.sampler_param_names.clone())
        .unwrap_or_default();

    let mut header: Vec<String> = ["chain", "iteration", "lp__", "accept_stat__"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(sampler_names.iter().cloned());
    header.extend(output.param_names.iter().cloned());
    wtr.write_record(&header)?;

    for chain in output.successful() {
        for (i, draw) in chain.draws.rows().into_iter().enumerate() {
            let mut row = vec![
                chain.chain_id.to_string(),
                i.to_string(),
                chain.log_prob[i].to_string(),
                chain.accept_stat[i].to_string(),
            ];
            row.extend(chain.sampler_params.row(i).iter().map(|v| v.to_string()));
            row.extend(draw.iter().map(|v| v.to_string()));
            wtr.write_record(&row)?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChainOutput;
    use crate::error::{HmcError, StepSizeError};
    use ndarray::{array, Array2};

    fn chain(chain_id: usize) -> ChainOutput {
        ChainOutput {
            chain_id,
            step_size: 0.5,
            draws: array![[1.0, 2.0], [3.0, 4.0]],
            log_prob: array![-2.5, -12.5],
            accept_stat: array![1.0, 0.25],
            sampler_param_names: vec!["stepsize__".into()],
            sampler_params: Array2::from_elem((2, 1), 0.5),
            diagnostic_names: Vec::new(),
            diagnostics: Vec::new(),
            state_lines: Vec::new(),
        }
    }

    #[test]
    fn test_writes_header_and_one_row_per_draw() {
        let output = SamplingOutput {
            seed: 0,
            param_names: vec!["a".into(), "b".into()],
            chains: vec![
                Ok(chain(0)),
                Err(HmcError::StepSize(StepSizeError::NoAcceptableStepSize)),
                Ok(chain(2)),
            ],
        };
        let file = tempfile::NamedTempFile::new().unwrap();
        save_csv(&output, file.path()).unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "chain,iteration,lp__,accept_stat__,stepsize__,a,b");
        assert_eq!(lines[1], "0,0,-2.5,1,0.5,1,2");
        assert_eq!(lines[4], "2,1,-12.5,0.25,0.5,3,4");
        assert_eq!(lines.len(), 5);
    }
}
