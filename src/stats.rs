//! Convergence diagnostics and summaries for multi-chain output.

use std::collections::VecDeque;
use std::fmt;

use ndarray::prelude::*;
use ndarray_stats::QuantileExt;

/// Split-R̂ for each parameter.
///
/// `draws` has shape `[n_chains, n_draws, n_params]`. Every chain is cut into a
/// first and a second half (the middle draw is dropped when `n_draws` is odd)
/// and the halves are compared as separate chains, so a chain that drifts
/// shows up as poor mixing. Parameters with fewer than two draws per half get
/// `NaN`.
pub fn split_rhat(draws: ArrayView3<f64>) -> Array1<f64> {
    let (n_chains, n_draws, n_params) = draws.dim();
    let half = n_draws / 2;
    if n_chains == 0 || half < 2 {
        return Array1::from_elem(n_params, f64::NAN);
    }

    let mut halves = Vec::with_capacity(2 * n_chains);
    for chain in draws.outer_iter() {
        halves.push(chain.slice_move(s![..half, ..]));
        halves.push(chain.slice_move(s![n_draws - half.., ..]));
    }

    let m = halves.len() as f64;
    let n = half as f64;

    // m x n_params
    let means = Array2::from_shape_fn((halves.len(), n_params), |(j, k)| {
        halves[j].column(k).sum() / n
    });
    let within_each = Array2::from_shape_fn((halves.len(), n_params), |(j, k)| {
        let mu = means[[j, k]];
        halves[j].column(k).fold(0.0, |acc, x| acc + (x - mu).powi(2)) / (n - 1.0)
    });

    let mut rhat = Array1::zeros(n_params);
    for k in 0..n_params {
        let col = means.column(k);
        let grand = col.sum() / m;
        let between = n / (m - 1.0) * col.fold(0.0, |acc, x| acc + (x - grand).powi(2));
        let within = within_each.column(k).sum() / m;
        let var = within * (n - 1.0) / n + between / n;
        rhat[k] = (var / within).sqrt();
    }
    rhat
}

/// Largest finite R̂, or `None` when every value is NaN.
pub fn max_rhat(rhat: &Array1<f64>) -> Option<f64> {
    let finite: Array1<f64> = rhat.iter().copied().filter(|x| x.is_finite()).collect();
    finite.max().ok().copied()
}

/// Running mean of the last `window` acceptance statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptTracker {
    window: usize,
    recent: VecDeque<f64>,
    sum: f64,
}

impl AcceptTracker {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            recent: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    pub fn step(&mut self, accept_stat: f64) {
        if self.recent.len() == self.window {
            if let Some(old) = self.recent.pop_front() {
                self.sum -= old;
            }
        }
        self.recent.push_back(accept_stat);
        self.sum += accept_stat;
    }

    /// `0` before the first step.
    pub fn mean(&self) -> f64 {
        if self.recent.is_empty() {
            0.0
        } else {
            self.sum / self.recent.len() as f64
        }
    }
}

impl Default for AcceptTracker {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Posterior mean, standard deviation and split-R̂ per parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub names: Vec<String>,
    pub mean: Array1<f64>,
    pub sd: Array1<f64>,
    pub rhat: Array1<f64>,
}

impl Summary {
    /// Summarizes draws shaped `[n_chains, n_draws, n_params]`. Returns `None`
    /// when there are no draws.
    pub fn from_draws(names: Vec<String>, draws: ArrayView3<f64>) -> Option<Self> {
        let (n_chains, n_draws, n_params) = draws.dim();
        let total = (n_chains * n_draws) as f64;
        if n_chains == 0 || n_draws == 0 {
            return None;
        }

        let mut mean = Array1::zeros(n_params);
        let mut sd = Array1::zeros(n_params);
        for k in 0..n_params {
            let col = draws.index_axis(Axis(2), k);
            let mu = col.sum() / total;
            let ss = col.fold(0.0, |acc, x| acc + (x - mu).powi(2));
            mean[k] = mu;
            sd[k] = if total > 1.0 {
                (ss / (total - 1.0)).sqrt()
            } else {
                f64::NAN
            };
        }

        Some(Self {
            names,
            mean,
            sd,
            rhat: split_rhat(draws),
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<16} {:>10} {:>10} {:>8}", "param", "mean", "sd", "rhat")?;
        for (i, name) in self.names.iter().enumerate() {
            writeln!(
                f,
                "{:<16} {:>10.4} {:>10.4} {:>8.3}",
                name, self.mean[i], self.sd[i], self.rhat[i]
            )?;
        }
        Ok(())
    }
}
