//! Phase-space points: position, momentum and the cached potential and gradient,
//! plus the metric carried by each Euclidean variant.

use nalgebra::{Cholesky, DMatrix, DVector};

use crate::callbacks::Writer;
use crate::error::{HmcError, Result};

/// The state that Hamiltonian dynamics evolves.
///
/// `gradient` is the gradient of `potential`, i.e. minus the gradient of the log
/// density at `q`.
#[derive(Debug, Clone, PartialEq)]
pub struct PsPoint {
    pub q: DVector<f64>,
    pub p: DVector<f64>,
    pub potential: f64,
    pub gradient: DVector<f64>,
}

impl PsPoint {
    pub fn new(dim: usize) -> Self {
        Self {
            q: DVector::zeros(dim),
            p: DVector::zeros(dim),
            potential: 0.0,
            gradient: DVector::zeros(dim),
        }
    }

    pub fn dim(&self) -> usize {
        self.q.len()
    }

    /// Overwrites the position. The dimensionality is fixed at construction.
    pub fn set_position(&mut self, q: &[f64]) -> Result<()> {
        if q.len() != self.q.len() {
            return Err(HmcError::DimensionMismatch {
                expected: self.q.len(),
                found: q.len(),
            });
        }
        self.q.copy_from_slice(q);
        Ok(())
    }
}

/// A phase-space point together with whatever metric parameters the
/// Hamiltonian reads from it.
pub trait PhasePoint: Clone {
    fn with_dim(dim: usize) -> Self;

    fn ps(&self) -> &PsPoint;

    fn ps_mut(&mut self) -> &mut PsPoint;

    /// Writes the metric in human-readable form.
    fn write_metric(&self, writer: &mut dyn Writer);

    /// Names of the diagnostic entries, in the same order as [`PhasePoint::params`].
    /// There is always one name per entry, whatever the length of `model_names`.
    fn param_names(&self, model_names: &[String]) -> Vec<String>;

    fn params(&self) -> Vec<f64>;
}

/// Point for the unit metric. There is nothing to tune.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitEPoint {
    ps: PsPoint,
}

impl PhasePoint for UnitEPoint {
    fn with_dim(dim: usize) -> Self {
        Self {
            ps: PsPoint::new(dim),
        }
    }

    fn ps(&self) -> &PsPoint {
        &self.ps
    }

    fn ps_mut(&mut self) -> &mut PsPoint {
        &mut self.ps
    }

    fn write_metric(&self, writer: &mut dyn Writer) {
        writer.write_message("No free parameters for unit metric");
    }

    fn param_names(&self, _model_names: &[String]) -> Vec<String> {
        Vec::new()
    }

    fn params(&self) -> Vec<f64> {
        Vec::new()
    }
}

/// Point for a diagonal metric, storing the diagonal of the inverse mass matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagEPoint {
    ps: PsPoint,
    inv_metric: DVector<f64>,
}

impl DiagEPoint {
    pub fn inv_metric(&self) -> &DVector<f64> {
        &self.inv_metric
    }

    /// Replaces the inverse metric diagonal. Every entry must be finite and positive.
    pub fn set_inv_metric(&mut self, inv_metric: &[f64]) -> Result<()> {
        if inv_metric.len() != self.ps.dim() {
            return Err(HmcError::DimensionMismatch {
                expected: self.ps.dim(),
                found: inv_metric.len(),
            });
        }
        if inv_metric.iter().any(|&m| !(m.is_finite() && m > 0.0)) {
            return Err(HmcError::NotPositiveDefinite);
        }
        self.inv_metric.copy_from_slice(inv_metric);
        Ok(())
    }
}

impl PhasePoint for DiagEPoint {
    fn with_dim(dim: usize) -> Self {
        Self {
            ps: PsPoint::new(dim),
            inv_metric: DVector::from_element(dim, 1.0),
        }
    }

    fn ps(&self) -> &PsPoint {
        &self.ps
    }

    fn ps_mut(&mut self) -> &mut PsPoint {
        &mut self.ps
    }

    fn write_metric(&self, writer: &mut dyn Writer) {
        writer.write_message("Diagonal elements of inverse mass matrix:");
        writer.write_values(self.inv_metric.as_slice());
    }

    fn param_names(&self, model_names: &[String]) -> Vec<String> {
        (0..self.inv_metric.len())
            .map(|i| format!("inv_metric[{}]", entry_name(model_names, i)))
            .collect()
    }

    fn params(&self) -> Vec<f64> {
        self.inv_metric.iter().copied().collect()
    }
}

/// Point for a dense metric.
///
/// Keeps the inverse mass matrix `M^{-1}` and its lower Cholesky factor `L`
/// (`M^{-1} = L L^T`), which momentum sampling needs.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseEPoint {
    ps: PsPoint,
    inv_metric: DMatrix<f64>,
    inv_metric_chol: DMatrix<f64>,
}

impl DenseEPoint {
    pub fn inv_metric(&self) -> &DMatrix<f64> {
        &self.inv_metric
    }

    pub fn inv_metric_cholesky(&self) -> &DMatrix<f64> {
        &self.inv_metric_chol
    }

    /// Replaces the inverse metric. The matrix must be square, symmetric and
    /// positive definite.
    pub fn set_inv_metric(&mut self, inv_metric: DMatrix<f64>) -> Result<()> {
        let dim = self.ps.dim();
        if inv_metric.nrows() != dim || inv_metric.ncols() != dim {
            return Err(HmcError::DimensionMismatch {
                expected: dim * dim,
                found: inv_metric.len(),
            });
        }
        if (&inv_metric - inv_metric.transpose()).amax() > 1e-10 * inv_metric.amax().max(1.0) {
            return Err(HmcError::NotPositiveDefinite);
        }
        let chol = Cholesky::new(inv_metric.clone()).ok_or(HmcError::NotPositiveDefinite)?;
        self.inv_metric_chol = chol.l();
        self.inv_metric = inv_metric;
        Ok(())
    }
}

impl PhasePoint for DenseEPoint {
    fn with_dim(dim: usize) -> Self {
        Self {
            ps: PsPoint::new(dim),
            inv_metric: DMatrix::identity(dim, dim),
            inv_metric_chol: DMatrix::identity(dim, dim),
        }
    }

    fn ps(&self) -> &PsPoint {
        &self.ps
    }

    fn ps_mut(&mut self) -> &mut PsPoint {
        &mut self.ps
    }

    fn write_metric(&self, writer: &mut dyn Writer) {
        writer.write_message("Elements of inverse mass matrix:");
        for row in self.inv_metric.row_iter() {
            let values: Vec<f64> = row.iter().copied().collect();
            writer.write_values(&values);
        }
    }

    fn param_names(&self, model_names: &[String]) -> Vec<String> {
        let dim = self.inv_metric.nrows();
        let mut names = Vec::with_capacity(dim * dim);
        for i in 0..dim {
            let row = entry_name(model_names, i);
            for j in 0..dim {
                names.push(format!("inv_metric[{row},{}]", entry_name(model_names, j)));
            }
        }
        names
    }

    fn params(&self) -> Vec<f64> {
        // nalgebra is column-major; diagnostics are reported row by row.
        self.inv_metric.transpose().iter().copied().collect()
    }
}

/// Model name of parameter `i`, or `theta_<i>` when there is none.
fn entry_name(model_names: &[String], i: usize) -> String {
    match model_names.get(i) {
        Some(name) => name.clone(),
        None => format!("theta_{i}"),
    }
}
