//! Native regressor implementations.
//!
//! Every family implements [`Regressor`]: a blocking `fit` on a dense design
//! matrix, a single-row `predict_row`, and an [`Explainability`] summary that
//! is fixed by the family (trees report importances, linear models report
//! coefficients, distance and kernel models report nothing).

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod boosting;
pub mod coordinate;
pub mod forest;
pub mod knn;
pub mod linear;
pub mod svr;
pub mod tree;

pub use boosting::{AdaBoost, GradientBoosting};
pub use coordinate::ElasticNet;
pub use forest::Forest;
pub use knn::KNearestNeighbors;
pub use linear::{LinearRegression, Ridge};
pub use svr::Svr;
pub use tree::{RegressionTree, Splitter, TreeParams};

#[derive(Error, Debug)]
pub enum FitError {
    #[error("Cannot fit a model on an empty training set.")]
    EmptyTrainingSet,
    #[error("Design matrix has {rows} rows but the target vector has {targets} entries.")]
    DimensionMismatch { rows: usize, targets: usize },
    #[error("Training data contains NaN or infinite values.")]
    NonFiniteInput,
    #[error("Linear algebra backend failed: {0}")]
    LinalgError(#[from] ndarray_linalg::error::LinalgError),
    #[error("Sample weights became degenerate during boosting: {0}")]
    DegenerateWeights(String),
}

/// How a fitted model can be explained, decided by its family when it is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Explainability {
    /// Normalized split importances, one per feature, summing to 1 (or all zero).
    Importance(Vec<f64>),
    /// Signed linear weights, one per feature.
    Coefficient(Vec<f64>),
    /// No per-feature summary exists.
    Opaque,
}

impl Explainability {
    pub fn kind(&self) -> ExplainabilityKind {
        match self {
            Explainability::Importance(_) => ExplainabilityKind::Importance,
            Explainability::Coefficient(_) => ExplainabilityKind::Coefficient,
            Explainability::Opaque => ExplainabilityKind::Opaque,
        }
    }

    pub fn values(&self) -> Option<&[f64]> {
        match self {
            Explainability::Importance(v) | Explainability::Coefficient(v) => Some(v),
            Explainability::Opaque => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplainabilityKind {
    Importance,
    Coefficient,
    Opaque,
}

impl fmt::Display for ExplainabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExplainabilityKind::Importance => "importance-bearing",
            ExplainabilityKind::Coefficient => "coefficient-bearing",
            ExplainabilityKind::Opaque => "opaque",
        })
    }
}

pub trait Regressor: Send + Sync + fmt::Debug {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), FitError>;

    fn predict_row(&self, row: ArrayView1<f64>) -> f64;

    fn predict(&self, x: ArrayView2<f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    fn explain(&self) -> Explainability;
}

/// Shared precondition check run at the top of every `fit`.
pub(crate) fn validate_training_set(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
) -> Result<(), FitError> {
    if x.nrows() == 0 {
        return Err(FitError::EmptyTrainingSet);
    }
    if x.nrows() != y.len() {
        return Err(FitError::DimensionMismatch {
            rows: x.nrows(),
            targets: y.len(),
        });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteInput);
    }
    Ok(())
}

/// Scales a non-negative vector to sum to one; an all-zero vector stays zero.
pub(crate) fn normalize(values: Array1<f64>) -> Vec<f64> {
    let total = values.sum();
    if total > 0.0 {
        (values / total).to_vec()
    } else {
        values.to_vec()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use ndarray::{Array1, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// `y = 3 + 2*x0 - x1 + noise` on uniform inputs.
    pub fn linear_problem(n: usize, noise: f64, seed: u64) -> (Array2<f64>, Array1<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let x = Array2::from_shape_fn((n, 3), |_| rng.gen_range(-5.0..5.0));
        let y = x
            .rows()
            .into_iter()
            .map(|r| 3.0 + 2.0 * r[0] - r[1] + noise * rng.gen_range(-1.0..1.0))
            .collect();
        (x, y)
    }

    /// Step function of the first feature only.
    pub fn step_problem(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let x = Array2::from_shape_fn((n, 3), |_| rng.gen_range(0.0..10.0));
        let y = x
            .rows()
            .into_iter()
            .map(|r| if r[0] < 5.0 { 100.0 } else { 500.0 })
            .collect();
        (x, y)
    }

    pub fn r2(y: &Array1<f64>, pred: &Array1<f64>) -> f64 {
        let mean = y.mean().unwrap_or(0.0);
        let ss_res: f64 = y.iter().zip(pred).map(|(a, b)| (a - b).powi(2)).sum();
        let ss_tot: f64 = y.iter().map(|a| (a - mean).powi(2)).sum();
        1.0 - ss_res / ss_tot
    }
}
