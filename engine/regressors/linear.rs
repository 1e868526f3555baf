use super::{Explainability, FitError, Regressor, validate_training_set};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_linalg::{LeastSquaresSvd, Solve};
use serde::{Deserialize, Serialize};

/// Centered copy of the design matrix and target, plus the means removed.
///
/// Fitting on centered data leaves the intercept unpenalized and recoverable
/// as `y_mean - x_mean . beta`.
pub(crate) struct Centered {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub x_mean: Array1<f64>,
    pub y_mean: f64,
}

pub(crate) fn center(x: ArrayView2<f64>, y: ArrayView1<f64>) -> Centered {
    let x_mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let y_mean = y.mean().unwrap_or(0.0);
    Centered {
        x: &x - &x_mean,
        y: y.mapv(|v| v - y_mean),
        x_mean,
        y_mean,
    }
}

/// Ordinary least squares with an intercept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coefficients(&self) -> ArrayView1<'_, f64> {
        self.coefficients.view()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), FitError> {
        validate_training_set(x, y)?;
        let centered = center(x, y);
        // SVD least squares copes with rank-deficient designs (e.g. a one-hot
        // block that always sums to one).
        let beta = centered.x.least_squares(&centered.y)?.solution;
        self.intercept = centered.y_mean - centered.x_mean.dot(&beta);
        self.coefficients = beta;
        Ok(())
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.intercept + row.dot(&self.coefficients)
    }

    fn explain(&self) -> Explainability {
        Explainability::Coefficient(self.coefficients.to_vec())
    }
}

/// Least squares with an L2 penalty `alpha * ||beta||^2` on the slopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ridge {
    alpha: f64,
    coefficients: Array1<f64>,
    intercept: f64,
}

impl Ridge {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            coefficients: Array1::zeros(0),
            intercept: 0.0,
        }
    }

    pub fn coefficients(&self) -> ArrayView1<'_, f64> {
        self.coefficients.view()
    }
}

impl Regressor for Ridge {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), FitError> {
        validate_training_set(x, y)?;
        let centered = center(x, y);
        let mut gram = centered.x.t().dot(&centered.x);
        gram.diag_mut().mapv_inplace(|d| d + self.alpha);
        let rhs = centered.x.t().dot(&centered.y);
        let beta = gram.solve_into(rhs)?;
        self.intercept = centered.y_mean - centered.x_mean.dot(&beta);
        self.coefficients = beta;
        Ok(())
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.intercept + row.dot(&self.coefficients)
    }

    fn explain(&self) -> Explainability {
        Explainability::Coefficient(self.coefficients.to_vec())
    }
}
