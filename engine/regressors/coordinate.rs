use super::linear::center;
use super::{Explainability, FitError, Regressor, validate_training_set};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Elastic-net regression fitted by cyclic coordinate descent.
///
/// Minimizes
///
/// ```text
/// 1/(2n) ||y - X b - c||^2 + alpha * l1_ratio * ||b||_1 + alpha * (1 - l1_ratio) / 2 * ||b||^2
/// ```
///
/// `l1_ratio = 1` is the lasso.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticNet {
    alpha: f64,
    l1_ratio: f64,
    max_iter: usize,
    tol: f64,
    coefficients: Array1<f64>,
    intercept: f64,
    iterations: usize,
}

impl ElasticNet {
    pub fn new(alpha: f64, l1_ratio: f64) -> Self {
        Self {
            alpha,
            l1_ratio: l1_ratio.clamp(0.0, 1.0),
            max_iter: 1000,
            tol: 1e-4,
            coefficients: Array1::zeros(0),
            intercept: 0.0,
            iterations: 0,
        }
    }

    pub fn lasso(alpha: f64) -> Self {
        Self::new(alpha, 1.0)
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn coefficients(&self) -> ArrayView1<'_, f64> {
        self.coefficients.view()
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    value.signum() * (value.abs() - threshold).max(0.0)
}

impl Regressor for ElasticNet {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), FitError> {
        validate_training_set(x, y)?;
        let n = x.nrows() as f64;
        let centered = center(x, y);
        let xc = &centered.x;
        let l1 = self.alpha * self.l1_ratio * n;
        let l2 = self.alpha * (1.0 - self.l1_ratio) * n;
        let col_norms: Array1<f64> = xc.map_axis(Axis(0), |c| c.dot(&c));

        let mut beta = Array1::<f64>::zeros(xc.ncols());
        let mut residual = centered.y.clone();
        self.iterations = self.max_iter;

        for iter in 0..self.max_iter {
            let mut max_step: f64 = 0.0;
            let mut max_coef: f64 = 0.0;
            for j in 0..xc.ncols() {
                if col_norms[j] == 0.0 {
                    continue;
                }
                let column = xc.column(j);
                let old = beta[j];
                if old != 0.0 {
                    residual.scaled_add(old, &column);
                }
                let rho = column.dot(&residual);
                let new = soft_threshold(rho, l1) / (col_norms[j] + l2);
                if new != 0.0 {
                    residual.scaled_add(-new, &column);
                }
                beta[j] = new;
                max_step = max_step.max((new - old).abs());
                max_coef = max_coef.max(new.abs());
            }
            if max_coef == 0.0 || max_step / max_coef < self.tol {
                self.iterations = iter + 1;
                break;
            }
        }
        if self.iterations == self.max_iter {
            log::warn!(
                "Coordinate descent hit the iteration limit ({}) before converging",
                self.max_iter
            );
        }

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

#[cfg(test)]
mod tests {
    use super::super::test_support::linear_problem;
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn lasso_zeroes_the_irrelevant_feature() {
        let (x, y) = linear_problem(200, 0.1, 41);
        let mut model = ElasticNet::lasso(0.5);
        model.fit(x.view(), y.view()).unwrap();

        assert_eq!(model.coefficients()[2], 0.0);
        assert!(model.coefficients()[0] > 1.5);
        assert!(model.coefficients()[1] < -0.5);
        assert!(model.iterations() < 1000);
    }

    #[test]
    fn tiny_penalty_matches_least_squares() {
        let (x, y) = linear_problem(100, 0.0, 42);
        let mut model = ElasticNet::new(1e-8, 0.5).with_max_iter(5000);
        model.fit(x.view(), y.view()).unwrap();
        assert_abs_diff_eq!(model.coefficients()[0], 2.0, epsilon = 1e-3);
        assert_abs_diff_eq!(model.coefficients()[1], -1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(model.predict_row(x.row(0)), y[0], epsilon = 1e-2);
    }

    #[test]
    fn soft_threshold_shrinks_and_clips() {
        assert_eq!(soft_threshold(5.0, 2.0), 3.0);
        assert_eq!(soft_threshold(-5.0, 2.0), -3.0);
        assert_eq!(soft_threshold(1.0, 2.0), 0.0);
    }
}
