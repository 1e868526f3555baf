use super::{Explainability, FitError, Regressor, validate_training_set};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Epsilon-insensitive support vector regression with an RBF kernel.
///
/// The dual is solved by randomized coordinate descent. The bias is folded
/// into the kernel (`K + 1`), which removes the equality constraint and lets
/// each dual coefficient be updated in closed form:
///
/// ```text
/// beta_i <- clip(soft(y_i - sum_{j != i} K'_ij beta_j, epsilon) / K'_ii, -C, C)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Svr {
    c: f64,
    epsilon: f64,
    /// `None` selects `1 / (n_features * Var(X))` at fit time.
    gamma: Option<f64>,
    max_epochs: usize,
    tol: f64,
    seed: u64,
    fitted_gamma: f64,
    support: Array2<f64>,
    dual: Array1<f64>,
}

impl Svr {
    pub fn new(c: f64, epsilon: f64, seed: u64) -> Self {
        Self {
            c,
            epsilon,
            gamma: None,
            max_epochs: 100,
            tol: 1e-3,
            seed,
            fitted_gamma: 0.0,
            support: Array2::zeros((0, 0)),
            dual: Array1::zeros(0),
        }
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    pub fn support_count(&self) -> usize {
        self.dual.len()
    }

    fn kernel(gamma: f64, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        let d: f64 = a.iter().zip(b.iter()).map(|(p, q)| (p - q).powi(2)).sum();
        (-gamma * d).exp() + 1.0
    }
}

fn scale_gamma(x: ArrayView2<f64>) -> f64 {
    let var = x.var(0.0);
    if var > 0.0 {
        1.0 / (x.ncols() as f64 * var)
    } else {
        1.0
    }
}

impl Regressor for Svr {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), FitError> {
        validate_training_set(x, y)?;
        let n = x.nrows();
        let gamma = self.gamma.unwrap_or_else(|| scale_gamma(x));
        // RBF self-similarity is 1, plus the folded-in bias term.
        let diag = 2.0;

        let mut beta = Array1::<f64>::zeros(n);
        let mut fitted = Array1::<f64>::zeros(n);
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut epochs = 0;

        for _ in 0..self.max_epochs {
            epochs += 1;
            order.shuffle(&mut rng);
            let mut max_change: f64 = 0.0;
            for &i in &order {
                let others = fitted[i] - diag * beta[i];
                let z = y[i] - others;
                let shrunk = z.signum() * (z.abs() - self.epsilon).max(0.0);
                let new = (shrunk / diag).clamp(-self.c, self.c);
                let delta = new - beta[i];
                if delta.abs() <= 1e-12 {
                    continue;
                }
                let xi = x.row(i);
                for (j, f) in fitted.iter_mut().enumerate() {
                    *f += delta * Self::kernel(gamma, xi, x.row(j));
                }
                beta[i] = new;
                max_change = max_change.max(delta.abs());
            }
            if max_change < self.tol {
                break;
            }
        }

        let support: Vec<usize> = (0..n).filter(|&i| beta[i] != 0.0).collect();
        log::debug!(
            "SVR converged after {epochs} epochs with {} support vectors (gamma {gamma:.4})",
            support.len()
        );
        self.fitted_gamma = gamma;
        self.support = x.select(Axis(0), &support);
        self.dual = beta.select(Axis(0), &support);
        Ok(())
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.support
            .rows()
            .into_iter()
            .zip(self.dual.iter())
            .map(|(sv, b)| b * Self::kernel(self.fitted_gamma, sv, row))
            .sum()
    }

    fn explain(&self) -> Explainability {
        Explainability::Opaque
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn sine_problem(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| -3.0 + 6.0 * i as f64 / (n - 1) as f64);
        let y = x.column(0).mapv(f64::sin);
        (x, y)
    }

    #[test]
    fn fits_a_smooth_curve_within_the_tube() {
        let (x, y) = sine_problem(60);
        let mut svr = Svr::new(10.0, 0.05, 42).with_gamma(1.0);
        svr.fit(x.view(), y.view()).unwrap();

        let pred = svr.predict(x.view());
        let max_err = (&pred - &y).mapv(f64::abs).fold(0.0_f64, |m, &e| m.max(e));
        assert!(max_err < 0.2, "max error {max_err}");
        assert!(svr.support_count() > 0);
    }

    #[test]
    fn dual_coefficients_respect_the_box() {
        let (x, y) = sine_problem(40);
        let y = y.mapv(|v| v * 1000.0);
        let mut svr = Svr::new(1.0, 0.1, 7);
        svr.fit(x.view(), y.view()).unwrap();
        assert!(svr.dual.iter().all(|b| b.abs() <= 1.0 + 1e-12));
    }

    #[test]
    fn scale_gamma_uses_feature_variance() {
        let x = ndarray::array![[0.0, 2.0], [2.0, 0.0]];
        // Var over all entries is 1, two features.
        assert_eq!(scale_gamma(x.view()), 0.5);
    }
}
