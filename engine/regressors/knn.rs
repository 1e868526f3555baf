use super::{Explainability, FitError, Regressor, validate_training_set};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Uniform-weight k-nearest-neighbours regression under Euclidean distance.
///
/// Distances are taken on raw feature values, so callers are expected to
/// standardize features first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNearestNeighbors {
    k: usize,
    x: Array2<f64>,
    y: Array1<f64>,
}

impl KNearestNeighbors {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            x: Array2::zeros((0, 0)),
            y: Array1::zeros(0),
        }
    }
}

impl Regressor for KNearestNeighbors {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), FitError> {
        validate_training_set(x, y)?;
        self.x = x.to_owned();
        self.y = y.to_owned();
        Ok(())
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let n = self.y.len();
        if n == 0 {
            return 0.0;
        }
        let mut distances: Vec<(f64, usize)> = self
            .x
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, train)| {
                let d: f64 = train.iter().zip(row.iter()).map(|(a, b)| (a - b).powi(2)).sum();
                (d, i)
            })
            .collect();
        let k = self.k.min(n);
        // Ties broken by row order so repeated calls agree.
        let by_distance = |a: &(f64, usize), b: &(f64, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
        if k < n {
            distances.select_nth_unstable_by(k - 1, by_distance);
        }
        distances[..k].iter().map(|&(_, i)| self.y[i]).sum::<f64>() / k as f64
    }

    fn explain(&self) -> Explainability {
        Explainability::Opaque
    }
}
