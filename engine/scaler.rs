use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Per-column standardization to zero mean and unit variance.
///
/// Fitted once on the training matrix and replayed unchanged at prediction
/// time; columns without variance are centered but left unscaled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: ArrayView2<f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let mut scale = Array1::zeros(x.ncols());
        for (j, column) in x.axis_iter(Axis(1)).enumerate() {
            let var = column.iter().map(|v| (v - mean[j]).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            scale[j] = if std > f64::EPSILON { std } else { 1.0 };
        }
        Self { mean, scale }
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> Array2<f64> {
        (&x - &self.mean) / &self.scale
    }

    pub fn transform_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        (&row - &self.mean) / &self.scale
    }

    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    pub fn scale(&self) -> ArrayView1<'_, f64> {
        self.scale.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn transformed_columns_are_standardized() {
        let x = array![[1.0, 10.0, 5.0], [2.0, 20.0, 5.0], [3.0, 30.0, 5.0], [4.0, 40.0, 5.0]];
        let scaler = StandardScaler::fit(x.view());
        let z = scaler.transform(x.view());

        for j in 0..2 {
            let col = z.column(j);
            assert_abs_diff_eq!(col.mean().unwrap(), 0.0, epsilon = 1e-12);
            let var = col.mapv(|v| v * v).mean().unwrap();
            assert_abs_diff_eq!(var, 1.0, epsilon = 1e-12);
        }
        // Constant column: centered, not blown up.
        assert!(z.column(2).iter().all(|&v| v == 0.0));
        assert_eq!(scaler.scale()[2], 1.0);
    }

    #[test]
    fn row_transform_matches_matrix_transform() {
        let x = array![[1.0, 3.0], [2.0, 7.0], [6.0, 2.0]];
        let scaler = StandardScaler::fit(x.view());
        let z = scaler.transform(x.view());
        let row = scaler.transform_row(x.row(1));
        for j in 0..2 {
            assert_abs_diff_eq!(row[j], z[[1, j]], epsilon = 1e-12);
        }
    }
}
