use super::tree::{RegressionTree, Splitter, TreeParams};
use super::{Explainability, FitError, Regressor, normalize, validate_training_set};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Averaging ensemble of regression trees.
///
/// Covers both bagged CART forests (bootstrap rows, best splits) and
/// extremely randomized trees (all rows, random thresholds). Trees are fitted
/// in parallel; each tree derives its own seed from the forest seed, so the
/// result does not depend on scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forest {
    n_trees: usize,
    tree_params: TreeParams,
    bootstrap: bool,
    seed: u64,
    trees: Vec<RegressionTree>,
}

impl Forest {
    pub fn random_forest(n_trees: usize, max_depth: Option<usize>, seed: u64) -> Self {
        let mut tree_params = TreeParams::default();
        tree_params.max_depth = max_depth;
        Self {
            n_trees,
            tree_params,
            bootstrap: true,
            seed,
            trees: Vec::new(),
        }
    }

    pub fn extra_trees(n_trees: usize, max_depth: Option<usize>, seed: u64) -> Self {
        let mut tree_params = TreeParams::default().with_splitter(Splitter::Random);
        tree_params.max_depth = max_depth;
        Self {
            n_trees,
            tree_params,
            bootstrap: false,
            seed,
            trees: Vec::new(),
        }
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

impl Regressor for Forest {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), FitError> {
        validate_training_set(x, y)?;
        let n = x.nrows();
        let params = self.tree_params;
        let (seed, bootstrap) = (self.seed, self.bootstrap);

        log::debug!(
            "Fitting {} trees on {n} rows (bootstrap: {bootstrap}, splitter: {:?})",
            self.n_trees,
            params.splitter
        );

        self.trees = (0..self.n_trees)
            .into_par_iter()
            .map(|t| {
                let tree_seed = seed.wrapping_add(t as u64);
                let mut rng = StdRng::seed_from_u64(tree_seed);
                let indices: Vec<usize> = if bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                let mut tree = RegressionTree::new(params.with_seed(tree_seed));
                tree.fit_indices(x, y, indices)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>, FitError>>()?;
        Ok(())
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        total / self.trees.len() as f64
    }

    fn explain(&self) -> Explainability {
        let width = self.trees.first().map_or(0, |t| t.raw_importances().len());
        let mut sum = Array1::zeros(width);
        for tree in &self.trees {
            let raw = tree.raw_importances();
            let total = raw.sum();
            if total > 0.0 {
                sum += &(&raw / total);
            }
        }
        Explainability::Importance(normalize(sum))
    }
}
