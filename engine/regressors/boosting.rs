use super::tree::{RegressionTree, TreeParams};
use super::{Explainability, FitError, Regressor, normalize, validate_training_set};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Least-squares gradient boosting: each stage fits a shallow tree to the
/// current residuals and adds a shrunken copy of it to the ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    n_stages: usize,
    learning_rate: f64,
    tree_params: TreeParams,
    init: f64,
    stages: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn new(n_stages: usize, max_depth: usize, learning_rate: f64, seed: u64) -> Self {
        Self {
            n_stages,
            learning_rate,
            tree_params: TreeParams::default().with_max_depth(max_depth).with_seed(seed),
            init: 0.0,
            stages: Vec::new(),
        }
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl Regressor for GradientBoosting {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), FitError> {
        validate_training_set(x, y)?;
        self.init = y.mean().unwrap_or(0.0);
        self.stages = Vec::with_capacity(self.n_stages);

        let mut current = Array1::from_elem(y.len(), self.init);
        for stage in 0..self.n_stages {
            let residuals = &y - &current;
            let mut tree = RegressionTree::new(self.tree_params.with_seed(
                self.tree_params.seed.wrapping_add(stage as u64),
            ));
            tree.fit(x, residuals.view())?;
            current.scaled_add(self.learning_rate, &tree.predict(x));
            self.stages.push(tree);
        }
        log::debug!(
            "Gradient boosting finished {} stages, training MSE {:.3}",
            self.stages.len(),
            (&y - &current).mapv(|r| r * r).mean().unwrap_or(0.0)
        );
        Ok(())
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.init
            + self.learning_rate * self.stages.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    fn explain(&self) -> Explainability {
        Explainability::Importance(stage_importances(&self.stages))
    }
}

/// AdaBoost.R2 with linear loss.
///
/// Every round draws a weighted bootstrap sample, fits a shallow tree, and
/// re-weights rows by how badly that tree did on them. Prediction is the
/// weighted median of the per-round predictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoost {
    n_rounds: usize,
    learning_rate: f64,
    tree_params: TreeParams,
    seed: u64,
    rounds: Vec<(RegressionTree, f64)>,
}

impl AdaBoost {
    pub fn new(n_rounds: usize, max_depth: usize, learning_rate: f64, seed: u64) -> Self {
        Self {
            n_rounds,
            learning_rate,
            tree_params: TreeParams::default().with_max_depth(max_depth),
            seed,
            rounds: Vec::new(),
        }
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }
}

impl Regressor for AdaBoost {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), FitError> {
        validate_training_set(x, y)?;
        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut weights = Array1::from_elem(n, 1.0 / n as f64);
        self.rounds = Vec::with_capacity(self.n_rounds);

        for round in 0..self.n_rounds {
            let sampler = WeightedIndex::new(weights.iter())
                .map_err(|e| FitError::DegenerateWeights(e.to_string()))?;
            let indices: Vec<usize> = (0..n).map(|_| sampler.sample(&mut rng)).collect();

            let mut tree = RegressionTree::new(
                self.tree_params
                    .with_seed(self.seed.wrapping_add(round as u64)),
            );
            tree.fit_indices(x, y, indices)?;

            let errors = (&tree.predict(x) - &y).mapv(f64::abs);
            let max_error = errors.fold(0.0_f64, |m, &e| m.max(e));
            if max_error <= 0.0 {
                // A perfect fit ends boosting with this tree carrying full weight.
                self.rounds.push((tree, 1.0));
                break;
            }
            let loss = errors / max_error;
            let round_error = weights.dot(&loss);

            if round_error <= 0.0 {
                self.rounds.push((tree, 1.0));
                break;
            }
            if round_error >= 0.5 {
                if self.rounds.is_empty() {
                    self.rounds.push((tree, 1.0));
                }
                log::debug!("AdaBoost stopped at round {round}: weighted error {round_error:.3}");
                break;
            }

            let beta = round_error / (1.0 - round_error);
            let estimator_weight = self.learning_rate * (1.0 / beta).ln();
            if round + 1 < self.n_rounds {
                for (w, l) in weights.iter_mut().zip(loss.iter()) {
                    *w *= beta.powf((1.0 - l) * self.learning_rate);
                }
                let total = weights.sum();
                if !(total.is_finite() && total > 0.0) {
                    self.rounds.push((tree, estimator_weight));
                    break;
                }
                weights /= total;
            }
            self.rounds.push((tree, estimator_weight));
        }
        Ok(())
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut votes: Vec<(f64, f64)> = self
            .rounds
            .iter()
            .map(|(tree, weight)| (tree.predict_row(row), *weight))
            .collect();
        weighted_median(&mut votes)
    }

    fn explain(&self) -> Explainability {
        let width = self
            .rounds
            .first()
            .map_or(0, |(t, _)| t.raw_importances().len());
        let mut sum = Array1::zeros(width);
        let total_weight: f64 = self.rounds.iter().map(|(_, w)| w).sum();
        for (tree, weight) in &self.rounds {
            let raw = tree.raw_importances();
            let raw_total = raw.sum();
            if raw_total > 0.0 && total_weight > 0.0 {
                sum.scaled_add(weight / total_weight, &(&raw / raw_total));
            }
        }
        Explainability::Importance(normalize(sum))
    }
}

/// Smallest value whose cumulative weight reaches half of the total weight.
fn weighted_median(votes: &mut [(f64, f64)]) -> f64 {
    if votes.is_empty() {
        return 0.0;
    }
    votes.sort_by(|a, b| a.0.total_cmp(&b.0));
    let total: f64 = votes.iter().map(|(_, w)| w).sum();
    let mut cumulative = 0.0;
    for (value, weight) in votes.iter() {
        cumulative += weight;
        if cumulative >= 0.5 * total {
            return *value;
        }
    }
    votes[votes.len() - 1].0
}

fn stage_importances(trees: &[RegressionTree]) -> Vec<f64> {
    let width = trees.first().map_or(0, |t| t.raw_importances().len());
    let mut sum = Array1::zeros(width);
    for tree in trees {
        let raw = tree.raw_importances();
        let total = raw.sum();
        if total > 0.0 {
            sum += &(&raw / total);
        }
    }
    normalize(sum)
}
