//! CART regression trees with squared-error splits.
//!
//! Two split strategies share one builder: `Best` scans every threshold of
//! every feature, `Random` draws a single uniform threshold per feature and
//! keeps the best of those draws (the extremely-randomized variant). Nodes live
//! in a flat arena so trees are cheap to clone and ship across threads.

use super::{Explainability, FitError, Regressor, normalize, validate_training_set};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Splitter {
    Best,
    Random,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub splitter: Splitter,
    pub seed: u64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            splitter: Splitter::Best,
            seed: 0,
        }
    }
}

impl TreeParams {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_splitter(mut self, splitter: Splitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Reduction in the node's sum of squared errors.
    gain: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    params: TreeParams,
    nodes: Vec<TreeNode>,
    /// Un-normalized squared-error reduction attributed to each feature.
    raw_importances: Array1<f64>,
}

impl RegressionTree {
    pub fn new(params: TreeParams) -> Self {
        Self {
            params,
            nodes: Vec::new(),
            raw_importances: Array1::zeros(0),
        }
    }

    /// Fits on the given row indices of `x`/`y`. Indices may repeat, which is
    /// how bootstrap and weighted resamples are expressed.
    pub fn fit_indices(
        &mut self,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        indices: Vec<usize>,
    ) -> Result<(), FitError> {
        validate_training_set(x, y)?;
        if indices.is_empty() {
            return Err(FitError::EmptyTrainingSet);
        }
        let mut builder = Builder {
            x,
            y,
            params: self.params,
            rng: StdRng::seed_from_u64(self.params.seed),
            nodes: Vec::new(),
            importances: Array1::zeros(x.ncols()),
        };
        builder.grow(indices, 0);
        self.nodes = builder.nodes;
        self.raw_importances = builder.importances;
        Ok(())
    }

    pub fn raw_importances(&self) -> ArrayView1<'_, f64> {
        self.raw_importances.view()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], at: usize) -> usize {
            match nodes[at] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }
}

impl Regressor for RegressionTree {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), FitError> {
        self.fit_indices(x, y, (0..x.nrows()).collect())
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes.get(at) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    fn explain(&self) -> Explainability {
        Explainability::Importance(normalize(self.raw_importances.clone()))
    }
}

struct Builder<'x, 'y> {
    x: ArrayView2<'x, f64>,
    y: ArrayView1<'y, f64>,
    params: TreeParams,
    rng: StdRng,
    nodes: Vec<TreeNode>,
    importances: Array1<f64>,
}

impl Builder<'_, '_> {
    /// Grows the subtree for `indices` and returns its arena slot.
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let slot = self.nodes.len();
        let n = indices.len();
        let sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let mean = sum / n as f64;
        self.nodes.push(TreeNode::Leaf { value: mean });

        let at_depth_limit = self.params.max_depth.is_some_and(|d| depth >= d);
        let pure = indices.iter().all(|&i| (self.y[i] - mean).abs() < 1e-12);
        if n < self.params.min_samples_split || at_depth_limit || pure {
            return slot;
        }

        let candidate = match self.params.splitter {
            Splitter::Best => self.best_split(&indices, sum),
            Splitter::Random => self.random_split(&indices, sum),
        };
        let Some(split) = candidate else {
            return slot;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[[i, split.feature]] <= split.threshold);
        if left_idx.is_empty() || right_idx.is_empty() {
            return slot;
        }

        self.importances[split.feature] += split.gain.max(0.0);
        let left = self.grow(left_idx, depth + 1);
        let right = self.grow(right_idx, depth + 1);
        self.nodes[slot] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        slot
    }

    fn best_split(&self, indices: &[usize], total: f64) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent_score = total * total / n as f64;
        let mut best: Option<SplitCandidate> = None;
        let mut order = indices.to_vec();

        for feature in 0..self.x.ncols() {
            order.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));
            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += self.y[order[k]];
                let n_left = k + 1;
                let n_right = n - n_left;
                let here = self.x[[order[k], feature]];
                let next = self.x[[order[k + 1], feature]];
                if next <= here || n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / n_left as f64
                    + right_sum * right_sum / n_right as f64
                    - parent_score;
                if best.as_ref().is_none_or(|b| gain > b.gain) {
                    let mut threshold = 0.5 * (here + next);
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }
        best
    }

    fn random_split(&mut self, indices: &[usize], total: f64) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent_score = total * total / n as f64;
        let mut best: Option<SplitCandidate> = None;

        for feature in 0..self.x.ncols() {
            let (lo, hi) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                let v = self.x[[i, feature]];
                (lo.min(v), hi.max(v))
            });
            if hi <= lo {
                continue;
            }
            let threshold = self.rng.gen_range(lo..hi);
            let (mut n_left, mut left_sum) = (0usize, 0.0);
            for &i in indices {
                if self.x[[i, feature]] <= threshold {
                    n_left += 1;
                    left_sum += self.y[i];
                }
            }
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }
            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64
                - parent_score;
            if best.as_ref().is_none_or(|b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    gain,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{r2, step_problem};
    use super::*;

    #[test]
    fn recovers_a_step_function() {
        let (x, y) = step_problem(200, 1);
        let mut tree = RegressionTree::new(TreeParams::default().with_max_depth(3));
        tree.fit(x.view(), y.view()).unwrap();

        let pred = tree.predict(x.view());
        assert!(r2(&y, &pred) > 0.999);
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn importance_concentrates_on_informative_feature() {
        let (x, y) = step_problem(200, 2);
        let mut tree = RegressionTree::new(TreeParams::default().with_max_depth(5));
        tree.fit(x.view(), y.view()).unwrap();

        match tree.explain() {
            Explainability::Importance(imp) => {
                assert_eq!(imp.len(), 3);
                assert!(imp[0] > 0.99, "importances: {imp:?}");
                assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            }
            other => panic!("Expected importances, got {other:?}"),
        }
    }

    #[test]
    fn depth_limit_is_honoured() {
        let (x, y) = step_problem(300, 3);
        let noisy = &y + &x.column(1);
        let mut tree = RegressionTree::new(TreeParams::default().with_max_depth(2));
        tree.fit(x.view(), noisy.view()).unwrap();
        assert!(tree.depth() <= 2);
        assert!(tree.node_count() <= 7);
    }

    #[test]
    fn random_splitter_is_reproducible() {
        let (x, y) = step_problem(150, 4);
        let params = TreeParams::default()
            .with_splitter(Splitter::Random)
            .with_seed(9);
        let mut a = RegressionTree::new(params);
        let mut b = RegressionTree::new(params);
        a.fit(x.view(), y.view()).unwrap();
        b.fit(x.view(), y.view()).unwrap();
        assert_eq!(a.predict(x.view()), b.predict(x.view()));
    }

    #[test]
    fn constant_target_is_a_single_leaf() {
        let (x, _) = step_problem(20, 5);
        let y = Array1::from_elem(20, 7.5);
        let mut tree = RegressionTree::new(TreeParams::default());
        tree.fit(x.view(), y.view()).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_row(x.row(0)), 7.5);
    }
}
