//! Model selectors and the fitted-model bundle handed out by the engine.

use crate::encode::FeatureSchema;
use crate::regressors::{
    AdaBoost, ElasticNet, Explainability, ExplainabilityKind, Forest, GradientBoosting,
    KNearestNeighbors, LinearRegression, RegressionTree, Regressor, Ridge, Svr, TreeParams,
};
use crate::scaler::StandardScaler;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The eleven model families the engine can train. The display strings are
/// the external selector names and are used verbatim as cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelKind {
    RandomForest,
    GradientBoosting,
    AdaBoost,
    ExtraTrees,
    DecisionTree,
    LinearRegression,
    RidgeRegression,
    LassoRegression,
    ElasticNet,
    KNearestNeighbors,
    SupportVectorMachine,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown model type '{0}'. Run `nexus models` for the list of selectors.")]
pub struct UnknownModelKind(pub String);

impl ModelKind {
    pub const ALL: [ModelKind; 11] = [
        ModelKind::RandomForest,
        ModelKind::GradientBoosting,
        ModelKind::AdaBoost,
        ModelKind::ExtraTrees,
        ModelKind::DecisionTree,
        ModelKind::LinearRegression,
        ModelKind::RidgeRegression,
        ModelKind::LassoRegression,
        ModelKind::ElasticNet,
        ModelKind::KNearestNeighbors,
        ModelKind::SupportVectorMachine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelKind::RandomForest => "Random Forest",
            ModelKind::GradientBoosting => "Gradient Boosting",
            ModelKind::AdaBoost => "AdaBoost",
            ModelKind::ExtraTrees => "Extra Trees",
            ModelKind::DecisionTree => "Decision Tree",
            ModelKind::LinearRegression => "Linear Regression",
            ModelKind::RidgeRegression => "Ridge Regression",
            ModelKind::LassoRegression => "Lasso Regression",
            ModelKind::ElasticNet => "ElasticNet",
            ModelKind::KNearestNeighbors => "K-Nearest Neighbors",
            ModelKind::SupportVectorMachine => "Support Vector Machine (SVR)",
        }
    }

    /// Distance and kernel models are fitted on standardized features.
    pub fn requires_scaling(self) -> bool {
        matches!(
            self,
            ModelKind::KNearestNeighbors | ModelKind::SupportVectorMachine
        )
    }

    pub fn explainability_kind(self) -> ExplainabilityKind {
        match self {
            ModelKind::RandomForest
            | ModelKind::GradientBoosting
            | ModelKind::AdaBoost
            | ModelKind::ExtraTrees
            | ModelKind::DecisionTree => ExplainabilityKind::Importance,
            ModelKind::LinearRegression
            | ModelKind::RidgeRegression
            | ModelKind::LassoRegression
            | ModelKind::ElasticNet => ExplainabilityKind::Coefficient,
            ModelKind::KNearestNeighbors | ModelKind::SupportVectorMachine => {
                ExplainabilityKind::Opaque
            }
        }
    }

    /// How to read this family's drivers, when there is a stock reading.
    pub fn analyst_note(self) -> Option<&'static str> {
        match self {
            ModelKind::LinearRegression | ModelKind::RidgeRegression => Some(
                "Linear models show Direction: positive weights increase cost, negative weights decrease cost.",
            ),
            ModelKind::RandomForest
            | ModelKind::GradientBoosting
            | ModelKind::AdaBoost
            | ModelKind::ExtraTrees
            | ModelKind::DecisionTree => Some(
                "Tree models show Importance: which variable drove the most splits (direction is not shown).",
            ),
            _ => None,
        }
    }

    /// An unfitted regressor configured with this family's hyperparameters.
    pub fn build(self, seed: u64) -> Box<dyn Regressor> {
        match self {
            ModelKind::RandomForest => Box::new(Forest::random_forest(50, Some(10), seed)),
            ModelKind::GradientBoosting => Box::new(GradientBoosting::new(100, 3, 0.1, seed)),
            ModelKind::AdaBoost => Box::new(AdaBoost::new(50, 3, 1.0, seed)),
            ModelKind::ExtraTrees => Box::new(Forest::extra_trees(100, None, seed)),
            ModelKind::DecisionTree => Box::new(RegressionTree::new(
                TreeParams::default().with_max_depth(10).with_seed(seed),
            )),
            ModelKind::LinearRegression => Box::new(LinearRegression::new()),
            ModelKind::RidgeRegression => Box::new(Ridge::new(1.0)),
            ModelKind::LassoRegression => Box::new(ElasticNet::lasso(1.0)),
            ModelKind::ElasticNet => Box::new(ElasticNet::new(1.0, 0.5)),
            ModelKind::KNearestNeighbors => Box::new(KNearestNeighbors::new(5)),
            ModelKind::SupportVectorMachine => Box::new(Svr::new(1.0, 0.1, seed)),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = UnknownModelKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == "Support Vector Machine" {
            return Ok(ModelKind::SupportVectorMachine);
        }
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.name() == trimmed)
            .ok_or_else(|| UnknownModelKind(s.to_string()))
    }
}

/// A trained regressor together with everything needed to score a subject:
/// the schema it was trained on and, for scaled families, the scaler fitted on
/// the same training matrix.
#[derive(Debug)]
pub struct FittedModel {
    kind: ModelKind,
    regressor: Box<dyn Regressor>,
    scaler: Option<StandardScaler>,
    schema: FeatureSchema,
    explainability: Explainability,
    training_rows: usize,
}

impl FittedModel {
    pub(crate) fn new(
        kind: ModelKind,
        regressor: Box<dyn Regressor>,
        scaler: Option<StandardScaler>,
        schema: FeatureSchema,
        training_rows: usize,
    ) -> Self {
        let explainability = regressor.explain();
        Self {
            kind,
            regressor,
            scaler,
            schema,
            explainability,
            training_rows,
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn regressor(&self) -> &dyn Regressor {
        self.regressor.as_ref()
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn explainability(&self) -> &Explainability {
        &self.explainability
    }

    pub fn training_rows(&self) -> usize {
        self.training_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_strings_round_trip() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.to_string().parse::<ModelKind>(), Ok(kind));
        }
        assert_eq!(
            "Support Vector Machine".parse::<ModelKind>(),
            Ok(ModelKind::SupportVectorMachine)
        );
        assert!("Neural Network".parse::<ModelKind>().is_err());
    }

    #[test]
    fn only_distance_and_kernel_models_are_scaled() {
        let scaled: Vec<_> = ModelKind::ALL
            .into_iter()
            .filter(|k| k.requires_scaling())
            .collect();
        assert_eq!(
            scaled,
            vec![ModelKind::KNearestNeighbors, ModelKind::SupportVectorMachine]
        );
    }

    #[test]
    fn explainability_kinds_split_five_four_two() {
        let count = |want: ExplainabilityKind| {
            ModelKind::ALL
                .iter()
                .filter(|k| k.explainability_kind() == want)
                .count()
        };
        assert_eq!(count(ExplainabilityKind::Importance), 5);
        assert_eq!(count(ExplainabilityKind::Coefficient), 4);
        assert_eq!(count(ExplainabilityKind::Opaque), 2);
    }

    #[test]
    fn analyst_notes_follow_family() {
        assert!(ModelKind::RidgeRegression.analyst_note().unwrap().contains("Direction"));
        assert!(ModelKind::AdaBoost.analyst_note().unwrap().contains("Importance"));
        assert_eq!(ModelKind::LassoRegression.analyst_note(), None);
        assert_eq!(ModelKind::KNearestNeighbors.analyst_note(), None);
    }
}
