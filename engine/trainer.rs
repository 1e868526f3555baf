//! Turns a loaded dataset and a selector into a [`FittedModel`].

use crate::config::EngineConfig;
use crate::data::Dataset;
use crate::encode::{FeatureEncoder, FeatureSchema, Subject};
use crate::model::{FittedModel, ModelKind};
use crate::regressors::FitError;
use crate::scaler::StandardScaler;
use ndarray::Array1;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("No training data available: {0}")]
    DataUnavailable(String),
    #[error("Model fit failed: {0}")]
    FitFailed(#[from] FitError),
}

/// Samples, cleans, encodes and fits. Blocks until the fit completes.
///
/// Rows missing any prediction input or the cost target are dropped after
/// sampling, so a large file with many incomplete rows can train on fewer than
/// `sample_size` rows.
pub fn train(
    dataset: &Dataset,
    kind: ModelKind,
    config: &EngineConfig,
) -> Result<FittedModel, TrainingError> {
    if dataset.is_placeholder() {
        return Err(TrainingError::DataUnavailable(
            "source file is missing or unreadable".to_string(),
        ));
    }

    let (subjects, costs): (Vec<Subject>, Vec<f64>) = dataset
        .sample(config.sample_size, config.seed)
        .into_iter()
        .filter_map(|record| Some((record.subject()?, record.annual_medical_cost?)))
        .unzip();
    if subjects.is_empty() {
        return Err(TrainingError::DataUnavailable(
            "no complete rows after dropping missing values".to_string(),
        ));
    }

    let encoder = FeatureEncoder::new(FeatureSchema::new(dataset.dependents_column));
    let mut x = encoder.encode_all(&subjects);
    let y = Array1::from(costs);

    let scaler = if kind.requires_scaling() {
        let scaler = StandardScaler::fit(x.view());
        x = scaler.transform(x.view());
        Some(scaler)
    } else {
        None
    };

    let start = Instant::now();
    let mut regressor = kind.build(config.seed);
    regressor.fit(x.view(), y.view())?;
    log::info!(
        "Trained {kind} on {} rows x {} features in {:.2?}",
        x.nrows(),
        x.ncols(),
        start.elapsed()
    );

    Ok(FittedModel::new(
        kind,
        regressor,
        scaler,
        encoder.schema().clone(),
        subjects.len(),
    ))
}
