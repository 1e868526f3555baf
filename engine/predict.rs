use crate::encode::{FeatureEncoder, FeatureSchema, Subject};
use crate::model::FittedModel;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PredictError {
    #[error(
        "Feature schema mismatch: the model was trained on [{expected}] but the request used [{found}]."
    )]
    SchemaMismatch { expected: String, found: String },
}

/// Scores one subject. Pure: the same model, schema and subject always give
/// the same cost.
pub fn predict(
    model: &FittedModel,
    schema: &FeatureSchema,
    subject: &Subject,
) -> Result<f64, PredictError> {
    if schema != model.schema() {
        return Err(PredictError::SchemaMismatch {
            expected: model.schema().names().join(", "),
            found: schema.names().join(", "),
        });
    }
    let row = FeatureEncoder::new(schema.clone()).encode(subject);
    let row = match model.scaler() {
        Some(scaler) => scaler.transform_row(row.view()),
        None => row,
    };
    Ok(model.regressor().predict_row(row.view()))
}
