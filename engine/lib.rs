//! Medical-insurance cost engine: dataset loading, feature encoding, on-demand
//! model training and the population analytics built on top of them.

pub mod analytics;
pub mod cache;
pub mod config;
pub mod context;
pub mod data;
pub mod encode;
pub mod export;
pub mod model;
pub mod predict;
pub mod regressors;
pub mod scaler;
pub mod trainer;

pub use config::EngineConfig;
pub use context::{Engine, LiveModel, OfflineReason};
pub use data::{Dataset, RiskCategory, load_dataset};
pub use encode::{FeatureSchema, Region, Sex, SmokerStatus, Subject};
pub use model::{FittedModel, ModelKind};
pub use predict::{PredictError, predict};
pub use trainer::{TrainingError, train};
