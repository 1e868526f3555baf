//! The application context: configuration plus the two memoization tables.

use crate::cache::{DatasetCache, ModelCache};
use crate::config::EngineConfig;
use crate::data::Dataset;
use crate::model::{FittedModel, ModelKind};
use crate::trainer::{TrainingError, train};
use std::fmt;
use std::sync::Arc;

/// Why no model is available for a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineReason {
    CsvMissing,
    EngineOffline,
}

impl From<&TrainingError> for OfflineReason {
    fn from(err: &TrainingError) -> Self {
        match err {
            TrainingError::DataUnavailable(_) => OfflineReason::CsvMissing,
            TrainingError::FitFailed(_) => OfflineReason::EngineOffline,
        }
    }
}

impl fmt::Display for OfflineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OfflineReason::CsvMissing => "CSV Missing",
            OfflineReason::EngineOffline => "Engine Offline",
        })
    }
}

/// A model lookup that never fails outright. Callers match on it before
/// using any derived value.
#[derive(Debug, Clone)]
pub enum LiveModel {
    Online(Arc<FittedModel>),
    Offline(OfflineReason),
}

impl LiveModel {
    pub fn online(&self) -> Option<&Arc<FittedModel>> {
        match self {
            LiveModel::Online(model) => Some(model),
            LiveModel::Offline(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    datasets: DatasetCache,
    models: ModelCache,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            datasets: DatasetCache::new(),
            models: ModelCache::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dataset(&mut self) -> Arc<Dataset> {
        self.datasets.get_or_load(&self.config)
    }

    /// Returns the cached model for `kind`, training it on first use.
    /// Failures are not cached, so a later call retrains.
    pub fn model(&mut self, kind: ModelKind) -> Result<Arc<FittedModel>, TrainingError> {
        if let Some(model) = self.models.get(kind) {
            log::debug!("Reusing cached {kind} model");
            return Ok(model);
        }
        let dataset = self.dataset();
        let fitted = train(&dataset, kind, &self.config)?;
        Ok(self.models.insert(fitted))
    }

    /// [`Engine::model`] with failures collapsed into the offline sentinel.
    pub fn live_model(&mut self, kind: ModelKind) -> LiveModel {
        match self.model(kind) {
            Ok(model) => LiveModel::Online(model),
            Err(e) => {
                let reason = OfflineReason::from(&e);
                log::warn!("{kind} unavailable ({reason}): {e}");
                LiveModel::Offline(reason)
            }
        }
    }

    pub fn models(&self) -> &ModelCache {
        &self.models
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regressors::FitError;

    #[test]
    fn offline_reasons_render_as_sentinels() {
        let missing = TrainingError::DataUnavailable("gone".into());
        let failed = TrainingError::FitFailed(FitError::EmptyTrainingSet);
        assert_eq!(OfflineReason::from(&missing).to_string(), "CSV Missing");
        assert_eq!(OfflineReason::from(&failed).to_string(), "Engine Offline");
    }

    #[test]
    fn missing_dataset_leaves_cache_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::default().with_dataset_path(dir.path().join("none.csv"));
        let mut engine = Engine::new(config);
        match engine.live_model(ModelKind::RandomForest) {
            LiveModel::Offline(reason) => assert_eq!(reason, OfflineReason::CsvMissing),
            LiveModel::Online(_) => panic!("Expected the engine to be offline"),
        }
        assert!(engine.models().is_empty());
    }
}
