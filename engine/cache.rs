//! Memoization tables owned by [`crate::context::Engine`].
//!
//! The dataset cache reloads whenever the source file's fingerprint changes.
//! The model cache is never invalidated: once a selector has a fitted model,
//! that instance is reused for the rest of the process, even if the dataset
//! underneath it is reloaded.

use crate::config::EngineConfig;
use crate::data::{Dataset, load_dataset};
use crate::model::{FittedModel, ModelKind};
use ahash::AHashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// What the loader saw on disk. `len` and `modified` are `None` for a missing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFingerprint {
    pub path: PathBuf,
    pub len: Option<u64>,
    pub modified: Option<SystemTime>,
}

impl SourceFingerprint {
    pub fn probe(path: &Path) -> Self {
        let metadata = fs::metadata(path).ok();
        Self {
            path: path.to_path_buf(),
            len: metadata.as_ref().map(|m| m.len()),
            modified: metadata.and_then(|m| m.modified().ok()),
        }
    }
}

#[derive(Debug, Default)]
pub struct DatasetCache {
    entry: Option<(SourceFingerprint, Arc<Dataset>)>,
    loads: usize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached dataset when the source is unchanged, otherwise loads it again.
    pub fn get_or_load(&mut self, config: &EngineConfig) -> Arc<Dataset> {
        let fingerprint = SourceFingerprint::probe(&config.dataset_path);
        if let Some((cached, dataset)) = &self.entry {
            if *cached == fingerprint {
                return Arc::clone(dataset);
            }
            log::debug!("Dataset source changed; reloading '{}'", fingerprint.path.display());
        }
        let dataset = Arc::new(load_dataset(config));
        self.loads += 1;
        self.entry = Some((fingerprint, Arc::clone(&dataset)));
        dataset
    }

    /// How many times the source has actually been read.
    pub fn loads(&self) -> usize {
        self.loads
    }
}

/// Fitted models keyed by selector. Only successful fits are stored.
#[derive(Debug, Default)]
pub struct ModelCache {
    models: AHashMap<ModelKind, Arc<FittedModel>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ModelKind) -> Option<Arc<FittedModel>> {
        self.models.get(&kind).cloned()
    }

    pub fn insert(&mut self, model: FittedModel) -> Arc<FittedModel> {
        let model = Arc::new(model);
        self.models.insert(model.kind(), Arc::clone(&model));
        model
    }

    pub fn contains(&self, kind: ModelKind) -> bool {
        self.models.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
