use std::{fs, path::Path};

use burn::data::dataset::Dataset;

use crate::domain::batch::{Feature, TokenizedBatch};
use crate::error::{FinetuneError, Result};

/// Aligned features, ready for a burn DataLoader with a FeatureBatcher
#[derive(Debug, Clone, Default)]
pub struct FeatureDataset {
    features: Vec<Feature>,
}

impl FeatureDataset {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Read a features file written by the preprocess pipeline
    pub fn from_jsonl(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let features = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).map_err(|e| {
                    FinetuneError::invalid_example(path.display().to_string(), n + 1, e.to_string())
                })
            })
            .collect::<Result<Vec<Feature>>>()?;
        tracing::info!("Loaded {} features from '{}'", features.len(), path.display());
        Ok(Self { features })
    }

    pub fn extend(&mut self, batch: &TokenizedBatch) {
        self.features.extend(batch.features());
    }
}

impl Dataset<Feature> for FeatureDataset {
    fn get(&self, index: usize) -> Option<Feature> {
        self.features.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.features.len()
    }
}
