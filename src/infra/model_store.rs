// ============================================================
// Layer 6 — Local Model Store
// ============================================================
// A ModelLoader over checkpoints saved on disk:
//
//   <model_dir>/
//     config.json      ← model_type, id2label, label2id, ...
//     (weights)        ← handed to the training framework as a path
//
// A missing directory or a directory without config.json is a
// miss (Ok(None)), which get_model reports as ModelNotFound. A
// config.json that exists but cannot be read is an error.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{FinetuneError, Result};
use crate::ml::model::{LoadArgs, ModelConfig, ModelKind, ModelLoader, PretrainedModel};

pub const CONFIG_FILE: &str = "config.json";

/// A checkpoint found on disk, configured for one task head
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalModel {
    pub kind:   ModelKind,
    pub path:   PathBuf,
    pub args:   LoadArgs,
    pub config: ModelConfig,
}

impl PretrainedModel for LocalModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut ModelConfig {
        &mut self.config
    }
}

impl LocalModel {
    /// Write the adjusted configuration back next to the weights
    pub fn save_config(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(&self.config)?)?;
        tracing::info!("Model config saved to '{}'", path.display());
        Ok(path)
    }
}

/// Resolves model identifiers as paths, relative to `root` when
/// one is given.
#[derive(Debug, Clone, Default)]
pub struct LocalModelStore {
    root: Option<PathBuf>,
}

impl LocalModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    fn resolve(&self, model_name_or_path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(model_name_or_path),
            None => PathBuf::from(model_name_or_path),
        }
    }
}

impl ModelLoader for LocalModelStore {
    type Model = LocalModel;

    fn from_pretrained(&self, kind: ModelKind, args: &LoadArgs) -> Result<Option<LocalModel>> {
        let path = self.resolve(&args.model_name_or_path);
        let config_path = path.join(CONFIG_FILE);
        if !config_path.is_file() {
            tracing::debug!("No {} under '{}'", CONFIG_FILE, path.display());
            return Ok(None);
        }

        let json = fs::read_to_string(&config_path)?;
        let mut config: ModelConfig = serde_json::from_str(&json).map_err(|e| {
            FinetuneError::config(format!("cannot parse '{}': {e}", config_path.display()))
        })?;

        // A head with a different label count gets fresh generic labels
        if config.num_labels != args.num_labels || config.id2label.len() != args.num_labels {
            let names: Vec<String> = (0..args.num_labels).map(|i| format!("LABEL_{i}")).collect();
            config.set_label_names(&names);
            config.num_labels = args.num_labels;
        }

        Ok(Some(LocalModel {
            kind,
            path,
            args: args.clone(),
            config,
        }))
    }
}
