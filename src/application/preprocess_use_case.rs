// ============================================================
// Layer 2 — PreprocessUseCase
// ============================================================
// Turns a JSON-lines dataset split into aligned features:
//
//   Step 1: Resolve the task from the catalog   (Layer 4 - data)
//   Step 2: Load the tokenizer                  (Layer 6 - infra)
//   Step 3: Read the examples                   (Layer 6 - infra)
//   Step 4: Configure the example function      (Layer 4 - data)
//   Step 5: Per batch: preprocess hook, align   (Layer 4 - data)
//   Step 6: Write features and the run config   (Layer 6 - infra)

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::aligner::get_example_function;
use crate::data::catalog::TaskCatalog;
use crate::domain::batch::ExampleBatch;
use crate::domain::hooks::Split;
use crate::domain::naming::trim_task_name;
use crate::domain::traits::Padding;
use crate::infra::output_store::{read_jsonl, OutputStore};
use crate::infra::tokenizer_store::HfTokenizer;

// ─── Preprocess Configuration ─────────────────────────────────────────────────
// Saved next to the features so a training run can check which
// settings produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    pub catalog:           Option<PathBuf>,
    pub task:              String,
    pub tokenizer:         PathBuf,
    pub input:             PathBuf,
    pub output_dir:        PathBuf,
    pub split:             Split,
    pub max_source_length: Option<usize>,
    pub max_target_length: Option<usize>,
    pub padding:           Padding,
    pub truncation:        bool,
    pub batch_size:        usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            catalog:           None,
            task:              "klue-ynat".to_string(),
            tokenizer:         PathBuf::from("tokenizer.json"),
            input:             PathBuf::from("data/train.jsonl"),
            output_dir:        PathBuf::from("features"),
            split:             Split::Train,
            max_source_length: Some(512),
            max_target_length: None,
            padding:           Padding::Longest,
            truncation:        true,
            batch_size:        1000,
        }
    }
}

/// What a preprocessing run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessSummary {
    pub examples: usize,
    pub features: usize,
    pub output:   PathBuf,
}

// ─── PreprocessUseCase ────────────────────────────────────────────────────────
pub struct PreprocessUseCase {
    config: PreprocessConfig,
}

impl PreprocessUseCase {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PreprocessSummary> {
        let cfg = &self.config;
        if cfg.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }

        // ── Step 1: Resolve exactly one task ──────────────────────────────────
        let catalog = TaskCatalog::load_or_builtin(cfg.catalog.as_deref())?;
        let mut infos = catalog.get_task_info(&cfg.task)?;
        let info = match infos.len() {
            1 => infos.remove(0),
            0 => bail!("No task named '{}' in the catalog", cfg.task),
            n => bail!("'{}' names a group of {} tasks; preprocess one task at a time", cfg.task, n),
        };
        tracing::info!("Preprocessing {} ({}) split={:?}", info.id(), info.task_type, cfg.split);

        // ── Step 2: Tokenizer ─────────────────────────────────────────────────
        let tokenizer = HfTokenizer::from_file(&cfg.tokenizer)?;

        // ── Step 3: Examples ──────────────────────────────────────────────────
        let rows = read_jsonl(&cfg.input)?;
        tracing::info!("Read {} examples from '{}'", rows.len(), cfg.input.display());

        // ── Step 4: Example function ──────────────────────────────────────────
        let functions = get_example_function(
            &info,
            &tokenizer,
            cfg.max_source_length,
            cfg.max_target_length,
            cfg.padding,
            cfg.truncation,
        )?;
        let function = functions.for_split(cfg.split);

        // ── Step 5: Batches ───────────────────────────────────────────────────
        let store = OutputStore::new(&cfg.output_dir)?;
        let split_name = match cfg.split {
            Split::Train      => &info.train_split,
            Split::Validation => &info.eval_split,
        };
        let file_name = format!("{}.{}.jsonl", trim_task_name(&info.id()), trim_task_name(split_name));
        let mut writer = store.feature_writer(&file_name)?;

        for (n, chunk) in rows.chunks(cfg.batch_size).enumerate() {
            let batch = ExampleBatch::from_rows(chunk)?;
            let batch = info
                .preprocess_function
                .apply(cfg.split, batch)
                .with_context(|| format!("Preprocessing batch {n} failed"))?;
            let aligned = function
                .call(&batch)
                .with_context(|| format!("Aligning batch {n} failed"))?;
            writer.write_all(&aligned.features())?;
            tracing::debug!("Batch {}: {} examples → {} features", n, batch.len(), aligned.len());
        }

        // ── Step 6: Finish ────────────────────────────────────────────────────
        let (output, features) = writer.finish()?;
        store.save_config(cfg)?;
        tracing::info!("Wrote {} features to '{}'", features, output.display());

        Ok(PreprocessSummary { examples: rows.len(), features, output })
    }
}
