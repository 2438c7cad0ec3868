// ============================================================
// Layer 2 — PlanUseCase
// ============================================================
// Resolves everything an external training run needs for one
// task, or for every task of a group:
//
//   Step 1: Load the catalog                  (Layer 4 - data)
//   Step 2: Resolve task ids into TaskInfos   (Layer 4 - data)
//   Step 3: Model kind + load arguments       (Layer 5 - ml)
//   Step 4: Collator and trainer kinds        (Layer 4 / 5)
//   Step 5: Optionally load the model config  (Layer 6 - infra)
//
// The result is a list of TaskPlans, printed as JSON by the CLI.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::catalog::TaskCatalog;
use crate::data::collator::{get_data_collator, DataCollator};
use crate::domain::hooks::{PostprocessFunction, PreprocessFunction};
use crate::domain::naming::trim_task_name;
use crate::domain::task_info::TaskInfo;
use crate::domain::task_type::TaskType;
use crate::infra::model_store::LocalModelStore;
use crate::ml::model::{get_model, LoadArgs, ModelConfig, ModelKind};
use crate::ml::trainer::{get_trainer, TrainerKind, TrainingArgsKind};

// ─── Plan Configuration ───────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Catalog file; the embedded catalog when None
    pub catalog:            Option<PathBuf>,
    /// Task identifier or group
    pub task:               String,
    pub model_name_or_path: String,
    pub max_seq_length:     usize,
    /// Resolve the model through LocalModelStore as well
    pub load_model:         bool,
    /// Directory model identifiers are resolved against
    pub model_root:         Option<PathBuf>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            catalog:            None,
            task:               "klue".to_string(),
            model_name_or_path: "klue/roberta-base".to_string(),
            max_seq_length:     512,
            load_model:         false,
            model_root:         None,
        }
    }
}

// ─── TaskPlan ─────────────────────────────────────────────────────────────────
/// Everything resolved for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub task:                 String,
    pub run_name:             String,
    pub task_type:            TaskType,
    pub model_kind:           ModelKind,
    pub load_args:            LoadArgs,
    pub data_collator:        DataCollator,
    pub training_args:        TrainingArgsKind,
    pub trainer:              TrainerKind,
    pub train_split:          String,
    pub eval_split:           String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_name:          Option<String>,
    pub preprocess_function:  PreprocessFunction,
    pub postprocess_function: PostprocessFunction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_config:         Option<ModelConfig>,
}

impl TaskPlan {
    pub fn new(info: &TaskInfo, model_name_or_path: &str, max_seq_length: usize) -> Self {
        let model_kind = ModelKind::for_task(info.task_type);
        let (training_args, trainer) = get_trainer(info.task_type);
        Self {
            task: info.id(),
            run_name: trim_task_name(&format!("{}_{}", info.id(), model_name_or_path)),
            task_type: info.task_type,
            model_kind,
            load_args: LoadArgs::new(model_kind, model_name_or_path, info, max_seq_length),
            data_collator: get_data_collator(info.task_type),
            training_args,
            trainer,
            train_split: info.train_split.clone(),
            eval_split: info.eval_split.clone(),
            metric_name: info.metric_name.clone(),
            preprocess_function: info.preprocess_function,
            postprocess_function: info.postprocess_function,
            model_config: None,
        }
    }
}

// ─── PlanUseCase ──────────────────────────────────────────────────────────────
pub struct PlanUseCase {
    config: PlanConfig,
}

impl PlanUseCase {
    pub fn new(config: PlanConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<TaskPlan>> {
        let cfg = &self.config;

        // ── Step 1: Catalog ───────────────────────────────────────────────────
        let catalog = TaskCatalog::load_or_builtin(cfg.catalog.as_deref())?;

        // ── Step 2: Task descriptors ──────────────────────────────────────────
        let infos = catalog
            .get_task_info(&cfg.task)
            .with_context(|| format!("Cannot resolve task '{}'", cfg.task))?;
        if infos.is_empty() {
            bail!("No task or task group named '{}' in the catalog", cfg.task);
        }
        tracing::info!("Planning {} task(s) for '{}'", infos.len(), cfg.task);

        // ── Steps 3-5: Resolve per task ───────────────────────────────────────
        let store = match &cfg.model_root {
            Some(root) => LocalModelStore::with_root(root),
            None => LocalModelStore::new(),
        };

        infos
            .iter()
            .map(|info| {
                let mut plan = TaskPlan::new(info, &cfg.model_name_or_path, cfg.max_seq_length);
                if cfg.load_model {
                    let model = get_model(&store, &cfg.model_name_or_path, info, cfg.max_seq_length)
                        .with_context(|| format!("Cannot load the model for '{}'", plan.task))?;
                    plan.model_config = Some(model.config);
                }
                tracing::debug!("{} → {} / {} / {}", plan.task, plan.model_kind, plan.data_collator, plan.trainer);
                Ok(plan)
            })
            .collect()
    }
}
