// ============================================================
// Layer 5 — Model Resolver
// ============================================================
// Picks the model head for a task and asks a ModelLoader for it.
//
//   task type                      → model kind
//   ─────────────────────────────────────────────────────
//   sequence-classification        → SequenceClassification
//   token-classification           → TokenClassification
//   conditional-generation         → CausalLm
//   causal-language-modeling       → CausalLm
//   question-answering             → QuestionAnswering
//   masked-language-modeling       → MaskedLm
//   sequence-to-sequence           → Seq2SeqLm
//   dependency-parsing             → DependencyParsing
//
// Some heads take extra construction arguments. Each kind states
// which ones through LoaderCapabilities, and LoadArgs carries a
// value only for the arguments the kind declares.
//
// The architectures and weights themselves live behind the
// ModelLoader trait; this crate never builds a network.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::task_info::TaskInfo;
use crate::domain::task_type::TaskType;
use crate::error::{FinetuneError, Result};

// ─── ModelKind ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    SequenceClassification,
    TokenClassification,
    CausalLm,
    QuestionAnswering,
    MaskedLm,
    Seq2SeqLm,
    DependencyParsing,
}

/// Optional construction arguments a model kind accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderCapabilities {
    pub max_seq_length: bool,
    pub num_relations:  bool,
}

impl ModelKind {
    pub fn for_task(task_type: TaskType) -> Self {
        match task_type {
            TaskType::SequenceClassification => ModelKind::SequenceClassification,
            TaskType::TokenClassification    => ModelKind::TokenClassification,
            TaskType::ConditionalGeneration  => ModelKind::CausalLm,
            TaskType::QuestionAnswering      => ModelKind::QuestionAnswering,
            TaskType::MaskedLanguageModeling => ModelKind::MaskedLm,
            TaskType::CausalLanguageModeling => ModelKind::CausalLm,
            TaskType::SequenceToSequence     => ModelKind::Seq2SeqLm,
            TaskType::DependencyParsing      => ModelKind::DependencyParsing,
        }
    }

    pub fn capabilities(&self) -> LoaderCapabilities {
        match self {
            ModelKind::DependencyParsing => LoaderCapabilities {
                max_seq_length: true,
                num_relations:  true,
            },
            _ => LoaderCapabilities::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::SequenceClassification => "sequence-classification",
            ModelKind::TokenClassification    => "token-classification",
            ModelKind::CausalLm               => "causal-lm",
            ModelKind::QuestionAnswering      => "question-answering",
            ModelKind::MaskedLm               => "masked-lm",
            ModelKind::Seq2SeqLm              => "seq2seq-lm",
            ModelKind::DependencyParsing      => "dependency-parsing",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── LoadArgs ─────────────────────────────────────────────────────────────────
/// Everything a loader receives for one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadArgs {
    pub model_name_or_path: String,
    pub num_labels:         usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_seq_length:     Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_relations:      Option<usize>,
}

impl LoadArgs {
    pub fn new(kind: ModelKind, model_name_or_path: &str, info: &TaskInfo, max_seq_length: usize) -> Self {
        let caps = kind.capabilities();
        Self {
            model_name_or_path: model_name_or_path.to_string(),
            num_labels:         info.num_labels,
            max_seq_length:     caps.max_seq_length.then_some(max_seq_length),
            num_relations:      caps.num_relations.then_some(info.num_labels),
        }
    }
}

// ─── ModelConfig ──────────────────────────────────────────────────────────────
/// The part of a checkpoint configuration the resolver touches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(default)]
    pub num_labels: usize,
    #[serde(default)]
    pub id2label:   BTreeMap<usize, String>,
    #[serde(default)]
    pub label2id:   BTreeMap<String, usize>,
}

impl ModelConfig {
    /// Replace both label maps with the enumeration of `names`
    pub fn set_label_names(&mut self, names: &[String]) {
        self.id2label = names.iter().cloned().enumerate().collect();
        self.label2id = self.id2label.iter().map(|(&i, l)| (l.clone(), i)).collect();
    }
}

// ─── Traits ───────────────────────────────────────────────────────────────────
/// A loaded model whose configuration can be read and adjusted
pub trait PretrainedModel {
    fn config(&self) -> &ModelConfig;
    fn config_mut(&mut self) -> &mut ModelConfig;
}

/// Source of pretrained models: a hub client, a local directory,
/// a test double. Ok(None) means nothing matched the identifier.
pub trait ModelLoader {
    type Model: PretrainedModel;

    fn from_pretrained(&self, kind: ModelKind, args: &LoadArgs) -> Result<Option<Self::Model>>;
}

/// Load the model for a task.
///
/// For token classification and dependency parsing, `label_names`
/// in the task's extra options replace the checkpoint's label maps.
pub fn get_model<L: ModelLoader + ?Sized>(
    loader:             &L,
    model_name_or_path: &str,
    info:               &TaskInfo,
    max_seq_length:     usize,
) -> Result<L::Model> {
    let kind = ModelKind::for_task(info.task_type);
    let args = LoadArgs::new(kind, model_name_or_path, info, max_seq_length);
    tracing::info!("Loading {} model from '{}' ({} labels)", kind, model_name_or_path, args.num_labels);

    let mut model = loader
        .from_pretrained(kind, &args)?
        .ok_or_else(|| FinetuneError::ModelNotFound { model: model_name_or_path.to_string() })?;

    let relabel = matches!(info.task_type, TaskType::TokenClassification | TaskType::DependencyParsing);
    match info.extra_options.label_names.as_deref() {
        Some(names) if relabel && !names.is_empty() => {
            tracing::debug!("Overriding label maps with {} label names", names.len());
            model.config_mut().set_label_names(names);
        }
        _ => {}
    }

    Ok(model)
}
