// ============================================================
// Layer 3 — TaskType Domain Type
// ============================================================
// The closed set of fine-tuning task families. Every other
// component (model resolver, example aligner, collator and
// trainer resolver) dispatches on this enum with an exhaustive
// match, so adding a variant is a compile error everywhere a
// decision has to be made.
//
// Serialised in kebab-case so catalog files read naturally:
//   "task_type": "token-classification"

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FinetuneError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    SequenceClassification,
    TokenClassification,
    ConditionalGeneration,
    QuestionAnswering,
    MaskedLanguageModeling,
    CausalLanguageModeling,
    SequenceToSequence,
    DependencyParsing,
}

impl TaskType {
    pub const ALL: [TaskType; 8] = [
        TaskType::SequenceClassification,
        TaskType::TokenClassification,
        TaskType::ConditionalGeneration,
        TaskType::QuestionAnswering,
        TaskType::MaskedLanguageModeling,
        TaskType::CausalLanguageModeling,
        TaskType::SequenceToSequence,
        TaskType::DependencyParsing,
    ];

    /// The kebab-case name used in catalog files
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::SequenceClassification => "sequence-classification",
            TaskType::TokenClassification    => "token-classification",
            TaskType::ConditionalGeneration  => "conditional-generation",
            TaskType::QuestionAnswering      => "question-answering",
            TaskType::MaskedLanguageModeling => "masked-language-modeling",
            TaskType::CausalLanguageModeling => "causal-language-modeling",
            TaskType::SequenceToSequence     => "sequence-to-sequence",
            TaskType::DependencyParsing      => "dependency-parsing",
        }
    }

    /// Tasks whose labels are aligned token by token
    pub fn is_token_level(&self) -> bool {
        matches!(self, TaskType::TokenClassification | TaskType::DependencyParsing)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = FinetuneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FinetuneError::UnknownTaskType(s.to_string()))
    }
}
