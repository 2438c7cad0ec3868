// ============================================================
// Layer 3 — Per-Task Hooks
// ============================================================
// A few benchmark tasks need their raw examples reshaped before
// alignment (KLUE-STS nests its score, KLUE-RE needs entity
// markers) or their predictions reshaped afterwards (KLUE-MRC
// turns logits into answer strings).
//
// The domain layer only names which hook a task uses. The
// behaviour lives next to the code that needs it:
//   - PreprocessFunction::apply   → data/preprocess.rs
//   - PostprocessFunction         → ml/postprocess.rs

use serde::{Deserialize, Serialize};

/// Which split a batch belongs to. Hooks and the QA aligner
/// behave differently on training and evaluation data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreprocessFunction {
    /// Leave the batch untouched
    #[default]
    Identity,
    /// Lift the float similarity score out of the nested `labels` object
    KlueSts,
    /// Wrap subject and object entities in marker tokens
    KlueRe,
    /// Identity on training data, no preprocessing on validation data
    KlueMrc,
}

impl PreprocessFunction {
    /// Override table keyed by catalog identifier
    pub fn for_task(task_id: &str) -> Self {
        match task_id {
            "klue-sts" => PreprocessFunction::KlueSts,
            "klue-re"  => PreprocessFunction::KlueRe,
            "klue-mrc" => PreprocessFunction::KlueMrc,
            _          => PreprocessFunction::Identity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostprocessFunction {
    #[default]
    Identity,
    /// Extractive QA: logits + offsets → answer text per example
    MrcAnswers,
}

impl PostprocessFunction {
    pub fn for_task(task_id: &str) -> Self {
        match task_id {
            "klue-mrc" => PostprocessFunction::MrcAnswers,
            _          => PostprocessFunction::Identity,
        }
    }
}
