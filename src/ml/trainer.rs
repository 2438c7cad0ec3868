// ============================================================
// Layer 5 — Trainer Resolver
// ============================================================
// Which training-argument flavour and which trainer an external
// training framework should use for a task.
//
//   sequence-to-sequence → (Seq2Seq, Seq2Seq)
//   question-answering   → (Generic, QuestionAnswering)
//   everything else      → (Generic, Generic)
//
// The question-answering trainer runs the task's postprocess
// function over evaluation logits before computing metrics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::task_type::TaskType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrainingArgsKind {
    Generic,
    Seq2Seq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrainerKind {
    Generic,
    Seq2Seq,
    QuestionAnswering,
}

impl fmt::Display for TrainingArgsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrainingArgsKind::Generic => "training-arguments",
            TrainingArgsKind::Seq2Seq => "seq2seq-training-arguments",
        })
    }
}

impl fmt::Display for TrainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrainerKind::Generic           => "trainer",
            TrainerKind::Seq2Seq           => "seq2seq-trainer",
            TrainerKind::QuestionAnswering => "question-answering-trainer",
        })
    }
}

pub fn get_trainer(task_type: TaskType) -> (TrainingArgsKind, TrainerKind) {
    match task_type {
        TaskType::SequenceToSequence => (TrainingArgsKind::Seq2Seq, TrainerKind::Seq2Seq),
        TaskType::QuestionAnswering  => (TrainingArgsKind::Generic, TrainerKind::QuestionAnswering),
        _                            => (TrainingArgsKind::Generic, TrainerKind::Generic),
    }
}
