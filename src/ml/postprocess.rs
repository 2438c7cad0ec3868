// ============================================================
// Layer 5 — Prediction Postprocessing
// ============================================================
// Turns raw model outputs back into task-level predictions.
//
// klue-mrc (extractive QA):
//   One example may have been split into several spans. For every
//   span we look at the n best start and n best end logits and
//   keep the candidate (start, end) pairs that
//     - point at context tokens (offset is not None)
//     - are ordered (end >= start)
//     - are at most max_answer_length tokens long
//   The best-scoring candidate across all spans of an example,
//   score = start_logit + end_logit, gives the answer text.
//   An example without any valid candidate predicts "".
//
// Reference: Devlin et al. (2019) BERT, §4.2

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::batch::{ExampleBatch, TokenizedBatch};
use crate::domain::hooks::PostprocessFunction;
use crate::domain::task_info::{ExtraOptions, TaskInfo};
use crate::error::{FinetuneError, Result};

pub const DEFAULT_N_BEST_SIZE: usize = 20;
pub const DEFAULT_MAX_ANSWER_LENGTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MrcOptions {
    pub n_best_size:       usize,
    pub max_answer_length: usize,
}

impl Default for MrcOptions {
    fn default() -> Self {
        Self {
            n_best_size:       DEFAULT_N_BEST_SIZE,
            max_answer_length: DEFAULT_MAX_ANSWER_LENGTH,
        }
    }
}

impl MrcOptions {
    /// `n_best_size` / `max_answer_length` from the task's extra options
    pub fn from_extra_options(options: &ExtraOptions) -> Self {
        let read = |key: &str, default: usize| {
            options
                .other
                .get(key)
                .and_then(Value::as_u64)
                .map_or(default, |v| v as usize)
        };
        Self {
            n_best_size:       read("n_best_size", DEFAULT_N_BEST_SIZE),
            max_answer_length: read("max_answer_length", DEFAULT_MAX_ANSWER_LENGTH),
        }
    }
}

/// Answer text predicted for one example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id:              Value,
    pub prediction_text: String,
}

impl PostprocessFunction {
    /// Map span logits to per-example predictions.
    /// Identity returns None: the logits are the predictions.
    pub fn apply(
        &self,
        info:         &TaskInfo,
        examples:     &ExampleBatch,
        features:     &TokenizedBatch,
        start_logits: &[Vec<f32>],
        end_logits:   &[Vec<f32>],
    ) -> Result<Option<Vec<Prediction>>> {
        match self {
            PostprocessFunction::Identity => Ok(None),
            PostprocessFunction::MrcAnswers => {
                let options = MrcOptions::from_extra_options(&info.extra_options);
                mrc_answers(info, examples, features, start_logits, end_logits, options).map(Some)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    score:      f32,
    char_start: usize,
    char_end:   usize,
}

pub fn mrc_answers(
    info:         &TaskInfo,
    examples:     &ExampleBatch,
    features:     &TokenizedBatch,
    start_logits: &[Vec<f32>],
    end_logits:   &[Vec<f32>],
    options:      MrcOptions,
) -> Result<Vec<Prediction>> {
    let id_column = info
        .id_column
        .as_deref()
        .ok_or_else(|| FinetuneError::config("question answering needs 'id_column'"))?;
    let ids = examples.column(id_column)?;
    let contexts = examples.column(&info.text_column)?;

    let (Some(feature_ids), Some(offsets)) = (&features.example_id, &features.offset_mapping) else {
        return Err(FinetuneError::config(
            "features carry no example ids or offsets; use the evaluation aligner",
        ));
    };
    if start_logits.len() != features.len() || end_logits.len() != features.len() {
        return Err(FinetuneError::config(format!(
            "{} features but {} start / {} end logit rows",
            features.len(),
            start_logits.len(),
            end_logits.len()
        )));
    }

    let index_of: HashMap<String, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.to_string(), i))
        .collect();
    let mut best: Vec<Option<Candidate>> = vec![None; ids.len()];

    for (f, feature_id) in feature_ids.iter().enumerate() {
        let Some(&example) = index_of.get(&feature_id.to_string()) else {
            tracing::warn!("Feature {} refers to unknown example {}", f, feature_id);
            continue;
        };
        let offsets = &offsets[f];
        let starts = top_indices(&start_logits[f], options.n_best_size);
        let ends = top_indices(&end_logits[f], options.n_best_size);

        for &s in &starts {
            for &e in &ends {
                let (Some(Some(start_offset)), Some(Some(end_offset))) = (offsets.get(s), offsets.get(e)) else {
                    continue;
                };
                if e < s || e - s + 1 > options.max_answer_length {
                    continue;
                }
                let score = start_logits[f][s] + end_logits[f][e];
                if best[example].map_or(true, |b| score > b.score) {
                    best[example] = Some(Candidate {
                        score,
                        char_start: start_offset.0,
                        char_end:   end_offset.1,
                    });
                }
            }
        }
    }

    ids.iter()
        .zip(&best)
        .enumerate()
        .map(|(row, (id, candidate))| {
            let prediction_text = match candidate {
                Some(c) => {
                    let context = contexts[row].as_str().ok_or_else(|| {
                        FinetuneError::invalid_example(&info.text_column, row, "expected a string")
                    })?;
                    context.chars().skip(c.char_start).take(c.char_end.saturating_sub(c.char_start)).collect()
                }
                None => String::new(),
            };
            Ok(Prediction { id: id.clone(), prediction_text })
        })
        .collect()
}

/// Indices of the `n` largest values, largest first
fn top_indices(logits: &[f32], n: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..logits.len()).collect();
    indices.sort_by(|&a, &b| logits[b].total_cmp(&logits[a]));
    indices.truncate(n);
    indices
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mrc_info() -> TaskInfo {
        TaskInfo::from_entry(
            "klue-mrc",
            &json!({
                "task_type": "question-answering",
                "text_column": "context",
                "text_pair_column": "question",
                "label_column": "answers",
                "id_column": "guid",
                "extra_options": {"doc_stride": 1, "max_answer_length": 3}
            }),
        )
        .unwrap()
    }

    fn examples() -> ExampleBatch {
        ExampleBatch::new()
            .with_column("guid", vec![json!("q-1"), json!("q-2")])
            .with_column("context", vec![json!("서울은 한국의 수도"), json!("abc")])
    }

    /// Two spans for q-1, one for q-2; tokens 0..=1 are not context
    fn features() -> TokenizedBatch {
        TokenizedBatch {
            input_ids:      vec![vec![101, 7, 1, 2, 3]; 3],
            attention_mask: vec![vec![1; 5]; 3],
            example_id:     Some(vec![json!("q-1"), json!("q-1"), json!("q-2")]),
            offset_mapping: Some(vec![
                vec![None, None, Some((0, 3)), Some((4, 7)), Some((8, 10))],
                vec![None, None, Some((4, 7)), Some((8, 10)), None],
                vec![None, None, Some((0, 3)), None, None],
            ]),
            ..TokenizedBatch::default()
        }
    }

    #[test]
    fn test_best_span_across_features() {
        let start = vec![
            vec![9.0, 0.0, 1.0, 0.5, 0.0],
            vec![9.0, 0.0, 0.0, 4.0, 0.0],
            vec![9.0, 9.0, 0.0, 0.0, 0.0],
        ];
        let end = vec![
            vec![9.0, 0.0, 0.0, 1.0, 0.5],
            vec![9.0, 0.0, 0.0, 3.0, 0.0],
            vec![9.0, 9.0, 0.0, 0.0, 0.0],
        ];

        let predictions = PostprocessFunction::MrcAnswers
            .apply(&mrc_info(), &examples(), &features(), &start, &end)
            .unwrap()
            .unwrap();

        // span 2 wins with 4.0 + 3.0 over (8,10)
        assert_eq!(predictions[0], Prediction { id: json!("q-1"), prediction_text: "수도".into() });
        // only token 2 is context in q-2's span
        assert_eq!(predictions[1].prediction_text, "abc");
    }

    #[test]
    fn test_answers_longer_than_max_are_dropped() {
        let mut info = mrc_info();
        info.extra_options.other.insert("max_answer_length".into(), json!(1));
        let start = vec![vec![0.0, 0.0, 5.0, 0.0, 0.0]; 3];
        let end = vec![vec![0.0, 0.0, 0.0, 0.0, 5.0]; 3];

        let predictions = mrc_answers(
            &info,
            &examples(),
            &features(),
            &start,
            &end,
            MrcOptions { n_best_size: 1, max_answer_length: 1 },
        )
        .unwrap();
        assert_eq!(predictions[0].prediction_text, "");
        assert_eq!(predictions[1].prediction_text, "");
    }

    #[test]
    fn test_identity_passes() {
        let out = PostprocessFunction::Identity
            .apply(&mrc_info(), &examples(), &features(), &[], &[])
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_options_from_extra_options() {
        let options = MrcOptions::from_extra_options(&mrc_info().extra_options);
        assert_eq!(options, MrcOptions { n_best_size: 20, max_answer_length: 3 });
    }

    #[test]
    fn test_training_features_are_rejected() {
        let mut features = features();
        features.offset_mapping = None;
        let start = vec![vec![0.0; 5]; 3];
        assert!(mrc_answers(&mrc_info(), &examples(), &features, &start, &start, MrcOptions::default()).is_err());
    }
}
