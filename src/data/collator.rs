// ============================================================
// Layer 4 — Data Collators
// ============================================================
// A collator turns a list of Features of different lengths into
// a rectangular batch. Which collator a task gets depends only on
// its task type:
//
//   token-classification  → TokenClassification (labels padded)
//   sequence-to-sequence  → Seq2Seq             (labels padded)
//   everything else       → WithPadding         (inputs only)
//
// Seq2Seq pads targets that are already token ids. Text targets,
// which the aligner copies through untokenized, are left as-is.
//
// The remaining named collators can be chosen explicitly by name.
// They pad like the language-modeling collator: labels become a
// copy of the inputs with padding ignored. Masking itself belongs
// to the training framework.
//
// Padding always goes to the longest feature in the list, on the
// tokenizer's padding side. Label vectors are padded with
// IGNORE_INDEX so padded positions never reach the loss.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::batch::{Feature, IGNORE_INDEX};
use crate::domain::task_type::TaskType;
use crate::domain::traits::PaddingSide;
use crate::error::{FinetuneError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataCollator {
    WithPadding,
    Sop,
    LanguageModeling,
    TokenClassification,
    #[serde(rename = "sequence-to-sequence")]
    Seq2Seq,
    PermutationLanguageModeling,
    WholeWordMask,
}

impl DataCollator {
    /// Collators that can be selected by name
    pub const NAMED: [DataCollator; 6] = [
        DataCollator::Sop,
        DataCollator::LanguageModeling,
        DataCollator::TokenClassification,
        DataCollator::Seq2Seq,
        DataCollator::PermutationLanguageModeling,
        DataCollator::WholeWordMask,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataCollator::WithPadding                 => "with-padding",
            DataCollator::Sop                         => "sop",
            DataCollator::LanguageModeling            => "language-modeling",
            DataCollator::TokenClassification         => "token-classification",
            DataCollator::Seq2Seq                     => "sequence-to-sequence",
            DataCollator::PermutationLanguageModeling => "permutation-language-modeling",
            DataCollator::WholeWordMask               => "whole-word-mask",
        }
    }

    /// Whether per-token labels are padded alongside the inputs
    fn pads_labels(&self) -> bool {
        matches!(self, DataCollator::TokenClassification | DataCollator::Seq2Seq)
    }

    /// Whether labels are derived from the inputs
    fn labels_from_inputs(&self) -> bool {
        matches!(
            self,
            DataCollator::Sop
                | DataCollator::LanguageModeling
                | DataCollator::PermutationLanguageModeling
                | DataCollator::WholeWordMask
        )
    }

    /// Pad every feature to the longest one in the list
    pub fn collate(&self, features: &[Feature], pad_token_id: u32, side: PaddingSide) -> Result<Vec<Feature>> {
        let longest = features.iter().map(|f| f.input_ids.len()).max().unwrap_or(0);

        features
            .iter()
            .enumerate()
            .map(|(row, feature)| {
                let missing = longest - feature.input_ids.len();
                let mut out = feature.clone();

                pad(&mut out.input_ids, missing, pad_token_id, side);
                pad(&mut out.attention_mask, missing, 0, side);
                if !out.token_type_ids.is_empty() {
                    pad(&mut out.token_type_ids, missing, 0, side);
                }
                if let Some(offsets) = out.offset_mapping.as_mut() {
                    pad(offsets, missing, None, side);
                }
                if let Some(heads) = out.head_labels.as_mut() {
                    pad(heads, missing, IGNORE_INDEX, side);
                }
                if let Some(deprels) = out.dp_labels.as_mut() {
                    pad(deprels, missing, IGNORE_INDEX, side);
                }

                if self.labels_from_inputs() {
                    let labels: Vec<i64> = out
                        .input_ids
                        .iter()
                        .zip(&out.attention_mask)
                        .map(|(&id, &mask)| if mask == 0 { IGNORE_INDEX } else { i64::from(id) })
                        .collect();
                    out.labels = Some(Value::from(labels));
                } else if self.pads_labels() {
                    if let Some(labels) = out.labels.take() {
                        out.labels = Some(self.pad_labels(row, labels, longest, side)?);
                    }
                }

                Ok(out)
            })
            .collect()
    }

    fn pad_labels(&self, row: usize, labels: Value, longest: usize, side: PaddingSide) -> Result<Value> {
        let mut ids = match token_labels(row, &labels) {
            Ok(ids) => ids,
            Err(_) if *self == DataCollator::Seq2Seq => return Ok(labels),
            Err(e) => return Err(e),
        };
        let missing = longest.saturating_sub(ids.len());
        pad(&mut ids, missing, IGNORE_INDEX, side);
        Ok(Value::from(ids))
    }
}

impl fmt::Display for DataCollator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataCollator {
    type Err = FinetuneError;

    fn from_str(s: &str) -> Result<Self> {
        std::iter::once(DataCollator::WithPadding)
            .chain(DataCollator::NAMED)
            .find(|c| c.as_str() == s)
            .ok_or_else(|| FinetuneError::UnknownCollator(s.to_string()))
    }
}

/// Collator for a task type. Never fails.
pub fn get_data_collator(task_type: TaskType) -> DataCollator {
    match task_type {
        TaskType::TokenClassification => DataCollator::TokenClassification,
        TaskType::SequenceToSequence  => DataCollator::Seq2Seq,
        _                             => DataCollator::WithPadding,
    }
}

fn pad<T: Clone>(values: &mut Vec<T>, missing: usize, value: T, side: PaddingSide) {
    let fill = std::iter::repeat(value).take(missing);
    match side {
        PaddingSide::Right => values.extend(fill),
        PaddingSide::Left  => {
            values.splice(0..0, fill);
        }
    }
}

fn token_labels(row: usize, labels: &Value) -> Result<Vec<i64>> {
    labels
        .as_array()
        .and_then(|items| items.iter().map(Value::as_i64).collect::<Option<Vec<_>>>())
        .ok_or_else(|| FinetuneError::invalid_example("labels", row, "expected a list of integer labels"))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(ids: &[u32], labels: Option<Value>) -> Feature {
        Feature {
            input_ids:      ids.to_vec(),
            attention_mask: vec![1; ids.len()],
            labels,
            ..Feature::default()
        }
    }

    #[test]
    fn test_collator_for_task_type() {
        assert_eq!(get_data_collator(TaskType::TokenClassification), DataCollator::TokenClassification);
        assert_eq!(get_data_collator(TaskType::SequenceToSequence), DataCollator::Seq2Seq);
        assert_eq!(get_data_collator(TaskType::QuestionAnswering), DataCollator::WithPadding);
        assert_eq!(get_data_collator(TaskType::DependencyParsing), DataCollator::WithPadding);
    }

    #[test]
    fn test_named_collators_parse() {
        for collator in DataCollator::NAMED {
            assert_eq!(collator.as_str().parse::<DataCollator>().unwrap(), collator);
        }
        assert!(matches!("mlm".parse::<DataCollator>(), Err(FinetuneError::UnknownCollator(_))));
    }

    #[test]
    fn test_with_padding_keeps_scalar_labels() {
        let features = vec![feature(&[5, 6, 7], Some(json!(1))), feature(&[5], Some(json!(0)))];
        let out = DataCollator::WithPadding.collate(&features, 0, PaddingSide::Right).unwrap();

        assert_eq!(out[1].input_ids, vec![5, 0, 0]);
        assert_eq!(out[1].attention_mask, vec![1, 0, 0]);
        assert_eq!(out[1].labels, Some(json!(0)));
    }

    #[test]
    fn test_token_classification_pads_labels_with_ignore_index() {
        let features = vec![
            feature(&[101, 7, 102], Some(json!([-100, 3, -100]))),
            feature(&[101, 102], Some(json!([-100, -100]))),
        ];
        let out = DataCollator::TokenClassification.collate(&features, 0, PaddingSide::Left).unwrap();

        assert_eq!(out[1].input_ids, vec![0, 101, 102]);
        assert_eq!(out[1].labels, Some(json!([-100, -100, -100])));
        assert_eq!(out[0], features[0]);
    }

    #[test]
    fn test_language_modeling_labels_copy_inputs() {
        let features = vec![feature(&[4, 5], None), feature(&[6], None)];
        let out = DataCollator::LanguageModeling.collate(&features, 0, PaddingSide::Right).unwrap();
        assert_eq!(out[1].labels, Some(json!([6, -100])));
    }

    #[test]
    fn test_seq2seq_pads_id_targets_and_keeps_text_targets() {
        let features = vec![
            feature(&[5, 6, 7], Some(json!([8, 9]))),
            feature(&[5], Some(json!([4]))),
        ];
        let out = DataCollator::Seq2Seq.collate(&features, 0, PaddingSide::Right).unwrap();
        assert_eq!(out[0].labels, Some(json!([8, 9, -100])));
        assert_eq!(out[1].labels, Some(json!([4, -100, -100])));

        let features = vec![feature(&[5, 6], Some(json!("요약문"))), feature(&[5], Some(json!("짧은 요약")))];
        let out = DataCollator::Seq2Seq.collate(&features, 0, PaddingSide::Right).unwrap();
        assert_eq!(out[0].labels, Some(json!("요약문")));
        assert_eq!(out[1].input_ids, vec![5, 0]);
    }

    #[test]
    fn test_token_labels_must_be_integers() {
        let features = vec![feature(&[1], Some(json!("B-PS")))];
        assert!(DataCollator::TokenClassification.collate(&features, 0, PaddingSide::Right).is_err());
    }
}
