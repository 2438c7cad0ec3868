// ============================================================
// Layer 4 — Per-Task Preprocessing
// ============================================================
// Reshapes raw example batches before they reach the aligner.
// Only three catalog tasks need this; every other task uses
// PreprocessFunction::Identity.
//
//   klue-sts  labels: {"label": 3.2, "binary-label": 1, ...}
//             → label: 3.2
//
//   klue-re   sentence + subject_entity / object_entity spans
//             → "<subj>이순신</subj>은 <obj>조선</obj> 중기의 무신이다."
//
//   klue-mrc  train: unchanged, validation: not preprocessed
//
// Reference: Rust Book §8 (Strings in Rust)

use serde_json::Value;

use crate::domain::batch::ExampleBatch;
use crate::domain::hooks::{PreprocessFunction, Split};
use crate::error::{FinetuneError, Result};

pub const SUBJECT_START: &str = "<subj>";
pub const SUBJECT_END:   &str = "</subj>";
pub const OBJECT_START:  &str = "<obj>";
pub const OBJECT_END:    &str = "</obj>";

const STS_SOURCE:      &str = "labels";
const STS_TARGET:      &str = "label";
const RE_SENTENCE:     &str = "sentence";
const RE_SUBJECT:      &str = "subject_entity";
const RE_OBJECT:       &str = "object_entity";

impl PreprocessFunction {
    /// Whether the hook runs on a split at all
    pub fn applies_to(&self, split: Split) -> bool {
        !matches!((self, split), (PreprocessFunction::KlueMrc, Split::Validation))
    }

    /// Run the hook over one batch. Splits the hook does not apply
    /// to come back unchanged.
    pub fn apply(&self, split: Split, batch: ExampleBatch) -> Result<ExampleBatch> {
        if !self.applies_to(split) {
            return Ok(batch);
        }
        match self {
            PreprocessFunction::Identity | PreprocessFunction::KlueMrc => Ok(batch),
            PreprocessFunction::KlueSts => klue_sts(batch),
            PreprocessFunction::KlueRe  => klue_re(batch),
        }
    }
}

// ── klue-sts ──────────────────────────────────────────────────────────────────

fn klue_sts(mut batch: ExampleBatch) -> Result<ExampleBatch> {
    let scores = batch
        .column(STS_SOURCE)?
        .iter()
        .enumerate()
        .map(|(row, value)| {
            value
                .get(STS_TARGET)
                .and_then(Value::as_f64)
                .map(Value::from)
                .ok_or_else(|| {
                    FinetuneError::invalid_example(STS_SOURCE, row, "expected a numeric 'label' field")
                })
        })
        .collect::<Result<Vec<_>>>()?;

    batch.insert(STS_TARGET, scores);
    Ok(batch)
}

// ── klue-re ───────────────────────────────────────────────────────────────────

/// Character span of an entity, end inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntitySpan {
    start: usize,
    end:   usize,
}

impl EntitySpan {
    fn parse(column: &str, row: usize, value: &Value) -> Result<Self> {
        let index = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_u64)
                .map(|v| v as usize)
                .ok_or_else(|| FinetuneError::invalid_example(column, row, format!("missing '{key}'")))
        };
        let span = Self { start: index("start_idx")?, end: index("end_idx")? };
        if span.end < span.start {
            return Err(FinetuneError::invalid_example(column, row, "end_idx is before start_idx"));
        }
        Ok(span)
    }
}

fn klue_re(mut batch: ExampleBatch) -> Result<ExampleBatch> {
    let marked = batch
        .column(RE_SENTENCE)?
        .iter()
        .enumerate()
        .map(|(row, sentence)| {
            let text = sentence.as_str().ok_or_else(|| {
                FinetuneError::invalid_example(RE_SENTENCE, row, "expected a string")
            })?;
            let subject = EntitySpan::parse(RE_SUBJECT, row, batch.cell(RE_SUBJECT, row)?)?;
            let object = EntitySpan::parse(RE_OBJECT, row, batch.cell(RE_OBJECT, row)?)?;
            mark_entities(text, subject, object, row).map(Value::String)
        })
        .collect::<Result<Vec<_>>>()?;

    batch.insert(RE_SENTENCE, marked);
    Ok(batch)
}

/// Insert the four markers. Insertions are applied from the back
/// of the sentence so earlier character indices stay valid.
fn mark_entities(text: &str, subject: EntitySpan, object: EntitySpan, row: usize) -> Result<String> {
    let mut chars: Vec<char> = text.chars().collect();
    for span in [subject, object] {
        if span.end >= chars.len() {
            return Err(FinetuneError::invalid_example(
                RE_SENTENCE,
                row,
                format!("entity ends at {} but the sentence has {} characters", span.end, chars.len()),
            ));
        }
    }

    let mut inserts = vec![
        (subject.start, SUBJECT_START),
        (subject.end + 1, SUBJECT_END),
        (object.start, OBJECT_START),
        (object.end + 1, OBJECT_END),
    ];
    // Back to front; at equal positions a closing marker goes last
    inserts.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| is_closing(a.1).cmp(&is_closing(b.1))));

    for (at, marker) in inserts {
        chars.splice(at..at, marker.chars());
    }
    Ok(chars.into_iter().collect())
}

fn is_closing(marker: &str) -> bool {
    marker.starts_with("</")
}
