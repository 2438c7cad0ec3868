// ============================================================
// Layer 4 — Feature Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<Feature> into
// tensors for an external training loop.
//
// How batching works here:
//   Input:  N Features, possibly of different lengths
//   Step 1: the task's DataCollator pads them to the longest (S)
//   Step 2: every sequence column is flattened and reshaped
//
//   [f1_t1, f1_t2, ..., f1_tS, f2_t1, ..., fN_tS] → [N, S]
//
// Label columns depend on the task:
//   class ids            → Int   [N]
//   similarity scores    → Float [N]
//   per-token labels     → Int   [N, S]
//   QA start/end         → Int   [N] each
//   DP head / relation   → Int   [N, S] each
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};
use serde_json::Value;

use crate::data::collator::DataCollator;
use crate::domain::batch::Feature;
use crate::domain::traits::PaddingSide;
use crate::error::{FinetuneError, Result};

// ─── FeatureBatch ─────────────────────────────────────────────────────────────
/// Label tensor of a batch, shaped by what the features carry
#[derive(Debug, Clone)]
pub enum BatchLabels<B: Backend> {
    /// One class id per feature — shape: [batch_size]
    Classes(Tensor<B, 1, Int>),
    /// One regression target per feature — shape: [batch_size]
    Scores(Tensor<B, 1>),
    /// One label per token — shape: [batch_size, seq_len]
    Tokens(Tensor<B, 2, Int>),
}

/// All tensors have batch_size as their first dimension
#[derive(Debug, Clone)]
pub struct FeatureBatch<B: Backend> {
    /// Token ID sequences — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape: [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Segment ids, when the tokenizer produces them
    pub token_type_ids: Option<Tensor<B, 2, Int>>,

    pub labels: Option<BatchLabels<B>>,

    pub head_labels: Option<Tensor<B, 2, Int>>,
    pub dp_labels:   Option<Tensor<B, 2, Int>>,

    pub start_positions: Option<Tensor<B, 1, Int>>,
    pub end_positions:   Option<Tensor<B, 1, Int>>,
}

// ─── FeatureBatcher ───────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct FeatureBatcher<B: Backend> {
    pub device:       B::Device,
    pub collator:     DataCollator,
    pub pad_token_id: u32,
    pub padding_side: PaddingSide,
}

impl<B: Backend> FeatureBatcher<B> {
    pub fn new(device: B::Device, collator: DataCollator) -> Self {
        Self {
            device,
            collator,
            pad_token_id: 0,
            padding_side: PaddingSide::Right,
        }
    }

    pub fn with_padding(mut self, pad_token_id: u32, padding_side: PaddingSide) -> Self {
        self.pad_token_id = pad_token_id;
        self.padding_side = padding_side;
        self
    }

    /// Collate and convert, reporting malformed features as errors
    pub fn try_batch(&self, items: Vec<Feature>) -> Result<FeatureBatch<B>> {
        if items.is_empty() {
            return Err(FinetuneError::config("cannot build a batch from zero features"));
        }
        let items = self.collator.collate(&items, self.pad_token_id, self.padding_side)?;
        let seq_len = items[0].input_ids.len();

        // ── Model inputs ──────────────────────────────────────────────────────
        let input_ids      = self.matrix("input_ids", items.iter().map(|f| widen(&f.input_ids)).collect(), seq_len)?;
        let attention_mask = self.matrix("attention_mask", items.iter().map(|f| widen(&f.attention_mask)).collect(), seq_len)?;

        let token_type_ids = if items.iter().all(|f| f.token_type_ids.is_empty()) {
            None
        } else {
            Some(self.matrix("token_type_ids", items.iter().map(|f| widen(&f.token_type_ids)).collect(), seq_len)?)
        };

        // ── Dependency parsing labels ─────────────────────────────────────────
        let head_labels = all_some(items.iter().map(|f| f.head_labels.clone()))
            .map(|rows| self.matrix("head_labels", rows, seq_len))
            .transpose()?;
        let dp_labels = all_some(items.iter().map(|f| f.dp_labels.clone()))
            .map(|rows| self.matrix("dp_labels", rows, seq_len))
            .transpose()?;

        // ── Question answering positions ──────────────────────────────────────
        let start_positions = all_some(items.iter().map(|f| f.start_position.map(|p| p as i64)))
            .map(|v| self.vector(&v));
        let end_positions = all_some(items.iter().map(|f| f.end_position.map(|p| p as i64)))
            .map(|v| self.vector(&v));

        // ── Labels ────────────────────────────────────────────────────────────
        let labels = match all_some(items.iter().map(|f| f.labels.clone())) {
            Some(values) => Some(self.labels(&values, seq_len)?),
            None => None,
        };

        Ok(FeatureBatch {
            input_ids,
            attention_mask,
            token_type_ids,
            labels,
            head_labels,
            dp_labels,
            start_positions,
            end_positions,
        })
    }

    /// Stack equal-length rows into [rows, seq_len]
    fn matrix(&self, column: &str, rows: Vec<Vec<i64>>, seq_len: usize) -> Result<Tensor<B, 2, Int>> {
        if let Some((row, values)) = rows.iter().enumerate().find(|(_, r)| r.len() != seq_len) {
            return Err(FinetuneError::invalid_example(
                column,
                row,
                format!("expected {seq_len} values, found {}", values.len()),
            ));
        }
        let batch_size = rows.len();
        let flat: Vec<i64> = rows.into_iter().flatten().collect();
        Ok(Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape([batch_size, seq_len]))
    }

    fn vector(&self, values: &[i64]) -> Tensor<B, 1, Int> {
        Tensor::<B, 1, Int>::from_ints(values, &self.device)
    }

    fn labels(&self, values: &[Value], seq_len: usize) -> Result<BatchLabels<B>> {
        if values.iter().all(Value::is_array) {
            let rows = values
                .iter()
                .enumerate()
                .map(|(row, v)| {
                    v.as_array()
                        .into_iter()
                        .flatten()
                        .map(Value::as_i64)
                        .collect::<Option<Vec<i64>>>()
                        .ok_or_else(|| FinetuneError::invalid_example("labels", row, "token labels must be integers"))
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(BatchLabels::Tokens(self.matrix("labels", rows, seq_len)?));
        }

        if let Some(classes) = values.iter().map(Value::as_i64).collect::<Option<Vec<i64>>>() {
            return Ok(BatchLabels::Classes(self.vector(&classes)));
        }

        let scores = values
            .iter()
            .enumerate()
            .map(|(row, v)| {
                v.as_f64()
                    .map(|s| s as f32)
                    .ok_or_else(|| FinetuneError::invalid_example("labels", row, "labels must be numbers or lists of numbers"))
            })
            .collect::<Result<Vec<f32>>>()?;
        Ok(BatchLabels::Scores(Tensor::<B, 1>::from_floats(scores.as_slice(), &self.device)))
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
// The DataLoader calls .batch(items) with each mini-batch. The trait
// has no error channel, so malformed features abort the loader.
impl<B: Backend> Batcher<Feature, FeatureBatch<B>> for FeatureBatcher<B> {
    fn batch(&self, items: Vec<Feature>) -> FeatureBatch<B> {
        match self.try_batch(items) {
            Ok(batch) => batch,
            Err(e) => panic!("cannot batch features: {e}"),
        }
    }
}

fn widen(ids: &[u32]) -> Vec<i64> {
    ids.iter().map(|&x| i64::from(x)).collect()
}

/// Some(values) only when every item has a value
fn all_some<T>(items: impl Iterator<Item = Option<T>>) -> Option<Vec<T>> {
    items.collect()
}
