// ============================================================
// Layer 3 — Example and Feature Batches
// ============================================================
// Two column-oriented containers:
//
//   ExampleBatch   — raw examples as they come out of a dataset:
//                    column name → one JSON value per example
//
//   TokenizedBatch — what an aligner returns: token ids, masks,
//                    offsets and the aligned label columns, one
//                    entry per tokenized span
//
// A TokenizedBatch can be split into row-shaped Features, which
// is what gets written to disk and what the collator pads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::traits::{EncodedSpan, TextInput};
use crate::error::{FinetuneError, Result};

/// Sentinel for positions the loss must skip
pub const IGNORE_INDEX: i64 = -100;

// ─── ExampleBatch ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExampleBatch {
    columns: BTreeMap<String, Vec<Value>>,
}

impl ExampleBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a batch from row objects. Columns are the union of all
    /// keys; a row without a key gets null in that column.
    pub fn from_rows(rows: &[Value]) -> Result<Self> {
        let mut names: Vec<&str> = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let object = row.as_object().ok_or_else(|| {
                FinetuneError::invalid_example("<row>", i, "example rows must be JSON objects")
            })?;
            for key in object.keys() {
                if !names.contains(&key.as_str()) {
                    names.push(key.as_str());
                }
            }
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let values = rows
                    .iter()
                    .map(|row| row.get(name).cloned().unwrap_or(Value::Null))
                    .collect();
                (name.to_string(), values)
            })
            .collect();

        Ok(Self { columns })
    }

    /// Add or replace a column
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<Value>) {
        self.columns.insert(name.into(), values);
    }

    pub fn with_column(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.insert(name, values);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// A column the caller cannot do without
    pub fn column(&self, name: &str) -> Result<&[Value]> {
        self.get(name).ok_or_else(|| FinetuneError::missing_column(name))
    }

    /// One cell of a column. A column shorter than the row asked
    /// for is an invalid example.
    pub fn cell(&self, name: &str, row: usize) -> Result<&Value> {
        self.column(name)?.get(row).ok_or_else(|| {
            FinetuneError::invalid_example(name, row, "column is shorter than the batch")
        })
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Number of examples (all columns share one length)
    pub fn len(&self) -> usize {
        self.columns.values().next().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a text column as tokenizer input. Pre-split columns
    /// hold arrays of strings, raw columns hold strings.
    pub fn texts(&self, name: &str, split_into_words: bool) -> Result<Vec<TextInput>> {
        self.column(name)?
            .iter()
            .enumerate()
            .map(|(row, value)| text_input(name, row, value, split_into_words))
            .collect()
    }
}

fn text_input(column: &str, row: usize, value: &Value, split_into_words: bool) -> Result<TextInput> {
    if split_into_words {
        let words = value
            .as_array()
            .ok_or_else(|| FinetuneError::invalid_example(column, row, "expected a list of words"))?
            .iter()
            .map(|w| {
                w.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| FinetuneError::invalid_example(column, row, "words must be strings"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TextInput::Words(words))
    } else {
        value
            .as_str()
            .map(|s| TextInput::Text(s.to_string()))
            .ok_or_else(|| FinetuneError::invalid_example(column, row, "expected a string"))
    }
}

// ─── TokenizedBatch ───────────────────────────────────────────────────────────

/// Label column of a tokenized batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Labels {
    /// One label per token, IGNORE_INDEX where the loss skips
    Tokens(Vec<Vec<i64>>),
    /// Example-level labels copied through unchanged
    Passthrough(Vec<Value>),
}

impl Labels {
    pub fn len(&self) -> usize {
        match self {
            Labels::Tokens(rows)      => rows.len(),
            Labels::Passthrough(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn row(&self, i: usize) -> Option<Value> {
        match self {
            Labels::Tokens(rows)      => rows.get(i).map(|r| Value::from(r.clone())),
            Labels::Passthrough(rows) => rows.get(i).cloned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenizedBatch {
    pub input_ids:      Vec<Vec<u32>>,
    pub attention_mask: Vec<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub token_type_ids: Vec<Vec<u32>>,

    /// Character offsets; None marks tokens outside the context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_mapping: Option<Vec<Vec<Option<(usize, usize)>>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_labels: Option<Vec<Vec<i64>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp_labels: Option<Vec<Vec<i64>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_positions: Option<Vec<usize>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_positions: Option<Vec<usize>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_id: Option<Vec<Value>>,
}

impl TokenizedBatch {
    /// Copy the model inputs out of encoded spans
    pub fn from_spans(spans: &[EncodedSpan]) -> Self {
        Self {
            input_ids:      spans.iter().map(|s| s.input_ids.clone()).collect(),
            attention_mask: spans.iter().map(|s| s.attention_mask.clone()).collect(),
            token_type_ids: spans.iter().map(|s| s.token_type_ids.clone()).collect(),
            ..Self::default()
        }
    }

    /// Number of tokenized spans
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Split into one Feature per span
    pub fn features(&self) -> Vec<Feature> {
        (0..self.len())
            .map(|i| Feature {
                input_ids:       self.input_ids[i].clone(),
                attention_mask:  self.attention_mask.get(i).cloned().unwrap_or_default(),
                token_type_ids:  self.token_type_ids.get(i).cloned().unwrap_or_default(),
                offset_mapping:  self.offset_mapping.as_ref().and_then(|m| m.get(i).cloned()),
                labels:          self.labels.as_ref().and_then(|l| l.row(i)),
                head_labels:     self.head_labels.as_ref().and_then(|l| l.get(i).cloned()),
                dp_labels:       self.dp_labels.as_ref().and_then(|l| l.get(i).cloned()),
                start_position:  self.start_positions.as_ref().and_then(|p| p.get(i).copied()),
                end_position:    self.end_positions.as_ref().and_then(|p| p.get(i).copied()),
                example_id:      self.example_id.as_ref().and_then(|ids| ids.get(i).cloned()),
            })
            .collect()
    }
}

// ─── Feature ──────────────────────────────────────────────────────────────────
/// One model-ready row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub token_type_ids: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_mapping: Option<Vec<Option<(usize, usize)>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels:         Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_labels:    Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp_labels:      Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_position:   Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_id:     Option<Value>,
}
