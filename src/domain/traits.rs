// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The tokenizer is an external collaborator. The aligners only
// need a handful of capabilities from it, captured here as the
// TextTokenizer trait:
//
//   - batch encoding with truncation, padding, stride and
//     overflow tracking
//   - per-token character offsets
//   - per-token source-word index (None for special tokens)
//   - per-token sequence index (question vs. context)
//   - the classification-token id and the padding side
//
// Implementations:
//   - HfTokenizer   → infra/tokenizer_store.rs (tokenizers crate)
//   - FakeTokenizer → test_support.rs (deterministic, tests only)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ─── Encode inputs and options ────────────────────────────────────────────────

/// One text field of one example, either raw or already split
/// into words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextInput {
    Text(String),
    Words(Vec<String>),
}

/// How sequences in a batch are padded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    /// Pad to the longest sequence in the batch
    #[default]
    Longest,
    /// Pad to `max_length` (falls back to longest when unset)
    MaxLength,
    DoNotPad,
}

/// Which side padding tokens are added on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingSide {
    Left,
    #[default]
    Right,
}

/// Which sequence of a pair gives up tokens when truncating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationStrategy {
    LongestFirst,
    OnlyFirst,
    OnlySecond,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    /// Maximum span length including special tokens
    pub max_length: Option<usize>,
    /// None disables truncation
    pub truncation: Option<TruncationStrategy>,
    pub padding: Padding,
    /// Tokens shared between consecutive overflow spans
    pub stride: usize,
    /// Emit every window of a truncated example, not just the first
    pub return_overflowing_tokens: bool,
}

// ─── Encode output ────────────────────────────────────────────────────────────

/// One tokenized span. Without overflow there is exactly one span
/// per input example; with overflow an example may produce several,
/// all sharing the same `sample_index`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedSpan {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub token_type_ids: Vec<u32>,
    /// Character offsets into the source text; (0, 0) for special tokens
    pub offsets:        Vec<(usize, usize)>,
    /// Source word of each token; None for special and padding tokens
    pub word_ids:       Vec<Option<usize>>,
    /// 0 for the first sequence, 1 for the second, None otherwise
    pub sequence_ids:   Vec<Option<usize>>,
    /// Index of the example this span came from
    pub sample_index:   usize,
}

impl EncodedSpan {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

// ─── TextTokenizer ────────────────────────────────────────────────────────────
/// The tokenization capability the example aligners run on.
///
/// Spans are returned grouped by example in input order, with the
/// overflow windows of an example directly after its first window.
pub trait TextTokenizer {
    /// Encode a batch of single texts or text pairs.
    /// `second`, when given, has the same length as `first`.
    fn encode_batch(
        &self,
        first:   Vec<TextInput>,
        second:  Option<Vec<TextInput>>,
        options: &EncodeOptions,
    ) -> Result<Vec<EncodedSpan>>;

    /// Id of the classification token ([CLS] or equivalent)
    fn cls_token_id(&self) -> Option<u32>;

    fn padding_side(&self) -> PaddingSide;
}
