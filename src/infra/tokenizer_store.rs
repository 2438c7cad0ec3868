// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads HuggingFace tokenizer JSON files and adapts them to the
// TextTokenizer trait the aligners are written against.
//
// Per call, a clone of the loaded tokenizer is configured with
// the requested truncation and padding, so the stored tokenizer
// is never mutated and concurrent calls do not interfere.
//
// Overflowing spans produced by striding are flattened into the
// output right after the span they came from, tagged with the
// index of the example they belong to.
//
// Offsets are character offsets (encode_batch_char_offsets), which
// is what the answer spans in the datasets are expressed in.

use std::path::Path;

use tokenizers::{
    EncodeInput, Encoding, InputSequence, PaddingDirection, PaddingParams, PaddingStrategy,
    Tokenizer, TruncationDirection, TruncationParams,
    TruncationStrategy as HfTruncationStrategy,
};

use crate::domain::traits::{
    EncodeOptions, EncodedSpan, Padding, PaddingSide, TextInput, TextTokenizer, TruncationStrategy,
};
use crate::error::{FinetuneError, Result};

/// Classification tokens of BERT-style and RoBERTa-style vocabularies
const CLS_TOKENS: [&str; 2] = ["[CLS]", "<s>"];

#[derive(Clone)]
pub struct HfTokenizer {
    inner: Tokenizer,
}

impl HfTokenizer {
    pub fn new(inner: Tokenizer) -> Self {
        Self { inner }
    }

    /// Load a tokenizer.json file, or `<dir>/tokenizer.json`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = if path.is_dir() { path.join("tokenizer.json") } else { path.to_path_buf() };
        let inner = Tokenizer::from_file(&file).map_err(|e| {
            FinetuneError::tokenizer(format!("cannot load tokenizer from '{}': {e}", file.display()))
        })?;
        tracing::info!("Loaded tokenizer from '{}'", file.display());
        Ok(Self { inner })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let inner: Tokenizer = json
            .parse()
            .map_err(|e| FinetuneError::tokenizer(format!("malformed tokenizer JSON: {e}")))?;
        Ok(Self { inner })
    }

    pub fn inner(&self) -> &Tokenizer {
        &self.inner
    }

    pub fn pad_token_id(&self) -> u32 {
        self.inner.get_padding().map_or(0, |p| p.pad_id)
    }

    /// A clone of the tokenizer set up for one encode call
    fn configured(&self, options: &EncodeOptions) -> Result<Tokenizer> {
        let mut tokenizer = self.inner.clone();

        let truncation = match (options.truncation, options.max_length) {
            (Some(strategy), Some(max_length)) => Some(TruncationParams {
                direction: TruncationDirection::Right,
                max_length,
                strategy: match strategy {
                    TruncationStrategy::LongestFirst => HfTruncationStrategy::LongestFirst,
                    TruncationStrategy::OnlyFirst    => HfTruncationStrategy::OnlyFirst,
                    TruncationStrategy::OnlySecond   => HfTruncationStrategy::OnlySecond,
                },
                stride: options.stride,
            }),
            _ => None,
        };
        tokenizer
            .with_truncation(truncation)
            .map_err(|e| FinetuneError::tokenizer(e.to_string()))?;

        let base = self.inner.get_padding().cloned().unwrap_or_default();
        let padding = match (options.padding, options.max_length) {
            (Padding::DoNotPad, _) => None,
            (Padding::MaxLength, Some(max_length)) => Some(PaddingParams {
                strategy: PaddingStrategy::Fixed(max_length),
                ..base
            }),
            _ => Some(PaddingParams { strategy: PaddingStrategy::BatchLongest, ..base }),
        };
        tokenizer.with_padding(padding);

        Ok(tokenizer)
    }
}

fn sequence(input: TextInput) -> InputSequence<'static> {
    match input {
        TextInput::Text(text)   => text.into(),
        TextInput::Words(words) => words.into(),
    }
}

fn to_span(encoding: &Encoding, sample_index: usize) -> EncodedSpan {
    EncodedSpan {
        input_ids:      encoding.get_ids().to_vec(),
        attention_mask: encoding.get_attention_mask().to_vec(),
        token_type_ids: encoding.get_type_ids().to_vec(),
        offsets:        encoding.get_offsets().to_vec(),
        word_ids:       encoding.get_word_ids().iter().map(|w| w.map(|w| w as usize)).collect(),
        sequence_ids:   encoding.get_sequence_ids(),
        sample_index,
    }
}

impl TextTokenizer for HfTokenizer {
    fn encode_batch(
        &self,
        first:   Vec<TextInput>,
        second:  Option<Vec<TextInput>>,
        options: &EncodeOptions,
    ) -> Result<Vec<EncodedSpan>> {
        let inputs: Vec<EncodeInput<'static>> = match second {
            None => first.into_iter().map(|a| EncodeInput::Single(sequence(a))).collect(),
            Some(second) => {
                if second.len() != first.len() {
                    return Err(FinetuneError::tokenizer(format!(
                        "{} first sequences but {} second sequences",
                        first.len(),
                        second.len()
                    )));
                }
                first
                    .into_iter()
                    .zip(second)
                    .map(|(a, b)| EncodeInput::Dual(sequence(a), sequence(b)))
                    .collect()
            }
        };

        let tokenizer = self.configured(options)?;
        let encodings = tokenizer
            .encode_batch_char_offsets(inputs, true)
            .map_err(|e| FinetuneError::tokenizer(e.to_string()))?;

        let mut spans = Vec::with_capacity(encodings.len());
        for (sample_index, mut encoding) in encodings.into_iter().enumerate() {
            let overflowing = encoding.take_overflowing();
            spans.push(to_span(&encoding, sample_index));
            if options.return_overflowing_tokens {
                spans.extend(overflowing.iter().map(|o| to_span(o, sample_index)));
            }
        }
        Ok(spans)
    }

    fn cls_token_id(&self) -> Option<u32> {
        CLS_TOKENS.iter().find_map(|token| self.inner.token_to_id(token))
    }

    fn padding_side(&self) -> PaddingSide {
        match self.inner.get_padding().map(|p| p.direction) {
            Some(PaddingDirection::Left) => PaddingSide::Left,
            _                            => PaddingSide::Right,
        }
    }
}
