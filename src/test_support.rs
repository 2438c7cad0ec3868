// Deterministic tokenizer for unit tests.
//
// Words are split on whitespace (or taken as given when the input
// is pre-split) and every word is cut into pieces of at most
// `piece_len` characters:
//
//   "hello world" (piece_len 3) → [CLS] hel lo wor ld [SEP]
//
// Pairs are laid out as [CLS] a [SEP] b [SEP]. Truncation,
// striding and padding follow the usual sliding-window rules so
// overflow behaviour can be tested without a tokenizer file.

use crate::domain::traits::{
    EncodeOptions, EncodedSpan, Padding, PaddingSide, TextInput, TextTokenizer,
    TruncationStrategy,
};
use crate::error::{FinetuneError, Result};

pub const CLS_ID: u32 = 101;
pub const SEP_ID: u32 = 102;
pub const PAD_ID: u32 = 0;

#[derive(Debug, Clone)]
pub struct FakeTokenizer {
    pub piece_len:    usize,
    pub padding_side: PaddingSide,
}

impl Default for FakeTokenizer {
    fn default() -> Self {
        Self { piece_len: 3, padding_side: PaddingSide::Right }
    }
}

#[derive(Debug, Clone, Copy)]
struct Piece {
    id:      u32,
    offsets: (usize, usize),
    word:    usize,
}

impl FakeTokenizer {
    pub fn new(piece_len: usize) -> Self {
        Self { piece_len, ..Self::default() }
    }

    pub fn left_padded(piece_len: usize) -> Self {
        Self { piece_len, padding_side: PaddingSide::Left }
    }

    fn pieces(&self, input: &TextInput) -> Vec<Piece> {
        // (start char offset, characters) per word
        let words: Vec<(usize, Vec<char>)> = match input {
            TextInput::Text(text) => {
                let mut words = Vec::new();
                let mut current: Option<(usize, Vec<char>)> = None;
                for (i, c) in text.chars().enumerate() {
                    if c.is_whitespace() {
                        if let Some(word) = current.take() {
                            words.push(word);
                        }
                    } else {
                        current.get_or_insert_with(|| (i, Vec::new())).1.push(c);
                    }
                }
                words.extend(current);
                words
            }
            TextInput::Words(words) => words.iter().map(|w| (0, w.chars().collect())).collect(),
        };

        let mut pieces = Vec::new();
        for (word, (start, chars)) in words.iter().enumerate() {
            for (k, chunk) in chars.chunks(self.piece_len).enumerate() {
                let begin = start + k * self.piece_len;
                pieces.push(Piece {
                    id:      1000 + chunk.len() as u32,
                    offsets: (begin, begin + chunk.len()),
                    word,
                });
            }
        }
        pieces
    }

    fn assemble(first: &[Piece], second: Option<&[Piece]>, sample_index: usize) -> EncodedSpan {
        let mut span = EncodedSpan { sample_index, ..EncodedSpan::default() };
        let special = |span: &mut EncodedSpan, id: u32, type_id: u32| {
            span.input_ids.push(id);
            span.token_type_ids.push(type_id);
            span.offsets.push((0, 0));
            span.word_ids.push(None);
            span.sequence_ids.push(None);
        };
        let content = |span: &mut EncodedSpan, pieces: &[Piece], seq: usize| {
            for p in pieces {
                span.input_ids.push(p.id);
                span.token_type_ids.push(seq as u32);
                span.offsets.push(p.offsets);
                span.word_ids.push(Some(p.word));
                span.sequence_ids.push(Some(seq));
            }
        };

        special(&mut span, CLS_ID, 0);
        content(&mut span, first, 0);
        special(&mut span, SEP_ID, 0);
        if let Some(second) = second {
            content(&mut span, second, 1);
            special(&mut span, SEP_ID, 1);
        }
        span.attention_mask = vec![1; span.input_ids.len()];
        span
    }

    fn pad(&self, span: &mut EncodedSpan, target: usize) {
        let missing = target.saturating_sub(span.len());
        if missing == 0 {
            return;
        }
        let at = match self.padding_side {
            PaddingSide::Right => span.len(),
            PaddingSide::Left  => 0,
        };
        span.input_ids.splice(at..at, std::iter::repeat(PAD_ID).take(missing));
        span.attention_mask.splice(at..at, std::iter::repeat(0).take(missing));
        span.token_type_ids.splice(at..at, std::iter::repeat(0).take(missing));
        span.offsets.splice(at..at, std::iter::repeat((0, 0)).take(missing));
        span.word_ids.splice(at..at, std::iter::repeat(None).take(missing));
        span.sequence_ids.splice(at..at, std::iter::repeat(None).take(missing));
    }
}

/// Sliding windows of `max` pieces advancing by `max - stride`
fn windows(len: usize, max: usize, stride: usize) -> Result<Vec<(usize, usize)>> {
    if len <= max {
        return Ok(vec![(0, len)]);
    }
    if max == 0 || stride >= max {
        return Err(FinetuneError::tokenizer("stride must be smaller than the truncation budget"));
    }
    let mut out = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + max).min(len);
        out.push((start, end));
        if end == len {
            return Ok(out);
        }
        start += max - stride;
    }
}

impl TextTokenizer for FakeTokenizer {
    fn encode_batch(
        &self,
        first:   Vec<TextInput>,
        second:  Option<Vec<TextInput>>,
        options: &EncodeOptions,
    ) -> Result<Vec<EncodedSpan>> {
        let mut spans = Vec::new();

        for (i, text) in first.iter().enumerate() {
            let a = self.pieces(text);
            let b = second.as_ref().map(|s| self.pieces(&s[i]));
            let specials = if b.is_some() { 3 } else { 2 };

            let limit = match (options.truncation, options.max_length) {
                (Some(strategy), Some(max)) => Some((strategy, max.saturating_sub(specials))),
                _ => None,
            };

            let mut produced = match (limit, &b) {
                (None, _) => vec![Self::assemble(&a, b.as_deref(), i)],
                (Some((_, budget)), None) => windows(a.len(), budget, options.stride)?
                    .into_iter()
                    .map(|(s, e)| Self::assemble(&a[s..e], None, i))
                    .collect(),
                (Some((TruncationStrategy::OnlySecond, budget)), Some(b)) => {
                    let room = budget.saturating_sub(a.len());
                    windows(b.len(), room, options.stride)?
                        .into_iter()
                        .map(|(s, e)| Self::assemble(&a, Some(&b[s..e]), i))
                        .collect()
                }
                (Some((TruncationStrategy::OnlyFirst, budget)), Some(b)) => {
                    let room = budget.saturating_sub(b.len());
                    windows(a.len(), room, options.stride)?
                        .into_iter()
                        .map(|(s, e)| Self::assemble(&a[s..e], Some(b), i))
                        .collect()
                }
                (Some((TruncationStrategy::LongestFirst, budget)), Some(b)) => {
                    let (mut la, mut lb) = (a.len(), b.len());
                    while la + lb > budget {
                        if la >= lb { la -= 1 } else { lb -= 1 }
                    }
                    vec![Self::assemble(&a[..la], Some(&b[..lb]), i)]
                }
            };

            if !options.return_overflowing_tokens {
                produced.truncate(1);
            }
            spans.extend(produced);
        }

        let longest = spans.iter().map(EncodedSpan::len).max().unwrap_or(0);
        let target = match (options.padding, options.max_length) {
            (Padding::DoNotPad, _)          => 0,
            (Padding::MaxLength, Some(max)) => max,
            _                               => longest,
        };
        for span in &mut spans {
            self.pad(span, target);
        }

        Ok(spans)
    }

    fn cls_token_id(&self) -> Option<u32> {
        Some(CLS_ID)
    }

    fn padding_side(&self) -> PaddingSide {
        self.padding_side
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pieces_and_word_ids() {
        let tok = FakeTokenizer::new(3);
        let spans = tok
            .encode_batch(vec![TextInput::Text("hello world".into())], None, &EncodeOptions::default())
            .unwrap();

        assert_eq!(spans.len(), 1);
        let span = &spans[0];
        assert_eq!(span.input_ids.len(), 6);
        assert_eq!(span.word_ids, vec![None, Some(0), Some(0), Some(1), Some(1), None]);
        assert_eq!(span.offsets[3], (6, 9));
    }

    #[test]
    fn test_overflow_windows_share_sample_index() {
        let tok = FakeTokenizer::new(10);
        let options = EncodeOptions {
            max_length:                Some(6),
            truncation:                Some(TruncationStrategy::OnlySecond),
            padding:                   Padding::MaxLength,
            stride:                    1,
            return_overflowing_tokens: true,
        };
        let spans = tok
            .encode_batch(
                vec![TextInput::Text("q".into())],
                Some(vec![TextInput::Text("a b c d".into())]),
                &options,
            )
            .unwrap();

        // budget for the context is 6 - 3 - 1 = 2, stride 1 → 3 windows
        assert_eq!(spans.len(), 3);
        assert!(spans.iter().all(|s| s.sample_index == 0 && s.len() == 6));
        assert_eq!(spans[1].offsets[3], (2, 3));
    }
}
