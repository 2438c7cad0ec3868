// ============================================================
// Layer 4 — Example Aligner
// ============================================================
// Turns a batch of raw examples into tokenized, label-aligned
// model inputs. One routine per task family:
//
//   token-classification  → labels per token (first sub-word
//                           carries the word label)
//   dependency-parsing    → head_labels + dp_labels per token
//   question-answering    → strided spans with start/end token
//                           positions (train) or without (eval)
//   everything else       → plain tokenization, labels copied
//
// Conventions shared by every routine:
//   - IGNORE_INDEX (-100) marks tokens the loss must skip
//   - the first sub-word of a word carries the word's label
//   - an answer that is not inside a span points at [CLS]
//
// Word alignment example (piece length 3):
//
//   words:    ["서울특별시", "에서"]        labels: [2, 12]
//   tokens:   [CLS] 서울특  별시  에서 [SEP]
//   word_ids:  -     0     0    1    -
//   labels:   -100   2   -100  12  -100
//
// Reference: Devlin et al. (2019) BERT, §4.2 and §4.3

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::batch::{ExampleBatch, Labels, TokenizedBatch, IGNORE_INDEX};
use crate::domain::hooks::Split;
use crate::domain::task_info::{LabelColumn, TaskInfo};
use crate::domain::task_type::TaskType;
use crate::domain::traits::{
    EncodeOptions, EncodedSpan, Padding, PaddingSide, TextTokenizer, TruncationStrategy,
};
use crate::error::{FinetuneError, Result};

/// Input column of dependency-parsing datasets
pub const DP_WORD_COLUMN: &str = "word_form";

// ─── Settings ─────────────────────────────────────────────────────────────────
/// Tokenization settings chosen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignSettings {
    pub max_source_length: Option<usize>,
    /// Carried for sequence-to-sequence callers; the aligners copy
    /// target labels through without tokenizing them
    pub max_target_length: Option<usize>,
    pub padding:           Padding,
    pub truncation:        bool,
}

impl Default for AlignSettings {
    fn default() -> Self {
        Self {
            max_source_length: None,
            max_target_length: None,
            padding:           Padding::Longest,
            truncation:        true,
        }
    }
}

// ─── Routines ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
enum Routine {
    Plain,
    TokenClassification {
        label_all_tokens: bool,
        b_to_i_label:     Vec<i64>,
    },
    DependencyParsing {
        heads:    String,
        deprels:  String,
        label2id: HashMap<String, i64>,
    },
    QuestionAnsweringTrain,
    QuestionAnsweringEval,
}

/// A configured alignment routine. Holds its own copy of the task
/// descriptor and only borrows the tokenizer, so calling it twice
/// on the same batch gives the same result.
pub struct ExampleFunction<'t, T: TextTokenizer + ?Sized> {
    info:      TaskInfo,
    tokenizer: &'t T,
    settings:  AlignSettings,
    routine:   Routine,
}

/// What get_example_function hands back. Question answering has
/// separate routines for training and evaluation data.
pub enum ExampleFunctions<'t, T: TextTokenizer + ?Sized> {
    Single(ExampleFunction<'t, T>),
    QuestionAnswering {
        train: ExampleFunction<'t, T>,
        eval:  ExampleFunction<'t, T>,
    },
}

impl<'t, T: TextTokenizer + ?Sized> ExampleFunctions<'t, T> {
    /// The routine to run on a given split
    pub fn for_split(&self, split: Split) -> &ExampleFunction<'t, T> {
        match (self, split) {
            (ExampleFunctions::Single(f), _) => f,
            (ExampleFunctions::QuestionAnswering { train, .. }, Split::Train) => train,
            (ExampleFunctions::QuestionAnswering { eval, .. }, Split::Validation) => eval,
        }
    }
}

/// Pick and configure the alignment routine for a task.
///
/// Configuration problems (wrong label-column shape, missing
/// `label_names` for dependency parsing, missing id or question
/// column for question answering) are reported here, before any
/// batch is processed.
pub fn get_example_function<'t, T: TextTokenizer + ?Sized>(
    info:              &TaskInfo,
    tokenizer:         &'t T,
    max_source_length: Option<usize>,
    max_target_length: Option<usize>,
    padding:           Padding,
    truncation:        bool,
) -> Result<ExampleFunctions<'t, T>> {
    let settings = AlignSettings { max_source_length, max_target_length, padding, truncation };
    let make = |routine: Routine| ExampleFunction {
        info: info.clone(),
        tokenizer,
        settings,
        routine,
    };

    let functions = match info.task_type {
        TaskType::TokenClassification => {
            if info.label_column.as_single().is_none() {
                return Err(FinetuneError::config(
                    "token classification needs a single 'label_column'",
                ));
            }
            let options = &info.extra_options;
            let b_to_i_label = options.b_to_i_label.clone().unwrap_or_default();
            if options.label_all_tokens && b_to_i_label.is_empty() {
                return Err(FinetuneError::config(
                    "'label_all_tokens' requires a non-empty 'b_to_i_label' table in extra_options",
                ));
            }
            ExampleFunctions::Single(make(Routine::TokenClassification {
                label_all_tokens: options.label_all_tokens,
                b_to_i_label,
            }))
        }

        TaskType::DependencyParsing => {
            let LabelColumn::Split { head, dependency } = &info.label_column else {
                return Err(FinetuneError::config(
                    "for dependency parsing, 'label_column' should be constructed as \
                     {\"head\": <head_column>, \"dependency\": <dependency_relation_column>}",
                ));
            };
            let label_names = info.extra_options.label_names.as_ref().ok_or_else(|| {
                FinetuneError::config("dependency parsing requires 'label_names' in extra_options")
            })?;
            let label2id = label_names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i as i64))
                .collect();
            ExampleFunctions::Single(make(Routine::DependencyParsing {
                heads:   head.clone(),
                deprels: dependency.clone(),
                label2id,
            }))
        }

        TaskType::QuestionAnswering => {
            if info.text_pair_column.is_none() {
                return Err(FinetuneError::config(
                    "question answering needs 'text_pair_column' (the question)",
                ));
            }
            if info.id_column.is_none() {
                return Err(FinetuneError::config("question answering needs 'id_column'"));
            }
            ExampleFunctions::QuestionAnswering {
                train: make(Routine::QuestionAnsweringTrain),
                eval:  make(Routine::QuestionAnsweringEval),
            }
        }

        TaskType::SequenceClassification
        | TaskType::ConditionalGeneration
        | TaskType::MaskedLanguageModeling
        | TaskType::CausalLanguageModeling
        | TaskType::SequenceToSequence => ExampleFunctions::Single(make(Routine::Plain)),
    };

    tracing::debug!("Configured example function for {} ({})", info.id(), info.task_type);
    Ok(functions)
}

impl<'t, T: TextTokenizer + ?Sized> ExampleFunction<'t, T> {
    pub fn settings(&self) -> &AlignSettings {
        &self.settings
    }

    /// Run the routine over one batch of raw examples
    pub fn call(&self, examples: &ExampleBatch) -> Result<TokenizedBatch> {
        match &self.routine {
            Routine::Plain => self.plain(examples),
            Routine::TokenClassification { label_all_tokens, b_to_i_label } => {
                self.token_classification(examples, *label_all_tokens, b_to_i_label)
            }
            Routine::DependencyParsing { heads, deprels, label2id } => {
                self.dependency_parsing(examples, heads, deprels, label2id)
            }
            Routine::QuestionAnsweringTrain => self.question_answering(examples, true),
            Routine::QuestionAnsweringEval  => self.question_answering(examples, false),
        }
    }

    // ── Shared tokenization ───────────────────────────────────────────────────

    /// Text (+ optional pair) with the caller's settings
    fn encode_texts(&self, examples: &ExampleBatch) -> Result<Vec<EncodedSpan>> {
        let split = self.info.is_split_into_words;
        let first = examples.texts(&self.info.text_column, split)?;
        let second = match &self.info.text_pair_column {
            Some(column) if examples.contains(column) => Some(examples.texts(column, split)?),
            _ => None,
        };
        let options = EncodeOptions {
            max_length:                self.settings.max_source_length,
            truncation:                self.settings.truncation.then_some(TruncationStrategy::LongestFirst),
            padding:                   self.settings.padding,
            stride:                    0,
            return_overflowing_tokens: false,
        };
        self.tokenizer.encode_batch(first, second, &options)
    }

    // ── (e) default ───────────────────────────────────────────────────────────

    fn plain(&self, examples: &ExampleBatch) -> Result<TokenizedBatch> {
        let spans = self.encode_texts(examples)?;
        let mut batch = TokenizedBatch::from_spans(&spans);

        if let Some(labels) = self.info.label_column.as_single().and_then(|c| examples.get(c)) {
            batch.labels = Some(Labels::Passthrough(labels.to_vec()));
        }
        Ok(batch)
    }

    // ── (a) token classification ──────────────────────────────────────────────

    fn token_classification(
        &self,
        examples:         &ExampleBatch,
        label_all_tokens: bool,
        b_to_i_label:     &[i64],
    ) -> Result<TokenizedBatch> {
        let label_column = self.info.label_column.as_single().unwrap_or_default();
        examples.column(label_column)?;

        let spans = self.encode_texts(examples)?;
        let mut labels = Vec::with_capacity(spans.len());

        for span in &spans {
            let row = span.sample_index;
            let word_labels = int_list(label_column, row, examples.cell(label_column, row)?)?;
            let label_at = |word: usize| {
                word_labels.get(word).copied().ok_or_else(|| {
                    FinetuneError::invalid_example(label_column, row, format!("no label for word {word}"))
                })
            };

            let aligned = word_roles(&span.word_ids)
                .into_iter()
                .map(|role| match role {
                    WordRole::Special => Ok(IGNORE_INDEX),
                    WordRole::First(word) => label_at(word),
                    WordRole::Continuation(word) if label_all_tokens => {
                        remap(b_to_i_label, label_at(word)?)
                    }
                    WordRole::Continuation(_) => Ok(IGNORE_INDEX),
                })
                .collect::<Result<Vec<i64>>>()?;
            labels.push(aligned);
        }

        let mut batch = TokenizedBatch::from_spans(&spans);
        batch.labels = Some(Labels::Tokens(labels));
        Ok(batch)
    }

    // ── (b) dependency parsing ────────────────────────────────────────────────

    fn dependency_parsing(
        &self,
        examples: &ExampleBatch,
        heads:    &str,
        deprels:  &str,
        label2id: &HashMap<String, i64>,
    ) -> Result<TokenizedBatch> {
        examples.column(heads)?;
        examples.column(deprels)?;

        // Always pre-split words, padded to max length and truncated
        let words = examples.texts(DP_WORD_COLUMN, true)?;
        let options = EncodeOptions {
            max_length:                self.settings.max_source_length,
            truncation:                Some(TruncationStrategy::LongestFirst),
            padding:                   Padding::MaxLength,
            stride:                    0,
            return_overflowing_tokens: false,
        };
        let spans = self.tokenizer.encode_batch(words, None, &options)?;

        let mut head_labels = Vec::with_capacity(spans.len());
        let mut dp_labels = Vec::with_capacity(spans.len());

        for span in &spans {
            let row = span.sample_index;
            let word_heads = int_list(heads, row, examples.cell(heads, row)?)?;
            let word_deprels = string_list(deprels, row, examples.cell(deprels, row)?)?;

            let mut span_heads = Vec::with_capacity(span.len());
            let mut span_deprels = Vec::with_capacity(span.len());

            for role in word_roles(&span.word_ids) {
                match role {
                    WordRole::First(word) => {
                        let head = word_heads.get(word).copied().ok_or_else(|| {
                            FinetuneError::invalid_example(heads, row, format!("no head for word {word}"))
                        })?;
                        let deprel = word_deprels.get(word).ok_or_else(|| {
                            FinetuneError::invalid_example(deprels, row, format!("no relation for word {word}"))
                        })?;
                        let id = label2id
                            .get(deprel.as_str())
                            .copied()
                            .ok_or_else(|| FinetuneError::UnknownLabel(deprel.clone()))?;
                        span_heads.push(head);
                        span_deprels.push(id);
                    }
                    WordRole::Special | WordRole::Continuation(_) => {
                        span_heads.push(IGNORE_INDEX);
                        span_deprels.push(IGNORE_INDEX);
                    }
                }
            }

            head_labels.push(span_heads);
            dp_labels.push(span_deprels);
        }

        let mut batch = TokenizedBatch::from_spans(&spans);
        batch.head_labels = Some(head_labels);
        batch.dp_labels = Some(dp_labels);
        Ok(batch)
    }

    // ── (c) / (d) question answering ──────────────────────────────────────────

    fn question_answering(&self, examples: &ExampleBatch, with_positions: bool) -> Result<TokenizedBatch> {
        let info = &self.info;
        let question_column = info.text_pair_column.as_deref().unwrap_or_default();
        let id_column = info.id_column.as_deref().unwrap_or_default();
        examples.column(id_column)?;

        // Right-padding tokenizers take the question first and the
        // context second; left-padding ones the other way round.
        let pad_on_right = self.tokenizer.padding_side() == PaddingSide::Right;
        let questions = examples.texts(question_column, false)?;
        let contexts = examples.texts(&info.text_column, false)?;
        let (first, second, context_seq, strategy) = if pad_on_right {
            (questions, contexts, 1, TruncationStrategy::OnlySecond)
        } else {
            (contexts, questions, 0, TruncationStrategy::OnlyFirst)
        };

        let options = EncodeOptions {
            max_length:                self.settings.max_source_length,
            truncation:                Some(strategy),
            padding:                   Padding::MaxLength,
            stride:                    info.extra_options.doc_stride,
            return_overflowing_tokens: true,
        };
        let spans = self.tokenizer.encode_batch(first, Some(second), &options)?;
        let mut batch = TokenizedBatch::from_spans(&spans);

        if with_positions {
            let label_column = info.label_column.as_single().unwrap_or_default();
            examples.column(label_column)?;
            let cls_id = self.tokenizer.cls_token_id();

            let mut starts = Vec::with_capacity(spans.len());
            let mut ends = Vec::with_capacity(spans.len());
            for (i, span) in spans.iter().enumerate() {
                let cls_index = cls_id
                    .and_then(|id| span.input_ids.iter().position(|&t| t == id))
                    .ok_or(FinetuneError::MissingClsToken { span: i })?;
                let row = span.sample_index;
                let answer = Answer::parse(label_column, row, examples.cell(label_column, row)?)?;
                let (start, end) = answer_positions(span, answer, context_seq, cls_index);
                starts.push(start);
                ends.push(end);
            }
            batch.start_positions = Some(starts);
            batch.end_positions = Some(ends);
        }

        batch.example_id = Some(
            spans
                .iter()
                .map(|span| examples.cell(id_column, span.sample_index).cloned())
                .collect::<Result<Vec<_>>>()?,
        );
        batch.offset_mapping = Some(
            spans
                .iter()
                .map(|span| context_offsets(span, context_seq))
                .collect(),
        );

        tracing::debug!(
            "Aligned {} examples into {} question-answering spans",
            examples.len(),
            spans.len()
        );
        Ok(batch)
    }
}

// ─── Word alignment ───────────────────────────────────────────────────────────

/// How a token relates to the source words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordRole {
    /// Special or padding token
    Special,
    /// First token of a word
    First(usize),
    /// A later sub-word piece of the same word
    Continuation(usize),
}

fn word_roles(word_ids: &[Option<usize>]) -> Vec<WordRole> {
    let mut previous: Option<usize> = None;
    word_ids
        .iter()
        .map(|&word| {
            let role = match word {
                None => WordRole::Special,
                Some(w) if word != previous => WordRole::First(w),
                Some(w) => WordRole::Continuation(w),
            };
            previous = word;
            role
        })
        .collect()
}

/// Begin → inside remap for continuation pieces
fn remap(table: &[i64], label: i64) -> Result<i64> {
    usize::try_from(label)
        .ok()
        .and_then(|i| table.get(i).copied())
        .ok_or(FinetuneError::LabelOutOfRange { label, size: table.len() })
}

// ─── Answer spans ─────────────────────────────────────────────────────────────

/// First gold answer of an example, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Answer {
    start_char: usize,
    end_char:   usize,
}

impl Answer {
    /// `{"answer_start": [..], "text": [..]}`; None when there is no answer
    fn parse(column: &str, row: usize, value: &Value) -> Result<Option<Self>> {
        let starts = value
            .get("answer_start")
            .and_then(Value::as_array)
            .ok_or_else(|| FinetuneError::invalid_example(column, row, "missing 'answer_start' list"))?;
        let Some(start) = starts.first() else {
            return Ok(None);
        };
        let start_char = start
            .as_u64()
            .ok_or_else(|| FinetuneError::invalid_example(column, row, "'answer_start' must hold integers"))?
            as usize;
        let text = value
            .get("text")
            .and_then(Value::as_array)
            .and_then(|texts| texts.first())
            .and_then(Value::as_str)
            .ok_or_else(|| FinetuneError::invalid_example(column, row, "missing answer 'text'"))?;

        Ok(Some(Self { start_char, end_char: start_char + text.chars().count() }))
    }
}

/// Token (start, end) of the answer inside one span, or (cls, cls)
/// when the span does not contain the whole answer.
fn answer_positions(
    span:        &EncodedSpan,
    answer:      Option<Answer>,
    context_seq: usize,
    cls_index:   usize,
) -> (usize, usize) {
    let Some(Answer { start_char, end_char }) = answer else {
        return (cls_index, cls_index);
    };

    // Context token range of this span
    let in_context = |k: &usize| span.sequence_ids[*k] == Some(context_seq);
    let (Some(first), Some(last)) = (
        (0..span.len()).find(in_context),
        (0..span.len()).rev().find(in_context),
    ) else {
        return (cls_index, cls_index);
    };

    let offsets = &span.offsets;
    if !(offsets[first].0 <= start_char && offsets[last].1 >= end_char) {
        return (cls_index, cls_index);
    }

    // Last context token starting at or before the answer
    let mut start = first;
    while start <= last && offsets[start].0 <= start_char {
        start += 1;
    }

    // First context token ending at or after the answer
    let mut end = last as isize;
    while end >= first as isize && offsets[end as usize].1 >= end_char {
        end -= 1;
    }

    (start - 1, (end + 1) as usize)
}

/// Keep offsets of context tokens, null everything else
fn context_offsets(span: &EncodedSpan, context_seq: usize) -> Vec<Option<(usize, usize)>> {
    span.offsets
        .iter()
        .zip(&span.sequence_ids)
        .map(|(&offset, &seq)| (seq == Some(context_seq)).then_some(offset))
        .collect()
}

// ─── Cell helpers ─────────────────────────────────────────────────────────────

fn int_list(column: &str, row: usize, value: &Value) -> Result<Vec<i64>> {
    value
        .as_array()
        .ok_or_else(|| FinetuneError::invalid_example(column, row, "expected a list of integers"))?
        .iter()
        .map(|v| {
            v.as_i64()
                .ok_or_else(|| FinetuneError::invalid_example(column, row, "expected integer labels"))
        })
        .collect()
}

fn string_list(column: &str, row: usize, value: &Value) -> Result<Vec<String>> {
    value
        .as_array()
        .ok_or_else(|| FinetuneError::invalid_example(column, row, "expected a list of strings"))?
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| FinetuneError::invalid_example(column, row, "expected string labels"))
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeTokenizer, CLS_ID};
    use serde_json::json;

    fn ner_info(label_all_tokens: bool) -> TaskInfo {
        TaskInfo::from_entry(
            "klue-ner",
            &json!({
                "task_type": "token-classification",
                "text_column": "tokens",
                "label_column": "ner_tags",
                "is_split_into_words": true,
                "extra_options": {
                    "label_all_tokens": label_all_tokens,
                    "b_to_i_label": [1, 1, 2]
                }
            }),
        )
        .unwrap()
    }

    fn dp_info() -> TaskInfo {
        TaskInfo::from_entry(
            "klue-dp",
            &json!({
                "task_type": "dependency-parsing",
                "text_column": "word_form",
                "label_column": {"head": "head", "dependency": "deprel"},
                "extra_options": {"label_names": ["NP", "VP", "NP_SBJ"]}
            }),
        )
        .unwrap()
    }

    fn mrc_info(doc_stride: usize) -> TaskInfo {
        TaskInfo::from_entry(
            "klue-mrc",
            &json!({
                "task_type": "question-answering",
                "text_column": "context",
                "text_pair_column": "question",
                "label_column": "answers",
                "id_column": "guid",
                "extra_options": {"doc_stride": doc_stride}
            }),
        )
        .unwrap()
    }

    fn single<'t>(functions: ExampleFunctions<'t, FakeTokenizer>) -> ExampleFunction<'t, FakeTokenizer> {
        match functions {
            ExampleFunctions::Single(f) => f,
            ExampleFunctions::QuestionAnswering { .. } => panic!("expected a single routine"),
        }
    }

    fn token_labels(batch: &TokenizedBatch) -> &Vec<Vec<i64>> {
        match batch.labels.as_ref() {
            Some(Labels::Tokens(rows)) => rows,
            other => panic!("expected token labels, got {other:?}"),
        }
    }

    // ── token classification ──────────────────────────────────────────────────

    #[test]
    fn test_first_piece_carries_the_label() {
        let tok = FakeTokenizer::new(3);
        let info = ner_info(false);
        let f = single(get_example_function(&info, &tok, None, None, Padding::Longest, true).unwrap());

        let batch = ExampleBatch::new()
            .with_column("tokens", vec![json!(["hello", "me"]), json!(["a"])])
            .with_column("ner_tags", vec![json!([0, 2]), json!([1])]);
        let out = f.call(&batch).unwrap();

        // [CLS] hel lo me [SEP] / [CLS] a [SEP] [PAD] [PAD]
        assert_eq!(
            token_labels(&out),
            &vec![vec![-100, 0, -100, 2, -100], vec![-100, 1, -100, -100, -100]]
        );
    }

    #[test]
    fn test_label_all_tokens_uses_begin_to_inside_table() {
        let tok = FakeTokenizer::new(2);
        let info = ner_info(true);
        let f = single(get_example_function(&info, &tok, None, None, Padding::Longest, true).unwrap());

        let batch = ExampleBatch::new()
            .with_column("tokens", vec![json!(["abcde", "xy"])])
            .with_column("ner_tags", vec![json!([0, 2])]);
        let out = f.call(&batch).unwrap();

        // ab cd e | xy   → 0, b_to_i[0]=1, 1, 2
        assert_eq!(token_labels(&out), &vec![vec![-100, 0, 1, 1, 2, -100]]);
    }

    #[test]
    fn test_label_lengths_match_tokens_and_specials_are_ignored() {
        let tok = FakeTokenizer::new(2);
        let info = ner_info(false);
        let f = single(get_example_function(&info, &tok, Some(6), None, Padding::MaxLength, true).unwrap());

        let batch = ExampleBatch::new()
            .with_column("tokens", vec![json!(["abcdef", "gh", "ijk"]), json!(["z"])])
            .with_column("ner_tags", vec![json!([0, 1, 2]), json!([2])]);
        let out = f.call(&batch).unwrap();

        let labels = token_labels(&out);
        let spans = tok
            .encode_batch(
                batch.texts("tokens", true).unwrap(),
                None,
                &EncodeOptions {
                    max_length: Some(6),
                    truncation: Some(TruncationStrategy::LongestFirst),
                    padding: Padding::MaxLength,
                    ..EncodeOptions::default()
                },
            )
            .unwrap();
        for (row, span) in labels.iter().zip(&spans) {
            assert_eq!(row.len(), span.len());
            for (label, word) in row.iter().zip(&span.word_ids) {
                if word.is_none() {
                    assert_eq!(*label, IGNORE_INDEX);
                }
            }
        }
    }

    #[test]
    fn test_short_label_column_is_an_invalid_example() {
        let tok = FakeTokenizer::new(3);
        let info = ner_info(false);
        let f = single(get_example_function(&info, &tok, None, None, Padding::Longest, true).unwrap());

        let batch = ExampleBatch::new()
            .with_column("tokens", vec![json!(["hello"]), json!(["me"])])
            .with_column("ner_tags", vec![json!([0])]);
        match f.call(&batch) {
            Err(FinetuneError::InvalidExample { column, row, .. }) => {
                assert_eq!(column, "ner_tags");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_remap_is_an_error() {
        let tok = FakeTokenizer::new(1);
        let info = ner_info(true);
        let f = single(get_example_function(&info, &tok, None, None, Padding::Longest, true).unwrap());

        let batch = ExampleBatch::new()
            .with_column("tokens", vec![json!(["ab"])])
            .with_column("ner_tags", vec![json!([7])]);
        assert!(matches!(f.call(&batch), Err(FinetuneError::LabelOutOfRange { label: 7, .. })));
    }

    // ── dependency parsing ────────────────────────────────────────────────────

    #[test]
    fn test_dependency_parsing_parallel_labels() {
        let tok = FakeTokenizer::new(2);
        let info = dp_info();
        let f = single(get_example_function(&info, &tok, Some(8), None, Padding::Longest, false).unwrap());

        let batch = ExampleBatch::new()
            .with_column("word_form", vec![json!(["나는", "학교에", "간다"])])
            .with_column("head", vec![json!([3, 3, 0])])
            .with_column("deprel", vec![json!(["NP_SBJ", "NP", "VP"])]);
        let out = f.call(&batch).unwrap();

        // [CLS] 나는 학교 에 간다 [SEP] [PAD] [PAD] → padded to max length 8
        let heads = &out.head_labels.as_ref().unwrap()[0];
        let deprels = &out.dp_labels.as_ref().unwrap()[0];
        assert_eq!(heads, &vec![-100, 3, 3, -100, 0, -100, -100, -100]);
        assert_eq!(deprels, &vec![-100, 2, 0, -100, 1, -100, -100, -100]);
        assert_eq!(heads.len(), out.input_ids[0].len());
    }

    #[test]
    fn test_dependency_parsing_ignores_label_all_tokens() {
        let tok = FakeTokenizer::new(1);
        let mut info = dp_info();
        info.extra_options.label_all_tokens = true;
        info.extra_options.b_to_i_label = Some(vec![0, 1, 2]);
        let f = single(get_example_function(&info, &tok, Some(6), None, Padding::Longest, true).unwrap());

        let batch = ExampleBatch::new()
            .with_column("word_form", vec![json!(["abc"])])
            .with_column("head", vec![json!([0])])
            .with_column("deprel", vec![json!(["VP"])]);
        let out = f.call(&batch).unwrap();
        assert_eq!(out.dp_labels.unwrap()[0], vec![-100, 1, -100, -100, -100, -100]);
    }

    #[test]
    fn test_dependency_parsing_unknown_relation() {
        let tok = FakeTokenizer::new(3);
        let info = dp_info();
        let f = single(get_example_function(&info, &tok, Some(8), None, Padding::Longest, true).unwrap());

        let batch = ExampleBatch::new()
            .with_column("word_form", vec![json!(["a"])])
            .with_column("head", vec![json!([0])])
            .with_column("deprel", vec![json!(["ROOT"])]);
        assert!(matches!(f.call(&batch), Err(FinetuneError::UnknownLabel(l)) if l == "ROOT"));
    }

    #[test]
    fn test_dependency_parsing_requires_mapping_label_column() {
        let tok = FakeTokenizer::new(3);
        let mut info = dp_info();
        info.label_column = LabelColumn::Single("deprel".into());
        let result = get_example_function(&info, &tok, None, None, Padding::Longest, true);
        assert!(matches!(result, Err(FinetuneError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_dependency_parsing_requires_label_names() {
        let tok = FakeTokenizer::new(3);
        let mut info = dp_info();
        info.extra_options.label_names = None;
        let result = get_example_function(&info, &tok, None, None, Padding::Longest, true);
        assert!(matches!(result, Err(FinetuneError::InvalidConfiguration { .. })));
    }

    // ── question answering ────────────────────────────────────────────────────

    fn mrc_batch() -> ExampleBatch {
        // context words: a(0,1) b(2,3) c(4,5) d(6,7) e(8,9) f(10,11)
        ExampleBatch::new()
            .with_column("guid", vec![json!("q-1"), json!("q-2")])
            .with_column("question", vec![json!("q"), json!("q")])
            .with_column("context", vec![json!("a b c d e f"), json!("a b c d e f")])
            .with_column(
                "answers",
                vec![
                    json!({"answer_start": [4], "text": ["c d"]}),
                    json!({"answer_start": [], "text": []}),
                ],
            )
    }

    #[test]
    fn test_question_answering_train_positions() {
        let tok = FakeTokenizer::new(5);
        let info = mrc_info(1);
        let functions = get_example_function(&info, &tok, Some(7), None, Padding::Longest, true).unwrap();
        let out = functions.for_split(Split::Train).call(&mrc_batch()).unwrap();

        // budget 7 - 3 - 1 = 3 context tokens, stride 1 → windows
        // [a b c] [c d e] [e f] per example
        assert_eq!(out.len(), 6);
        assert_eq!(
            out.example_id.as_ref().unwrap(),
            &vec![json!("q-1"), json!("q-1"), json!("q-1"), json!("q-2"), json!("q-2"), json!("q-2")]
        );

        let starts = out.start_positions.as_ref().unwrap();
        let ends = out.end_positions.as_ref().unwrap();
        // [CLS] q [SEP] c d e [SEP]: answer "c d" at tokens 3..=4
        assert_eq!((starts[1], ends[1]), (3, 4));
        // the answer is cut in the first and last window
        assert_eq!((starts[0], ends[0]), (0, 0));
        assert_eq!((starts[2], ends[2]), (0, 0));
        // no answer at all
        assert!(starts[3..].iter().chain(&ends[3..]).all(|&p| p == 0));
    }

    #[test]
    fn test_question_answering_positions_bound_the_answer() {
        let tok = FakeTokenizer::new(5);
        let info = mrc_info(2);
        let functions = get_example_function(&info, &tok, Some(9), None, Padding::Longest, true).unwrap();
        let batch = mrc_batch();
        let out = functions.for_split(Split::Train).call(&batch).unwrap();

        let offsets = out.offset_mapping.as_ref().unwrap();
        let starts = out.start_positions.as_ref().unwrap();
        let ends = out.end_positions.as_ref().unwrap();
        for i in 0..out.len() {
            if out.example_id.as_ref().unwrap()[i] != json!("q-1") || starts[i] == 0 {
                continue;
            }
            let (s, _) = offsets[i][starts[i]].unwrap();
            let (_, e) = offsets[i][ends[i]].unwrap();
            assert!(s <= 4 && e >= 7, "span {i}: ({s}, {e})");
        }
    }

    #[test]
    fn test_question_answering_nulls_non_context_offsets() {
        let tok = FakeTokenizer::new(5);
        let info = mrc_info(0);
        let functions = get_example_function(&info, &tok, Some(20), None, Padding::Longest, true).unwrap();
        let out = functions.for_split(Split::Validation).call(&mrc_batch()).unwrap();

        assert!(out.start_positions.is_none());
        assert!(out.end_positions.is_none());
        let offsets = &out.offset_mapping.as_ref().unwrap()[0];
        // [CLS] q [SEP] a b c d e f [SEP] [PAD]...
        assert_eq!(offsets[0], None);
        assert_eq!(offsets[1], None);
        assert_eq!(offsets[2], None);
        assert_eq!(offsets[3], Some((0, 1)));
        assert_eq!(offsets[8], Some((10, 11)));
        assert_eq!(offsets[9], None);
        assert_eq!(offsets.len(), 20);
    }

    #[test]
    fn test_question_answering_left_padding_puts_context_first() {
        let tok = FakeTokenizer::left_padded(5);
        let info = mrc_info(0);
        let functions = get_example_function(&info, &tok, Some(11), None, Padding::Longest, true).unwrap();
        let out = functions.for_split(Split::Train).call(&mrc_batch()).unwrap();

        // [CLS] a b c d e f [SEP] q [SEP] → 10 tokens padded to 11 on the left
        let offsets = &out.offset_mapping.as_ref().unwrap()[0];
        assert_eq!(offsets[0], None);
        assert_eq!(offsets[1], None);
        assert_eq!(offsets[2], Some((0, 1)));
        assert_eq!(offsets[9], None);
        assert_eq!(out.start_positions.as_ref().unwrap()[0], 4);
        assert_eq!(out.end_positions.as_ref().unwrap()[0], 5);
        assert_eq!(out.input_ids[0][1], CLS_ID);
    }

    #[test]
    fn test_question_answering_short_id_column() {
        let tok = FakeTokenizer::new(5);
        let info = mrc_info(0);
        let functions = get_example_function(&info, &tok, Some(20), None, Padding::Longest, true).unwrap();
        let mut batch = mrc_batch();
        batch.insert("guid", vec![json!("q-1")]);

        for split in [Split::Train, Split::Validation] {
            assert!(matches!(
                functions.for_split(split).call(&batch),
                Err(FinetuneError::InvalidExample { row: 1, .. })
            ));
        }
    }

    #[test]
    fn test_question_answering_requires_id_column() {
        let tok = FakeTokenizer::new(5);
        let mut info = mrc_info(0);
        info.id_column = None;
        let result = get_example_function(&info, &tok, Some(20), None, Padding::Longest, true);
        assert!(matches!(result, Err(FinetuneError::InvalidConfiguration { .. })));
    }

    // ── default ───────────────────────────────────────────────────────────────

    #[test]
    fn test_default_copies_labels_verbatim() {
        let tok = FakeTokenizer::new(3);
        let info = TaskInfo::from_entry(
            "klue-sts",
            &json!({
                "task_type": "sequence-classification",
                "text_column": "sentence1",
                "text_pair_column": "sentence2",
                "label_column": "label"
            }),
        )
        .unwrap();
        let f = single(get_example_function(&info, &tok, None, None, Padding::Longest, true).unwrap());

        let batch = ExampleBatch::new()
            .with_column("sentence1", vec![json!("one two"), json!("three")])
            .with_column("sentence2", vec![json!("four"), json!("five six")])
            .with_column("label", vec![json!(3.2), json!(0.5)]);
        let out = f.call(&batch).unwrap();

        assert_eq!(out.labels, Some(Labels::Passthrough(vec![json!(3.2), json!(0.5)])));
        assert_eq!(out.input_ids[0].len(), out.input_ids[1].len());
        assert!(out.offset_mapping.is_none());
    }

    #[test]
    fn test_default_without_label_column_in_batch() {
        let tok = FakeTokenizer::new(3);
        let info = TaskInfo::from_entry(
            "kowiki-clm",
            &json!({
                "task_type": "causal-language-modeling",
                "text_column": "text",
                "label_column": "label"
            }),
        )
        .unwrap();
        let f = single(get_example_function(&info, &tok, Some(4), None, Padding::DoNotPad, true).unwrap());

        let batch = ExampleBatch::new().with_column("text", vec![json!("abcdefghi jkl")]);
        let out = f.call(&batch).unwrap();
        assert!(out.labels.is_none());
        assert_eq!(out.input_ids[0].len(), 4);
    }

    #[test]
    fn test_calling_twice_gives_identical_output() {
        let tok = FakeTokenizer::new(5);
        let info = mrc_info(1);
        let functions = get_example_function(&info, &tok, Some(7), None, Padding::Longest, true).unwrap();
        let f = functions.for_split(Split::Train);
        let batch = mrc_batch();
        assert_eq!(f.call(&batch).unwrap(), f.call(&batch).unwrap());
    }
}
