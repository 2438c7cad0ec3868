// ============================================================
// Layer 3 — TaskInfo Domain Type
// ============================================================
// The normalised description of one benchmark task. Built once
// from a raw catalog entry, immutable afterwards, and handed to
// the model resolver, the example aligner and the collator /
// trainer resolver.
//
// Construction rules:
//   - only whitelisted attributes are read (TASK_ATTRS)
//   - null, false, 0, "" and empty containers count as absent,
//     so the field default applies
//   - "<group>-<name>" is split into a TaskId
//   - dependency parsing must use the {head, dependency}
//     label-column form, and only dependency parsing may

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::hooks::{PostprocessFunction, PreprocessFunction};
use crate::domain::task_type::TaskType;
use crate::error::{FinetuneError, Result};

/// Separator between the group and the name of a task identifier
pub const TASK_SEPARATOR: char = '-';

/// Catalog attributes that TaskInfo understands. Anything else in
/// an entry is ignored.
pub const TASK_ATTRS: [&str; 12] = [
    "task",
    "task_type",
    "text_column",
    "text_pair_column",
    "label_column",
    "metric_name",
    "extra_options",
    "train_split",
    "eval_split",
    "num_labels",
    "is_split_into_words",
    "id_column",
];

pub const DEFAULT_NUM_LABELS: usize = 2;
pub const DEFAULT_TRAIN_SPLIT: &str = "train";
pub const DEFAULT_EVAL_SPLIT: &str = "validation";

// ─── TaskId ───────────────────────────────────────────────────────────────────
/// (dataset group, dataset name), e.g. ("klue", "ner")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId {
    pub group: String,
    pub name:  String,
}

impl TaskId {
    /// Split "<group>-<name>". Exactly one separator is allowed.
    pub fn parse(id: &str) -> Result<Self> {
        let mut parts = id.split(TASK_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(group), Some(name), None) if !group.is_empty() && !name.is_empty() => Ok(Self {
                group: group.to_string(),
                name:  name.to_string(),
            }),
            _ => Err(FinetuneError::InvalidTaskId { id: id.to_string() }),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.group, TASK_SEPARATOR, self.name)
    }
}

// ─── LabelColumn ──────────────────────────────────────────────────────────────
/// Where the gold labels live in a raw example batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelColumn {
    /// One label field (every task type except dependency parsing)
    Single(String),
    /// Two parallel label fields for dependency parsing
    Split { head: String, dependency: String },
}

impl LabelColumn {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            LabelColumn::Single(name) => Some(name),
            LabelColumn::Split { .. } => None,
        }
    }
}

// ─── ExtraOptions ─────────────────────────────────────────────────────────────
/// Task-type-specific tuning knobs. The named fields are the ones
/// the aligners and the model resolver read; everything else in
/// the catalog object is kept in `other`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraOptions {
    /// Token classification: label continuation sub-words too
    pub label_all_tokens: bool,

    /// Label names in id order; overrides checkpoint label maps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_names: Option<Vec<String>>,

    /// Begin → inside remap used with `label_all_tokens`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b_to_i_label: Option<Vec<i64>>,

    /// Question answering: token overlap between strided spans
    pub doc_stride: usize,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

// ─── TaskInfo ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub task:                 TaskId,
    pub task_type:            TaskType,
    pub text_column:          String,
    pub label_column:         LabelColumn,
    pub num_labels:           usize,
    pub id_column:            Option<String>,
    pub text_pair_column:     Option<String>,
    pub train_split:          String,
    pub eval_split:           String,
    pub metric_name:          Option<String>,
    pub extra_options:        ExtraOptions,
    pub is_split_into_words:  bool,
    pub preprocess_function:  PreprocessFunction,
    pub postprocess_function: PostprocessFunction,
}

impl TaskInfo {
    /// Build a TaskInfo from one raw catalog entry.
    ///
    /// `key` is the catalog key; it names the task when the entry
    /// has no `task` attribute of its own and selects the per-task
    /// preprocess / postprocess hooks.
    pub fn from_entry(key: &str, entry: &Value) -> Result<Self> {
        let object = entry.as_object().ok_or_else(|| {
            FinetuneError::config(format!("catalog entry '{key}' is not an object"))
        })?;

        // Keep whitelisted, non-empty attributes only
        let attrs: Map<String, Value> = TASK_ATTRS
            .iter()
            .filter_map(|&name| {
                object
                    .get(name)
                    .filter(|value| is_present(value))
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect();

        let task_id = match attrs.get("task") {
            Some(Value::String(id)) => id.clone(),
            Some(other) => {
                return Err(FinetuneError::config(format!(
                    "'task' of '{key}' must be a string, got {other}"
                )))
            }
            None => key.to_string(),
        };
        let task = TaskId::parse(&task_id)?;

        let task_type: TaskType = required(&attrs, key, "task_type")?;
        let text_column: String = required(&attrs, key, "text_column")?;
        let label_column: LabelColumn = required(&attrs, key, "label_column")?;

        if object.get("num_labels").and_then(Value::as_u64) == Some(0) {
            tracing::warn!(
                "Task '{}' declares num_labels = 0; using the default of {}",
                key,
                DEFAULT_NUM_LABELS
            );
        }
        let num_labels = optional::<usize>(&attrs, key, "num_labels")?.unwrap_or(DEFAULT_NUM_LABELS);

        let info = Self {
            task,
            task_type,
            text_column,
            label_column,
            num_labels,
            id_column:            optional(&attrs, key, "id_column")?,
            text_pair_column:     optional(&attrs, key, "text_pair_column")?,
            train_split:          optional(&attrs, key, "train_split")?
                .unwrap_or_else(|| DEFAULT_TRAIN_SPLIT.to_string()),
            eval_split:           optional(&attrs, key, "eval_split")?
                .unwrap_or_else(|| DEFAULT_EVAL_SPLIT.to_string()),
            metric_name:          optional(&attrs, key, "metric_name")?,
            extra_options:        optional(&attrs, key, "extra_options")?.unwrap_or_default(),
            is_split_into_words:  optional(&attrs, key, "is_split_into_words")?.unwrap_or(false),
            preprocess_function:  PreprocessFunction::for_task(&task_id),
            postprocess_function: PostprocessFunction::for_task(&task_id),
        };

        info.validate()?;
        Ok(info)
    }

    /// Check the cross-field invariants of a descriptor
    pub fn validate(&self) -> Result<()> {
        match (&self.task_type, &self.label_column) {
            (TaskType::DependencyParsing, LabelColumn::Split { .. }) => {}
            (TaskType::DependencyParsing, LabelColumn::Single(_)) => {
                return Err(FinetuneError::config(
                    "for dependency parsing, 'label_column' should be constructed as \
                     {\"head\": <head_column>, \"dependency\": <dependency_relation_column>}",
                ));
            }
            (other, LabelColumn::Split { .. }) => {
                return Err(FinetuneError::config(format!(
                    "the {{head, dependency}} label column form is only valid for \
                     dependency parsing, not {other}"
                )));
            }
            _ => {}
        }

        if self.task_type == TaskType::TokenClassification
            && self.extra_options.label_all_tokens
            && self.extra_options.b_to_i_label.as_ref().map_or(true, |t| t.is_empty())
        {
            return Err(FinetuneError::config(
                "'label_all_tokens' requires a non-empty 'b_to_i_label' table in extra_options",
            ));
        }

        Ok(())
    }

    /// The catalog identifier, "<group>-<name>"
    pub fn id(&self) -> String {
        self.task.to_string()
    }
}

/// Absent, null, false, zero and empty values all fall back to defaults
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null       => false,
        Value::Bool(b)    => *b,
        Value::Number(n)  => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s)  => !s.is_empty(),
        Value::Array(a)   => !a.is_empty(),
        Value::Object(o)  => !o.is_empty(),
    }
}

fn optional<T: for<'de> Deserialize<'de>>(
    attrs: &Map<String, Value>,
    key:   &str,
    name:  &str,
) -> Result<Option<T>> {
    attrs
        .get(name)
        .map(|value| {
            serde_json::from_value(value.clone()).map_err(|e| {
                FinetuneError::config(format!("attribute '{name}' of '{key}': {e}"))
            })
        })
        .transpose()
}

fn required<T: for<'de> Deserialize<'de>>(
    attrs: &Map<String, Value>,
    key:   &str,
    name:  &str,
) -> Result<T> {
    optional(attrs, key, name)?
        .ok_or_else(|| FinetuneError::config(format!("catalog entry '{key}' has no '{name}'")))
}
