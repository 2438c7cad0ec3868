// ============================================================
// Error Types
// ============================================================
// One error enum for every library layer. The CLI and the
// application use cases wrap these in anyhow::Error with extra
// context, the same split the binary has always had:
//   - library code  → FinetuneError (matchable variants)
//   - binary code   → anyhow::Result (human-readable chains)
//
// Reference: Rust Book §9 (Recoverable Errors with Result)

use thiserror::Error;

/// Everything that can go wrong while resolving a task or
/// aligning a batch of examples.
#[derive(Error, Debug)]
pub enum FinetuneError {
    /// The model loader produced nothing for this identifier
    #[error("Can't find any model matching '{model}' on the model hub or in a local directory")]
    ModelNotFound { model: String },

    /// A task descriptor or its options have the wrong shape
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Task identifiers look like "<group>-<name>"
    #[error("Invalid task identifier '{id}': expected '<group>-<name>'")]
    InvalidTaskId { id: String },

    #[error("Unknown task type '{0}'")]
    UnknownTaskType(String),

    #[error("Unknown data collator '{0}'")]
    UnknownCollator(String),

    /// A column the routine needs is not in the example batch
    #[error("Column '{column}' is missing from the example batch")]
    MissingColumn { column: String },

    /// A cell does not have the shape the routine expects
    #[error("Invalid value in column '{column}' at row {row}: {message}")]
    InvalidExample {
        column:  String,
        row:     usize,
        message: String,
    },

    /// A label index points outside a remap table
    #[error("Label {label} is out of range for a table of {size} entries")]
    LabelOutOfRange { label: i64, size: usize },

    /// A dependency relation that is not in label_names
    #[error("Unknown label '{0}'")]
    UnknownLabel(String),

    /// The tokenizer emitted a span without a classification token
    #[error("Tokenized span {span} has no classification token")]
    MissingClsToken { span: usize },

    #[error("Catalog error: {message}")]
    Catalog { message: String },

    #[error("Tokenizer error: {message}")]
    Tokenizer { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failures from external collaborators pass through untouched
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias used across the library layers
pub type Result<T> = std::result::Result<T, FinetuneError>;

impl FinetuneError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration { message: message.into() }
    }

    pub fn tokenizer(message: impl Into<String>) -> Self {
        Self::Tokenizer { message: message.into() }
    }

    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn { column: column.into() }
    }

    pub fn invalid_example(column: impl Into<String>, row: usize, message: impl Into<String>) -> Self {
        Self::InvalidExample {
            column:  column.into(),
            row,
            message: message.into(),
        }
    }
}
