// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe benchmark tasks and the data
// flowing through preprocessing.
//
// Rules for this layer:
//   - NO tokenizers or burn types here
//   - NO file I/O
//   - Only structs, enums and traits
//
// Everything else in the crate is written in terms of these
// types, so this layer can be tested without a tokenizer file
// or a model checkpoint.

/// The closed set of task families
pub mod task_type;

/// Task descriptors built from catalog entries
pub mod task_info;

/// Per-task preprocess / postprocess hook names and splits
pub mod hooks;

/// Raw example batches, tokenized batches and features
pub mod batch;

/// The tokenization capability used by the aligners
pub mod traits;

/// Filesystem-safe task names
pub mod naming;
