// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Concrete implementations of the capabilities the inner layers
// only describe as traits, plus file I/O:
//
//   tokenizer_store.rs — HfTokenizer
//                        Loads a HuggingFace tokenizer.json and
//                        implements TextTokenizer on top of the
//                        `tokenizers` crate.
//
//   model_store.rs     — LocalModelStore
//                        A ModelLoader that finds checkpoints in
//                        local directories by their config.json.
//
//   output_store.rs    — Reading example files and writing
//                        aligned features and run configs.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// HuggingFace tokenizer adapter
pub mod tokenizer_store;

/// Local checkpoint lookup
pub mod model_store;

/// JSON-lines input and feature output
pub mod output_store;
