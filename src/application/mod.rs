// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers for one goal each:
// planning a fine-tuning run, or preprocessing a dataset split.
//
// Rules for this layer:
//   - No alignment or resolver logic here
//   - No UI or printing here (that's Layer 1)
//   - Only workflow coordination, with anyhow context on errors
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

/// Resolve model, collator and trainer for a task or group
pub mod plan_use_case;

/// Align a JSON-lines dataset split into features
pub mod preprocess_use_case;
