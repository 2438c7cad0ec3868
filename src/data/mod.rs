// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a catalog entry and model-ready tensors.
//
// The pipeline flows in this order:
//
//   benchmarks.json
//       │
//       ▼
//   TaskCatalog        → resolves task ids and groups to TaskInfo
//       │
//       ▼
//   PreprocessFunction → per-task reshaping of raw examples
//       │
//       ▼
//   ExampleFunction    → tokenizes and aligns labels to tokens
//       │
//       ▼
//   FeatureDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   DataCollator       → pads features to a rectangular batch
//       │
//       ▼
//   FeatureBatcher     → implements Burn's Batcher trait
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Task catalog loading and lookup
pub mod catalog;

/// Per-task preprocess hooks (klue-sts, klue-re, klue-mrc)
pub mod preprocess;

/// Token-to-label alignment routines
pub mod aligner;

/// Implements Burn's Dataset trait over aligned features
pub mod dataset;

/// Collator selection and padding
pub mod collator;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
