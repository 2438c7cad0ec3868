// ============================================================
// Layer 5 — ML Layer
// ============================================================
// Everything that knows about models, without building one:
//
//   model.rs       — task type → model kind, loader capabilities,
//                    the ModelLoader trait and get_model
//
//   trainer.rs     — task type → (training arguments, trainer)
//
//   postprocess.rs — model outputs → task predictions
//                    (extractive QA answer search for klue-mrc)
//
// Reference: Devlin et al. (2019) BERT

/// Model kind resolution and loading
pub mod model;

/// Trainer kind resolution
pub mod trainer;

/// Prediction postprocessing hooks
pub mod postprocess;
