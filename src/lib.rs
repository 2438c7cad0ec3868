// ============================================================
// koai-bench — library root
// ============================================================
// Layers, outermost first:
//
//   cli/          Layer 1 — argument parsing and printing
//   application/  Layer 2 — plan and preprocess workflows
//   domain/       Layer 3 — task descriptors, batches, traits
//   data/         Layer 4 — catalog, hooks, aligners, collators
//   ml/           Layer 5 — model / trainer resolution, postprocessing
//   infra/        Layer 6 — tokenizer, model store, file I/O
//
// Library callers usually need only:
//   TaskCatalog::get_task_info, get_model, get_example_function,
//   get_data_collator, get_trainer and trim_task_name.

pub mod error;

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;

#[cfg(test)]
mod test_support;

pub use data::aligner::{get_example_function, ExampleFunction, ExampleFunctions};
pub use data::catalog::TaskCatalog;
pub use data::collator::{get_data_collator, DataCollator};
pub use domain::naming::trim_task_name;
pub use domain::task_info::TaskInfo;
pub use error::{FinetuneError, Result};
pub use ml::model::get_model;
pub use ml::trainer::get_trainer;
