// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands and their flags:
//
//   tasks      — list the catalog
//   plan       — resolve model / collator / trainer for a task
//   preprocess — align a JSON-lines split into features
//   trim-name  — print a filesystem-safe run name
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::application::plan_use_case::PlanConfig;
use crate::application::preprocess_use_case::PreprocessConfig;
use crate::domain::hooks::Split;
use crate::domain::traits::Padding;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the tasks in the catalog
    Tasks,

    /// Show what a fine-tuning run for a task (or task group) needs
    Plan(PlanArgs),

    /// Tokenize and align a JSON-lines dataset split
    Preprocess(PreprocessArgs),

    /// Turn a free-form name into a filesystem-safe one
    TrimName(TrimNameArgs),
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Task identifier ("klue-ner") or group ("klue")
    #[arg(long)]
    pub task: String,

    /// Model identifier or checkpoint directory
    #[arg(long, default_value = "klue/roberta-base")]
    pub model: String,

    /// Passed to heads that take a maximum sequence length
    #[arg(long, default_value_t = 512)]
    pub max_seq_length: usize,

    /// Also read the model's config.json from disk
    #[arg(long)]
    pub load_model: bool,

    /// Directory model identifiers are resolved against
    #[arg(long)]
    pub model_root: Option<PathBuf>,
}

impl PlanArgs {
    pub fn into_config(self, catalog: Option<PathBuf>) -> PlanConfig {
        PlanConfig {
            catalog,
            task:               self.task,
            model_name_or_path: self.model,
            max_seq_length:     self.max_seq_length,
            load_model:         self.load_model,
            model_root:         self.model_root,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SplitArg {
    Train,
    Validation,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PaddingArg {
    Longest,
    MaxLength,
    DoNotPad,
}

#[derive(Args, Debug)]
pub struct PreprocessArgs {
    /// A single task identifier
    #[arg(long)]
    pub task: String,

    /// tokenizer.json, or a directory containing one
    #[arg(long)]
    pub tokenizer: PathBuf,

    /// JSON-lines file, one example per line
    #[arg(long)]
    pub input: PathBuf,

    /// Where features and the run config are written
    #[arg(long, default_value = "features")]
    pub output_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = SplitArg::Train)]
    pub split: SplitArg,

    #[arg(long)]
    pub max_source_length: Option<usize>,

    /// Saved with the run config; targets are copied untokenized
    #[arg(long)]
    pub max_target_length: Option<usize>,

    #[arg(long, value_enum, default_value_t = PaddingArg::Longest)]
    pub padding: PaddingArg,

    /// Disable truncation to max_source_length
    #[arg(long)]
    pub no_truncation: bool,

    /// Examples per aligned batch
    #[arg(long, default_value_t = 1000)]
    pub batch_size: usize,
}

impl PreprocessArgs {
    /// Boundary between Layer 1 and Layer 2: the application layer
    /// never sees clap types.
    pub fn into_config(self, catalog: Option<PathBuf>) -> PreprocessConfig {
        PreprocessConfig {
            catalog,
            task:              self.task,
            tokenizer:         self.tokenizer,
            input:             self.input,
            output_dir:        self.output_dir,
            split:             match self.split {
                SplitArg::Train      => Split::Train,
                SplitArg::Validation => Split::Validation,
            },
            max_source_length: self.max_source_length,
            max_target_length: self.max_target_length,
            padding:           match self.padding {
                PaddingArg::Longest   => Padding::Longest,
                PaddingArg::MaxLength => Padding::MaxLength,
                PaddingArg::DoNotPad  => Padding::DoNotPad,
            },
            truncation:        !self.no_truncation,
            batch_size:        self.batch_size,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrimNameArgs {
    pub name: String,
}
