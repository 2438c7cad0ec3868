// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses command line arguments with `clap` and hands the work
// to Layer 2 (application). Results are printed here and only
// here, as JSON where they are structured.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PlanArgs, PreprocessArgs};

use crate::application::{plan_use_case::PlanUseCase, preprocess_use_case::PreprocessUseCase};
use crate::data::catalog::TaskCatalog;
use crate::domain::naming::trim_task_name;

#[derive(Parser, Debug)]
#[command(
    name = "koai-bench",
    version,
    about = "Resolve benchmark tasks and align their examples for fine-tuning."
)]
pub struct Cli {
    /// Task catalog JSON; the embedded catalog when omitted
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand; the CLI layer never computes.
    pub fn run(self) -> Result<()> {
        let catalog = self.catalog;
        match self.command {
            Commands::Tasks            => run_tasks(catalog),
            Commands::Plan(args)       => run_plan(args, catalog),
            Commands::Preprocess(args) => run_preprocess(args, catalog),
            Commands::TrimName(args)   => {
                println!("{}", trim_task_name(&args.name));
                Ok(())
            }
        }
    }
}

fn run_tasks(catalog: Option<PathBuf>) -> Result<()> {
    let catalog = TaskCatalog::load_or_builtin(catalog.as_deref())?;
    for id in catalog.task_ids() {
        for info in catalog.get_task_info(id)? {
            println!("{:<16} {}", info.id(), info.task_type);
        }
    }
    Ok(())
}

fn run_plan(args: PlanArgs, catalog: Option<PathBuf>) -> Result<()> {
    tracing::info!("Planning '{}' with model '{}'", args.task, args.model);
    let plans = PlanUseCase::new(args.into_config(catalog)).execute()?;
    println!("{}", serde_json::to_string_pretty(&plans)?);
    Ok(())
}

fn run_preprocess(args: PreprocessArgs, catalog: Option<PathBuf>) -> Result<()> {
    let summary = PreprocessUseCase::new(args.into_config(catalog)).execute()?;
    println!(
        "Aligned {} examples into {} features: {}",
        summary.examples,
        summary.features,
        summary.output.display()
    );
    Ok(())
}
