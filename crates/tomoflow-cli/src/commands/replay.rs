use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tomoflow_core::io::{read_metadata, save_stack};
use tomoflow_core::pipeline::FilterController;

use super::{load_input, pipeline_config, ExecutionArgs, OutputArgs, StackArgs};
use crate::progress::BarReporter;
use crate::summary::print_history;

#[derive(Args)]
pub struct ReplayArgs {
    /// Saved stack directory whose history is replayed
    #[arg(long)]
    pub from: PathBuf,

    /// Pipeline config file (TOML) with execution settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub stack: StackArgs,

    #[command(flatten)]
    pub exec: ExecutionArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run(args: &ReplayArgs) -> Result<()> {
    let history = read_metadata(&args.from)
        .with_context(|| format!("Failed to read history from {}", args.from.display()))?
        .map(|m| m.operation_history)
        .unwrap_or_default();
    print_history(&history);

    let config = pipeline_config(args.config.as_deref(), &args.exec)?;
    let controller = FilterController::from_config(&config)?;
    let mut stack = load_input(&args.stack, &config)?;

    let reporter = BarReporter::new();
    let applied = controller
        .replay(&history, &mut stack, &reporter)
        .context("Replay aborted")?;

    save_stack(&stack, &args.output.output, &args.output.prefix)?;
    println!(
        "\n{applied} operation(s) replayed, output saved to {}",
        args.output.output.display()
    );
    Ok(())
}
