use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tomoflow_core::io::save_stack;
use tomoflow_core::pipeline::FilterController;

use super::{load_input, pipeline_config, ExecutionArgs, OutputArgs, StackArgs};
use crate::progress::BarReporter;
use crate::summary::print_pipeline_summary;

#[derive(Args)]
pub struct RunArgs {
    /// Pipeline config file (TOML)
    pub config: PathBuf,

    #[command(flatten)]
    pub stack: StackArgs,

    #[command(flatten)]
    pub exec: ExecutionArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = pipeline_config(Some(args.config.as_path()), &args.exec)?;
    let controller = FilterController::from_config(&config)?;
    let mut stack = load_input(&args.stack, &config)?;
    print_pipeline_summary(&config, &stack, &args.stack.input.display().to_string());

    let reporter = BarReporter::new();
    let applied = controller
        .run_steps(&config.steps, &mut stack, &reporter)
        .context("Pipeline aborted")?;

    save_stack(&stack, &args.output.output, &args.output.prefix)?;
    println!(
        "\n{applied} operation(s) applied, output saved to {}",
        args.output.output.display()
    );
    Ok(())
}
