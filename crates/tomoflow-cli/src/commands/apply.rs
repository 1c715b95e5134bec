use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tomoflow_core::io::save_stack;
use tomoflow_core::pipeline::FilterController;

use super::{load_input, parse_kwargs, pipeline_config, ExecutionArgs, OutputArgs, StackArgs};
use crate::progress::BarReporter;
use crate::summary::print_stack;

#[derive(Args)]
pub struct ApplyArgs {
    /// Operation name (see `tomoflow list`)
    pub operation: String,

    /// Parameters as NAME=VALUE
    #[arg(value_name = "NAME=VALUE")]
    pub params: Vec<String>,

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

pub fn run(args: &ApplyArgs) -> Result<()> {
    let config = pipeline_config(args.config.as_deref(), &args.exec)?;
    let controller = FilterController::from_config(&config)?;
    let descriptor = controller.registry().get(&args.operation)?;
    let kwargs = parse_kwargs(descriptor, &args.params)?;

    let mut stack = load_input(&args.stack, &config)?;
    print_stack(&stack, &args.stack.input.display().to_string());
    println!();

    let reporter = BarReporter::new();
    let record = controller
        .apply_named(&args.operation, &mut stack, &kwargs, &reporter)
        .with_context(|| format!("{} failed", descriptor.display_name()))?;
    println!("Applied {record}");

    save_stack(&stack, &args.output.output, &args.output.prefix)?;
    println!("\nOutput saved to {}", args.output.output.display());
    Ok(())
}
