use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tomoflow_core::operation::Registry;

use super::{pipeline_config, ExecutionArgs};
use crate::summary::print_operations;

#[derive(Args)]
pub struct ListArgs {
    /// Pipeline config file (TOML) with discovery settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Include work-in-progress operations
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub exec: ExecutionArgs,
}

pub fn run(args: &ListArgs) -> Result<()> {
    let mut config = pipeline_config(args.config.as_deref(), &args.exec)?;
    if args.all {
        config.discovery.ignored.clear();
    }
    let registry = Registry::builtin(&config.discovery).context("Operation discovery failed")?;
    print_operations(&registry);
    Ok(())
}
