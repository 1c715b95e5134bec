use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tomoflow_core::io::read_metadata;

use crate::summary::print_history;

#[derive(Args)]
pub struct HistoryArgs {
    /// Saved stack directory
    pub input: PathBuf,

    /// Print the raw metadata entries as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &HistoryArgs) -> Result<()> {
    let history = read_metadata(&args.input)
        .with_context(|| format!("Failed to read metadata in {}", args.input.display()))?
        .map(|m| m.operation_history)
        .unwrap_or_default();

    if args.json {
        for record in &history {
            println!("{}", record.to_entry()?);
        }
    } else {
        print_history(&history);
    }
    Ok(())
}
