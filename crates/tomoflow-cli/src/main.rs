mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tomoflow", about = "Tomography pre-processing pipeline")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available operations and their parameters
    List(commands::list::ListArgs),
    /// Apply a single operation to a stack
    Apply(commands::apply::ApplyArgs),
    /// Run the operations of a pipeline config
    Run(commands::run::RunArgs),
    /// Re-apply the recorded history of one stack to another
    Replay(commands::replay::ReplayArgs),
    /// Show the operation history of a saved stack
    History(commands::history::HistoryArgs),
    /// Print a default pipeline config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::List(args) => commands::list::run(args),
        Commands::Apply(args) => commands::apply::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Replay(args) => commands::replay::run(args),
        Commands::History(args) => commands::history::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
