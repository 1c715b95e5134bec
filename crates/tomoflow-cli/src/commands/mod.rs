pub mod apply;
pub mod config;
pub mod history;
pub mod list;
pub mod replay;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use tomoflow_core::io::{load_reference, load_stack};
use tomoflow_core::operation::{ImportPolicy, Kwargs, OperationDescriptor, ParamSpec, Roi};
use tomoflow_core::pipeline::PipelineConfig;
use tomoflow_core::stack::ImageStack;
use tracing::debug;

/// Where a stack is loaded from.
#[derive(Args)]
pub struct StackArgs {
    /// Directory of sample images
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory of flat-field images
    #[arg(long, requires = "dark")]
    pub flat: Option<PathBuf>,

    /// Directory of dark-field images
    #[arg(long, requires = "flat")]
    pub dark: Option<PathBuf>,

    /// Region of interest as left,top,right,bottom
    #[arg(long, value_parser = parse_roi)]
    pub roi: Option<Roi>,
}

/// Overrides for the execution and discovery settings of a config.
#[derive(Args)]
pub struct ExecutionArgs {
    /// Number of worker threads
    #[arg(long)]
    pub cores: Option<usize>,

    /// Images per chunk
    #[arg(long)]
    pub chunksize: Option<usize>,

    /// Run on the calling thread only
    #[arg(long)]
    pub sequential: bool,

    /// List operations with missing dependencies as unavailable instead of failing
    #[arg(long)]
    pub degrade: bool,
}

/// Where a processed stack is written.
#[derive(Args)]
pub struct OutputArgs {
    /// Output directory
    #[arg(short, long)]
    pub output: PathBuf,

    /// File name prefix of the saved images
    #[arg(long, default_value = "image")]
    pub prefix: String,
}

fn parse_roi(text: &str) -> std::result::Result<Roi, String> {
    let spec = ParamSpec::stack_roi("roi", "ROI");
    let value = spec.parse_value(text)?;
    Roi::from_param(&value).ok_or_else(|| format!("invalid region {text:?}"))
}

/// Load a config file (or the defaults) and apply command-line overrides.
pub fn pipeline_config(path: Option<&Path>, exec: &ExecutionArgs) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(cores) = exec.cores {
        config.execution.cores = cores;
    }
    if exec.chunksize.is_some() {
        config.execution.chunksize = exec.chunksize;
    }
    if exec.sequential {
        config.execution.parallel = false;
    }
    if exec.degrade {
        config.discovery.on_import_failure = ImportPolicy::Degrade;
    }
    debug!(execution = ?config.execution, discovery = ?config.discovery, "Resolved config");
    Ok(config)
}

/// Load the input stack with its references and region of interest.
///
/// A region given on the command line takes precedence over the config's.
pub fn load_input(args: &StackArgs, config: &PipelineConfig) -> Result<ImageStack> {
    let mut stack = load_stack(&args.input)
        .with_context(|| format!("Failed to load stack from {}", args.input.display()))?;
    if let (Some(flat), Some(dark)) = (&args.flat, &args.dark) {
        let flat = load_reference(flat)
            .with_context(|| format!("Failed to load flat images from {}", flat.display()))?;
        let dark = load_reference(dark)
            .with_context(|| format!("Failed to load dark images from {}", dark.display()))?;
        stack = stack.with_references(flat, dark)?;
    }
    stack.set_roi(args.roi.or(config.roi));
    Ok(stack)
}

/// Parse `name=value` pairs against an operation's parameters.
pub fn parse_kwargs(descriptor: &OperationDescriptor, pairs: &[String]) -> Result<Kwargs> {
    let mut kwargs = Kwargs::new();
    for pair in pairs {
        let Some((name, text)) = pair.split_once('=') else {
            bail!("Expected NAME=VALUE, got {pair:?}");
        };
        let name = name.trim();
        let Some(spec) = descriptor.param(name) else {
            bail!(
                "'{}' has no parameter '{name}' (see `tomoflow list`)",
                descriptor.name()
            );
        };
        let value = spec.parse_value(text).map_err(anyhow::Error::msg)?;
        kwargs.insert(name.to_string(), value);
    }
    Ok(kwargs)
}
