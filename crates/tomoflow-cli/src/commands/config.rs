use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tomoflow_core::operation::{Kwargs, ParamValue};
use tomoflow_core::pipeline::{FilterStep, PipelineConfig};

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a default PipelineConfig with an example set of steps.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = PipelineConfig {
        steps: vec![
            FilterStep::new("background_correction", Kwargs::new()),
            FilterStep::new(
                "median_filter",
                Kwargs::from([
                    ("size".to_string(), ParamValue::Int(3)),
                    ("mode".to_string(), ParamValue::from("reflect")),
                ]),
            ),
            FilterStep::new("minus_log", Kwargs::new()),
        ],
        ..PipelineConfig::default()
    };
    let toml_str = config.to_toml_string()?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
