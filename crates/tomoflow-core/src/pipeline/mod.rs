pub mod config;
mod controller;

pub use config::{FilterStep, PipelineConfig};
pub use controller::{resolve_parameters, validate_parameters, FilterController};
