use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::operation::{DiscoveryConfig, Kwargs, Roi};
use crate::parallel::ExecutionConfig;

/// A batch processing run: where operations come from, how they execute and
/// which ones to apply, in order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Region of interest supplied to operations that take one from the stack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi: Option<Roi>,
    #[serde(default)]
    pub steps: Vec<FilterStep>,
}

/// One operation of a pipeline with its caller-supplied keyword arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterStep {
    pub operation: String,
    #[serde(default)]
    pub kwargs: Kwargs,
}

impl FilterStep {
    pub fn new(operation: impl Into<String>, kwargs: Kwargs) -> Self {
        Self {
            operation: operation.into(),
            kwargs,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
