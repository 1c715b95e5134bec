use thiserror::Error;

#[derive(Error, Debug)]
pub enum TomoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Could not write configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Operation discovery failed: {0}")]
    Discovery(String),

    #[error("Operation not found: {0}")]
    NotFound(String),

    #[error("Unknown operation in history: {0}")]
    UnknownOperation(String),

    #[error("Operation '{name}' is unavailable: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("Invalid operation name {0:?}: names must be non-empty and unqualified")]
    InvalidOperationName(String),

    #[error("Invalid parameters for '{operation}': {reason}")]
    Validation { operation: String, reason: String },

    #[error("{label} failed in chunk {chunk}: {source}")]
    OperationExecution {
        label: String,
        chunk: usize,
        #[source]
        source: Box<TomoError>,
    },

    #[error("Operation '{operation}' returned an unexpected result: {reason}")]
    UnexpectedResult { operation: String, reason: String },

    #[error("Invalid stack shape: expected 3 dimensions, got {ndim} ({shape:?})")]
    InvalidShape { ndim: usize, shape: Vec<usize> },

    #[error("Empty image stack")]
    EmptyStack,

    #[error("Filter error: {0}")]
    Filter(String),
}

impl TomoError {
    pub(crate) fn validation(operation: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TomoError>;
