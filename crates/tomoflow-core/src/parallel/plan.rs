use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Worker settings for the execution engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Size of the worker pool.
    #[serde(default = "default_cores")]
    pub cores: usize,
    /// Images per chunk. Defaults to an even split across `cores`.
    #[serde(default)]
    pub chunksize: Option<usize>,
    /// Set to `false` to force the sequential path.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_parallel() -> bool {
    true
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            cores: default_cores(),
            chunksize: None,
            parallel: default_parallel(),
        }
    }
}

impl ExecutionConfig {
    pub fn sequential() -> Self {
        Self {
            cores: 1,
            chunksize: None,
            parallel: false,
        }
    }

    pub fn with_cores(cores: usize) -> Self {
        Self {
            cores,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Sequential,
    Parallel,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "Sequential"),
            Self::Parallel => write!(f, "Parallel"),
        }
    }
}

/// How one invocation splits its work along axis 0.
///
/// Chunks are contiguous, non-overlapping, non-empty and cover `0..len` in
/// order. On the sequential path every image is its own unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub strategy: Strategy,
    pub workers: usize,
    pub chunksize: usize,
    pub chunks: Vec<Range<usize>>,
}

impl ExecutionPlan {
    pub fn new(len: usize, config: &ExecutionConfig) -> Self {
        let cores = config.cores.max(1);
        if !config.parallel || cores <= 1 || len <= 1 {
            return Self {
                strategy: Strategy::Sequential,
                workers: 1,
                chunksize: 1,
                chunks: partition(len, 1),
            };
        }

        let chunksize = config
            .chunksize
            .unwrap_or_else(|| len.div_ceil(cores))
            .clamp(1, len);
        let chunks = partition(len, chunksize);
        Self {
            strategy: Strategy::Parallel,
            // Never more threads than chunks to hand out.
            workers: cores.min(chunks.len()),
            chunksize,
            chunks,
        }
    }

    /// Number of progress units: chunks in parallel, images sequentially.
    pub fn total_units(&self) -> usize {
        self.chunks.len()
    }
}

/// Split `0..len` into consecutive ranges of `chunksize` (the last may be shorter).
pub fn partition(len: usize, chunksize: usize) -> Vec<Range<usize>> {
    let chunksize = chunksize.max(1);
    (0..len)
        .step_by(chunksize)
        .map(|start| start..(start + chunksize).min(len))
        .collect()
}
