pub mod consts;
pub mod error;
pub mod filters;
pub mod io;
pub mod operation;
pub mod parallel;
pub mod pipeline;
pub mod progress;
pub mod stack;
