mod engine;
pub mod plan;

pub use engine::{slice_kernel, slice_map, Executor, FnKernel, FnMap, SliceKernel, SliceMap};
pub use plan::{partition, ExecutionConfig, ExecutionPlan, Strategy};
