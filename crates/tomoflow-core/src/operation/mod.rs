pub mod params;
pub mod record;
pub mod registry;

use ndarray::Array3;

use crate::error::Result;
use crate::parallel::Executor;
use crate::progress::ProgressReporter;

pub use params::{
    Kwargs, ParamKind, ParamSource, ParamSpec, ParamValue, Roi, StackParameter,
    StackParameterProvider,
};
pub use record::{deserialize_history, BoundOperation, OperationRecord};
pub use registry::{
    DiscoveryConfig, ImportError, ImportPolicy, OperationDescriptor, OperationModule, Registry,
};

/// Volumes handed to an operation.
///
/// `sample` is a private working copy owned by the operation for the
/// duration of the call; the stack is only updated once the operation has
/// returned successfully.
pub struct OperationInput<'a> {
    pub sample: Array3<f32>,
    pub flat: Option<&'a Array3<f32>>,
    pub dark: Option<&'a Array3<f32>>,
}

/// What an operation produced.
#[derive(Clone, Debug)]
pub enum OperationOutput {
    /// A new sample volume; references are left as they were.
    Single(Array3<f32>),
    /// New sample, flat and dark volumes.
    Triple {
        sample: Array3<f32>,
        flat: Array3<f32>,
        dark: Array3<f32>,
    },
}

/// A named transform that can be applied to an image stack.
pub trait Operation: Send + Sync {
    /// Unique, unqualified name. Used as the key in recorded history.
    fn name(&self) -> &'static str;

    /// Human-readable name for listings and history display.
    fn display_name(&self) -> &'static str;

    /// Keyword parameters accepted by [`execute`](Self::execute).
    fn params(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    /// Runtime availability check, e.g. for an external tool.
    fn available(&self) -> bool {
        true
    }

    /// Run the operation. `kwargs` has already been validated against
    /// [`params`](Self::params), with defaults filled in.
    fn execute(
        &self,
        input: OperationInput<'_>,
        kwargs: &Kwargs,
        executor: &Executor,
        progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput>;
}
