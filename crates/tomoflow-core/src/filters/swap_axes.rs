use std::sync::Arc;

use crate::error::{Result, TomoError};
use crate::operation::{ImportError, Kwargs, Operation, OperationInput, OperationOutput};
use crate::parallel::Executor;
use crate::progress::ProgressReporter;

/// Exchanges the image and row axes, turning projections into sinograms
/// and back.
pub struct SwapAxes;

pub fn load() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(SwapAxes))
}

impl Operation for SwapAxes {
    fn name(&self) -> &'static str {
        "swap_axes"
    }

    fn display_name(&self) -> &'static str {
        "Swap Axes"
    }

    fn execute(
        &self,
        input: OperationInput<'_>,
        _kwargs: &Kwargs,
        _executor: &Executor,
        progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput> {
        if input.flat.is_some() || input.dark.is_some() {
            return Err(TomoError::validation(
                self.name(),
                "stacks with flat/dark references must be background corrected first",
            ));
        }

        // Whole-volume transform: a single unit of work.
        progress.begin(self.display_name(), 1);
        let swapped = input
            .sample
            .permuted_axes([1, 0, 2])
            .as_standard_layout()
            .into_owned();
        progress.advance(1);
        progress.finish();
        Ok(OperationOutput::Single(swapped))
    }
}
