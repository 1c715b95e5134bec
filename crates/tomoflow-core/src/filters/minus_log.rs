use std::sync::Arc;

use crate::consts::MINUS_LOG_FLOOR;
use crate::error::Result;
use crate::operation::{ImportError, Kwargs, Operation, OperationInput, OperationOutput};
use crate::parallel::{slice_kernel, Executor};
use crate::progress::ProgressReporter;

/// Converts transmission images to attenuation: `-ln(x)`.
pub struct MinusLog;

pub fn load() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(MinusLog))
}

impl Operation for MinusLog {
    fn name(&self) -> &'static str {
        "minus_log"
    }

    fn display_name(&self) -> &'static str {
        "Minus Log"
    }

    fn execute(
        &self,
        input: OperationInput<'_>,
        _kwargs: &Kwargs,
        executor: &Executor,
        progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput> {
        let kernel = slice_kernel(|mut image| {
            // Floor first so zero and negative counts stay finite.
            image.mapv_inplace(|v| -v.max(MINUS_LOG_FLOOR).ln());
            Ok(())
        });
        let sample = executor.execute(input.sample, &kernel, self.display_name(), progress)?;
        Ok(OperationOutput::Single(sample))
    }
}
