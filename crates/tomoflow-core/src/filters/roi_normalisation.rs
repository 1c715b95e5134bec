use std::sync::Arc;

use ndarray::s;

use crate::consts::MINIMUM_PIXEL_VALUE;
use crate::error::{Result, TomoError};
use crate::operation::{
    ImportError, Kwargs, Operation, OperationInput, OperationOutput, ParamSpec,
};
use crate::parallel::{slice_kernel, Executor};
use crate::progress::ProgressReporter;

use super::roi_arg;

/// Divides each image by the mean of an open-beam (air) region, removing
/// beam intensity fluctuations between projections.
pub struct RoiNormalisation;

pub fn load() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(RoiNormalisation))
}

impl Operation for RoiNormalisation {
    fn name(&self) -> &'static str {
        "roi_normalisation"
    }

    fn display_name(&self) -> &'static str {
        "ROI Normalisation"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::stack_roi("air_region", "Air region")
            .help("Region containing only open beam.")]
    }

    fn execute(
        &self,
        input: OperationInput<'_>,
        kwargs: &Kwargs,
        executor: &Executor,
        progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput> {
        let (_, h, w) = input.sample.dim();
        let roi = roi_arg(kwargs, self.name(), "air_region", (h, w))?;

        let kernel = slice_kernel(move |mut image| {
            let mean = image
                .slice(s![roi.top..roi.bottom, roi.left..roi.right])
                .mean()
                .unwrap_or(0.0);
            if mean.abs() < MINIMUM_PIXEL_VALUE {
                return Err(TomoError::Filter(format!(
                    "air region {roi} has zero mean"
                )));
            }
            image.mapv_inplace(|v| v / mean);
            Ok(())
        });
        let sample = executor.execute(input.sample, &kernel, self.display_name(), progress)?;
        Ok(OperationOutput::Single(sample))
    }
}
