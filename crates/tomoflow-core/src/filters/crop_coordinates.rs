use std::sync::Arc;

use ndarray::{s, Array3};

use crate::error::Result;
use crate::operation::{
    ImportError, Kwargs, Operation, OperationInput, OperationOutput, ParamSpec, Roi,
};
use crate::parallel::{slice_map, Executor};
use crate::progress::ProgressReporter;

use super::roi_arg;

/// Crops every image to the current region of interest. Flat and dark
/// references, when present, are cropped to the same region.
pub struct CropCoordinates;

pub fn load() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(CropCoordinates))
}

fn crop_volume(volume: &Array3<f32>, roi: Roi) -> Array3<f32> {
    volume
        .slice(s![.., roi.top..roi.bottom, roi.left..roi.right])
        .to_owned()
}

impl Operation for CropCoordinates {
    fn name(&self) -> &'static str {
        "crop_coordinates"
    }

    fn display_name(&self) -> &'static str {
        "Crop Coordinates"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::stack_roi("roi", "Region of interest")]
    }

    fn execute(
        &self,
        input: OperationInput<'_>,
        kwargs: &Kwargs,
        executor: &Executor,
        progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput> {
        let (_, h, w) = input.sample.dim();
        let roi = roi_arg(kwargs, self.name(), "roi", (h, w))?;

        let map = slice_map(move |image| {
            Ok(image
                .slice(s![roi.top..roi.bottom, roi.left..roi.right])
                .to_owned())
        });
        let sample = executor.execute_map(input.sample.view(), &map, self.display_name(), progress)?;

        match (input.flat, input.dark) {
            (Some(flat), Some(dark)) => Ok(OperationOutput::Triple {
                sample,
                flat: crop_volume(flat, roi),
                dark: crop_volume(dark, roi),
            }),
            _ => Ok(OperationOutput::Single(sample)),
        }
    }
}
