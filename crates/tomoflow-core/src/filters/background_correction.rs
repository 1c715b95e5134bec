use std::sync::Arc;

use ndarray::{Array2, Array3, Axis, Zip};
use tracing::debug;

use crate::consts::MINIMUM_PIXEL_VALUE;
use crate::error::{Result, TomoError};
use crate::operation::{ImportError, Kwargs, Operation, OperationInput, OperationOutput};
use crate::parallel::{slice_kernel, Executor};
use crate::progress::ProgressReporter;

/// Flat-field correction: `(sample - dark) / (flat - dark)` using the mean
/// flat and dark images.
///
/// The averaged references replace the stack's flat and dark volumes, so
/// the result is always a triple.
pub struct BackgroundCorrection;

pub fn load() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(BackgroundCorrection))
}

fn mean_image(volume: &Array3<f32>, operation: &str, what: &str) -> Result<Array2<f32>> {
    volume
        .mean_axis(Axis(0))
        .ok_or_else(|| TomoError::validation(operation, format!("{what} reference is empty")))
}

impl Operation for BackgroundCorrection {
    fn name(&self) -> &'static str {
        "background_correction"
    }

    fn display_name(&self) -> &'static str {
        "Background Correction"
    }

    fn execute(
        &self,
        input: OperationInput<'_>,
        _kwargs: &Kwargs,
        executor: &Executor,
        progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput> {
        let (Some(flat), Some(dark)) = (input.flat, input.dark) else {
            return Err(TomoError::validation(
                self.name(),
                "flat and dark reference images are required",
            ));
        };
        let (_, h, w) = input.sample.dim();
        for (what, volume) in [("flat", flat), ("dark", dark)] {
            let (_, rh, rw) = volume.dim();
            if (rh, rw) != (h, w) {
                return Err(TomoError::validation(
                    self.name(),
                    format!("{what} images are {rh}x{rw}, sample images are {h}x{w}"),
                ));
            }
        }

        let flat = mean_image(flat, self.name(), "flat")?;
        let dark = mean_image(dark, self.name(), "dark")?;
        let mut denominator = &flat - &dark;
        let clamped = denominator.iter().filter(|&&v| v < MINIMUM_PIXEL_VALUE).count();
        denominator.mapv_inplace(|v| v.max(MINIMUM_PIXEL_VALUE));
        if clamped > 0 {
            debug!(clamped, "Flat not brighter than dark at some pixels");
        }

        let sample = {
            let kernel = slice_kernel(|mut image| {
                Zip::from(&mut image)
                    .and(&dark)
                    .and(&denominator)
                    .for_each(|pixel, &d, &n| *pixel = (*pixel - d) / n);
                Ok(())
            });
            executor.execute(input.sample, &kernel, self.display_name(), progress)?
        };

        Ok(OperationOutput::Triple {
            sample,
            flat: flat.insert_axis(Axis(0)),
            dark: dark.insert_axis(Axis(0)),
        })
    }
}
