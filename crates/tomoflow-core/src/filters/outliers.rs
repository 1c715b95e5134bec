use std::sync::Arc;

use ndarray::Zip;

use crate::consts::DEFAULT_OUTLIER_RADIUS;
use crate::error::{Result, TomoError};
use crate::operation::{
    ImportError, Kwargs, Operation, OperationInput, OperationOutput, ParamSpec,
};
use crate::parallel::{slice_kernel, Executor};
use crate::progress::ProgressReporter;

use super::median_filter::median_image;
use super::{float_arg, int_arg, text_arg, BoundaryMode};

pub const OUTLIER_MODES: &[&str] = &["bright", "dark"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Polarity {
    Bright,
    Dark,
}

/// Replaces pixels that differ from their local median by at least
/// `threshold` with that median.
pub struct RemoveOutliers;

pub fn load() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(RemoveOutliers))
}

impl Operation for RemoveOutliers {
    fn name(&self) -> &'static str {
        "outliers"
    }

    fn display_name(&self) -> &'static str {
        "Remove Outliers"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::float("threshold", "Difference", 0.0, 1e9)
                .required()
                .help("Minimum distance from the local median."),
            ParamSpec::int("radius", "Size", 1, 255)
                .default_value(DEFAULT_OUTLIER_RADIUS)
                .help("Side of the median window."),
            ParamSpec::choice("mode", "Mode", OUTLIER_MODES)
                .default_value("bright")
                .help("Remove pixels brighter or darker than their surroundings."),
        ]
    }

    fn execute(
        &self,
        input: OperationInput<'_>,
        kwargs: &Kwargs,
        executor: &Executor,
        progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput> {
        let threshold = float_arg(kwargs, self.name(), "threshold")? as f32;
        let radius = int_arg(kwargs, self.name(), "radius")?.max(1) as usize;
        let polarity = match text_arg(kwargs, self.name(), "mode")? {
            "bright" => Polarity::Bright,
            "dark" => Polarity::Dark,
            other => {
                return Err(TomoError::validation(
                    self.name(),
                    format!("unknown mode {other:?}"),
                ))
            }
        };

        let kernel = slice_kernel(move |mut image| {
            let median = median_image(image.view(), radius, BoundaryMode::Reflect);
            Zip::from(&mut image).and(&median).for_each(|pixel, &m| {
                let distance = match polarity {
                    Polarity::Bright => *pixel - m,
                    Polarity::Dark => m - *pixel,
                };
                if distance >= threshold {
                    *pixel = m;
                }
            });
            Ok(())
        });
        let sample = executor.execute(input.sample, &kernel, self.display_name(), progress)?;
        Ok(OperationOutput::Single(sample))
    }
}
