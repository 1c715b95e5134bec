use std::sync::Arc;

use crate::error::{Result, TomoError};
use crate::operation::{
    ImportError, Kwargs, Operation, OperationInput, OperationOutput, ParamSpec,
};
use crate::parallel::{slice_kernel, Executor};
use crate::progress::ProgressReporter;

use super::optional_float_arg;

const LIMIT: f64 = 1e9;

pub struct ClipValues;

pub fn load() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(ClipValues))
}

impl Operation for ClipValues {
    fn name(&self) -> &'static str {
        "clip_values"
    }

    fn display_name(&self) -> &'static str {
        "Clip Values"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::float("clip_min", "Clip Min", -LIMIT, LIMIT)
                .help("Values below this are replaced."),
            ParamSpec::float("clip_max", "Clip Max", -LIMIT, LIMIT)
                .help("Values above this are replaced."),
            ParamSpec::float("clip_min_new_value", "Min Replacement", -LIMIT, LIMIT)
                .help("Replacement for values below the minimum. Defaults to the minimum."),
            ParamSpec::float("clip_max_new_value", "Max Replacement", -LIMIT, LIMIT)
                .help("Replacement for values above the maximum. Defaults to the maximum."),
        ]
    }

    fn execute(
        &self,
        input: OperationInput<'_>,
        kwargs: &Kwargs,
        executor: &Executor,
        progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput> {
        let name = self.name();
        let clip_min = optional_float_arg(kwargs, name, "clip_min")?;
        let clip_max = optional_float_arg(kwargs, name, "clip_max")?;
        if let (Some(lo), Some(hi)) = (clip_min, clip_max) {
            if lo > hi {
                return Err(TomoError::validation(
                    name,
                    format!("clip_min ({lo}) is greater than clip_max ({hi})"),
                ));
            }
        }
        let clip_min_new = optional_float_arg(kwargs, name, "clip_min_new_value")?;
        let clip_max_new = optional_float_arg(kwargs, name, "clip_max_new_value")?;
        for (bound, replacement, what) in [
            (clip_min, clip_min_new, "clip_min"),
            (clip_max, clip_max_new, "clip_max"),
        ] {
            if bound.is_none() && replacement.is_some() {
                return Err(TomoError::validation(
                    name,
                    format!("{what}_new_value is given without {what}"),
                ));
            }
        }
        if clip_min.is_none() && clip_max.is_none() {
            progress.begin(self.display_name(), 1);
            progress.advance(1);
            progress.finish();
            return Ok(OperationOutput::Single(input.sample));
        }

        let lower = clip_min.map(|lo| (lo as f32, clip_min_new.unwrap_or(lo) as f32));
        let upper = clip_max.map(|hi| (hi as f32, clip_max_new.unwrap_or(hi) as f32));

        let kernel = slice_kernel(move |mut image| {
            image.mapv_inplace(|v| match (lower, upper) {
                (Some((lo, new_lo)), _) if v < lo => new_lo,
                (_, Some((hi, new_hi))) if v > hi => new_hi,
                _ => v,
            });
            Ok(())
        });
        let sample = executor.execute(input.sample, &kernel, self.display_name(), progress)?;
        Ok(OperationOutput::Single(sample))
    }
}
