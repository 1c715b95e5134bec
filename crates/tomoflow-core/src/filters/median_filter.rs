use std::sync::Arc;

use ndarray::{Array2, ArrayView2};

use crate::error::Result;
use crate::operation::{
    ImportError, Kwargs, Operation, OperationInput, OperationOutput, ParamSpec,
};
use crate::parallel::{slice_kernel, Executor};
use crate::progress::ProgressReporter;

use super::{int_arg, mode_arg, BoundaryMode, BOUNDARY_MODES};

pub struct MedianFilter;

pub fn load() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(MedianFilter))
}

impl Operation for MedianFilter {
    fn name(&self) -> &'static str {
        "median_filter"
    }

    fn display_name(&self) -> &'static str {
        "Median"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::int("size", "Kernel size", 1, 255)
                .required()
                .help("Side of the square window. 1 leaves the data unchanged."),
            ParamSpec::choice("mode", "Edge mode", BOUNDARY_MODES)
                .default_value("reflect")
                .help("How the window is filled past the image border."),
        ]
    }

    fn execute(
        &self,
        input: OperationInput<'_>,
        kwargs: &Kwargs,
        executor: &Executor,
        progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput> {
        let size = int_arg(kwargs, self.name(), "size")?;
        let mode = mode_arg(kwargs, self.name(), "mode")?;
        if size <= 1 {
            progress.begin(self.display_name(), 1);
            progress.advance(1);
            progress.finish();
            return Ok(OperationOutput::Single(input.sample));
        }

        let size = size as usize;
        let kernel = slice_kernel(move |mut image| {
            let filtered = median_image(image.view(), size, mode);
            image.assign(&filtered);
            Ok(())
        });
        let sample = executor.execute(input.sample, &kernel, self.display_name(), progress)?;
        Ok(OperationOutput::Single(sample))
    }
}

/// Median of a `size` x `size` window around every pixel.
///
/// For even sizes the window extends one pixel further up/left than
/// down/right, and the upper of the two middle values is taken.
pub fn median_image(image: ArrayView2<'_, f32>, size: usize, mode: BoundaryMode) -> Array2<f32> {
    let (h, w) = image.dim();
    let before = (size / 2) as isize;
    let mut window = Vec::with_capacity(size * size);

    Array2::from_shape_fn((h, w), |(row, col)| {
        window.clear();
        for dr in 0..size as isize {
            let src_row = mode.resolve(row as isize - before + dr, h);
            for dc in 0..size as isize {
                let src_col = mode.resolve(col as isize - before + dc, w);
                let value = match (src_row, src_col) {
                    (Some(r), Some(c)) => image[[r, c]],
                    _ => 0.0,
                };
                window.push(value);
            }
        }
        middle_value(&mut window)
    })
}

fn middle_value(values: &mut [f32]) -> f32 {
    let mid = values.len() / 2;
    *values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b)).1
}
