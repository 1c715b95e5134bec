use std::sync::Arc;

use ndarray::{Array2, ArrayView2};

use crate::error::Result;
use crate::filters::float_arg;
use crate::operation::{
    ImportError, Kwargs, Operation, OperationInput, OperationOutput, ParamSpec,
};
use crate::parallel::{slice_kernel, Executor};
use crate::progress::ProgressReporter;

pub struct Gaussian;

pub fn load() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(Gaussian))
}

impl Operation for Gaussian {
    fn name(&self) -> &'static str {
        "gaussian"
    }

    fn display_name(&self) -> &'static str {
        "Gaussian (WIP)"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::float("sigma", "Sigma", 0.1, 100.0).default_value(1.0)]
    }

    fn execute(
        &self,
        input: OperationInput<'_>,
        kwargs: &Kwargs,
        executor: &Executor,
        progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput> {
        let sigma = float_arg(kwargs, self.name(), "sigma")? as f32;
        let taps = make_gaussian_kernel(sigma);
        let kernel = slice_kernel(|mut image| {
            let blurred = gaussian_blur_image(image.view(), &taps);
            image.assign(&blurred);
            Ok(())
        });
        let sample = executor.execute(input.sample, &kernel, self.display_name(), progress)?;
        Ok(OperationOutput::Single(sample))
    }
}

/// Separable Gaussian blur with edge clamping.
pub fn gaussian_blur_image(data: ArrayView2<'_, f32>, taps: &[f32]) -> Array2<f32> {
    let row_pass = convolve(data, taps, true);
    convolve(row_pass.view(), taps, false)
}

pub fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    let s2 = 2.0 * sigma * sigma;
    let mut taps: Vec<f32> = (0..2 * radius + 1)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / s2).exp()
        })
        .collect();
    let sum: f32 = taps.iter().sum();
    for v in &mut taps {
        *v /= sum;
    }
    taps
}

fn convolve(data: ArrayView2<'_, f32>, taps: &[f32], along_rows: bool) -> Array2<f32> {
    let (h, w) = data.dim();
    let radius = (taps.len() / 2) as isize;
    Array2::from_shape_fn((h, w), |(row, col)| {
        taps.iter()
            .enumerate()
            .map(|(ki, &kv)| {
                let offset = ki as isize - radius;
                let v = if along_rows {
                    data[[row, (col as isize + offset).clamp(0, w as isize - 1) as usize]]
                } else {
                    data[[(row as isize + offset).clamp(0, h as isize - 1) as usize, col]]
                };
                v * kv
            })
            .sum()
    })
}
