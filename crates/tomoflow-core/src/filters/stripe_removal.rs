//! Ring artefact suppression on sinograms.
//!
//! Vertical stripes in a sinogram are detector columns whose response is
//! off by a near-constant amount across all projections. Each sinogram is
//! split into a smooth part (box filter along the detector) and a high-pass
//! residual; the residual of every detector column is transformed along the
//! projection axis and its low angular frequencies are damped with
//! `1 - exp(-k^2 / 2 sigma^2)`, which removes the constant offset while
//! leaving structure that varies with angle.
//!
//! Needs the `fft` feature. Without it the module still registers, but
//! loading it reports the missing dependency.

use std::sync::Arc;

use crate::operation::{ImportError, Operation};

#[cfg(feature = "fft")]
pub use fourier::{SinogramFilter, StripeRemoval};

#[cfg(feature = "fft")]
pub fn load() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(StripeRemoval))
}

#[cfg(not(feature = "fft"))]
pub fn load() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Err(ImportError::new(
        "rustfft",
        "tomoflow-core was built without the `fft` feature",
    ))
}

#[cfg(feature = "fft")]
mod fourier {
    use std::sync::Arc;

    use ndarray::{Array2, ArrayView2, ArrayViewMut2, Axis};
    use num_complex::Complex;
    use rustfft::{Fft, FftPlanner};

    use crate::consts::{DEFAULT_STRIPE_SIGMA, DEFAULT_STRIPE_SIZE};
    use crate::error::Result;
    use crate::filters::{float_arg, int_arg, BoundaryMode};
    use crate::operation::{Kwargs, Operation, OperationInput, OperationOutput, ParamSpec};
    use crate::parallel::{Executor, SliceKernel};
    use crate::progress::ProgressReporter;

    pub struct StripeRemoval;

    impl Operation for StripeRemoval {
        fn name(&self) -> &'static str {
            "stripe_removal"
        }

        fn display_name(&self) -> &'static str {
            "Stripe Removal"
        }

        fn params(&self) -> Vec<ParamSpec> {
            vec![
                ParamSpec::float("sigma", "Sigma", 0.01, 1000.0)
                    .default_value(DEFAULT_STRIPE_SIGMA)
                    .help("Width of the damping in angular frequency."),
                ParamSpec::int("size", "Size", 1, 255)
                    .default_value(DEFAULT_STRIPE_SIZE)
                    .help("Detector smoothing width separating stripes from structure."),
            ]
        }

        fn execute(
            &self,
            input: OperationInput<'_>,
            kwargs: &Kwargs,
            executor: &Executor,
            progress: &dyn ProgressReporter,
        ) -> Result<OperationOutput> {
            let sigma = float_arg(kwargs, self.name(), "sigma")? as f32;
            let size = int_arg(kwargs, self.name(), "size")?.max(1) as usize;

            let mut sample = input.sample;
            let filter = SinogramFilter::new(sample.len_of(Axis(0)), sigma, size);
            // (projections, rows, columns) -> (rows, projections, columns):
            // each image along axis 0 of the view is one sinogram.
            let sinograms = sample.view_mut().permuted_axes([1, 0, 2]);
            executor.execute_in_place(sinograms, &filter, self.display_name(), progress)?;
            Ok(OperationOutput::Single(sample))
        }
    }

    /// Per-sinogram kernel. FFT plans are built once and shared by all workers.
    pub struct SinogramFilter {
        forward: Arc<dyn Fft<f32>>,
        inverse: Arc<dyn Fft<f32>>,
        damping: Vec<f32>,
        size: usize,
    }

    impl SinogramFilter {
        pub fn new(projections: usize, sigma: f32, size: usize) -> Self {
            let mut planner = FftPlanner::new();
            let two_sigma_sq = 2.0 * sigma * sigma;
            let damping = (0..projections)
                .map(|k| {
                    let freq = k.min(projections - k) as f32;
                    1.0 - (-freq * freq / two_sigma_sq).exp()
                })
                .collect();
            Self {
                forward: planner.plan_fft_forward(projections),
                inverse: planner.plan_fft_inverse(projections),
                damping,
                size,
            }
        }
    }

    impl SliceKernel for SinogramFilter {
        fn apply(&self, mut sinogram: ArrayViewMut2<'_, f32>) -> Result<()> {
            let (projections, columns) = sinogram.dim();
            let smooth = smooth_rows(sinogram.view(), self.size);
            let scale = 1.0 / projections as f32;
            let mut buffer = vec![Complex::new(0.0f32, 0.0); projections];

            for col in 0..columns {
                for (row, slot) in buffer.iter_mut().enumerate() {
                    *slot = Complex::new(sinogram[[row, col]] - smooth[[row, col]], 0.0);
                }
                self.forward.process(&mut buffer);
                for (slot, &d) in buffer.iter_mut().zip(&self.damping) {
                    *slot *= d;
                }
                self.inverse.process(&mut buffer);
                for (row, slot) in buffer.iter().enumerate() {
                    sinogram[[row, col]] = smooth[[row, col]] + slot.re * scale;
                }
            }
            Ok(())
        }
    }

    /// Box mean of width `size` along each row, edges extended with the
    /// nearest pixel.
    fn smooth_rows(data: ArrayView2<'_, f32>, size: usize) -> Array2<f32> {
        let (h, w) = data.dim();
        let before = (size / 2) as isize;
        let norm = 1.0 / size as f32;
        Array2::from_shape_fn((h, w), |(row, col)| {
            let mut sum = 0.0f32;
            for k in 0..size as isize {
                let src = BoundaryMode::Nearest
                    .resolve(col as isize - before + k, w)
                    .unwrap_or(col);
                sum += data[[row, src]];
            }
            sum * norm
        })
    }
}
