#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use ndarray::{Array3, Axis};

use tomoflow_core::error::{Result, TomoError};
use tomoflow_core::operation::{
    ImportError, ImportPolicy, Kwargs, Operation, OperationInput, OperationModule,
    OperationOutput, ParamSpec, ParamValue, Registry,
};
use tomoflow_core::parallel::{slice_kernel, Executor};
use tomoflow_core::progress::ProgressReporter;
use tomoflow_core::stack::ImageStack;

// ---------------------------------------------------------------------------
// Volumes
// ---------------------------------------------------------------------------

/// Volume where every pixel of image `i` equals `i`.
pub fn make_indexed_volume(n: usize, h: usize, w: usize) -> Array3<f32> {
    Array3::from_shape_fn((n, h, w), |(i, _, _)| i as f32)
}

/// Deterministic pseudo-random volume in [0, 1).
pub fn make_noise_volume(n: usize, h: usize, w: usize, seed: u64) -> Array3<f32> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    Array3::from_shape_simple_fn((n, h, w), || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 40) as f32) / (1u64 << 24) as f32
    })
}

pub fn make_stack(n: usize, h: usize, w: usize) -> ImageStack {
    ImageStack::new(make_noise_volume(n, h, w, 7)).unwrap()
}

pub fn kwargs(pairs: &[(&str, ParamValue)]) -> Kwargs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Test operations
// ---------------------------------------------------------------------------

/// Returns its input unchanged.
pub struct Identity;

impl Operation for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn display_name(&self) -> &'static str {
        "Identity"
    }

    fn execute(
        &self,
        input: OperationInput<'_>,
        _kwargs: &Kwargs,
        _executor: &Executor,
        _progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput> {
        Ok(OperationOutput::Single(input.sample))
    }
}

/// Adds the required integer `size` to every pixel.
pub struct AddSize;

impl Operation for AddSize {
    fn name(&self) -> &'static str {
        "add_size"
    }

    fn display_name(&self) -> &'static str {
        "Add Size"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::int("size", "Size", 0, 100).required()]
    }

    fn execute(
        &self,
        input: OperationInput<'_>,
        kwargs: &Kwargs,
        executor: &Executor,
        progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput> {
        let size = kwargs["size"].as_i64().unwrap() as f32;
        let kernel = slice_kernel(move |mut image| {
            image += size;
            Ok(())
        });
        let sample = executor.execute(input.sample, &kernel, "Add Size", progress)?;
        Ok(OperationOutput::Single(sample))
    }
}

/// Returns new references: flat = 2, dark = 1, with the sample untouched.
pub struct ReplaceReferences;

impl Operation for ReplaceReferences {
    fn name(&self) -> &'static str {
        "replace_references"
    }

    fn display_name(&self) -> &'static str {
        "Replace References"
    }

    fn execute(
        &self,
        input: OperationInput<'_>,
        _kwargs: &Kwargs,
        _executor: &Executor,
        _progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput> {
        let (_, h, w) = input.sample.dim();
        Ok(OperationOutput::Triple {
            sample: input.sample,
            flat: Array3::from_elem((1, h, w), 2.0),
            dark: Array3::from_elem((1, h, w), 1.0),
        })
    }
}

/// Returns an empty volume.
pub struct EmptyResult;

impl Operation for EmptyResult {
    fn name(&self) -> &'static str {
        "empty_result"
    }

    fn display_name(&self) -> &'static str {
        "Empty Result"
    }

    fn execute(
        &self,
        _input: OperationInput<'_>,
        _kwargs: &Kwargs,
        _executor: &Executor,
        _progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput> {
        Ok(OperationOutput::Single(Array3::zeros((0, 4, 4))))
    }
}

/// Negates every image, failing on images whose first pixel is at least `from`.
pub struct FailFrom;

impl Operation for FailFrom {
    fn name(&self) -> &'static str {
        "fail_from"
    }

    fn display_name(&self) -> &'static str {
        "Fail From"
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::float("from", "From", 0.0, 1e6).required()]
    }

    fn execute(
        &self,
        input: OperationInput<'_>,
        kwargs: &Kwargs,
        executor: &Executor,
        progress: &dyn ProgressReporter,
    ) -> Result<OperationOutput> {
        let from = kwargs["from"].as_f64().unwrap() as f32;
        let kernel = slice_kernel(move |mut image| {
            if image[[0, 0]] >= from {
                return Err(TomoError::Filter(format!("image {}", image[[0, 0]])));
            }
            image.mapv_inplace(|v| -v);
            Ok(())
        });
        let sample = executor.execute(input.sample, &kernel, "Fail From", progress)?;
        Ok(OperationOutput::Single(sample))
    }
}

fn load_identity() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(Identity))
}

fn load_add_size() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(AddSize))
}

fn load_replace_references() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(ReplaceReferences))
}

fn load_empty_result() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(EmptyResult))
}

fn load_fail_from() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Ok(Arc::new(FailFrom))
}

pub fn load_missing_dependency() -> std::result::Result<Arc<dyn Operation>, ImportError> {
    Err(ImportError::new("tomopy", "not installed"))
}

/// Catalog of the test operations under `ops`, with one module whose
/// dependency is missing.
pub fn test_catalog() -> Vec<OperationModule> {
    vec![
        OperationModule::new("ops/identity", load_identity),
        OperationModule::new("ops/add_size", load_add_size),
        OperationModule::new("ops/replace_references", load_replace_references),
        OperationModule::new("ops/empty_result", load_empty_result),
        OperationModule::new("ops/fail_from", load_fail_from),
        OperationModule::new("ops/missing_dependency", load_missing_dependency),
    ]
}

pub fn test_registry() -> Arc<Registry> {
    Arc::new(Registry::discover(&test_catalog(), "ops", &[], ImportPolicy::Degrade).unwrap())
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    Begin(String, usize),
    Advance(usize),
    Finish,
}

/// Records every progress call in order.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn begin(&self, label: &str, total_units: usize) {
        self.events
            .lock()
            .unwrap()
            .push(ProgressEvent::Begin(label.to_string(), total_units));
    }

    fn advance(&self, units_done: usize) {
        self.events
            .lock()
            .unwrap()
            .push(ProgressEvent::Advance(units_done));
    }

    fn finish(&self) {
        self.events.lock().unwrap().push(ProgressEvent::Finish);
    }
}

/// Image `i` of `volume`, for readable assertions.
pub fn image_values(volume: &Array3<f32>, i: usize) -> Vec<f32> {
    volume.index_axis(Axis(0), i).iter().copied().collect()
}
