use ndarray::{Array2, Array3, ArrayD, Axis, Ix3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TomoError};
use crate::operation::params::{ParamValue, Roi, StackParameter, StackParameterProvider};
use crate::operation::record::OperationRecord;

/// Element type reported in stack metadata. Processing always runs in `f32`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Float32,
}

/// Metadata persisted next to a saved stack.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StackMetadata {
    #[serde(default)]
    pub dtype: DataType,
    #[serde(default)]
    pub operation_history: Vec<OperationRecord>,
    /// (min, max) of the sample values the saved 16-bit images were scaled from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_range: Option<(f32, f32)>,
}

/// A radiograph volume with optional flat/dark references and its processing history.
///
/// Axis 0 of every volume is the image index; shapes are `(images, height, width)`.
#[derive(Clone, Debug)]
pub struct ImageStack {
    sample: Array3<f32>,
    flat: Option<Array3<f32>>,
    dark: Option<Array3<f32>>,
    dtype: DataType,
    history: Vec<OperationRecord>,
    roi: Option<Roi>,
}

fn check_not_empty(data: &Array3<f32>) -> Result<()> {
    if data.is_empty() {
        return Err(TomoError::EmptyStack);
    }
    Ok(())
}

impl ImageStack {
    pub fn new(sample: Array3<f32>) -> Result<Self> {
        check_not_empty(&sample)?;
        Ok(Self {
            sample,
            flat: None,
            dark: None,
            dtype: DataType::Float32,
            history: Vec::new(),
            roi: None,
        })
    }

    /// Build a stack from a dynamically-shaped array, rejecting anything that
    /// is not exactly three-dimensional.
    pub fn from_dyn(sample: ArrayD<f32>) -> Result<Self> {
        let ndim = sample.ndim();
        let shape = sample.shape().to_vec();
        let sample = sample
            .into_dimensionality::<Ix3>()
            .map_err(|_| TomoError::InvalidShape { ndim, shape })?;
        Self::new(sample)
    }

    /// Attach flat and dark reference volumes.
    pub fn with_references(mut self, flat: Array3<f32>, dark: Array3<f32>) -> Result<Self> {
        check_not_empty(&flat)?;
        check_not_empty(&dark)?;
        self.flat = Some(flat);
        self.dark = Some(dark);
        Ok(self)
    }

    /// Attach single-image flat and dark references.
    pub fn with_reference_images(self, flat: Array2<f32>, dark: Array2<f32>) -> Result<Self> {
        self.with_references(flat.insert_axis(Axis(0)), dark.insert_axis(Axis(0)))
    }

    /// Restore a stack's history, e.g. after loading it from disk.
    pub fn with_history(mut self, history: Vec<OperationRecord>) -> Self {
        self.history = history;
        self
    }

    pub fn sample(&self) -> &Array3<f32> {
        &self.sample
    }

    pub fn flat(&self) -> Option<&Array3<f32>> {
        self.flat.as_ref()
    }

    pub fn dark(&self) -> Option<&Array3<f32>> {
        self.dark.as_ref()
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn operation_history(&self) -> &[OperationRecord] {
        &self.history
    }

    pub fn num_images(&self) -> usize {
        self.sample.len_of(Axis(0))
    }

    /// `(height, width)` of each image.
    pub fn image_dim(&self) -> (usize, usize) {
        let (_, h, w) = self.sample.dim();
        (h, w)
    }

    pub fn roi(&self) -> Option<Roi> {
        self.roi
    }

    pub fn set_roi(&mut self, roi: Option<Roi>) {
        self.roi = roi;
    }

    pub fn metadata(&self) -> StackMetadata {
        StackMetadata {
            dtype: self.dtype,
            operation_history: self.history.clone(),
            value_range: None,
        }
    }

    pub(crate) fn replace_sample(&mut self, sample: Array3<f32>) {
        self.sample = sample;
    }

    pub(crate) fn replace_references(&mut self, flat: Array3<f32>, dark: Array3<f32>) {
        self.flat = Some(flat);
        self.dark = Some(dark);
    }

    pub(crate) fn push_record(&mut self, record: OperationRecord) -> &OperationRecord {
        self.history.push(record);
        &self.history[self.history.len() - 1]
    }
}

impl StackParameterProvider for ImageStack {
    fn parameter(&self, param: StackParameter) -> Option<ParamValue> {
        match param {
            StackParameter::Roi => self.roi.map(Roi::to_param),
        }
    }
}
