use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageBuffer, ImageFormat, Luma};
use ndarray::{Array2, Array3, ArrayView2, Axis};
use tracing::{debug, info};

use crate::consts::{METADATA_FILE_NAME, U16_FULL_SCALE};
use crate::error::{Result, TomoError};
use crate::operation::deserialize_history;
use crate::stack::{ImageStack, StackMetadata};

const IMAGE_EXTENSIONS: &[&str] = &["tif", "tiff", "png"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Image files of `dir`, sorted by file name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load a grayscale image, normalised to [0, 1].
pub fn load_image(path: &Path) -> Result<Array2<f32>> {
    let gray = image::open(path)?.to_luma16();
    let (w, h) = gray.dimensions();
    Ok(Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        gray.get_pixel(col as u32, row as u32).0[0] as f32 / U16_FULL_SCALE
    }))
}

/// Load every image of `dir` into one volume. All images must share a size.
pub fn load_volume(dir: &Path) -> Result<Array3<f32>> {
    let paths = list_images(dir)?;
    if paths.is_empty() {
        return Err(TomoError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no images in {}", dir.display()),
        )));
    }
    let images = paths
        .iter()
        .map(|p| load_image(p))
        .collect::<Result<Vec<_>>>()?;
    let views: Vec<ArrayView2<'_, f32>> = images.iter().map(|i| i.view()).collect();
    let volume = ndarray::stack(Axis(0), &views)?;
    debug!(dir = %dir.display(), shape = ?volume.dim(), "Loaded volume");
    Ok(volume)
}

/// Read `metadata.json` from `dir`, if there is one.
///
/// The history is checked record by record, so a malformed or namespaced
/// entry fails the load.
pub fn read_metadata(dir: &Path) -> Result<Option<StackMetadata>> {
    let path = dir.join(METADATA_FILE_NAME);
    if !path.is_file() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    let dtype = match value.get("dtype") {
        Some(v) => serde_json::from_value(v.clone())?,
        None => Default::default(),
    };
    let value_range = match value.get("value_range") {
        Some(v) => serde_json::from_value(v.clone())?,
        None => None,
    };
    Ok(Some(StackMetadata {
        dtype,
        operation_history: deserialize_history(&value)?,
        value_range,
    }))
}

fn rescale(volume: &mut Array3<f32>, metadata: Option<&StackMetadata>) {
    if let Some((lo, hi)) = metadata.and_then(|m| m.value_range) {
        let span = hi - lo;
        volume.mapv_inplace(|v| v * span + lo);
    }
}

/// Load an image stack together with its saved history.
pub fn load_stack(dir: &Path) -> Result<ImageStack> {
    let mut volume = load_volume(dir)?;
    let metadata = read_metadata(dir)?;
    rescale(&mut volume, metadata.as_ref());
    let history = metadata.map(|m| m.operation_history).unwrap_or_default();
    info!(
        dir = %dir.display(),
        images = volume.len_of(Axis(0)),
        history = history.len(),
        "Loaded stack"
    );
    Ok(ImageStack::new(volume)?.with_history(history))
}

/// Load a flat or dark reference directory.
pub fn load_reference(dir: &Path) -> Result<Array3<f32>> {
    let mut volume = load_volume(dir)?;
    rescale(&mut volume, read_metadata(dir)?.as_ref());
    Ok(volume)
}

fn value_range(volume: &Array3<f32>) -> (f32, f32) {
    let (lo, hi) = volume
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        (0.0, 1.0)
    } else if hi > lo {
        (lo, hi)
    } else {
        (lo, lo + 1.0)
    }
}

/// Save one image as 16-bit grayscale TIFF, mapping `range` onto the full scale.
pub fn save_tiff(image: ArrayView2<'_, f32>, range: (f32, f32), path: &Path) -> Result<()> {
    let (h, w) = image.dim();
    let (lo, hi) = range;
    let pixels: Vec<u16> = image
        .iter()
        .map(|&v| (((v - lo) / (hi - lo)).clamp(0.0, 1.0) * U16_FULL_SCALE).round() as u16)
        .collect();
    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or_else(|| {
            TomoError::Io(std::io::Error::other(
                "pixel buffer does not match image dimensions",
            ))
        })?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save a stack as `<prefix>_NNNN.tif` files plus `metadata.json`.
///
/// The sample's value range is stored in the metadata so loading restores
/// the original floating-point values up to 16-bit quantisation.
pub fn save_stack(stack: &ImageStack, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let range = value_range(stack.sample());

    let mut paths = Vec::with_capacity(stack.num_images());
    for (index, image) in stack.sample().outer_iter().enumerate() {
        let path = dir.join(format!("{prefix}_{index:04}.tif"));
        save_tiff(image, range, &path)?;
        paths.push(path);
    }

    let metadata = StackMetadata {
        value_range: Some(range),
        ..stack.metadata()
    };
    fs::write(
        dir.join(METADATA_FILE_NAME),
        serde_json::to_string_pretty(&metadata)?,
    )?;
    info!(
        dir = %dir.display(),
        images = paths.len(),
        history = metadata.operation_history.len(),
        "Saved stack"
    );
    Ok(paths)
}
