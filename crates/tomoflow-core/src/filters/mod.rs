pub mod background_correction;
pub mod clip_values;
pub mod crop_coordinates;
pub mod median_filter;
pub mod minus_log;
pub mod outliers;
pub mod roi_normalisation;
pub mod stripe_removal;
pub mod swap_axes;
pub mod wip;

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TomoError};
use crate::operation::{Kwargs, OperationModule, ParamValue, Roi};

static CATALOG: &[OperationModule] = &[
    OperationModule::new("filters/background_correction", background_correction::load),
    OperationModule::new("filters/clip_values", clip_values::load),
    OperationModule::new("filters/crop_coordinates", crop_coordinates::load),
    OperationModule::new("filters/median_filter", median_filter::load),
    OperationModule::new("filters/minus_log", minus_log::load),
    OperationModule::new("filters/outliers", outliers::load),
    OperationModule::new("filters/roi_normalisation", roi_normalisation::load),
    OperationModule::new("filters/stripe_removal", stripe_removal::load),
    OperationModule::new("filters/swap_axes", swap_axes::load),
    OperationModule::new("filters/wip/gaussian", wip::gaussian::load),
];

/// The built-in operation modules, in listing order.
pub fn catalog() -> &'static [OperationModule] {
    CATALOG
}

/// Names accepted by the `mode` parameter of neighbourhood filters.
pub const BOUNDARY_MODES: &[&str] = &["reflect", "constant", "nearest", "mirror", "wrap"];

/// How neighbourhood filters extend an image past its edges.
///
/// For an edge `a b c d`:
///
/// | mode     | extension           |
/// |----------|---------------------|
/// | reflect  | `d c b a \| a b c d \| d c b a` |
/// | constant | `0 0 0 0 \| a b c d \| 0 0 0 0` |
/// | nearest  | `a a a a \| a b c d \| d d d d` |
/// | mirror   | `d c b \| a b c d \| c b a`     |
/// | wrap     | `a b c d \| a b c d \| a b c d` |
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundaryMode {
    #[default]
    Reflect,
    Constant,
    Nearest,
    Mirror,
    Wrap,
}

impl BoundaryMode {
    /// Map `index` onto `0..len`, or `None` where the constant fill applies.
    pub fn resolve(self, index: isize, len: usize) -> Option<usize> {
        let n = len as isize;
        if (0..n).contains(&index) {
            return Some(index as usize);
        }
        let mapped = match self {
            Self::Constant => return None,
            Self::Nearest => index.clamp(0, n - 1),
            Self::Wrap => index.rem_euclid(n),
            Self::Reflect => {
                let m = index.rem_euclid(2 * n);
                if m < n {
                    m
                } else {
                    2 * n - 1 - m
                }
            }
            Self::Mirror => {
                if n == 1 {
                    0
                } else {
                    let period = 2 * n - 2;
                    let m = index.rem_euclid(period);
                    if m < n {
                        m
                    } else {
                        period - m
                    }
                }
            }
        };
        Some(mapped as usize)
    }
}

impl FromStr for BoundaryMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "reflect" => Ok(Self::Reflect),
            "constant" => Ok(Self::Constant),
            "nearest" => Ok(Self::Nearest),
            "mirror" => Ok(Self::Mirror),
            "wrap" => Ok(Self::Wrap),
            other => Err(format!(
                "unknown boundary mode {other:?}, expected one of {}",
                BOUNDARY_MODES.join("|")
            )),
        }
    }
}

impl fmt::Display for BoundaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reflect => "reflect",
            Self::Constant => "constant",
            Self::Nearest => "nearest",
            Self::Mirror => "mirror",
            Self::Wrap => "wrap",
        };
        write!(f, "{name}")
    }
}

// Keyword accessors for operation implementations. The controller has
// already checked kinds and filled defaults, so a failure here means the
// operation was invoked directly with bad arguments.

fn arg<'k>(kwargs: &'k Kwargs, operation: &str, name: &str) -> Result<&'k ParamValue> {
    kwargs
        .get(name)
        .ok_or_else(|| TomoError::validation(operation, format!("missing parameter '{name}'")))
}

fn wrong_kind(operation: &str, name: &str, expected: &str) -> TomoError {
    TomoError::validation(operation, format!("'{name}' must be {expected}"))
}

pub(crate) fn float_arg(kwargs: &Kwargs, operation: &str, name: &str) -> Result<f64> {
    arg(kwargs, operation, name)?
        .as_f64()
        .ok_or_else(|| wrong_kind(operation, name, "a number"))
}

pub(crate) fn optional_float_arg(
    kwargs: &Kwargs,
    operation: &str,
    name: &str,
) -> Result<Option<f64>> {
    match kwargs.get(name) {
        None | Some(ParamValue::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| wrong_kind(operation, name, "a number")),
    }
}

pub(crate) fn int_arg(kwargs: &Kwargs, operation: &str, name: &str) -> Result<i64> {
    arg(kwargs, operation, name)?
        .as_i64()
        .ok_or_else(|| wrong_kind(operation, name, "an integer"))
}

pub(crate) fn text_arg<'k>(kwargs: &'k Kwargs, operation: &str, name: &str) -> Result<&'k str> {
    arg(kwargs, operation, name)?
        .as_str()
        .ok_or_else(|| wrong_kind(operation, name, "text"))
}

pub(crate) fn mode_arg(kwargs: &Kwargs, operation: &str, name: &str) -> Result<BoundaryMode> {
    text_arg(kwargs, operation, name)?
        .parse()
        .map_err(|e: String| TomoError::validation(operation, e))
}

/// Region of interest, checked against an image of `height` x `width`.
pub(crate) fn roi_arg(
    kwargs: &Kwargs,
    operation: &str,
    name: &str,
    (height, width): (usize, usize),
) -> Result<Roi> {
    let roi = Roi::from_param(arg(kwargs, operation, name)?)
        .ok_or_else(|| wrong_kind(operation, name, "left,top,right,bottom"))?;
    if !roi.fits(height, width) {
        return Err(TomoError::validation(
            operation,
            format!("region {roi} does not fit images of {height}x{width}"),
        ));
    }
    Ok(roi)
}
