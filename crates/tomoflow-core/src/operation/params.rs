//! Declarative operation parameters.
//!
//! Every operation describes its keyword arguments with [`ParamSpec`]s. The
//! kind of a parameter is the contract front-ends build their controls from:
//! a GUI registers a widget per parameter and reads the value back, the CLI
//! parses `name=value` text with [`ParamSpec::parse_value`]. Parameters whose source
//! is [`ParamSource::Stack`] are never asked from the user; the controller
//! pulls them from a [`StackParameterProvider`] right before execution.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A JSON-representable parameter value.
///
/// Only primitives (and lists of them) are allowed so that recorded history
/// can be persisted next to the stack and replayed in another process.
/// `Null` stands for an unset optional argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ParamValue>),
}

/// Keyword arguments, ordered by name so serialization is deterministic.
pub type Kwargs = BTreeMap<String, ParamValue>;

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// `false` for non-finite floats anywhere in the value; JSON cannot hold them.
    pub fn is_persistable(&self) -> bool {
        match self {
            Self::Float(v) => v.is_finite(),
            Self::List(items) => items.iter().all(Self::is_persistable),
            _ => true,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// Rectangular region of interest in image pixel coordinates.
///
/// `right` and `bottom` are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub left: usize,
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
}

impl Roi {
    pub fn new(left: usize, top: usize, right: usize, bottom: usize) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> usize {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> usize {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Whether the region lies fully inside an image of `height` x `width`.
    pub fn fits(&self, height: usize, width: usize) -> bool {
        !self.is_empty() && self.right <= width && self.bottom <= height
    }

    pub fn to_param(self) -> ParamValue {
        ParamValue::List(
            [self.left, self.top, self.right, self.bottom]
                .iter()
                .map(|&v| ParamValue::Int(v as i64))
                .collect(),
        )
    }

    pub fn from_param(value: &ParamValue) -> Option<Self> {
        let ParamValue::List(items) = value else {
            return None;
        };
        if items.len() != 4 {
            return None;
        }
        let mut coords = [0usize; 4];
        for (slot, item) in coords.iter_mut().zip(items) {
            *slot = usize::try_from(item.as_i64()?).ok()?;
        }
        Some(Self::new(coords[0], coords[1], coords[2], coords[3]))
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Values computed from the current stack state rather than supplied by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StackParameter {
    /// The current region-of-interest selection.
    Roi,
}

impl fmt::Display for StackParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Roi => write!(f, "ROI"),
        }
    }
}

/// Supplies stack-computed parameter values. Returns `None` when the value
/// is not currently available (e.g. nothing is selected).
pub trait StackParameterProvider {
    fn parameter(&self, param: StackParameter) -> Option<ParamValue>;
}

/// Where a parameter value comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamSource {
    Caller,
    Stack(StackParameter),
}

/// Type and constraints of a parameter, determining the control shown for it.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamKind {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Bool,
    Choice(&'static [&'static str]),
    Roi,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int { min, max } => write!(f, "int [{min}, {max}]"),
            Self::Float { min, max } => write!(f, "float [{min}, {max}]"),
            Self::Bool => write!(f, "bool"),
            Self::Choice(options) => write!(f, "one of {}", options.join("|")),
            Self::Roi => write!(f, "roi left,top,right,bottom"),
        }
    }
}

/// Declaration of a single keyword parameter of an operation.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<ParamValue>,
    pub source: ParamSource,
    pub help: &'static str,
}

impl ParamSpec {
    fn new(name: &'static str, label: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            default: None,
            source: ParamSource::Caller,
            help: "",
        }
    }

    pub fn int(name: &'static str, label: &'static str, min: i64, max: i64) -> Self {
        Self::new(name, label, ParamKind::Int { min, max })
    }

    pub fn float(name: &'static str, label: &'static str, min: f64, max: f64) -> Self {
        Self::new(name, label, ParamKind::Float { min, max })
    }

    pub fn boolean(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, ParamKind::Bool)
    }

    pub fn choice(
        name: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        Self::new(name, label, ParamKind::Choice(options))
    }

    /// A region of interest taken from the stack's current selection.
    pub fn stack_roi(name: &'static str, label: &'static str) -> Self {
        let mut spec = Self::new(name, label, ParamKind::Roi);
        spec.source = ParamSource::Stack(StackParameter::Roi);
        spec.required = true;
        spec
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, help: &'static str) -> Self {
        self.help = help;
        self
    }

    /// Check that `value` matches this parameter's kind and constraints.
    ///
    /// `Null` passes for optional parameters, where it means "not given".
    pub fn check(&self, value: &ParamValue) -> std::result::Result<(), String> {
        if value.is_null() {
            if self.required {
                return Err(format!("required parameter '{}' is null", self.name));
            }
            return Ok(());
        }
        match &self.kind {
            ParamKind::Int { min, max } => {
                let v = value
                    .as_i64()
                    .ok_or_else(|| format!("'{}' expects an integer, got {value}", self.name))?;
                if v < *min || v > *max {
                    return Err(format!(
                        "'{}' must be within [{min}, {max}], got {v}",
                        self.name
                    ));
                }
            }
            ParamKind::Float { min, max } => {
                let v = value
                    .as_f64()
                    .ok_or_else(|| format!("'{}' expects a number, got {value}", self.name))?;
                if !v.is_finite() || v < *min || v > *max {
                    return Err(format!(
                        "'{}' must be within [{min}, {max}], got {v}",
                        self.name
                    ));
                }
            }
            ParamKind::Bool => {
                value
                    .as_bool()
                    .ok_or_else(|| format!("'{}' expects true or false, got {value}", self.name))?;
            }
            ParamKind::Choice(options) => {
                let v = value
                    .as_str()
                    .ok_or_else(|| format!("'{}' expects text, got {value}", self.name))?;
                if !options.contains(&v) {
                    return Err(format!(
                        "'{}' must be one of {}, got {v:?}",
                        self.name,
                        options.join("|")
                    ));
                }
            }
            ParamKind::Roi => {
                let roi = Roi::from_param(value).ok_or_else(|| {
                    format!("'{}' expects four non-negative integers, got {value}", self.name)
                })?;
                if roi.is_empty() {
                    return Err(format!("'{}' is an empty region: {roi}", self.name));
                }
            }
        }
        Ok(())
    }

    /// Parse widget or command-line text into a typed value and check it.
    pub fn parse_value(&self, text: &str) -> std::result::Result<ParamValue, String> {
        let text = text.trim();
        let value = match &self.kind {
            ParamKind::Int { .. } => ParamValue::Int(
                text.parse()
                    .map_err(|_| format!("'{}' expects an integer, got {text:?}", self.name))?,
            ),
            ParamKind::Float { .. } => ParamValue::Float(
                text.parse()
                    .map_err(|_| format!("'{}' expects a number, got {text:?}", self.name))?,
            ),
            ParamKind::Bool => ParamValue::Bool(
                text.parse()
                    .map_err(|_| format!("'{}' expects true or false, got {text:?}", self.name))?,
            ),
            ParamKind::Choice(_) => ParamValue::Text(text.to_string()),
            ParamKind::Roi => {
                let coords: Vec<i64> = text
                    .split(',')
                    .map(|s| s.trim().parse::<i64>())
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|_| {
                        format!("'{}' expects left,top,right,bottom, got {text:?}", self.name)
                    })?;
                ParamValue::List(coords.into_iter().map(ParamValue::Int).collect())
            }
        };
        self.check(&value)?;
        Ok(value)
    }
}
