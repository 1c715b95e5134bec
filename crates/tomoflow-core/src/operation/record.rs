use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::consts::OPERATION_HISTORY_KEY;
use crate::error::{Result, TomoError};

use super::params::{Kwargs, ParamValue};
use super::Operation;

/// A persisted description of one operation applied to a stack.
///
/// Serializes to a mapping with exactly four keys: `name`, `args`, `kwargs`
/// and `display_name` (null when absent).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    name: String,
    args: Vec<ParamValue>,
    kwargs: Kwargs,
    #[serde(default)]
    display_name: Option<String>,
}

/// Reject names that carry a namespace. History must stay portable across
/// processes that lay out their operation modules differently.
pub fn validate_operation_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('.') || name.contains('/') || name.contains("::") {
        return Err(TomoError::InvalidOperationName(name.to_string()));
    }
    Ok(())
}

impl OperationRecord {
    pub fn new(
        name: impl Into<String>,
        args: Vec<ParamValue>,
        kwargs: Kwargs,
        display_name: Option<String>,
    ) -> Result<Self> {
        let record = Self {
            name: name.into(),
            args,
            kwargs,
            display_name,
        };
        record.validate()?;
        Ok(record)
    }

    fn validate(&self) -> Result<()> {
        validate_operation_name(&self.name)?;
        let all_persistable = self
            .args
            .iter()
            .chain(self.kwargs.values())
            .all(ParamValue::is_persistable);
        if !all_persistable {
            return Err(TomoError::validation(
                &self.name,
                "recorded values must be finite",
            ));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[ParamValue] {
        &self.args
    }

    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// The display name if one was recorded, the operation name otherwise.
    pub fn friendly_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Serialize into a metadata entry.
    pub fn to_entry(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Inverse of [`to_entry`](Self::to_entry).
    pub fn from_entry(entry: &serde_json::Value) -> Result<Self> {
        let record: Self = serde_json::from_value(entry.clone())?;
        record.validate()?;
        Ok(record)
    }

    /// Bind the recorded keyword arguments to the operation of the same name.
    pub fn to_callable(&self, lookup: &HashMap<String, Arc<dyn Operation>>) -> Result<BoundOperation> {
        let operation = lookup
            .get(&self.name)
            .ok_or_else(|| TomoError::UnknownOperation(self.name.clone()))?;
        Ok(BoundOperation {
            operation: Arc::clone(operation),
            kwargs: self.kwargs.clone(),
        })
    }
}

impl fmt::Display for OperationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, args: [", self.friendly_name())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, "], kwargs: {{")?;
        for (i, (key, value)) in self.kwargs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        write!(f, "}}")
    }
}

/// An operation with its keyword arguments fixed, ready to be applied.
///
/// Positional arguments stay in the record for audit only; operations take
/// keyword arguments exclusively.
#[derive(Clone)]
pub struct BoundOperation {
    pub operation: Arc<dyn Operation>,
    pub kwargs: Kwargs,
}

impl fmt::Debug for BoundOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundOperation")
            .field("operation", &self.operation.name())
            .field("kwargs", &self.kwargs)
            .finish()
    }
}

/// Read the operation history out of stack metadata. A missing history key
/// means the stack has never been processed.
pub fn deserialize_history(metadata: &serde_json::Value) -> Result<Vec<OperationRecord>> {
    match metadata.get(OPERATION_HISTORY_KEY) {
        Some(serde_json::Value::Array(entries)) => {
            entries.iter().map(OperationRecord::from_entry).collect()
        }
        Some(other) => Err(TomoError::Metadata(serde::de::Error::custom(format!(
            "'{OPERATION_HISTORY_KEY}' must be a list, got {other}"
        )))),
        None => Ok(Vec::new()),
    }
}
