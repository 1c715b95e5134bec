use std::sync::Arc;
use std::time::Instant;

use ndarray::Array3;
use tracing::{debug, info};

use crate::error::{Result, TomoError};
use crate::operation::{
    Kwargs, OperationDescriptor, OperationInput, OperationOutput, OperationRecord, ParamSource,
    Registry, StackParameterProvider,
};
use crate::parallel::{ExecutionConfig, Executor};
use crate::progress::ProgressReporter;
use crate::stack::ImageStack;

use super::config::{FilterStep, PipelineConfig};

/// Merge caller keyword arguments with stack-computed values and schema
/// defaults.
///
/// Stack-computed parameters override whatever the caller passed under the
/// same name, but only when the provider actually has a value. A `null`
/// optional parameter counts as not given. Optional parameters that are
/// still missing get their declared default. A required parameter that is
/// still missing is a validation error.
pub fn resolve_parameters(
    descriptor: &OperationDescriptor,
    caller_kwargs: &Kwargs,
    provider: &dyn StackParameterProvider,
) -> Result<Kwargs> {
    let mut merged = caller_kwargs.clone();
    merged.retain(|name, value| {
        !value.is_null() || descriptor.param(name).map_or(true, |spec| spec.required)
    });

    for spec in descriptor.params() {
        if let ParamSource::Stack(param) = spec.source {
            if let Some(value) = provider.parameter(param) {
                if merged.insert(spec.name.to_string(), value).is_some() {
                    debug!(
                        operation = descriptor.name(),
                        param = spec.name,
                        "Stack value overrides caller value"
                    );
                }
            }
        }
    }

    for spec in descriptor.params() {
        if merged.contains_key(spec.name) {
            continue;
        }
        match &spec.default {
            Some(default) => {
                merged.insert(spec.name.to_string(), default.clone());
            }
            None if spec.required => {
                let reason = match spec.source {
                    ParamSource::Stack(param) => {
                        format!("required parameter '{}' ({param}) is not available", spec.name)
                    }
                    ParamSource::Caller => format!("missing required parameter '{}'", spec.name),
                };
                return Err(TomoError::validation(descriptor.name(), reason));
            }
            None => {}
        }
    }

    Ok(merged)
}

/// Check resolved keyword arguments against the operation's schema.
pub fn validate_parameters(descriptor: &OperationDescriptor, kwargs: &Kwargs) -> Result<()> {
    for name in kwargs.keys() {
        if descriptor.param(name).is_none() {
            return Err(TomoError::validation(
                descriptor.name(),
                format!("unknown parameter '{name}'"),
            ));
        }
    }
    for spec in descriptor.params() {
        match kwargs.get(spec.name) {
            Some(value) => spec
                .check(value)
                .map_err(|reason| TomoError::validation(descriptor.name(), reason))?,
            None if spec.required => {
                return Err(TomoError::validation(
                    descriptor.name(),
                    format!("missing required parameter '{}'", spec.name),
                ));
            }
            None => {}
        }
    }
    Ok(())
}

fn unexpected(operation: &str, reason: impl Into<String>) -> TomoError {
    TomoError::UnexpectedResult {
        operation: operation.to_string(),
        reason: reason.into(),
    }
}

fn image_dim(volume: &Array3<f32>) -> (usize, usize) {
    let (_, h, w) = volume.dim();
    (h, w)
}

/// Check an operation's output against the stack it will be committed to.
fn check_output(operation: &str, stack: &ImageStack, output: &OperationOutput) -> Result<()> {
    let (sample, references) = match output {
        OperationOutput::Single(sample) => (sample, stack.flat().zip(stack.dark())),
        OperationOutput::Triple { sample, flat, dark } => (sample, Some((flat, dark))),
    };
    if sample.is_empty() {
        return Err(unexpected(operation, "sample volume is empty"));
    }
    let dim = image_dim(sample);
    if let Some((flat, dark)) = references {
        for (what, volume) in [("flat", flat), ("dark", dark)] {
            if volume.is_empty() || image_dim(volume) != dim {
                return Err(unexpected(
                    operation,
                    format!(
                        "{what} images are {:?}, sample images are {dim:?}",
                        image_dim(volume)
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Applies registry operations to image stacks and records what was done.
///
/// A stack is only touched once its operation has fully succeeded: the
/// operation runs on a working copy and the result is committed together
/// with the history record.
pub struct FilterController {
    registry: Arc<Registry>,
    executor: Executor,
}

impl FilterController {
    pub fn new(registry: Arc<Registry>, config: ExecutionConfig) -> Self {
        Self {
            registry,
            executor: Executor::new(config),
        }
    }

    /// Discover the built-in operations and set up execution from a pipeline config.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let registry = Registry::builtin(&config.discovery)?;
        Ok(Self::new(Arc::new(registry), config.execution.clone()))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Validate `kwargs`, run the operation and commit its result to `stack`.
    ///
    /// Returns the record appended to the stack's history. On any error the
    /// stack's volumes and history are left exactly as they were.
    pub fn apply<'s>(
        &self,
        descriptor: &OperationDescriptor,
        stack: &'s mut ImageStack,
        kwargs: &Kwargs,
        progress: &dyn ProgressReporter,
    ) -> Result<&'s OperationRecord> {
        let operation = Arc::clone(descriptor.operation()?);
        validate_parameters(descriptor, kwargs)?;
        let record = OperationRecord::new(
            descriptor.name(),
            Vec::new(),
            kwargs.clone(),
            Some(descriptor.display_name().to_string()),
        )?;

        info!(
            operation = descriptor.name(),
            images = stack.num_images(),
            kwargs = ?kwargs,
            "Applying operation"
        );
        let start = Instant::now();

        let input = OperationInput {
            sample: stack.sample().clone(),
            flat: stack.flat(),
            dark: stack.dark(),
        };
        let output = operation.execute(input, kwargs, &self.executor, progress)?;
        check_output(descriptor.name(), stack, &output)?;

        match output {
            OperationOutput::Single(sample) => stack.replace_sample(sample),
            OperationOutput::Triple { sample, flat, dark } => {
                stack.replace_sample(sample);
                stack.replace_references(flat, dark);
            }
        }
        info!(
            operation = descriptor.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Operation applied"
        );
        Ok(stack.push_record(record))
    }

    /// Look up an operation by name, resolve its parameters against the
    /// stack and apply it.
    pub fn apply_named<'s>(
        &self,
        name: &str,
        stack: &'s mut ImageStack,
        caller_kwargs: &Kwargs,
        progress: &dyn ProgressReporter,
    ) -> Result<&'s OperationRecord> {
        let descriptor = self.registry.get(name)?;
        let kwargs = resolve_parameters(descriptor, caller_kwargs, &*stack)?;
        self.apply(descriptor, stack, &kwargs, progress)
    }

    /// Apply each step in order, stopping at the first failure.
    ///
    /// Steps that completed before a failure stay applied.
    pub fn run_steps(
        &self,
        steps: &[FilterStep],
        stack: &mut ImageStack,
        progress: &dyn ProgressReporter,
    ) -> Result<usize> {
        for (index, step) in steps.iter().enumerate() {
            debug!(step = index, operation = %step.operation, "Running pipeline step");
            self.apply_named(&step.operation, stack, &step.kwargs, progress)?;
        }
        info!(steps = steps.len(), "Pipeline complete");
        Ok(steps.len())
    }

    /// Re-apply recorded history to `stack` with the recorded keyword arguments.
    pub fn replay(
        &self,
        history: &[OperationRecord],
        stack: &mut ImageStack,
        progress: &dyn ProgressReporter,
    ) -> Result<usize> {
        let functions = self.registry.functions();
        // Bind everything first so an unknown name fails before any work is done.
        let bound = history
            .iter()
            .map(|record| record.to_callable(&functions))
            .collect::<Result<Vec<_>>>()?;

        for operation in &bound {
            let descriptor = self.registry.get(operation.operation.name())?;
            self.apply(descriptor, stack, &operation.kwargs, progress)?;
        }
        info!(operations = bound.len(), "Replay complete");
        Ok(bound.len())
    }
}
