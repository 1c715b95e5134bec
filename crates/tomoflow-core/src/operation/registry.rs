//! Operation discovery.
//!
//! Operations are enumerated from a static catalog of [`OperationModule`]s,
//! each living at a namespace path such as `filters/median_filter`. The last
//! path segment is the operation's name. Discovery walks the catalog in
//! order, keeps the modules under the requested root, skips ignored
//! sub-namespaces and loads each module. A module whose optional dependency
//! is missing either aborts discovery or is kept as an unavailable entry,
//! depending on [`ImportPolicy`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::consts::{DEFAULT_DISCOVERY_ROOT, DEFAULT_IGNORED_NAMESPACE, NAMESPACE_SEPARATOR};
use crate::error::{Result, TomoError};

use super::params::ParamSpec;
use super::record::validate_operation_name;
use super::Operation;

/// Failure to load an operation module because a dependency is missing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportError {
    pub dependency: String,
    pub reason: String,
}

impl ImportError {
    pub fn new(dependency: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            dependency: dependency.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing dependency '{}': {}", self.dependency, self.reason)
    }
}

/// Loader for one operation module.
pub type ModuleLoader = fn() -> std::result::Result<Arc<dyn Operation>, ImportError>;

/// A catalog entry: where an operation lives and how to load it.
#[derive(Clone, Copy)]
pub struct OperationModule {
    pub path: &'static str,
    pub load: ModuleLoader,
}

impl OperationModule {
    pub const fn new(path: &'static str, load: ModuleLoader) -> Self {
        Self { path, load }
    }

    /// Last segment of the module path.
    pub fn name(&self) -> &'static str {
        self.path
            .rsplit(NAMESPACE_SEPARATOR)
            .next()
            .unwrap_or(self.path)
    }

    fn is_under(&self, namespace: &str) -> bool {
        let namespace = namespace.trim_end_matches(NAMESPACE_SEPARATOR);
        self.path
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with(NAMESPACE_SEPARATOR))
    }
}

/// What to do when a module fails to load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPolicy {
    /// Abort discovery.
    #[default]
    Escalate,
    /// Keep the operation as unavailable and continue.
    Degrade,
}

impl fmt::Display for ImportPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Escalate => write!(f, "Escalate"),
            Self::Degrade => write!(f, "Degrade"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub root: String,
    #[serde(default)]
    pub ignored: Vec<String>,
    #[serde(default)]
    pub on_import_failure: ImportPolicy,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            root: DEFAULT_DISCOVERY_ROOT.to_string(),
            ignored: vec![DEFAULT_IGNORED_NAMESPACE.to_string()],
            on_import_failure: ImportPolicy::default(),
        }
    }
}

/// Registry entry describing one discovered operation.
#[derive(Clone)]
pub struct OperationDescriptor {
    name: String,
    display_name: String,
    path: String,
    params: Vec<ParamSpec>,
    operation: Option<Arc<dyn Operation>>,
    unavailable_reason: Option<String>,
}

impl OperationDescriptor {
    fn loaded(module: &OperationModule, operation: Arc<dyn Operation>) -> Self {
        let unavailable_reason =
            (!operation.available()).then(|| "runtime availability check failed".to_string());
        Self {
            name: module.name().to_string(),
            display_name: operation.display_name().to_string(),
            path: module.path.to_string(),
            params: operation.params(),
            operation: Some(operation),
            unavailable_reason,
        }
    }

    fn unavailable(module: &OperationModule, error: &ImportError) -> Self {
        Self {
            name: module.name().to_string(),
            display_name: module.name().to_string(),
            path: module.path.to_string(),
            params: Vec::new(),
            operation: None,
            unavailable_reason: Some(error.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn available(&self) -> bool {
        self.unavailable_reason.is_none()
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable_reason.as_deref()
    }

    /// The operation, if it is available.
    pub fn operation(&self) -> Result<&Arc<dyn Operation>> {
        match (&self.operation, &self.unavailable_reason) {
            (Some(op), None) => Ok(op),
            (_, reason) => Err(TomoError::Unavailable {
                name: self.name.clone(),
                reason: reason.clone().unwrap_or_default(),
            }),
        }
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("available", &self.available())
            .finish()
    }
}

/// Read-only set of discovered operations, in catalog order.
#[derive(Debug, Default)]
pub struct Registry {
    descriptors: Vec<OperationDescriptor>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Discover the operations of `modules` that live under `root`.
    pub fn discover(
        modules: &[OperationModule],
        root: &str,
        ignored: &[String],
        policy: ImportPolicy,
    ) -> Result<Self> {
        let under_root: Vec<&OperationModule> =
            modules.iter().filter(|m| m.is_under(root)).collect();
        if under_root.is_empty() {
            return Err(TomoError::Discovery(format!(
                "namespace '{root}' does not exist"
            )));
        }

        let mut registry = Self::default();
        for module in under_root {
            if let Some(prefix) = ignored.iter().find(|prefix| module.is_under(prefix)) {
                debug!(path = module.path, ignored = %prefix, "Skipping ignored module");
                continue;
            }
            let name = module.name();
            validate_operation_name(name)
                .map_err(|e| TomoError::Discovery(format!("{}: {e}", module.path)))?;
            if registry.index.contains_key(name) {
                return Err(TomoError::Discovery(format!(
                    "duplicate operation name '{name}' at {}",
                    module.path
                )));
            }

            let descriptor = match (module.load)() {
                Ok(operation) => {
                    if operation.name() != name {
                        return Err(TomoError::Discovery(format!(
                            "module {} provides operation '{}'",
                            module.path,
                            operation.name()
                        )));
                    }
                    OperationDescriptor::loaded(module, operation)
                }
                Err(error) => match policy {
                    ImportPolicy::Escalate => {
                        return Err(TomoError::Discovery(format!("{}: {error}", module.path)));
                    }
                    ImportPolicy::Degrade => {
                        warn!(path = module.path, %error, "Operation unavailable");
                        OperationDescriptor::unavailable(module, &error)
                    }
                },
            };
            registry
                .index
                .insert(descriptor.name.clone(), registry.descriptors.len());
            registry.descriptors.push(descriptor);
        }

        info!(
            root,
            discovered = registry.descriptors.len(),
            available = registry.available().count(),
            "Operation discovery complete"
        );
        Ok(registry)
    }

    /// Discover the built-in filter catalog.
    pub fn builtin(config: &DiscoveryConfig) -> Result<Self> {
        Self::discover(
            crate::filters::catalog(),
            &config.root,
            &config.ignored,
            config.on_import_failure,
        )
    }

    pub fn get(&self, name: &str) -> Result<&OperationDescriptor> {
        self.index
            .get(name)
            .map(|&i| &self.descriptors[i])
            .ok_or_else(|| TomoError::NotFound(name.to_string()))
    }

    pub fn descriptors(&self) -> &[OperationDescriptor] {
        &self.descriptors
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name())
    }

    pub fn available(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.descriptors.iter().filter(|d| d.available())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Name to operation lookup of the available operations, used to bind
    /// recorded history for replay.
    pub fn functions(&self) -> HashMap<String, Arc<dyn Operation>> {
        self.available()
            .filter_map(|d| d.operation.as_ref().map(|op| (d.name.clone(), Arc::clone(op))))
            .collect()
    }
}
