/// Thread-safe progress reporting for operations.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
///
/// The execution engine only ever calls a reporter from the orchestrating
/// thread, so implementations need no synchronisation beyond what `Sync`
/// already demands.
pub trait ProgressReporter: Send + Sync {
    /// An operation has started. `total_units` is the number of chunks (or
    /// slices, on the sequential path) it will complete.
    fn begin(&self, _label: &str, _total_units: usize) {}

    /// `units_done` units have completed so far.
    fn advance(&self, _units_done: usize) {}

    /// The current operation is finished, successfully or not.
    fn finish(&self) {}
}

/// No-op progress reporter.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
