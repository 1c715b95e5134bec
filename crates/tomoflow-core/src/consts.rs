/// Root namespace that built-in operations are registered under.
pub const DEFAULT_DISCOVERY_ROOT: &str = "filters";

/// Work-in-progress operations, skipped by default discovery.
pub const DEFAULT_IGNORED_NAMESPACE: &str = "filters/wip";

/// Separator between segments of an operation module path.
pub const NAMESPACE_SEPARATOR: char = '/';

/// Smallest divisor used when normalising by flat/dark or ROI means.
pub const MINIMUM_PIXEL_VALUE: f32 = 1e-6;

/// Values at or below this are floored before taking the logarithm.
pub const MINUS_LOG_FLOOR: f32 = 1e-6;

/// Default median kernel size used by outlier removal.
pub const DEFAULT_OUTLIER_RADIUS: i64 = 3;

/// Default Fourier damping for stripe removal.
pub const DEFAULT_STRIPE_SIGMA: f64 = 2.0;

/// Default horizontal smoothing width separating stripes from structure.
pub const DEFAULT_STRIPE_SIZE: i64 = 5;

/// Metadata file written next to saved image stacks.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Top-level metadata key holding the operation history.
pub const OPERATION_HISTORY_KEY: &str = "operation_history";

/// Full-scale value of the 16-bit images written by the saver.
pub const U16_FULL_SCALE: f32 = 65535.0;
