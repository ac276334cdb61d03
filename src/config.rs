//! Engine Construction Options
//!
//! Two knobs are recognized: the maximum number of distinct live keys, and
//! the period of the active expiration cycle. A zero period falls back to
//! the 100ms default when the cycle starts.

use std::time::Duration;

/// Default period of the active expiration cycle.
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for an [`Engine`](crate::Engine).
///
/// # Example
///
/// ```
/// use emberkv::Config;
/// use std::time::Duration;
///
/// let config = Config::new(10_000).with_cycle_interval(Duration::from_millis(250));
/// assert_eq!(config.max_keys, 10_000);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum count of distinct simultaneously-bound keys. Creating a key
    /// beyond this bound fails; overwriting an existing key never does.
    pub max_keys: usize,

    /// Period of the active expiration cycle (default: 100ms).
    pub cycle_interval: Duration,
}

impl Config {
    /// Creates a configuration with the given key capacity and the default
    /// expiration cycle period.
    pub fn new(max_keys: usize) -> Self {
        Self {
            max_keys,
            cycle_interval: DEFAULT_CYCLE_INTERVAL,
        }
    }

    /// Sets the period of the active expiration cycle.
    ///
    /// A zero duration is replaced by the default when the cycle starts.
    pub fn with_cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }
}
