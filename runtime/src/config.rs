//! Runtime configuration.
//!
//! Values come from [`RuntimeConfig::default`], the `with_*` builders, or the
//! environment:
//!
//! | variable | field | default |
//! |---|---|---|
//! | `SHOP_QUERY_POOL_SIZE` | `pool_size` | available parallelism |
//! | `SHOP_QUERY_SHUTDOWN_TIMEOUT_SECS` | `shutdown_timeout` | 30 s |
//! | `SHOP_QUERY_RUN_DELAY_MS` | `run_delay` | 2000 ms |
//!
//! Unparseable values fall back to the default.

use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Environment variable holding the worker pool size.
pub const POOL_SIZE_VAR: &str = "SHOP_QUERY_POOL_SIZE";
/// Environment variable holding the shutdown timeout in seconds.
pub const SHUTDOWN_TIMEOUT_VAR: &str = "SHOP_QUERY_SHUTDOWN_TIMEOUT_SECS";
/// Environment variable holding the delay between runs in milliseconds.
pub const RUN_DELAY_VAR: &str = "SHOP_QUERY_RUN_DELAY_MS";

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RUN_DELAY: Duration = Duration::from_millis(2000);

/// Settings for the worker pool and the invocation harness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Number of store reads that may run at once.
    pub pool_size: usize,
    /// How long shutdown waits for in-flight runs.
    pub shutdown_timeout: Duration,
    /// Pause between consecutive runs of a sequence.
    pub run_delay: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            run_delay: DEFAULT_RUN_DELAY,
        }
    }
}

impl RuntimeConfig {
    /// Set the pool size
    #[must_use]
    pub const fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set the shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the delay between runs
    #[must_use]
    pub const fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = delay;
        self
    }

    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            pool_size: lookup(POOL_SIZE_VAR)
                .and_then(|s| s.trim().parse::<NonZeroUsize>().ok())
                .map_or(defaults.pool_size, NonZeroUsize::get),
            shutdown_timeout: lookup(SHUTDOWN_TIMEOUT_VAR)
                .and_then(|s| s.trim().parse().ok())
                .map_or(defaults.shutdown_timeout, Duration::from_secs),
            run_delay: lookup(RUN_DELAY_VAR)
                .and_then(|s| s.trim().parse().ok())
                .map_or(defaults.run_delay, Duration::from_millis),
        }
    }
}

fn default_pool_size() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
