//! Pool configuration.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a [`Pool`](crate::Pool), frozen at construction.
///
/// Out-of-range values are clamped silently rather than rejected: `max` is
/// raised to at least 1, `min` is lowered to `max`, `priority_range` is
/// raised to at least 1, and zero-valued timeouts are treated as unset.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolOptions {
    /// Maximum number of resources the pool may hold, counting in-flight
    /// creations (default 1)
    pub max: usize,
    /// Number of resources the pool keeps ready (default 0)
    pub min: usize,
    /// Cap on queued acquirers once the pool is saturated; unset means
    /// unbounded waiting
    pub max_waiting_clients: Option<usize>,
    /// Number of priority slots; slot 0 is served first (default 1)
    pub priority_range: usize,
    /// Hand out the oldest idle resource first; `false` gives LIFO
    /// (default `true`)
    pub fifo: bool,
    /// Run `factory.validate` on resources before dispatching them
    pub test_on_borrow: bool,
    /// Run `factory.validate` on resources as they are released; failures
    /// destroy the resource instead of re-idling it
    pub test_on_return: bool,
    /// How long an acquire may wait before rejecting; unset waits forever
    pub acquire_timeout: Option<Duration>,
    /// How long to wait on `factory.destroy` before giving up on it; the
    /// destroy itself is never aborted
    pub destroy_timeout: Option<Duration>,
    /// Period of the eviction sweep; unset disables eviction (default)
    pub eviction_run_interval: Option<Duration>,
    /// How many idle resources each eviction sweep examines (default 3)
    pub num_tests_per_eviction_run: usize,
    /// Idle age past which surplus resources (above `min`) are evicted;
    /// unset disables the soft rule (default)
    pub soft_idle_timeout: Option<Duration>,
    /// Idle age past which any resource is evicted (default 30s)
    pub idle_timeout: Duration,
    /// Start the pool at construction instead of on first acquire
    /// (default `true`)
    pub autostart: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max: 1,
            min: 0,
            max_waiting_clients: None,
            priority_range: 1,
            fifo: true,
            test_on_borrow: false,
            test_on_return: false,
            acquire_timeout: None,
            destroy_timeout: None,
            eviction_run_interval: None,
            num_tests_per_eviction_run: 3,
            soft_idle_timeout: None,
            idle_timeout: Duration::from_secs(30),
            autostart: true,
        }
    }
}

impl PoolOptions {
    /// Apply the clamping rules. Called once when the pool is built.
    pub(crate) fn normalized(mut self) -> Self {
        self.max = self.max.max(1);
        self.min = self.min.min(self.max);
        self.priority_range = self.priority_range.max(1);
        self.acquire_timeout = self.acquire_timeout.filter(|t| !t.is_zero());
        self.destroy_timeout = self.destroy_timeout.filter(|t| !t.is_zero());
        self.eviction_run_interval = self.eviction_run_interval.filter(|t| !t.is_zero());
        self.soft_idle_timeout = self.soft_idle_timeout.filter(|t| !t.is_zero());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = PoolOptions::default().normalized();
        assert_eq!(options.max, 1);
        assert_eq!(options.min, 0);
        assert_eq!(options.priority_range, 1);
        assert!(options.fifo);
        assert!(!options.test_on_borrow);
        assert!(!options.test_on_return);
        assert!(options.autostart);
        assert!(options.eviction_run_interval.is_none());
        assert_eq!(options.num_tests_per_eviction_run, 3);
        assert!(options.soft_idle_timeout.is_none());
        assert_eq!(options.idle_timeout, Duration::from_secs(30));
        assert!(options.acquire_timeout.is_none());
        assert!(options.max_waiting_clients.is_none());
    }

    #[test]
    fn min_above_max_clamps_down() {
        let options = PoolOptions {
            min: 5,
            max: 3,
            ..Default::default()
        }
        .normalized();
        assert_eq!(options.max, 3);
        assert_eq!(options.min, 3);
    }

    #[test]
    fn zero_max_is_raised_to_one() {
        let options = PoolOptions {
            max: 0,
            min: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(options.max, 1);
    }

    #[test]
    fn zero_priority_range_is_raised_to_one() {
        let options = PoolOptions {
            priority_range: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(options.priority_range, 1);
    }

    #[test]
    fn zero_timeouts_mean_unset() {
        let options = PoolOptions {
            acquire_timeout: Some(Duration::ZERO),
            destroy_timeout: Some(Duration::ZERO),
            eviction_run_interval: Some(Duration::ZERO),
            soft_idle_timeout: Some(Duration::ZERO),
            ..Default::default()
        }
        .normalized();
        assert!(options.acquire_timeout.is_none());
        assert!(options.destroy_timeout.is_none());
        assert!(options.eviction_run_interval.is_none());
        assert!(options.soft_idle_timeout.is_none());
    }
}
