//! Idle-eviction policy.
//!
//! A pure predicate over one idle resource: the soft timeout trims surplus
//! above `min` aggressively, the hard timeout eventually reaps any idle
//! resource (the pool tops back up to `min` afterwards via its minimum
//! replenishment).

use crate::config::PoolOptions;
use crate::pooled::PooledResource;

/// Decide whether an idle resource should be destroyed.
///
/// `available_count` is the current size of the available set, including
/// the candidate itself.
pub(crate) fn should_evict<T>(
    options: &PoolOptions,
    pooled: &PooledResource<T>,
    available_count: usize,
) -> bool {
    let idle_time = pooled.idle_since().elapsed();

    if let Some(soft) = options.soft_idle_timeout
        && idle_time > soft
        && available_count > options.min
    {
        return true;
    }

    idle_time > options.idle_timeout
}
