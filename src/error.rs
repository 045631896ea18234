//! Error types for pool operations
use std::time::Duration;

use thiserror::Error;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type covering every failure a pool operation can surface.
///
/// Factory failures during the pool's own bookkeeping (background creates,
/// destroys, validations) are not returned from public calls; they are
/// emitted on the event bus so one bad resource cannot break unrelated
/// acquires.
#[derive(Error, Debug)]
pub enum Error {
    /// The pool has begun draining and no longer accepts work
    #[error("pool is draining and cannot accept work")]
    Draining,

    /// The waiting queue is full (`max_waiting_clients` reached)
    #[error("max waitingClients count exceeded")]
    MaxWaitersExceeded,

    /// A waiter expired before a resource could be dispatched to it
    #[error("acquire timed out after {waited:?}")]
    AcquireTimeout {
        /// How long the waiter was queued before expiring
        waited: Duration,
    },

    /// The presented handle does not belong to this pool
    #[error("resource not currently part of this pool")]
    ResourceNotInPool,

    /// `factory.destroy` exceeded its deadline; the underlying destroy
    /// keeps running detached, the pool just stops waiting on it
    #[error("destroy timed out after {timeout:?}")]
    DestroyTimeout {
        /// The configured `destroy_timeout`
        timeout: Duration,
    },

    /// A failure reported by the caller-supplied factory
    #[error("factory error: {message}")]
    Factory {
        /// The failure description
        message: String,
        /// The underlying error, if the factory kept one
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal bookkeeping failure (should not occur in normal operation)
    #[error("internal pool error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl Error {
    /// Create a factory error from a plain message.
    pub fn factory<S: Into<String>>(message: S) -> Self {
        Self::Factory {
            message: message.into(),
            source: None,
        }
    }

    /// Create a factory error wrapping an underlying error.
    pub fn factory_with<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Factory {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if retrying the failed operation later may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AcquireTimeout { .. } | Self::MaxWaitersExceeded | Self::DestroyTimeout { .. }
        )
    }

    /// Whether this error is the expiry of a waiting acquire
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::AcquireTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_waiters_message_is_stable() {
        // Callers match on this message; it must not drift.
        assert_eq!(
            Error::MaxWaitersExceeded.to_string(),
            "max waitingClients count exceeded"
        );
    }

    #[test]
    fn destroy_timeout_message_mentions_destroy() {
        let err = Error::DestroyTimeout {
            timeout: Duration::from_millis(20),
        };
        assert!(err.to_string().contains("destroy timed out"));
    }

    #[test]
    fn retryable_classification() {
        assert!(
            Error::AcquireTimeout {
                waited: Duration::from_millis(5)
            }
            .is_retryable()
        );
        assert!(Error::MaxWaitersExceeded.is_retryable());
        assert!(!Error::Draining.is_retryable());
        assert!(!Error::ResourceNotInPool.is_retryable());
    }

    #[test]
    fn factory_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::factory_with("connect failed", io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
