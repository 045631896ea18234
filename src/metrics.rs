//! Metrics collection for pool events.
//!
//! Subscribes to the pool's event stream and translates it into counters
//! and histograms via the `metrics` crate.
//!
//! Gated behind the `metrics` feature.

use tokio::sync::broadcast;

use crate::events::PoolEvent;

/// Background collector that consumes [`PoolEvent`]s and records them
/// through the `metrics` facade.
///
/// # Usage
///
/// ```rust,ignore
/// let collector = MetricsCollector::new(pool.subscribe());
/// tokio::spawn(collector.run());
/// ```
pub struct MetricsCollector {
    receiver: broadcast::Receiver<PoolEvent>,
}

impl MetricsCollector {
    /// Wrap a subscription obtained from [`Pool::subscribe`](crate::Pool::subscribe).
    #[must_use]
    pub fn new(receiver: broadcast::Receiver<PoolEvent>) -> Self {
        Self { receiver }
    }

    /// Run the collector loop until the pool (and with it the event
    /// channel) goes away. Lagged events are skipped.
    pub async fn run(mut self) {
        loop {
            match self.receiver.recv().await {
                Ok(event) => Self::record_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(skipped, "MetricsCollector lagged behind pool events");
                    let _ = skipped;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    fn record_event(event: &PoolEvent) {
        match event {
            PoolEvent::ResourceCreated { .. } => {
                metrics::counter!("pool.resource.created.total").increment(1);
            }
            PoolEvent::ResourceDestroyed { .. } => {
                metrics::counter!("pool.resource.destroyed.total").increment(1);
            }
            PoolEvent::Acquired { waited } => {
                metrics::counter!("pool.acquire.total").increment(1);
                metrics::histogram!("pool.acquire.wait_seconds").record(waited.as_secs_f64());
            }
            PoolEvent::Released { held } => {
                metrics::counter!("pool.release.total").increment(1);
                metrics::histogram!("pool.usage.duration_seconds").record(held.as_secs_f64());
            }
            PoolEvent::FactoryCreateError { .. } => {
                metrics::counter!("pool.factory.error.total", "op" => "create").increment(1);
            }
            PoolEvent::FactoryDestroyError { .. } => {
                metrics::counter!("pool.factory.error.total", "op" => "destroy").increment(1);
            }
        }
    }
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector").finish()
    }
}
