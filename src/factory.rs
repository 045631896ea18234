//! The caller-supplied resource factory.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

/// Builds, probes, and tears down the resources a pool manages.
///
/// Factories are shared by the pool and invoked concurrently, so
/// implementations must be reentrant. Each method is called from a spawned
/// task, never while pool state is locked.
///
/// `create` may fail freely: the pool emits the error as an event and keeps
/// retrying for as long as waiters are queued and capacity is spare.
pub trait Factory: Send + Sync + 'static {
    /// The resource handed to clients.
    type Resource: Send + 'static;

    /// Build one resource.
    fn create(&self) -> impl Future<Output = Result<Self::Resource>> + Send;

    /// Release the underlying handles of a resource.
    fn destroy(&self, obj: Self::Resource) -> impl Future<Output = Result<()>> + Send;

    /// Probe whether a resource is still usable. `Ok(false)` or `Err`
    /// condemns it. The default keeps everything.
    fn validate(&self, obj: &mut Self::Resource) -> impl Future<Output = Result<bool>> + Send {
        let _ = obj;
        async { Ok(true) }
    }
}

/// Run `factory.destroy`, optionally bounded by a deadline.
///
/// With a deadline the destroy runs as its own task and is left running if
/// the deadline passes; the caller gets [`Error::DestroyTimeout`] and the
/// pool merely stops waiting.
pub(crate) async fn destroy_with_deadline<F: Factory>(
    factory: Arc<F>,
    obj: F::Resource,
    deadline: Option<Duration>,
) -> Result<()> {
    match deadline {
        None => factory.destroy(obj).await,
        Some(timeout) => {
            let task = tokio::spawn(async move { factory.destroy(obj).await });
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_error)) => Err(Error::internal(format!(
                    "destroy task failed: {join_error}"
                ))),
                Err(_) => Err(Error::DestroyTimeout { timeout }),
            }
        }
    }
}
