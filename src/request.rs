//! Pending acquire requests.
//!
//! A request is the pool-side half of one `acquire` call: a oneshot reply
//! channel back to the caller plus a settlement flag that `drain` can watch
//! without consuming the reply. PENDING simply means the reply has not been
//! sent yet; once resolved or rejected the request is inert.

use std::time::Instant;

use tokio::sync::{oneshot, watch};

use crate::error::{Error, Result};

pub(crate) struct ResourceRequest<T> {
    reply: Option<oneshot::Sender<Result<T>>>,
    settled: watch::Sender<bool>,
    created_at: Instant,
}

impl<T> ResourceRequest<T> {
    /// Create a request and the receiver the caller will await.
    pub(crate) fn new() -> (Self, oneshot::Receiver<Result<T>>) {
        let (reply, rx) = oneshot::channel();
        let (settled, _) = watch::channel(false);
        (
            Self {
                reply: Some(reply),
                settled,
                created_at: Instant::now(),
            },
            rx,
        )
    }

    pub(crate) fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Whether the caller has stopped listening for the reply.
    pub(crate) fn is_abandoned(&self) -> bool {
        self.reply.as_ref().is_none_or(oneshot::Sender::is_closed)
    }

    /// A signal that flips to `true` once the request settles either way.
    pub(crate) fn settled_signal(&self) -> watch::Receiver<bool> {
        self.settled.subscribe()
    }

    /// Fulfil the request. Returns the value back when the caller has
    /// already gone away, so the resource can be reclaimed.
    pub(crate) fn resolve(mut self, value: T) -> std::result::Result<(), T> {
        self.settled.send_replace(true);
        match self.reply.take() {
            Some(reply) => reply.send(Ok(value)).map_err(|unsent| match unsent {
                Ok(value) => value,
                Err(_) => unreachable!("resolve sent an Ok"),
            }),
            None => Err(value),
        }
    }

    /// Reject the request. A missing listener is not an error here; the
    /// request is settled regardless.
    pub(crate) fn reject(mut self, error: Error) {
        self.settled.send_replace(true);
        if let Some(reply) = self.reply.take() {
            let _ = reply.send(Err(error));
        }
    }
}
