//! Wrapper pairing one factory-built resource with lifecycle metadata.

use std::time::Instant;

/// Lifecycle state of a pooled resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PooledState {
    /// Sitting in the available set.
    Idle,
    /// Lent out under a loan.
    Allocated,
    /// Inside a `factory.validate` call.
    Validation,
    /// Handed back, not yet re-idled.
    Returning,
    /// Condemned; queued for `factory.destroy`.
    Invalid,
}

/// A resource owned by the pool, with the state and timestamps the
/// dispense and eviction paths key off.
///
/// `obj` is `None` exactly while the underlying resource is outside the
/// pool's hands: lent to a client or inside a factory call. Identity is the
/// pool-assigned `id`; the resource value itself is never compared.
pub(crate) struct PooledResource<T> {
    id: u64,
    obj: Option<T>,
    state: PooledState,
    created_at: Instant,
    last_borrowed_at: Option<Instant>,
    last_returned_at: Option<Instant>,
    last_idle_at: Instant,
}

impl<T> PooledResource<T> {
    pub(crate) fn new(id: u64, obj: T) -> Self {
        let now = Instant::now();
        Self {
            id,
            obj: Some(obj),
            state: PooledState::Idle,
            created_at: now,
            last_borrowed_at: None,
            last_returned_at: None,
            last_idle_at: now,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn state(&self) -> PooledState {
        self.state
    }

    #[allow(dead_code)]
    pub(crate) fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When the resource last went idle; the evictor's clock.
    pub(crate) fn idle_since(&self) -> Instant {
        self.last_idle_at
    }

    #[allow(dead_code)]
    pub(crate) fn last_returned_at(&self) -> Option<Instant> {
        self.last_returned_at
    }

    /// Move the resource out (for lending or a factory call).
    pub(crate) fn take_obj(&mut self) -> Option<T> {
        self.obj.take()
    }

    /// Hand the resource back to the wrapper.
    pub(crate) fn put_obj(&mut self, obj: T) {
        debug_assert!(self.obj.is_none(), "pooled resource already holds its obj");
        self.obj = Some(obj);
    }

    pub(crate) fn allocate(&mut self) {
        self.state = PooledState::Allocated;
        self.last_borrowed_at = Some(Instant::now());
    }

    pub(crate) fn deallocate(&mut self) {
        self.state = PooledState::Idle;
        self.last_returned_at = Some(Instant::now());
    }

    pub(crate) fn mark_idle(&mut self) {
        self.state = PooledState::Idle;
        self.last_idle_at = Instant::now();
    }

    pub(crate) fn test(&mut self) {
        self.state = PooledState::Validation;
    }

    pub(crate) fn returning(&mut self) {
        self.state = PooledState::Returning;
    }

    pub(crate) fn invalidate(&mut self) {
        self.state = PooledState::Invalid;
    }

    /// Backdate the idle timestamp; only for exercising eviction rules.
    #[cfg(test)]
    pub(crate) fn backdate_idle(&mut self, by: std::time::Duration) {
        self.last_idle_at -= by;
    }
}

impl<T> std::fmt::Debug for PooledResource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledResource")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("holds_obj", &self.obj.is_some())
            .finish()
    }
}
