//! RAII handle for borrowed resources.

use std::sync::Arc;

use crate::factory::Factory;
use crate::pool::{self, PoolCore};

/// A resource on loan from a [`Pool`](crate::Pool).
///
/// Dereferences to the resource itself. Hand it back with
/// [`Pool::release`](crate::Pool::release) or condemn it with
/// [`Pool::destroy`](crate::Pool::destroy); a guard dropped without either
/// is returned to its pool best-effort (the return needs a live tokio
/// runtime and ignores errors — explicit release is the primary path).
///
/// The guard is the loan's identity: the pool never inspects the resource
/// value to find its bookkeeping.
pub struct Guard<F: Factory> {
    core: Arc<PoolCore<F>>,
    id: u64,
    obj: Option<F::Resource>,
}

impl<F: Factory> Guard<F> {
    pub(crate) fn new(core: Arc<PoolCore<F>>, id: u64, obj: F::Resource) -> Self {
        Self {
            core,
            id,
            obj: Some(obj),
        }
    }

    pub(crate) fn core(&self) -> &Arc<PoolCore<F>> {
        &self.core
    }

    pub(crate) fn loan_id(&self) -> u64 {
        self.id
    }

    /// Take the guard apart without triggering the drop-return.
    pub(crate) fn dismantle(mut self) -> (u64, F::Resource) {
        let obj = self.obj.take().expect("guard dismantled twice");
        (self.id, obj)
    }
}

impl<F: Factory> std::ops::Deref for Guard<F> {
    type Target = F::Resource;

    fn deref(&self) -> &F::Resource {
        self.obj.as_ref().expect("guard used after dismantle")
    }
}

impl<F: Factory> std::ops::DerefMut for Guard<F> {
    fn deref_mut(&mut self) -> &mut F::Resource {
        self.obj.as_mut().expect("guard used after dismantle")
    }
}

impl<F: Factory> Drop for Guard<F> {
    fn drop(&mut self) {
        let Some(obj) = self.obj.take() else {
            return;
        };
        // Outside a runtime there is nowhere to run the pool's follow-up
        // work; the resource is simply dropped.
        if tokio::runtime::Handle::try_current().is_ok() {
            pool::return_from_drop(&self.core, self.id, obj);
        }
    }
}

impl<F: Factory> std::fmt::Debug for Guard<F>
where
    F::Resource: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("id", &self.id)
            .field("resource", &self.obj)
            .finish()
    }
}
