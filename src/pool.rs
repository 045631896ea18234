//! Pool orchestrator: the matching of waiting acquirers to resources,
//! creation and destruction bookkeeping, eviction scheduling, and the
//! drain/clear shutdown protocol.
//!
//! All bookkeeping lives behind one `parking_lot::Mutex` and is only ever
//! mutated in non-suspending critical sections. Factory calls and timers run
//! as spawned tasks that re-lock to post their results back, so no `await`
//! ever happens while the lock is held.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::AbortHandle;

use crate::config::PoolOptions;
use crate::error::{Error, Result};
use crate::events::{EventBus, PoolEvent};
use crate::evictor;
use crate::factory::{self, Factory};
use crate::guard::Guard;
use crate::list::{Cursor, LinkedList};
use crate::pooled::{PooledResource, PooledState};
use crate::priority_queue::{PriorityQueue, QueueRef};
use crate::request::ResourceRequest;

// ---------------------------------------------------------------------------
// Loans
// ---------------------------------------------------------------------------

/// Record that a client currently holds a resource. Its settlement signal
/// is what `drain` waits on; it is bool-valued and cannot carry an error.
struct Loan {
    settled: watch::Sender<bool>,
    borrowed_at: Instant,
}

impl Loan {
    fn new() -> Self {
        let (settled, _) = watch::channel(false);
        Self {
            settled,
            borrowed_at: Instant::now(),
        }
    }

    fn close(&self) {
        self.settled.send_replace(true);
    }

    fn signal(&self) -> watch::Receiver<bool> {
        self.settled.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Pool state
// ---------------------------------------------------------------------------

struct PoolState<F: Factory> {
    started: bool,
    draining: bool,
    next_id: u64,
    /// Every live resource, keyed by pool-assigned id.
    all: HashMap<u64, PooledResource<F::Resource>>,
    /// Idle resources in hand-out order.
    available: LinkedList<u64>,
    /// Resources inside a pre-dispatch `factory.validate`.
    test_on_borrow: HashSet<u64>,
    /// Resources inside a post-return `factory.validate`.
    test_on_return: HashSet<u64>,
    loans: HashMap<u64, Loan>,
    waiting: PriorityQueue<ResourceRequest<Guard<F>>>,
    /// In-flight `factory.create` calls. Counted against `max`.
    create_ops: usize,
    /// In-flight `factory.destroy` calls.
    destroy_ops: usize,
    eviction_cursor: Cursor,
    evictor_task: Option<AbortHandle>,
}

pub(crate) struct PoolCore<F: Factory> {
    options: PoolOptions,
    factory: Arc<F>,
    state: Mutex<PoolState<F>>,
    events: EventBus,
    /// Version counter bumped after every state change; `ready`, `clear`
    /// and similar waits subscribe to it instead of polling on a timer.
    changed: watch::Sender<u64>,
}

impl<F: Factory> PoolCore<F> {
    fn touch(&self) {
        self.changed.send_modify(|version| *version = version.wrapping_add(1));
    }
}

fn spare_capacity<F: Factory>(core: &PoolCore<F>, state: &PoolState<F>) -> usize {
    core.options
        .max
        .saturating_sub(state.all.len() + state.create_ops)
}

/// Resources that could serve a waiter without a new creation: idle ones,
/// ones inside either validation, and in-flight creations.
fn potentially_allocable<F: Factory>(state: &PoolState<F>) -> usize {
    state.available.len()
        + state.test_on_borrow.len()
        + state.test_on_return.len()
        + state.create_ops
}

/// Re-idle a resource and put it into the available set, at the tail for
/// FIFO hand-out or the head for LIFO.
fn add_to_available<F: Factory>(core: &PoolCore<F>, state: &mut PoolState<F>, id: u64) {
    let pooled = state
        .all
        .get_mut(&id)
        .expect("resource added to available set is pooled");
    pooled.mark_idle();
    if core.options.fifo {
        state.available.push_back(id);
    } else {
        state.available.push_front(id);
    }
}

// ---------------------------------------------------------------------------
// Dispense
// ---------------------------------------------------------------------------

/// Single matching pass between waiters and resources. Runs after every
/// event that can change the pairing: acquire, release, destroy, a create
/// settling, or a validation settling.
fn dispense<F: Factory>(core: &Arc<PoolCore<F>>, state: &mut PoolState<F>) {
    let waiting = state.waiting.len();
    if waiting == 0 {
        return;
    }

    let shortfall = waiting.saturating_sub(potentially_allocable(state));
    let creates = shortfall.min(spare_capacity(core, state));
    for _ in 0..creates {
        create_resource(core, state);
    }

    if core.options.test_on_borrow {
        let desired = waiting.saturating_sub(state.test_on_borrow.len());
        let tests = state.available.len().min(desired);
        for _ in 0..tests {
            start_borrow_validation(core, state);
        }
    } else {
        let dispatches = state.available.len().min(waiting);
        for _ in 0..dispatches {
            let Some(id) = state.available.pop_front() else {
                break;
            };
            dispatch_resource(core, state, id);
        }
    }
}

/// Pair one idle resource (already out of the available set) with the next
/// waiter. When the waiter is gone, the resource goes back to available and
/// this pairing attempt ends.
fn dispatch_resource<F: Factory>(core: &Arc<PoolCore<F>>, state: &mut PoolState<F>, id: u64) -> bool {
    let Some(request) = state.waiting.dequeue() else {
        add_to_available(core, state, id);
        return false;
    };
    if request.is_abandoned() {
        // Expired or dropped between enqueue and now; settle it and keep
        // the resource.
        request.reject(Error::internal("request abandoned before dispatch"));
        add_to_available(core, state, id);
        return false;
    }

    let waited = request.created_at().elapsed();
    let pooled = state
        .all
        .get_mut(&id)
        .expect("dispatched resource is pooled");
    let obj = pooled.take_obj().expect("idle resource holds its obj");
    pooled.allocate();

    match request.resolve(Guard::new(Arc::clone(core), id, obj)) {
        Ok(()) => {
            state.loans.insert(id, Loan::new());
            core.events.emit(PoolEvent::Acquired { waited });
            true
        }
        Err(guard) => {
            // The caller went away after the liveness check; undo.
            let (_, obj) = guard.dismantle();
            let pooled = state.all.get_mut(&id).expect("undoing a dispatch");
            pooled.put_obj(obj);
            add_to_available(core, state, id);
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Launch one `factory.create`. On success the resource joins the pool and
/// a dispense runs; on failure the error is emitted and a dispense runs
/// anyway, which re-attempts creation while waiters remain and capacity is
/// spare. There is no retry cap.
fn create_resource<F: Factory>(core: &Arc<PoolCore<F>>, state: &mut PoolState<F>) {
    state.create_ops += 1;
    let core = Arc::clone(core);
    tokio::spawn(async move {
        let created = core.factory.create().await;
        {
            let mut state = core.state.lock();
            state.create_ops -= 1;
            match created {
                Ok(obj) => {
                    let id = state.next_id;
                    state.next_id += 1;
                    state.all.insert(id, PooledResource::new(id, obj));
                    add_to_available(&core, &mut state, id);
                    #[cfg(feature = "tracing")]
                    tracing::debug!(id, "created pool resource");
                    core.events.emit(PoolEvent::ResourceCreated { id });
                    dispense(&core, &mut state);
                }
                Err(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(%error, "factory create failed");
                    core.events.emit(PoolEvent::FactoryCreateError {
                        error: Arc::new(error),
                    });
                    dispense(&core, &mut state);
                }
            }
        }
        core.touch();
    });
}

/// Spawn replacements when the pool has dipped below `min`. Skipped while
/// draining.
fn ensure_minimum<F: Factory>(core: &Arc<PoolCore<F>>, state: &mut PoolState<F>) {
    if state.draining {
        return;
    }
    let count = state.all.len() + state.create_ops;
    let shortfall = core.options.min.saturating_sub(count);
    for _ in 0..shortfall {
        create_resource(core, state);
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Move the head of the available set into a `factory.validate` call. On
/// success it is dispatched straight to the next waiter; on failure it is
/// destroyed and a dispense re-attempts the match.
fn start_borrow_validation<F: Factory>(core: &Arc<PoolCore<F>>, state: &mut PoolState<F>) {
    let Some(id) = state.available.pop_front() else {
        return;
    };
    let pooled = state.all.get_mut(&id).expect("validating a pooled resource");
    pooled.test();
    let obj = pooled.take_obj().expect("idle resource holds its obj");
    state.test_on_borrow.insert(id);

    let core = Arc::clone(core);
    tokio::spawn(async move {
        let mut obj = obj;
        let valid = matches!(core.factory.validate(&mut obj).await, Ok(true));
        {
            let mut state = core.state.lock();
            state.test_on_borrow.remove(&id);
            if let Some(pooled) = state.all.get_mut(&id) {
                pooled.put_obj(obj);
                if valid {
                    dispatch_resource(&core, &mut state, id);
                } else {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(id, "resource failed borrow validation");
                    destroy_pooled(&core, &mut state, id);
                    dispense(&core, &mut state);
                }
            }
        }
        core.touch();
    });
}

/// Validate a resource as it comes back from a client. Failures destroy it
/// instead of re-idling it.
fn start_return_validation<F: Factory>(core: &Arc<PoolCore<F>>, state: &mut PoolState<F>, id: u64) {
    let pooled = state.all.get_mut(&id).expect("validating a pooled resource");
    pooled.test();
    let obj = pooled.take_obj().expect("returned resource holds its obj");
    state.test_on_return.insert(id);

    let core = Arc::clone(core);
    tokio::spawn(async move {
        let mut obj = obj;
        let valid = matches!(core.factory.validate(&mut obj).await, Ok(true));
        {
            let mut state = core.state.lock();
            state.test_on_return.remove(&id);
            if let Some(pooled) = state.all.get_mut(&id) {
                pooled.put_obj(obj);
                if valid {
                    pooled.deallocate();
                    add_to_available(&core, &mut state, id);
                } else {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(id, "resource failed return validation");
                    destroy_pooled(&core, &mut state, id);
                }
                dispense(&core, &mut state);
            }
        }
        core.touch();
    });
}

// ---------------------------------------------------------------------------
// Destruction
// ---------------------------------------------------------------------------

/// Condemn a resource: drop it from the pool, run `factory.destroy` in a
/// task (bounded by the destroy deadline when configured), and top the pool
/// back up to `min`. The wrapper must hold its obj when this is called.
fn destroy_pooled<F: Factory>(core: &Arc<PoolCore<F>>, state: &mut PoolState<F>, id: u64) {
    let Some(mut pooled) = state.all.remove(&id) else {
        return;
    };
    pooled.invalidate();
    let Some(obj) = pooled.take_obj() else {
        debug_assert!(false, "destroying a resource that is not in hand");
        return;
    };
    state.destroy_ops += 1;

    let core_task = Arc::clone(core);
    tokio::spawn(async move {
        let result = factory::destroy_with_deadline(
            Arc::clone(&core_task.factory),
            obj,
            core_task.options.destroy_timeout,
        )
        .await;
        core_task.state.lock().destroy_ops -= 1;
        if let Err(error) = result {
            #[cfg(feature = "tracing")]
            tracing::warn!(id, %error, "factory destroy failed");
            core_task.events.emit(PoolEvent::FactoryDestroyError {
                error: Arc::new(error),
            });
        }
        core_task.events.emit(PoolEvent::ResourceDestroyed { id });
        core_task.touch();
    });

    ensure_minimum(core, state);
}

// ---------------------------------------------------------------------------
// Eviction
// ---------------------------------------------------------------------------

/// One eviction sweep: advance the persistent cursor over the available set
/// up to `num_tests_per_eviction_run` times, destroying whatever the policy
/// condemns. The cursor survives across sweeps, so consecutive runs rotate
/// through the set instead of re-examining the head.
fn evict_sweep<F: Factory>(core: &Arc<PoolCore<F>>) {
    let mut state = core.state.lock();
    let tests_to_run = core
        .options
        .num_tests_per_eviction_run
        .min(state.available.len());

    let mut tests_have_run = 0;
    while tests_have_run < tests_to_run {
        let mut cursor = state.eviction_cursor;
        let progress = cursor.advance(&state.available);
        state.eviction_cursor = cursor;

        let Some(node_ref) = progress else {
            // Exhausted or detached. Wrap around while there is anything
            // left to look at.
            state.eviction_cursor.reset();
            if state.available.is_empty() {
                break;
            }
            continue;
        };

        let Some(&id) = state.available.get(node_ref) else {
            continue;
        };
        let should_evict = {
            let pooled = state.all.get(&id).expect("available resource is pooled");
            debug_assert_eq!(pooled.state(), PooledState::Idle);
            evictor::should_evict(&core.options, pooled, state.available.len())
        };
        tests_have_run += 1;

        if should_evict {
            #[cfg(feature = "tracing")]
            tracing::debug!(id, "evicting idle resource");
            let mut cursor = state.eviction_cursor;
            cursor.remove_current(&mut state.available);
            state.eviction_cursor = cursor;
            destroy_pooled(core, &mut state, id);
        }
    }
    drop(state);
    core.touch();
}

async fn evictor_loop<F: Factory>(core: Weak<PoolCore<F>>, every: Duration) {
    let start = tokio::time::Instant::now() + every;
    let mut ticker = tokio::time::interval_at(start, every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(core) = core.upgrade() else {
            return;
        };
        evict_sweep(&core);
    }
}

// ---------------------------------------------------------------------------
// Waiter expiry
// ---------------------------------------------------------------------------

/// Arm the expiry of one enqueued waiter: after the deadline, splice it out
/// of the queue and reject it. A waiter that was dispatched first is simply
/// no longer in the queue.
fn arm_request_expiry<F: Factory>(core: &Arc<PoolCore<F>>, queue_ref: QueueRef, ttl: Duration) {
    let core = Arc::downgrade(core);
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        let Some(core) = core.upgrade() else {
            return;
        };
        let expired = core.state.lock().waiting.remove(queue_ref);
        if let Some(request) = expired {
            let waited = request.created_at().elapsed();
            request.reject(Error::AcquireTimeout { waited });
            core.touch();
        }
    });
}

// ---------------------------------------------------------------------------
// Release / destroy entry points
// ---------------------------------------------------------------------------

fn release_to_pool<F: Factory>(core: &Arc<PoolCore<F>>, id: u64, obj: F::Resource) -> Result<()> {
    let mut state = core.state.lock();
    let Some(loan) = state.loans.remove(&id) else {
        return Err(Error::ResourceNotInPool);
    };
    loan.close();
    let held = loan.borrowed_at.elapsed();

    let pooled = state.all.get_mut(&id).expect("loaned resource is pooled");
    pooled.put_obj(obj);
    if core.options.test_on_return {
        pooled.returning();
        start_return_validation(core, &mut state, id);
    } else {
        pooled.deallocate();
        add_to_available(core, &mut state, id);
    }
    core.events.emit(PoolEvent::Released { held });
    dispense(core, &mut state);
    drop(state);
    core.touch();
    Ok(())
}

fn destroy_from_pool<F: Factory>(core: &Arc<PoolCore<F>>, id: u64, obj: F::Resource) -> Result<()> {
    let mut state = core.state.lock();
    let Some(loan) = state.loans.remove(&id) else {
        return Err(Error::ResourceNotInPool);
    };
    loan.close();

    let pooled = state.all.get_mut(&id).expect("loaned resource is pooled");
    pooled.put_obj(obj);
    pooled.deallocate();
    destroy_pooled(core, &mut state, id);
    dispense(core, &mut state);
    drop(state);
    core.touch();
    Ok(())
}

/// Best-effort return used by [`Guard`]'s drop path.
pub(crate) fn return_from_drop<F: Factory>(core: &Arc<PoolCore<F>>, id: u64, obj: F::Resource) {
    let _ = release_to_pool(core, id, obj);
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Snapshot of the pool's counters, taken under a single lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    /// Live resources plus in-flight creations.
    pub size: usize,
    /// Idle resources ready to hand out.
    pub available: usize,
    /// Resources currently on loan.
    pub borrowed: usize,
    /// Queued acquirers.
    pub pending: usize,
    /// Configured capacity.
    pub max: usize,
    /// Configured floor.
    pub min: usize,
    /// Creations the pool could still start without breaching `max`.
    pub spare_resource_capacity: usize,
}

/// Generic asynchronous resource pool.
///
/// Multiplexes a bounded set of factory-built resources among concurrent
/// clients with priority + FIFO fairness, optional validity checks, idle
/// eviction and graceful shutdown. Cloning is cheap and every clone drives
/// the same pool.
///
/// Background work (creations, destructions, the eviction sweep, waiter
/// expiry) runs on spawned tasks, so a pool that has anything to do must
/// live inside a tokio runtime.
pub struct Pool<F: Factory> {
    core: Arc<PoolCore<F>>,
}

impl<F: Factory> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<F: Factory> std::fmt::Debug for Pool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").field("status", &self.status()).finish()
    }
}

impl<F: Factory> Pool<F> {
    /// Build a pool around `factory`. Options are normalized (clamped)
    /// first; with `autostart` set this also starts the pool immediately.
    pub fn new(factory: F, options: PoolOptions) -> Self {
        let options = options.normalized();
        let waiting = PriorityQueue::new(options.priority_range);
        let (changed, _) = watch::channel(0);
        let pool = Self {
            core: Arc::new(PoolCore {
                options,
                factory: Arc::new(factory),
                state: Mutex::new(PoolState {
                    started: false,
                    draining: false,
                    next_id: 0,
                    all: HashMap::new(),
                    available: LinkedList::new(),
                    test_on_borrow: HashSet::new(),
                    test_on_return: HashSet::new(),
                    loans: HashMap::new(),
                    waiting,
                    create_ops: 0,
                    destroy_ops: 0,
                    eviction_cursor: Cursor::new(),
                    evictor_task: None,
                }),
                events: EventBus::default(),
                changed,
            }),
        };
        if pool.core.options.autostart {
            pool.start();
        }
        pool
    }

    /// Start the pool: schedule the eviction sweep (when configured) and
    /// replenish up to `min`. Idempotent; a no-op once draining.
    pub fn start(&self) {
        let mut state = self.core.state.lock();
        start_locked(&self.core, &mut state);
    }

    /// Request a resource at the highest priority.
    pub fn acquire(&self) -> Acquire<F> {
        self.acquire_priority(0)
    }

    /// Request a resource. Lower `priority` values are served first;
    /// out-of-range values fall into the lowest-priority slot. The waiter
    /// is enqueued immediately; the returned future resolves once a
    /// resource is dispatched (or the request fails or expires).
    pub fn acquire_priority(&self, priority: usize) -> Acquire<F> {
        let core = &self.core;
        let mut state = core.state.lock();

        if !state.started {
            start_locked(core, &mut state);
        }
        if state.draining {
            return Acquire::failed(Error::Draining);
        }
        if let Some(max_waiting) = core.options.max_waiting_clients
            && spare_capacity(core, &state) < 1
            && state.available.is_empty()
            && state.waiting.len() >= max_waiting
        {
            return Acquire::failed(Error::MaxWaitersExceeded);
        }

        let (request, reply) = ResourceRequest::new();
        let queue_ref = state.waiting.enqueue(request, priority);
        if let Some(ttl) = core.options.acquire_timeout {
            arm_request_expiry(core, queue_ref, ttl);
        }
        dispense(core, &mut state);
        drop(state);
        core.touch();
        Acquire::waiting(reply)
    }

    /// Return a borrowed resource to the pool and re-run the matching
    /// pass. Fails with [`Error::ResourceNotInPool`] for a guard this pool
    /// did not issue (the guard then drop-returns to its own pool).
    pub async fn release(&self, guard: Guard<F>) -> Result<()> {
        if !Arc::ptr_eq(guard.core(), &self.core) {
            return Err(Error::ResourceNotInPool);
        }
        let (id, obj) = guard.dismantle();
        release_to_pool(&self.core, id, obj)
    }

    /// Return a borrowed resource for destruction instead of reuse. The
    /// pool replenishes toward `min` afterwards.
    pub async fn destroy(&self, guard: Guard<F>) -> Result<()> {
        if !Arc::ptr_eq(guard.core(), &self.core) {
            return Err(Error::ResourceNotInPool);
        }
        let (id, obj) = guard.dismantle();
        destroy_from_pool(&self.core, id, obj)
    }

    /// Acquire a resource, run `f` on it, then release it — or destroy it
    /// when `f` fails. The outer error is the pool's; the inner result is
    /// `f`'s, passed through untouched.
    pub async fn use_resource<U, E>(
        &self,
        f: impl AsyncFnOnce(&mut F::Resource) -> std::result::Result<U, E>,
    ) -> Result<std::result::Result<U, E>> {
        self.use_resource_priority(0, f).await
    }

    /// [`use_resource`](Pool::use_resource) at an explicit priority.
    pub async fn use_resource_priority<U, E>(
        &self,
        priority: usize,
        f: impl AsyncFnOnce(&mut F::Resource) -> std::result::Result<U, E>,
    ) -> Result<std::result::Result<U, E>> {
        let mut guard = self.acquire_priority(priority).await?;
        match f(&mut *guard).await {
            Ok(value) => {
                self.release(guard).await?;
                Ok(Ok(value))
            }
            Err(error) => {
                self.destroy(guard).await?;
                Ok(Err(error))
            }
        }
    }

    /// Whether `guard` is a live loan of this pool.
    pub fn is_borrowed_resource(&self, guard: &Guard<F>) -> bool {
        Arc::ptr_eq(guard.core(), &self.core)
            && self.core.state.lock().loans.contains_key(&guard.loan_id())
    }

    /// Stop accepting work and wait for the outstanding work to settle:
    /// first the settlement of the last-enqueued waiter (everything ahead
    /// of it settles earlier), then every open loan. Deschedules the
    /// eviction sweep. Acquires after this call fail with
    /// [`Error::Draining`].
    pub async fn drain(&self) {
        let core = &self.core;
        let tail_signal = {
            let mut state = core.state.lock();
            state.draining = true;
            state.waiting.tail().map(ResourceRequest::settled_signal)
        };
        core.touch();

        if let Some(mut signal) = tail_signal {
            let _ = signal.wait_for(|settled| *settled).await;
        }

        let loan_signals: Vec<_> = {
            let state = core.state.lock();
            state.loans.values().map(Loan::signal).collect()
        };
        for mut signal in loan_signals {
            let _ = signal.wait_for(|settled| *settled).await;
        }

        let evictor_task = core.state.lock().evictor_task.take();
        if let Some(task) = evictor_task {
            task.abort();
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("pool drained");
    }

    /// Destroy every idle resource: wait for in-flight creations to
    /// settle, condemn everything in the available set, then wait for the
    /// resulting destroys to settle (success or failure).
    pub async fn clear(&self) {
        let core = &self.core;
        wait_until(core, |state| state.create_ops == 0).await;
        {
            let mut state = core.state.lock();
            while let Some(id) = state.available.pop_front() {
                destroy_pooled(core, &mut state, id);
            }
        }
        core.touch();
        wait_until(core, |state| state.destroy_ops == 0).await;
        #[cfg(feature = "tracing")]
        tracing::debug!("pool cleared");
    }

    /// Resolve once the pool holds at least `min` idle resources.
    pub async fn ready(&self) {
        let min = self.core.options.min;
        wait_until(&self.core, move |state| state.available.len() >= min).await;
    }

    /// Subscribe to [`PoolEvent`]s. Unsubscribe by dropping the receiver.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.core.events.subscribe()
    }

    /// Live resources plus in-flight creations.
    #[must_use]
    pub fn size(&self) -> usize {
        let state = self.core.state.lock();
        state.all.len() + state.create_ops
    }

    /// Idle resources ready to hand out.
    #[must_use]
    pub fn available(&self) -> usize {
        self.core.state.lock().available.len()
    }

    /// Resources currently on loan.
    #[must_use]
    pub fn borrowed(&self) -> usize {
        self.core.state.lock().loans.len()
    }

    /// Queued acquirers.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.core.state.lock().waiting.len()
    }

    /// Configured capacity.
    #[must_use]
    pub fn max(&self) -> usize {
        self.core.options.max
    }

    /// Configured floor.
    #[must_use]
    pub fn min(&self) -> usize {
        self.core.options.min
    }

    /// Creations the pool could still start without breaching `max`.
    #[must_use]
    pub fn spare_resource_capacity(&self) -> usize {
        let state = self.core.state.lock();
        spare_capacity(&self.core, &state)
    }

    /// All counters in one consistent snapshot.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.core.state.lock();
        PoolStatus {
            size: state.all.len() + state.create_ops,
            available: state.available.len(),
            borrowed: state.loans.len(),
            pending: state.waiting.len(),
            max: self.core.options.max,
            min: self.core.options.min,
            spare_resource_capacity: spare_capacity(&self.core, &state),
        }
    }
}

fn start_locked<F: Factory>(core: &Arc<PoolCore<F>>, state: &mut PoolState<F>) {
    if state.started || state.draining {
        return;
    }
    state.started = true;
    if let Some(every) = core.options.eviction_run_interval {
        let handle = tokio::spawn(evictor_loop(Arc::downgrade(core), every));
        state.evictor_task = Some(handle.abort_handle());
    }
    ensure_minimum(core, state);
}

/// Block until `predicate` holds, re-checking on every state change.
async fn wait_until<F, P>(core: &Arc<PoolCore<F>>, predicate: P)
where
    F: Factory,
    P: Fn(&PoolState<F>) -> bool,
{
    loop {
        let mut changed = core.changed.subscribe();
        if predicate(&core.state.lock()) {
            return;
        }
        if changed.changed().await.is_err() {
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Acquire future
// ---------------------------------------------------------------------------

enum AcquireInner<F: Factory> {
    Failed(Option<Error>),
    Waiting(oneshot::Receiver<Result<Guard<F>>>),
}

/// Future returned by [`Pool::acquire`]. The waiter is already enqueued
/// when this is handed out; dropping it abandons the request and any
/// resource dispatched to it goes back to the pool.
#[must_use = "an Acquire does nothing unless awaited; dropping it abandons the request"]
pub struct Acquire<F: Factory> {
    inner: AcquireInner<F>,
}

impl<F: Factory> Acquire<F> {
    fn failed(error: Error) -> Self {
        Self {
            inner: AcquireInner::Failed(Some(error)),
        }
    }

    fn waiting(reply: oneshot::Receiver<Result<Guard<F>>>) -> Self {
        Self {
            inner: AcquireInner::Waiting(reply),
        }
    }
}

impl<F: Factory> Future for Acquire<F> {
    type Output = Result<Guard<F>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            AcquireInner::Failed(error) => {
                Poll::Ready(Err(error.take().expect("Acquire polled after completion")))
            }
            AcquireInner::Waiting(reply) => Pin::new(reply).poll(cx).map(|received| {
                received.unwrap_or_else(|_| {
                    Err(Error::internal("pool dropped while request was pending"))
                })
            }),
        }
    }
}
