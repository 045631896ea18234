//! The two-step shutdown: drain settles outstanding work, clear empties
//! the pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use respool::error::{Error, Result};
use respool::{Factory, Pool, PoolOptions};

struct Counting {
    next: AtomicU64,
}

impl Counting {
    fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }
}

impl Factory for Counting {
    type Resource = u64;

    async fn create(&self) -> Result<u64> {
        Ok(self.next.fetch_add(1, Ordering::SeqCst))
    }

    async fn destroy(&self, _obj: u64) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn drain_waits_for_queued_work_then_rejects_new_acquires() {
    let pool = Pool::new(
        Counting::new(),
        PoolOptions {
            max: 2,
            ..Default::default()
        },
    );

    // Five clients against a pool of two; each holds its resource a while.
    let mut holders = Vec::new();
    for _ in 0..5 {
        let acquire = pool.acquire();
        let pool = pool.clone();
        holders.push(tokio::spawn(async move {
            let guard = acquire.await.unwrap();
            tokio::time::sleep(Duration::from_millis(250)).await;
            pool.release(guard).await.unwrap();
        }));
    }

    pool.drain().await;
    pool.clear().await;

    // Every holder got through before the drain resolved.
    for holder in holders {
        holder.await.unwrap();
    }
    assert_eq!(pool.borrowed(), 0);
    assert_eq!(pool.pending(), 0);
    assert_eq!(pool.size(), 0);

    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, Error::Draining));
}

#[tokio::test]
async fn drain_resolves_even_when_waiters_timed_out() {
    let pool = Pool::new(
        Counting::new(),
        PoolOptions {
            max: 1,
            acquire_timeout: Some(Duration::from_millis(30)),
            ..Default::default()
        },
    );

    // Exhaust the pool, then queue a waiter that can only time out.
    let held = pool.acquire().await.unwrap();
    let starved = pool.acquire();

    let drained = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.drain().await })
    };

    let err = starved.await.unwrap_err();
    assert!(err.is_timeout());

    pool.release(held).await.unwrap();
    drained.await.unwrap();
}

#[tokio::test]
async fn clear_destroys_every_idle_resource() {
    let pool = Pool::new(
        Counting::new(),
        PoolOptions {
            max: 3,
            ..Default::default()
        },
    );

    let a = pool.acquire().await.unwrap();
    let b = pool.acquire().await.unwrap();
    let c = pool.acquire().await.unwrap();
    pool.release(a).await.unwrap();
    pool.release(b).await.unwrap();
    pool.release(c).await.unwrap();
    assert_eq!(pool.available(), 3);

    pool.clear().await;
    assert_eq!(pool.available(), 0);
    assert_eq!(pool.size(), 0);
}

#[tokio::test]
async fn clear_waits_for_inflight_creations() {
    struct Slow;

    impl Factory for Slow {
        type Resource = ();

        async fn create(&self) -> Result<()> {
            tokio::time::sleep(Duration::from_millis(80)).await;
            Ok(())
        }

        async fn destroy(&self, _obj: ()) -> Result<()> {
            Ok(())
        }
    }

    let pool = Pool::new(
        Slow,
        PoolOptions {
            min: 1,
            max: 1,
            ..Default::default()
        },
    );
    // The min-replenish creation is still in flight when shutdown starts;
    // clear must await it, let it land, and then destroy it. Draining
    // first stops the pool from replenishing what clear removes.
    pool.drain().await;
    pool.clear().await;
    assert_eq!(pool.size(), 0);
    assert_eq!(pool.available(), 0);
}
