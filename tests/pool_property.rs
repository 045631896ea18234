//! Property tests for pool bookkeeping invariants.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use proptest::prelude::*;
use respool::error::Result;
use respool::{Factory, Pool, PoolOptions};

// ---------------------------------------------------------------------------
// Test factory
// ---------------------------------------------------------------------------

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

// ---------------------------------------------------------------------------
// Property: counters stay consistent through arbitrary acquire/release
// sequences
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn size_stays_bounded_and_counters_stay_consistent(
        max in 1usize..6,
        fifo in any::<bool>(),
        ops in proptest::collection::vec(any::<bool>(), 1..40),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let pool = Pool::new(
                Counting::new(),
                PoolOptions {
                    max,
                    fifo,
                    acquire_timeout: Some(Duration::from_millis(50)),
                    ..Default::default()
                },
            );
            let mut guards = Vec::new();

            for op_is_acquire in ops {
                if op_is_acquire {
                    // May time out when the pool is exhausted; that is fine.
                    if let Ok(guard) = pool.acquire().await {
                        guards.push(guard);
                    }
                } else if let Some(guard) = guards.pop() {
                    pool.release(guard).await.unwrap();
                }

                let status = pool.status();
                prop_assert!(
                    status.size <= max,
                    "size {} exceeded max {}",
                    status.size,
                    max,
                );
                prop_assert!(
                    status.available + status.borrowed <= status.size,
                    "available {} + borrowed {} exceeded size {}",
                    status.available,
                    status.borrowed,
                    status.size,
                );
                prop_assert_eq!(status.borrowed, guards.len());
            }

            drop(guards);
            let status = pool.status();
            prop_assert_eq!(status.borrowed, 0);
            prop_assert!(status.available <= status.size);
            Ok(())
        })?;
    }
}

// ---------------------------------------------------------------------------
// Deterministic invariant checks
// ---------------------------------------------------------------------------

/// With no creations or validations in flight, the available and borrowed
/// counts partition the pool exactly.
#[tokio::test]
async fn available_plus_borrowed_partitions_the_pool_at_rest() {
    let pool = Pool::new(
        Counting::new(),
        PoolOptions {
            max: 4,
            ..Default::default()
        },
    );

    let a = pool.acquire().await.unwrap();
    let b = pool.acquire().await.unwrap();
    let c = pool.acquire().await.unwrap();
    pool.release(b).await.unwrap();

    let status = pool.status();
    assert_eq!(status.size, 3);
    assert_eq!(status.borrowed, 2);
    assert_eq!(status.available, 1);
    assert_eq!(status.available + status.borrowed, status.size);
    assert_eq!(status.spare_resource_capacity, 1);

    pool.release(a).await.unwrap();
    pool.release(c).await.unwrap();
    let status = pool.status();
    assert_eq!(status.available + status.borrowed, status.size);
}

#[tokio::test]
async fn rapid_cycling_preserves_invariants() {
    let pool = Pool::new(
        Counting::new(),
        PoolOptions {
            max: 4,
            ..Default::default()
        },
    );

    for _ in 0..50 {
        let guard = pool.acquire().await.unwrap();
        let status = pool.status();
        assert!(status.size <= 4);
        assert_eq!(status.borrowed, 1);
        pool.release(guard).await.unwrap();
        assert_eq!(pool.borrowed(), 0);
    }
    assert_eq!(pool.size(), 1, "one resource serves the whole cycle");
}
