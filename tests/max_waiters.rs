//! The cap on queued acquirers.

use std::time::Duration;

use respool::error::{Error, Result};
use respool::{Factory, Pool, PoolOptions};

struct Units;

impl Factory for Units {
    type Resource = ();

    async fn create(&self) -> Result<()> {
        Ok(())
    }

    async fn destroy(&self, _obj: ()) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn zero_max_waiters_rejects_once_saturated() {
    let pool = Pool::new(
        Units,
        PoolOptions {
            max: 2,
            max_waiting_clients: Some(0),
            ..Default::default()
        },
    );

    let first = pool.acquire().await.unwrap();
    let second = pool.acquire().await.unwrap();

    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, Error::MaxWaitersExceeded));
    assert_eq!(err.to_string(), "max waitingClients count exceeded");

    pool.release(first).await.unwrap();
    pool.release(second).await.unwrap();
}

#[tokio::test]
async fn queue_cap_only_applies_when_nothing_can_be_served() {
    let pool = Pool::new(
        Units,
        PoolOptions {
            max: 2,
            max_waiting_clients: Some(0),
            ..Default::default()
        },
    );

    // Capacity is spare, so acquires pass despite the zero cap.
    let first = pool.acquire().await.unwrap();
    pool.release(first).await.unwrap();

    // An idle resource also lets an acquire through.
    let again = pool.acquire().await.unwrap();
    pool.release(again).await.unwrap();
}

#[tokio::test]
async fn waiters_above_the_cap_are_rejected_waiters_below_are_served() {
    let pool = Pool::new(
        Units,
        PoolOptions {
            max: 1,
            max_waiting_clients: Some(1),
            ..Default::default()
        },
    );

    let held = pool.acquire().await.unwrap();
    let queued = pool.acquire();
    assert_eq!(pool.pending(), 1);

    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, Error::MaxWaitersExceeded));

    let release = {
        let pool = pool.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            pool.release(held).await.unwrap();
        })
    };
    let guard = queued.await.unwrap();
    release.await.unwrap();
    pool.release(guard).await.unwrap();
}
