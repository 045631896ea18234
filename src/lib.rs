//! # respool
//!
//! A generic asynchronous resource pool: a bounded set of expensive,
//! asynchronously constructed resources (database connections, sockets,
//! worker handles) multiplexed among any number of concurrent clients.
//!
//! The pool enforces capacity limits, fairness (priority, FIFO within a
//! priority), optional validity checks on borrow and on return, idle
//! eviction with a rotating cursor, per-operation timeouts, and a two-step
//! graceful shutdown (`drain` then `clear`).
//!
//! # Example
//!
//! ```rust,ignore
//! use respool::{Factory, Pool, PoolOptions, Result};
//!
//! struct Connections;
//!
//! impl Factory for Connections {
//!     type Resource = Connection;
//!
//!     async fn create(&self) -> Result<Connection> {
//!         Connection::open("db://...").await.map_err(respool::Error::factory)
//!     }
//!
//!     async fn destroy(&self, conn: Connection) -> Result<()> {
//!         conn.close().await;
//!         Ok(())
//!     }
//! }
//!
//! # async fn demo() -> Result<()> {
//! let pool = Pool::new(Connections, PoolOptions { max: 8, min: 2, ..Default::default() });
//! let conn = pool.acquire().await?;
//! // ... use *conn ...
//! pool.release(conn).await?;
//! pool.drain().await;
//! pool.clear().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod factory;
pub mod guard;
pub mod pool;

mod evictor;
mod list;
mod pooled;
mod priority_queue;
mod request;

#[cfg(feature = "metrics")]
pub mod metrics;

pub use config::PoolOptions;
pub use error::{Error, Result};
pub use events::{EventBus, PoolEvent};
pub use factory::Factory;
pub use guard::Guard;
pub use pool::{Acquire, Pool, PoolStatus};

#[cfg(feature = "metrics")]
pub use metrics::MetricsCollector;
