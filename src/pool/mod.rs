//! Bounded extraction pool
//!
//! A fixed set of long-lived workers, each owning one [`Extractor`](crate::extract::Extractor),
//! pull jobs from a shared queue. Callers hand a URL to the [`Dispatcher`] and
//! wait on a oneshot channel that only their own job can complete.
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::start(&PoolConfig::new(8), metrics, |_| MyExtractor::new());
//! let outcome = dispatcher.submit("https://example.com/").await?;
//! dispatcher.shutdown().await;
//! ```

mod dispatcher;
mod outcome;
mod worker;

pub use dispatcher::{DispatchError, Dispatcher, PoolConfig, PoolState};
pub use outcome::{ErrorBody, Outcome};
