//! # Sleuth Core
//!
//! Bounded-concurrency asynchronous iteration over a single-pass sequence, and
//! an unbounded result queue that turns worker output back into one stream.
//!
//! ## Features
//!
//! - **Deferred**: a settle-once future whose resolve/reject handle lives elsewhere
//! - **AsyncQueue**: ordered multi-producer/single-consumer queue with a terminal marker
//! - **Sequence**: one pull abstraction for every input source (streams and iterators)
//! - **Worker pool**: `limit` workers draining one shared sequence, first failure wins
//! - **Fan-in**: worker results pushed into an `AsyncQueue` in completion order
//! - **Top-K bucket**: fixed-capacity collection of the best-scored results
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Sequence (single-pass cursor)               │
//! │  (pulled under one critical section, each item exactly once)│
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   parallel_for_each(limit)                   │
//! │  [worker 0] [worker 1] ... [worker limit-1]                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ put (completion order)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         AsyncQueue                           │
//! │  (values, parked consumers, terminal marker + error)        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ get / into_stream
//!                              ▼
//!                           consumer
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use futures::StreamExt;
//! use sleuth_core::prelude::*;
//!
//! let queue = parallel_map_to_queue(2, from_iter(vec![1, 2, 3]), |x| async move {
//!     Ok::<_, String>(x * 10)
//! });
//!
//! let mut results = queue.into_stream();
//! while let Some(result) = results.next().await {
//!     println!("{}", result?);
//! }
//! ```

pub mod bucket;
pub mod deferred;
pub mod queue;
pub mod sequence;
pub mod worker;

/// Prelude for common imports
pub mod prelude {
    pub use crate::bucket::TopResultsBucket;
    pub use crate::deferred::{deferred, Deferred, DeferredError, Settler};
    pub use crate::queue::AsyncQueue;
    pub use crate::sequence::{from_iter, Sequence, SharedSequence};
    pub use crate::worker::{
        async_for_each, async_reduce, parallel, parallel_for_each, parallel_map_to_queue,
        parallel_reduce, WorkerPanic,
    };
}

// Re-export key types at crate root
pub use bucket::TopResultsBucket;
pub use deferred::{deferred, Deferred, DeferredError, Settler};
pub use queue::AsyncQueue;
pub use sequence::{from_iter, Sequence, SharedSequence};
pub use worker::{
    async_for_each, async_reduce, parallel, parallel_for_each, parallel_map_to_queue,
    parallel_reduce, WorkerPanic,
};
