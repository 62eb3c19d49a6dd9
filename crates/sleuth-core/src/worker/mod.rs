//! Bounded worker pool over a shared sequence
//!
//! This module provides:
//! - [`parallel`] - run `limit` worker futures, first failure wins
//! - [`parallel_for_each`] - `limit` workers draining one shared sequence
//! - [`parallel_reduce`] - per-worker partial folds merged by `combine`
//! - [`parallel_map_to_queue`] - fan worker results into an [`AsyncQueue`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     parallel(limit)                          │
//! │  ┌──────────┐  ┌──────────┐          ┌──────────────────┐   │
//! │  │ worker 0 │  │ worker 1 │   ...    │ worker limit - 1 │   │
//! │  └────┬─────┘  └────┬─────┘          └────────┬─────────┘   │
//! │       └─────────────┴──── pull ───────────────┘             │
//! │                          │                                   │
//! │                          ▼                                   │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │        SharedSequence (one pull at a time)          │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Workers are futures polled together on the calling task. Nothing is
//! cancelled: a worker that started an item finishes it.
//!
//! [`AsyncQueue`]: crate::queue::AsyncQueue

mod fanin;
mod pool;
mod reduce;

pub use fanin::{parallel_map_to_queue, WorkerPanic};
pub use pool::{async_for_each, parallel, parallel_for_each};
pub use reduce::{async_reduce, parallel_reduce};
