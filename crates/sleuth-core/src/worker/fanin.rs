//! Fan-in: worker pool output collected into one queue

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::pool::parallel_for_each;
use crate::queue::AsyncQueue;
use crate::sequence::Sequence;

/// The fan-in task panicked while pulling the sequence or running a transform
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fan-in worker panicked: {message}")]
pub struct WorkerPanic {
    pub message: String,
}

impl WorkerPanic {
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self { message }
    }
}

impl From<WorkerPanic> for String {
    fn from(panic: WorkerPanic) -> Self {
        panic.to_string()
    }
}

/// Map a sequence through `transform` with `limit` workers, results into a queue
///
/// Returns a live queue right away. A background task drains `sequence`,
/// putting each transformed item into the queue as soon as it completes, so
/// results arrive in completion order rather than input order. When every
/// worker is done the queue is ended; if a transform failed, it is ended
/// with that first failure instead.
///
/// Transforms that should not stop the run must handle their own errors and
/// return `Ok` with the failure recorded in `R`.
///
/// The queue is always ended. A panic in the sequence or in a transform is
/// caught and ends the queue with `E::from(WorkerPanic)`.
///
/// # Panics
///
/// Must be called from within a Tokio runtime.
pub fn parallel_map_to_queue<S, F, Fut, R, E>(
    limit: usize,
    sequence: S,
    transform: F,
) -> AsyncQueue<R, E>
where
    S: Sequence + 'static,
    F: Fn(S::Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: From<WorkerPanic> + Clone + Send + 'static,
{
    let queue = AsyncQueue::<R, E>::new();
    let producer = queue.clone();

    tokio::spawn(async move {
        let pool = parallel_for_each(limit, sequence, |item| {
            let producer = producer.clone();
            let transformed = transform(item);
            async move {
                producer.put(transformed.await?);
                Ok::<(), E>(())
            }
        });

        let outcome = match AssertUnwindSafe(pool).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                let panic = WorkerPanic::from_payload(payload.as_ref());
                error!(limit, message = %panic.message, "Fan-in task panicked, ending queue with error");
                Err(E::from(panic))
            }
        };

        match outcome {
            Ok(()) => {
                debug!(limit, "Fan-in complete, ending queue");
                producer.end(None);
            }
            Err(error) => {
                warn!(limit, "Fan-in stopped by a failed transform, ending queue with error");
                producer.end(Some(error));
            }
        }
    });

    queue
}
