//! Fixed-size worker pool
//!
//! Runs `limit` workers against one shared, single-pass sequence.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

use crate::sequence::{Sequence, SharedSequence};

/// Run `limit` workers concurrently and wait for all of them
///
/// Each worker is the future returned by `factory(worker_index)`. On success
/// the outputs come back in worker-index order. If any worker fails, the
/// first failure to complete is returned, but only after every other worker
/// has finished; no worker is cancelled.
pub async fn parallel<F, Fut, T, E>(limit: usize, mut factory: F) -> Result<Vec<T>, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut running: FuturesUnordered<_> = (0..limit)
        .map(|worker| {
            let task = factory(worker);
            async move { (worker, task.await) }
        })
        .collect();

    let mut outputs: Vec<Option<T>> = std::iter::repeat_with(|| None).take(limit).collect();
    let mut first_error = None;

    while let Some((worker, outcome)) = running.next().await {
        match outcome {
            Ok(output) => outputs[worker] = Some(output),
            Err(error) => {
                if first_error.is_none() {
                    warn!(worker, "Worker failed");
                    first_error = Some(error);
                } else {
                    debug!(worker, "Worker failed after an earlier failure");
                }
            }
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(outputs.into_iter().flatten().collect()),
    }
}

/// Drain a sequence with up to `limit` concurrent `on_item` calls
///
/// Each worker pulls one item, awaits `on_item(item)`, then pulls again
/// until the sequence is exhausted. Every item reaches exactly one worker.
/// After the first failure no further items are handed out; items already
/// in flight still finish, then that first failure is returned.
///
/// A `limit` of zero is treated as one.
pub async fn parallel_for_each<S, F, Fut, E>(limit: usize, sequence: S, on_item: F) -> Result<(), E>
where
    S: Sequence,
    F: Fn(S::Item) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let limit = limit.max(1);
    let shared = SharedSequence::new(sequence);
    let halted = AtomicBool::new(false);

    let (cursor, stop, handler) = (&shared, &halted, &on_item);
    let handled = parallel(limit, move |worker| drain(worker, cursor, stop, handler)).await?;

    debug!(
        limit,
        items = handled.iter().sum::<usize>(),
        "All workers drained the sequence"
    );
    Ok(())
}

/// Sequential form of [`parallel_for_each`]
pub async fn async_for_each<S, F, Fut, E>(mut sequence: S, mut on_item: F) -> Result<(), E>
where
    S: Sequence,
    F: FnMut(S::Item) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    while let Some(item) = sequence.pull().await {
        on_item(item).await?;
    }
    Ok(())
}

/// One worker's pull loop; returns how many items it handled
async fn drain<S, F, Fut, E>(
    worker: usize,
    cursor: &SharedSequence<S>,
    halted: &AtomicBool,
    on_item: &F,
) -> Result<usize, E>
where
    S: Sequence,
    F: Fn(S::Item) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let mut handled = 0;

    while let Some(item) = cursor.pull_unless(halted).await {

        if let Err(error) = on_item(item).await {
            halted.store(true, Ordering::Release);
            debug!(worker, handled, "Worker stopped after a failed item");
            return Err(error);
        }
        handled += 1;
    }

    debug!(worker, handled, "Worker finished");
    Ok(handled)
}
