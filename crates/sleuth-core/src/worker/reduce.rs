//! Folding a sequence, sequentially or with a bounded pool
//!
//! The parallel fold gives every worker its own accumulator, started from a
//! clone of `identity`, and merges the partial results with `combine` once
//! the sequence is exhausted. Which worker sees which item is not
//! deterministic, so the result is only well defined when `combine` is
//! associative and commutative and `identity` is its identity element.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::pool::parallel;
use crate::sequence::{Sequence, SharedSequence};

/// Fold a sequence one item at a time
pub async fn async_reduce<S, A, F, Fut, E>(seed: A, mut sequence: S, mut reducer: F) -> Result<A, E>
where
    S: Sequence,
    F: FnMut(A, S::Item) -> Fut,
    Fut: Future<Output = Result<A, E>>,
{
    let mut accumulator = seed;
    while let Some(item) = sequence.pull().await {
        accumulator = reducer(accumulator, item).await?;
    }
    Ok(accumulator)
}

/// Fold a sequence with up to `limit` reducer calls in flight
///
/// # Example
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use sleuth_core::{from_iter, parallel_reduce};
///
/// let total = parallel_reduce(
///     4,
///     0u64,
///     from_iter(1..=100u64),
///     |sum, n| async move { Ok::<_, ()>(sum + n) },
///     |a, b| a + b,
/// )
/// .await;
///
/// assert_eq!(total, Ok(5050));
/// # }
/// ```
///
/// A `limit` of zero is treated as one. The first reducer failure stops the
/// pool from handing out more items and is returned once in-flight calls
/// have finished.
pub async fn parallel_reduce<S, A, F, Fut, C, E>(
    limit: usize,
    identity: A,
    sequence: S,
    reducer: F,
    combine: C,
) -> Result<A, E>
where
    S: Sequence,
    A: Clone,
    F: Fn(A, S::Item) -> Fut,
    Fut: Future<Output = Result<A, E>>,
    C: FnMut(A, A) -> A,
{
    let limit = limit.max(1);
    let shared = SharedSequence::new(sequence);
    let halted = AtomicBool::new(false);

    let (cursor, stop, fold) = (&shared, &halted, &reducer);
    let partials = parallel(limit, |worker| {
        fold_partial(worker, identity.clone(), cursor, stop, fold)
    })
    .await?;

    debug!(limit, items = shared.pulled(), "Merging partial folds");
    Ok(partials.into_iter().reduce(combine).unwrap_or(identity))
}

/// One worker's partial fold
async fn fold_partial<S, A, F, Fut, E>(
    worker: usize,
    mut accumulator: A,
    cursor: &SharedSequence<S>,
    halted: &AtomicBool,
    reducer: &F,
) -> Result<A, E>
where
    S: Sequence,
    F: Fn(A, S::Item) -> Fut,
    Fut: Future<Output = Result<A, E>>,
{
    while let Some(item) = cursor.pull_unless(halted).await {

        accumulator = match reducer(accumulator, item).await {
            Ok(next) => next,
            Err(error) => {
                halted.store(true, Ordering::Release);
                debug!(worker, "Partial fold stopped after a failed item");
                return Err(error);
            }
        };
    }

    Ok(accumulator)
}
