//! Single-pass input sequences
//!
//! Every input source, sync or async, goes through the same pull
//! interface: ask for the next item, get `None` once exhausted.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::Mutex;

/// A pull-based, single-pass source of items
///
/// Implemented for every `Stream + Unpin + Send`. Plain iterators become
/// sequences through [`from_iter`]; pinned streams through `Box::pin`.
#[async_trait]
pub trait Sequence: Send {
    /// Item produced by the sequence
    type Item: Send;

    /// Next item, or `None` once exhausted
    async fn pull(&mut self) -> Option<Self::Item>;
}

#[async_trait]
impl<S> Sequence for S
where
    S: Stream + Unpin + Send,
    S::Item: Send,
{
    type Item = S::Item;

    async fn pull(&mut self) -> Option<Self::Item> {
        self.next().await
    }
}

/// Turn an iterator into a sequence
pub fn from_iter<I>(iter: I) -> stream::Iter<I::IntoIter>
where
    I: IntoIterator,
{
    stream::iter(iter)
}

/// One sequence cursor shared between concurrent pullers
///
/// Each pull runs inside a single critical section, so no two pullers ever
/// receive the same item and none is skipped. Once the sequence reports
/// exhaustion it is never polled again.
pub struct SharedSequence<S> {
    cursor: Mutex<Cursor<S>>,
    pulled: AtomicUsize,
}

struct Cursor<S> {
    sequence: S,
    exhausted: bool,
}

impl<S: Sequence> SharedSequence<S> {
    /// Wrap a sequence for shared pulling
    pub fn new(sequence: S) -> Self {
        Self {
            cursor: Mutex::new(Cursor {
                sequence,
                exhausted: false,
            }),
            pulled: AtomicUsize::new(0),
        }
    }

    /// Pull the next item
    pub async fn pull(&self) -> Option<S::Item> {
        let mut cursor = self.cursor.lock().await;
        self.advance(&mut cursor).await
    }

    /// Pull the next item unless `halted` is set
    ///
    /// The flag is read after the cursor lock is acquired, so a puller that
    /// was already waiting when the flag went up gets nothing.
    pub async fn pull_unless(&self, halted: &AtomicBool) -> Option<S::Item> {
        let mut cursor = self.cursor.lock().await;
        if halted.load(Ordering::Acquire) {
            return None;
        }
        self.advance(&mut cursor).await
    }

    async fn advance(&self, cursor: &mut Cursor<S>) -> Option<S::Item> {
        if cursor.exhausted {
            return None;
        }
        let item = Sequence::pull(&mut cursor.sequence).await;
        match item {
            Some(_) => {
                self.pulled.fetch_add(1, Ordering::Relaxed);
            }
            None => cursor.exhausted = true,
        }
        item
    }

    /// Number of items handed out so far
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::Relaxed)
    }

    /// Whether the sequence has reported exhaustion
    pub async fn is_exhausted(&self) -> bool {
        self.cursor.lock().await.exhausted
    }

    /// Recover the underlying sequence
    pub fn into_inner(self) -> S {
        self.cursor.into_inner().sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_iterator_sequence_is_single_pass() {
        let mut sequence = from_iter(vec![1, 2]);
        assert_eq!(sequence.pull().await, Some(1));
        assert_eq!(sequence.pull().await, Some(2));
        assert_eq!(sequence.pull().await, None);
        assert_eq!(sequence.pull().await, None);
    }

    #[tokio::test]
    async fn test_async_stream_sequence() {
        let mut sequence = Box::pin(stream::unfold(0u32, |n| async move {
            tokio::task::yield_now().await;
            (n < 3).then_some((n, n + 1))
        }));

        let mut seen = Vec::new();
        while let Some(item) = sequence.pull().await {
            seen.push(item);
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_shared_sequence_hands_out_each_item_once() {
        let shared = SharedSequence::new(from_iter(0..50));

        let pullers = (0..4).map(|_| async {
            let mut mine = Vec::new();
            while let Some(item) = shared.pull().await {
                mine.push(item);
                tokio::task::yield_now().await;
            }
            mine
        });
        let mut all: Vec<i32> = futures::future::join_all(pullers)
            .await
            .into_iter()
            .flatten()
            .collect();

        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
        assert_eq!(shared.pulled(), 50);
    }

    #[tokio::test]
    async fn test_shared_sequence_never_polls_after_exhaustion() {
        // unfold panics if polled again after yielding None
        let shared = SharedSequence::new(Box::pin(stream::unfold(0u32, |n| async move {
            (n < 2).then_some((n, n + 1))
        })));

        assert_eq!(shared.pull().await, Some(0));
        assert_eq!(shared.pull().await, Some(1));
        assert_eq!(shared.pull().await, None);
        assert!(shared.is_exhausted().await);
        assert_eq!(shared.pull().await, None);
        assert_eq!(shared.pull().await, None);
        assert_eq!(shared.pulled(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_pullers_on_exhausted_stream() {
        let shared = SharedSequence::new(Box::pin(stream::unfold(0u32, |n| async move {
            tokio::task::yield_now().await;
            (n < 5).then_some((n, n + 1))
        })));

        let pullers = (0..4).map(|_| async {
            let mut count = 0;
            while shared.pull().await.is_some() {
                count += 1;
            }
            count
        });
        let total: usize = futures::future::join_all(pullers).await.into_iter().sum();
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn test_pull_unless_checks_flag_inside_lock() {
        let shared = SharedSequence::new(from_iter(0..3));
        let halted = AtomicBool::new(false);

        assert_eq!(shared.pull_unless(&halted).await, Some(0));
        halted.store(true, Ordering::Release);
        assert_eq!(shared.pull_unless(&halted).await, None);
        assert_eq!(shared.pulled(), 1);
        // Unconditional pulls still see the remaining items
        assert_eq!(shared.pull().await, Some(1));
    }
}
