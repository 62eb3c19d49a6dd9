//! Unbounded ordered queue with a terminal marker
//!
//! Many producers `put`, one consumer `get`s. Values come out in the order
//! the `put` calls happened. `end` places the terminal marker, optionally
//! carrying an error that the consumer observes once the buffered values
//! are drained.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, Stream};
use parking_lot::Mutex;
use tracing::debug;

use crate::deferred::{deferred, DeferredError, Settler};

/// Terminal marker state
#[derive(Debug)]
enum Terminal<E> {
    /// Still accepting values
    Open,
    /// Ended cleanly
    Ended,
    /// Ended with an error
    Failed(E),
}

/// Shared queue state
///
/// `waiters` is only non-empty while `values` is empty and the queue is open.
struct QueueState<T, E> {
    values: VecDeque<T>,
    waiters: VecDeque<Settler<Option<T>, E>>,
    terminal: Terminal<E>,
}

/// Unbounded multi-producer/single-consumer queue
///
/// Handles are cheap to clone; every clone talks to the same queue.
///
/// # Example
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use sleuth_core::AsyncQueue;
///
/// let queue = AsyncQueue::<u32, String>::new();
/// queue.put(1);
/// queue.put(2);
/// queue.end(None);
///
/// assert_eq!(queue.get().await, Ok(Some(1)));
/// assert_eq!(queue.get().await, Ok(Some(2)));
/// assert_eq!(queue.get().await, Ok(None));
/// # }
/// ```
pub struct AsyncQueue<T, E> {
    inner: Arc<Mutex<QueueState<T, E>>>,
}

impl<T, E> Clone for AsyncQueue<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> Default for AsyncQueue<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for AsyncQueue<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("AsyncQueue")
            .field("buffered", &state.values.len())
            .field("waiting", &state.waiters.len())
            .field("ended", &!matches!(state.terminal, Terminal::Open))
            .finish()
    }
}

impl<T, E> AsyncQueue<T, E> {
    /// Create an empty, open queue
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueState {
                values: VecDeque::new(),
                waiters: VecDeque::new(),
                terminal: Terminal::Open,
            })),
        }
    }

    /// Append a value
    ///
    /// Never blocks. The oldest parked consumer receives the value directly;
    /// otherwise it is buffered. Values put after `end` are discarded.
    pub fn put(&self, value: T) {
        let mut state = self.inner.lock();
        if !matches!(state.terminal, Terminal::Open) {
            debug!("Discarding value put after end");
            return;
        }

        let mut pending = Some(value);
        while let Some(value) = pending.take() {
            let Some(waiter) = state.waiters.pop_front() else {
                state.values.push_back(value);
                break;
            };
            // The consumer stopped waiting: offer the value to the next one
            if let Err(Ok(Some(value))) = waiter.settle(Ok(Some(value))) {
                pending = Some(value);
            }
        }
    }

    /// Number of buffered, unread values
    pub fn len(&self) -> usize {
        self.inner.lock().values.len()
    }

    /// Whether no values are buffered
    pub fn is_empty(&self) -> bool {
        self.inner.lock().values.is_empty()
    }

    /// Whether the terminal marker has been placed
    pub fn is_ended(&self) -> bool {
        !matches!(self.inner.lock().terminal, Terminal::Open)
    }
}

impl<T, E: Clone> AsyncQueue<T, E> {
    /// Place the terminal marker
    ///
    /// Parked consumers wake up and observe the end (or `error`). Values
    /// already buffered stay readable. Only the first call has any effect.
    pub fn end(&self, error: Option<E>) {
        let mut state = self.inner.lock();
        if !matches!(state.terminal, Terminal::Open) {
            debug!("Queue already ended");
            return;
        }

        for waiter in state.waiters.drain(..) {
            match &error {
                Some(error) => waiter.reject(error.clone()),
                None => waiter.resolve(None),
            };
        }

        state.terminal = match error {
            Some(error) => Terminal::Failed(error),
            None => Terminal::Ended,
        };
    }

    /// Next value in `put` order
    ///
    /// Resolves to `Ok(None)` once the queue ended cleanly and is drained,
    /// or to the stored error once it ended with one. Both are sticky.
    ///
    /// Dropping a parked `get` before it completes may lose the value that
    /// was already handed to it.
    pub async fn get(&self) -> Result<Option<T>, E> {
        let pending = {
            let mut state = self.inner.lock();
            if let Some(value) = state.values.pop_front() {
                return Ok(Some(value));
            }
            match &state.terminal {
                Terminal::Ended => return Ok(None),
                Terminal::Failed(error) => return Err(error.clone()),
                Terminal::Open => {}
            }
            let (pending, settler) = deferred();
            state.waiters.push_back(settler);
            pending
        };

        match pending.await {
            Ok(value) => Ok(value),
            Err(DeferredError::Rejected(error)) => Err(error),
            // Settlers only leave the state through put/end, which settle them
            Err(DeferredError::Abandoned) => Ok(None),
        }
    }

    /// Consume the queue as a single-pass stream
    ///
    /// Yields every value, then stops at a clean end, or yields the terminal
    /// error once and stops.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, E>> {
        stream::unfold(Some(self), |queue| async move {
            let queue = queue?;
            match queue.get().await {
                Ok(Some(value)) => Some((Ok(value), Some(queue))),
                Ok(None) => None,
                Err(error) => Some((Err(error), None)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_values_come_out_in_put_order() {
        let queue = AsyncQueue::<u32, String>::new();
        for value in 1..=5 {
            queue.put(value);
        }
        queue.end(None);

        let collected: Vec<_> = queue.into_stream().collect().await;
        assert_eq!(collected, vec![Ok(1), Ok(2), Ok(3), Ok(4), Ok(5)]);
    }

    #[tokio::test]
    async fn test_end_with_error_after_values() {
        let queue = AsyncQueue::<u32, String>::new();
        queue.put(1);
        queue.put(2);
        queue.end(Some("fatal".to_string()));

        let collected: Vec<_> = queue.into_stream().collect().await;
        assert_eq!(collected, vec![Ok(1), Ok(2), Err("fatal".to_string())]);
    }

    #[tokio::test]
    async fn test_terminal_state_is_sticky() {
        let queue = AsyncQueue::<u32, String>::new();
        queue.end(Some("fatal".to_string()));

        assert_eq!(queue.get().await, Err("fatal".to_string()));
        assert_eq!(queue.get().await, Err("fatal".to_string()));

        let clean = AsyncQueue::<u32, String>::new();
        clean.end(None);
        assert_eq!(clean.get().await, Ok(None));
        assert_eq!(clean.get().await, Ok(None));
    }

    #[tokio::test]
    async fn test_second_end_is_ignored() {
        let queue = AsyncQueue::<u32, String>::new();
        queue.end(None);
        queue.end(Some("late".to_string()));

        assert!(queue.is_ended());
        assert_eq!(queue.get().await, Ok(None));
    }

    #[tokio::test]
    async fn test_put_after_end_is_discarded() {
        let queue = AsyncQueue::<u32, String>::new();
        queue.put(1);
        queue.end(None);
        queue.put(2);

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get().await, Ok(Some(1)));
        assert_eq!(queue.get().await, Ok(None));
    }

    #[tokio::test]
    async fn test_parked_consumer_wakes_on_put() {
        let queue = AsyncQueue::<&str, String>::new();
        let producer = queue.clone();

        let consumer = tokio::spawn(async move { queue.get().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        producer.put("hello");

        assert_eq!(consumer.await.unwrap(), Ok(Some("hello")));
        assert!(producer.is_empty());
    }

    #[tokio::test]
    async fn test_parked_consumer_wakes_on_end() {
        let queue = AsyncQueue::<u32, String>::new();
        let producer = queue.clone();

        let consumer = tokio::spawn(async move { queue.get().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        producer.end(Some("stopped".to_string()));

        assert_eq!(consumer.await.unwrap(), Err("stopped".to_string()));
    }

    #[tokio::test]
    async fn test_abandoned_get_does_not_swallow_value() {
        let queue = AsyncQueue::<u32, String>::new();

        let parked = tokio::time::timeout(Duration::from_millis(10), queue.get()).await;
        assert!(parked.is_err());

        queue.put(5);
        assert_eq!(queue.get().await, Ok(Some(5)));
    }

    #[tokio::test]
    async fn test_concurrent_consumers_are_served_in_arrival_order() {
        let queue = AsyncQueue::<u32, String>::new();

        let (first, second, ()) = futures::join!(queue.get(), queue.get(), async {
            tokio::task::yield_now().await;
            queue.put(1);
            queue.put(2);
        });

        assert_eq!(first, Ok(Some(1)));
        assert_eq!(second, Ok(Some(2)));
    }

    #[tokio::test]
    async fn test_many_producers_single_consumer() {
        let queue = AsyncQueue::<usize, String>::new();

        let producers: Vec<_> = (0..4)
            .map(|producer| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    for i in 0..25 {
                        queue.put(producer * 100 + i);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        let closer = queue.clone();
        tokio::spawn(async move {
            for handle in producers {
                handle.await.unwrap();
            }
            closer.end(None);
        });

        let mut collected: Vec<usize> = queue
            .into_stream()
            .map(|result| result.unwrap())
            .collect()
            .await;
        assert_eq!(collected.len(), 100);

        // Each producer's own values stay in its put order
        for producer in 0..4 {
            let own: Vec<_> = collected
                .iter()
                .copied()
                .filter(|v| v / 100 == producer)
                .collect();
            assert_eq!(own, (0..25).map(|i| producer * 100 + i).collect::<Vec<_>>());
        }

        collected.sort_unstable();
        collected.dedup();
        assert_eq!(collected.len(), 100);
    }
}
