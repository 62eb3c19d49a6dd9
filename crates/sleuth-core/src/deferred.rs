//! Settle-once futures with an external resolve/reject handle
//!
//! [`deferred`] returns a [`Deferred`] future and the [`Settler`] that
//! completes it. The first `resolve` or `reject` wins; later calls are ignored.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Outcome delivered through the one-shot slot
type Outcome<T, E> = Result<T, E>;

/// Why a [`Deferred`] did not produce a value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeferredError<E> {
    /// The settler rejected the future
    #[error("deferred rejected: {0}")]
    Rejected(E),

    /// Every settler was dropped before settling
    #[error("deferred abandoned before it was settled")]
    Abandoned,
}

/// Create a pending future together with the handle that settles it
///
/// # Example
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (pending, settler) = sleuth_core::deferred::<u32, String>();
/// assert!(settler.resolve(7));
/// assert!(!settler.reject("too late".into()));
/// assert_eq!(pending.await, Ok(7));
/// # }
/// ```
pub fn deferred<T, E>() -> (Deferred<T, E>, Settler<T, E>) {
    let (tx, rx) = oneshot::channel();
    let settler = Settler {
        slot: Arc::new(Mutex::new(Some(tx))),
    };
    (Deferred { rx }, settler)
}

/// Future side of a deferred pair
#[must_use = "a deferred does nothing unless awaited"]
#[derive(Debug)]
pub struct Deferred<T, E> {
    rx: oneshot::Receiver<Outcome<T, E>>,
}

impl<T, E> Future for Deferred<T, E> {
    type Output = Result<T, DeferredError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(DeferredError::Rejected(error)),
            Err(_) => Err(DeferredError::Abandoned),
        })
    }
}

/// Resolve/reject handle of a deferred pair
///
/// Clones share the same slot, so at most one settlement ever lands.
pub struct Settler<T, E> {
    slot: Arc<Mutex<Option<oneshot::Sender<Outcome<T, E>>>>>,
}

impl<T, E> Clone for Settler<T, E> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T, E> std::fmt::Debug for Settler<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settler")
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl<T, E> Settler<T, E> {
    /// Settle the future with a value
    ///
    /// Returns `true` only if this call settled it and the value reached a
    /// live [`Deferred`]. Settling after the `Deferred` was dropped spends the
    /// slot and returns `false`.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value)).is_ok()
    }

    /// Settle the future with a failure
    ///
    /// Returns `true` under the same conditions as [`Settler::resolve`].
    pub fn reject(&self, error: E) -> bool {
        self.settle(Err(error)).is_ok()
    }

    /// Whether a settlement has already been attempted
    pub fn is_settled(&self) -> bool {
        self.slot.lock().is_none()
    }

    /// Settle and hand the outcome back if nobody received it
    ///
    /// The outcome comes back when the slot was already used or the
    /// [`Deferred`] was dropped. Either way the slot is spent afterwards.
    pub(crate) fn settle(&self, outcome: Outcome<T, E>) -> Result<(), Outcome<T, E>> {
        let sender = self.slot.lock().take();
        match sender {
            Some(tx) => tx.send(outcome),
            None => Err(outcome),
        }
    }
}
