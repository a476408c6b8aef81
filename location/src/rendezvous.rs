use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use futures::channel::oneshot;

/// Single-slot hand-off between a delivering thread and one waiting task.
///
/// Each [`arm`](Self::arm) opens a fresh slot; the first
/// [`release`](Self::release) after that fills it and closes it. Releases with
/// no armed slot, or after the waiter gave up, are dropped.
pub struct Rendezvous<T> {
    slot: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Default for Rendezvous<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> fmt::Debug for Rendezvous<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rendezvous")
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl<T> Rendezvous<T> {
    /// Creates an unarmed rendezvous.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a fresh slot and returns its waiter.
    ///
    /// A waiter from a previous `arm` that has not been released yet is
    /// released empty.
    pub fn arm(&self) -> Waiter<T> {
        let (sender, receiver) = oneshot::channel();
        let mut slot = self.slot.lock().expect("rendezvous mutex poisoned");
        *slot = Some(sender);
        Waiter { receiver }
    }

    /// Delivers `value` to the armed waiter.
    ///
    /// Returns `true` only if a waiting task received it.
    pub fn release(&self, value: T) -> bool {
        let sender = self.slot.lock().expect("rendezvous mutex poisoned").take();
        sender.is_some_and(|sender| sender.send(value).is_ok())
    }

    /// Whether a waiter is currently armed and still listening.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.slot
            .lock()
            .expect("rendezvous mutex poisoned")
            .as_ref()
            .is_some_and(|sender| !sender.is_canceled())
    }
}

/// The receiving side of one [`Rendezvous::arm`].
pub struct Waiter<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> fmt::Debug for Waiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter").finish_non_exhaustive()
    }
}

impl<T> Waiter<T> {
    /// Waits for the released value, at most `timeout`.
    ///
    /// Returns `None` on timeout or when the slot was superseded by a newer
    /// `arm`.
    pub async fn wait(self, timeout: Duration) -> Option<T> {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(oneshot::Canceled)) | Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_release_wins() {
        let rendezvous = Rendezvous::new();
        let waiter = rendezvous.arm();

        assert!(rendezvous.release(1));
        assert!(!rendezvous.release(2));
        assert_eq!(waiter.wait(Duration::from_secs(1)).await, Some(1));
    }

    #[test]
    fn release_without_waiter_is_dropped() {
        let rendezvous = Rendezvous::new();
        assert!(!rendezvous.is_armed());
        assert!(!rendezvous.release("late"));
    }

    #[tokio::test(start_paused = true)]
    async fn release_after_timeout_is_dropped() {
        let rendezvous = Rendezvous::new();
        let waiter = rendezvous.arm();

        assert_eq!(waiter.wait(Duration::from_millis(50)).await, None);
        assert!(!rendezvous.is_armed());
        assert!(!rendezvous.release(7));
    }

    #[tokio::test]
    async fn rearm_releases_previous_waiter_empty() {
        let rendezvous = Rendezvous::new();
        let stale = rendezvous.arm();
        let fresh = rendezvous.arm();

        assert!(rendezvous.release("fix"));
        assert_eq!(stale.wait(Duration::from_secs(1)).await, None);
        assert_eq!(fresh.wait(Duration::from_secs(1)).await, Some("fix"));
    }
}
