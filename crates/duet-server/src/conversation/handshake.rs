//! Audio-playback handshake coordinator.
//!
//! Per-session rendezvous between the orchestrator (which blocks after
//! emitting a `speaking` event) and the client's `audio_finished`
//! acknowledgment. A wait ends one of three ways: the client confirmed,
//! the timeout elapsed (a normal outcome — the client may simply not ack),
//! or cleanup force-released the waiter during teardown.
//!
//! Signals are level-triggered: a signal arriving while no wait is blocked
//! is remembered and consumed by the next wait, so a very fast client ack
//! is not lost to ordering. Multiple signals before a wait collapse to one.
//! Signals for ids with no prepared entry are ignored entirely — an
//! `audio_finished` for a session that is not running changes no state.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

/// How a handshake wait ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The client confirmed playback finished.
    Confirmed,
    /// The timeout elapsed with no confirmation; processing proceeds anyway.
    TimedOut,
    /// Cleanup force-released the wait; the caller must emit nothing further.
    Released,
}

#[derive(Default)]
struct WaitState {
    signaled: bool,
    released: bool,
}

#[derive(Default)]
struct WaitEntry {
    state: Mutex<WaitState>,
    notify: Notify,
}

/// Coordinates playback-completion waits, one entry per session.
#[derive(Default)]
pub struct HandshakeCoordinator {
    waits: DashMap<String, Arc<WaitEntry>>,
}

impl HandshakeCoordinator {
    /// Create an empty coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the entry for a session about to run.
    ///
    /// Signals are only honored for prepared ids; everything else is noise
    /// from clients acking conversations that no longer exist.
    pub fn prepare(&self, id: &str) {
        let _ = self
            .waits
            .entry(id.to_owned())
            .or_insert_with(|| Arc::new(WaitEntry::default()));
    }

    /// Whether an entry exists for this id.
    #[must_use]
    pub fn is_prepared(&self, id: &str) -> bool {
        self.waits.contains_key(id)
    }

    /// Record a playback confirmation. Idempotent; ignored for unknown ids.
    pub fn signal(&self, id: &str) {
        if let Some(entry) = self.waits.get(id) {
            entry.state.lock().signaled = true;
            entry.notify.notify_waiters();
        } else {
            debug!(session_id = id, "playback ack for unknown session ignored");
        }
    }

    /// Force any current or future wait for `id` to end with
    /// [`WaitOutcome::Released`]. Called during teardown so no waiter can
    /// block past cleanup.
    pub fn force_release(&self, id: &str) {
        if let Some(entry) = self.waits.get(id) {
            entry.state.lock().released = true;
            entry.notify.notify_waiters();
        }
    }

    /// Drop the session's entry. Idempotent.
    pub fn drop_entry(&self, id: &str) {
        let _ = self.waits.remove(id);
    }

    /// Block until the session is signaled, released, or `timeout` elapses.
    ///
    /// A signal pending from before the call is consumed immediately (and
    /// the state is unset again for the next wait). The orchestrator issues
    /// at most one outstanding wait per session.
    pub async fn await_confirmation(&self, id: &str, timeout: Duration) -> WaitOutcome {
        let entry = {
            let Some(entry) = self.waits.get(id) else {
                // No entry means cleanup already dropped it
                return WaitOutcome::Released;
            };
            Arc::clone(&entry)
        };

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register interest before checking state so a signal landing
            // between the check and the await still wakes us.
            let notified = entry.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = entry.state.lock();
                if state.released {
                    return WaitOutcome::Released;
                }
                if state.signaled {
                    state.signaled = false;
                    return WaitOutcome::Confirmed;
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return WaitOutcome::TimedOut;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(50);
    const LONG: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn timeout_is_a_normal_outcome() {
        let hs = HandshakeCoordinator::new();
        hs.prepare("s1");
        let outcome = hs.await_confirmation("s1", SHORT).await;
        assert_eq!(outcome, WaitOutcome::TimedOut);
    }

    #[tokio::test]
    async fn signal_before_wait_confirms_immediately() {
        let hs = HandshakeCoordinator::new();
        hs.prepare("s1");
        hs.signal("s1");
        let start = std::time::Instant::now();
        let outcome = hs.await_confirmation("s1", LONG).await;
        assert_eq!(outcome, WaitOutcome::Confirmed);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn pending_signal_is_consumed_by_one_wait() {
        let hs = HandshakeCoordinator::new();
        hs.prepare("s1");
        hs.signal("s1");
        hs.signal("s1"); // collapses with the first
        assert_eq!(hs.await_confirmation("s1", LONG).await, WaitOutcome::Confirmed);
        // The next wait must block again
        assert_eq!(hs.await_confirmation("s1", SHORT).await, WaitOutcome::TimedOut);
    }

    #[tokio::test]
    async fn signal_during_wait_wakes_waiter() {
        let hs = Arc::new(HandshakeCoordinator::new());
        hs.prepare("s1");

        let waiter = {
            let hs = Arc::clone(&hs);
            tokio::spawn(async move { hs.await_confirmation("s1", LONG).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        hs.signal("s1");

        assert_eq!(waiter.await.unwrap(), WaitOutcome::Confirmed);
    }

    #[tokio::test]
    async fn force_release_unblocks_waiter() {
        let hs = Arc::new(HandshakeCoordinator::new());
        hs.prepare("s1");

        let waiter = {
            let hs = Arc::clone(&hs);
            tokio::spawn(async move { hs.await_confirmation("s1", LONG).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        hs.force_release("s1");

        assert_eq!(waiter.await.unwrap(), WaitOutcome::Released);
    }

    #[tokio::test]
    async fn released_entry_never_blocks_again() {
        let hs = HandshakeCoordinator::new();
        hs.prepare("s1");
        hs.force_release("s1");
        assert_eq!(hs.await_confirmation("s1", LONG).await, WaitOutcome::Released);
        // Even after a signal, released wins
        hs.signal("s1");
        assert_eq!(hs.await_confirmation("s1", LONG).await, WaitOutcome::Released);
    }

    #[tokio::test]
    async fn wait_without_entry_reports_released() {
        let hs = HandshakeCoordinator::new();
        assert_eq!(
            hs.await_confirmation("never_prepared", LONG).await,
            WaitOutcome::Released
        );
    }

    #[tokio::test]
    async fn signal_for_unknown_id_changes_nothing() {
        let hs = HandshakeCoordinator::new();
        hs.signal("ghost");
        assert!(!hs.is_prepared("ghost"));
    }

    #[tokio::test]
    async fn drop_entry_is_idempotent() {
        let hs = HandshakeCoordinator::new();
        hs.prepare("s1");
        hs.drop_entry("s1");
        hs.drop_entry("s1");
        assert!(!hs.is_prepared("s1"));
    }

    #[tokio::test]
    async fn fresh_entry_after_drop_starts_unset() {
        let hs = HandshakeCoordinator::new();
        hs.prepare("s1");
        hs.signal("s1");
        hs.drop_entry("s1");
        hs.prepare("s1");
        // The remembered signal died with the old entry
        assert_eq!(hs.await_confirmation("s1", SHORT).await, WaitOutcome::TimedOut);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let hs = HandshakeCoordinator::new();
        hs.prepare("s1");
        hs.prepare("s2");
        hs.signal("s2");
        assert_eq!(hs.await_confirmation("s2", LONG).await, WaitOutcome::Confirmed);
        assert_eq!(hs.await_confirmation("s1", SHORT).await, WaitOutcome::TimedOut);
    }
}
