//! Idempotent session teardown.
//!
//! Runs on every terminal path — completion, error, cancellation, explicit
//! stop, disconnect — and is safe to invoke multiple times concurrently for
//! the same session (the race between the stop handler and the task's own
//! finalizer is expected). Supervisor bookkeeping is deliberately not
//! touched here: cleanup may run inside the task's own finalizer, and the
//! task unregisters itself afterwards.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use duet_core::constants::CLEANUP_SETTLE_DELAY;
use duet_tts::SpeechSynthesizer;

use super::handshake::HandshakeCoordinator;
use super::registry::SessionRegistry;

/// Tears down everything a conversation owns.
pub struct CleanupCoordinator {
    registry: Arc<SessionRegistry>,
    handshake: Arc<HandshakeCoordinator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl CleanupCoordinator {
    /// Create a cleanup coordinator over the shared session state.
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        handshake: Arc<HandshakeCoordinator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            registry,
            handshake,
            synthesizer,
        }
    }

    /// Tear down all state for `session_id`.
    ///
    /// 1. Mark stopped, then drop the registry entry
    /// 2. Release any blocked handshake wait, then drop its entry
    /// 3. Best-effort stop in-flight synthesis and purge resident artifacts
    /// 4. Hold a short settle delay so a back-to-back `start` does not race
    ///    the state this cleanup just mutated
    #[instrument(skip(self))]
    pub async fn run(&self, session_id: &str) {
        self.registry.mark_stopped(session_id);
        self.registry.remove(session_id);

        self.handshake.force_release(session_id);
        self.handshake.drop_entry(session_id);

        self.synthesizer.stop_all();
        let purged = self.synthesizer.purge_artifacts(Duration::ZERO);
        debug!(session_id, purged, "session state cleaned up");

        tokio::time::sleep(CLEANUP_SETTLE_DELAY).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_tts::{ArtifactStore, MockSynthesizer};

    fn make_cleanup() -> (
        tempfile::TempDir,
        Arc<SessionRegistry>,
        Arc<HandshakeCoordinator>,
        Arc<MockSynthesizer>,
        CleanupCoordinator,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ArtifactStore::new(dir.path().join("voices")).unwrap());
        let registry = Arc::new(SessionRegistry::new());
        let handshake = Arc::new(HandshakeCoordinator::new());
        let synthesizer = Arc::new(MockSynthesizer::new(store));
        let cleanup = CleanupCoordinator::new(
            Arc::clone(&registry),
            Arc::clone(&handshake),
            Arc::clone(&synthesizer) as Arc<dyn SpeechSynthesizer>,
        );
        (dir, registry, handshake, synthesizer, cleanup)
    }

    #[tokio::test]
    async fn removes_registry_and_handshake_entries() {
        let (_tmp, registry, handshake, _synth, cleanup) = make_cleanup();
        registry.create("s1").unwrap();
        handshake.prepare("s1");

        cleanup.run("s1").await;

        assert!(!registry.contains("s1"));
        assert!(registry.is_stopped("s1"));
        assert!(!handshake.is_prepared("s1"));
    }

    #[tokio::test]
    async fn releases_blocked_waiter() {
        let (_tmp, _registry, handshake, _synth, cleanup) = make_cleanup();
        handshake.prepare("s1");

        let waiter = {
            let handshake = Arc::clone(&handshake);
            tokio::spawn(async move {
                handshake
                    .await_confirmation("s1", Duration::from_secs(30))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        cleanup.run("s1").await;
        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, crate::conversation::handshake::WaitOutcome::Released);
    }

    #[tokio::test]
    async fn purges_resident_artifacts_and_stops_synthesis() {
        let (_tmp, _registry, _handshake, synth, cleanup) = make_cleanup();
        let artifact = synth.synthesize("leftover", "Brian", 1.0).await.unwrap();
        assert!(artifact.exists());

        cleanup.run("s1").await;

        assert!(!artifact.exists());
        // The stop flag is set until the next conversation resets it
        assert!(matches!(
            synth.synthesize("more", "Brian", 1.0).await,
            Err(duet_tts::TtsError::Stopped)
        ));
    }

    #[tokio::test]
    async fn idempotent_and_safe_when_concurrent() {
        let (_tmp, registry, handshake, _synth, cleanup) = make_cleanup();
        registry.create("s1").unwrap();
        handshake.prepare("s1");

        let cleanup = Arc::new(cleanup);
        let a = {
            let c = Arc::clone(&cleanup);
            tokio::spawn(async move { c.run("s1").await })
        };
        let b = {
            let c = Arc::clone(&cleanup);
            tokio::spawn(async move { c.run("s1").await })
        };
        a.await.unwrap();
        b.await.unwrap();

        assert!(!registry.contains("s1"));
        // A third, sequential run is still fine
        cleanup.run("s1").await;
    }

    #[tokio::test]
    async fn unknown_session_is_harmless() {
        let (_tmp, registry, _handshake, _synth, cleanup) = make_cleanup();
        cleanup.run("never_existed").await;
        assert!(registry.is_empty());
    }
}
