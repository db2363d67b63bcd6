//! Shared dependencies injected into the connection handler.
//!
//! An explicit object with a defined lifetime rather than ambient globals,
//! so tests can build as many isolated instances as they need.

use std::sync::Arc;

use duet_llm::CompletionProvider;
use duet_tts::{ArtifactStore, SpeechSynthesizer};

use crate::conversation::cleanup::CleanupCoordinator;
use crate::conversation::handshake::HandshakeCoordinator;
use crate::conversation::registry::SessionRegistry;
use crate::conversation::supervisor::TaskSupervisor;

/// Everything a connection needs to run conversations.
pub struct ConversationContext {
    /// Active session state, keyed by session id.
    pub registry: Arc<SessionRegistry>,
    /// Playback-ack rendezvous, keyed by session id.
    pub handshake: Arc<HandshakeCoordinator>,
    /// One live orchestration task per session.
    pub supervisor: Arc<TaskSupervisor>,
    /// Idempotent teardown.
    pub cleanup: Arc<CleanupCoordinator>,
    /// Generation collaborator; `None` when upstream credentials are absent.
    pub provider: Option<Arc<dyn CompletionProvider>>,
    /// Synthesis collaborator.
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Audio artifact directory manager.
    pub store: Arc<ArtifactStore>,
}

impl ConversationContext {
    /// Build a context with fresh engine state around the collaborators.
    #[must_use]
    pub fn new(
        provider: Option<Arc<dyn CompletionProvider>>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        store: Arc<ArtifactStore>,
    ) -> Arc<Self> {
        let registry = Arc::new(SessionRegistry::new());
        let handshake = Arc::new(HandshakeCoordinator::new());
        let supervisor = Arc::new(TaskSupervisor::new());
        let cleanup = Arc::new(CleanupCoordinator::new(
            Arc::clone(&registry),
            Arc::clone(&handshake),
            Arc::clone(&synthesizer),
        ));
        Arc::new(Self {
            registry,
            handshake,
            supervisor,
            cleanup,
            provider,
            synthesizer,
            store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_tts::MockSynthesizer;

    #[test]
    fn contexts_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ArtifactStore::new(dir.path().join("voices")).unwrap());
        let synth = Arc::new(MockSynthesizer::new(Arc::clone(&store)));

        let ctx1 = ConversationContext::new(None, Arc::clone(&synth) as _, Arc::clone(&store));
        let ctx2 = ConversationContext::new(None, synth as _, store);

        ctx1.registry.create("s1").unwrap();
        assert!(ctx1.registry.contains("s1"));
        assert!(!ctx2.registry.contains("s1"));
    }
}
