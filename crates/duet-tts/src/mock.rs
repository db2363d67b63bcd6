//! Mock synthesizer for deterministic testing without the speech service.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::{TtsError, TtsResult};
use crate::store::ArtifactStore;
use crate::synthesizer::SpeechSynthesizer;

/// A synthesis request observed by the mock, for assertions.
#[derive(Clone, Debug)]
pub struct SynthesisCall {
    /// Text passed to `synthesize`.
    pub text: String,
    /// Voice key passed to `synthesize`.
    pub voice_key: String,
    /// Rate multiplier passed to `synthesize`.
    pub speed: f64,
}

/// Mock synthesizer that writes small placeholder artifacts.
///
/// The placeholder size is configurable so tests can drive the byte-size
/// duration heuristic (6000 bytes ≈ one second of estimated playback).
pub struct MockSynthesizer {
    store: Arc<ArtifactStore>,
    artifact_bytes: usize,
    failing: AtomicBool,
    stop_requested: AtomicBool,
    closed: AtomicBool,
    calls: Mutex<Vec<SynthesisCall>>,
}

impl MockSynthesizer {
    /// Create a mock writing 600-byte artifacts (~0.1 s estimated playback).
    #[must_use]
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self {
            store,
            artifact_bytes: 600,
            failing: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Override the placeholder artifact size.
    #[must_use]
    pub fn with_artifact_bytes(mut self, bytes: usize) -> Self {
        self.artifact_bytes = bytes;
        self
    }

    /// Make subsequent `synthesize` calls fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Snapshot of all observed synthesis requests.
    pub fn calls(&self) -> Vec<SynthesisCall> {
        self.calls.lock().clone()
    }

    /// Whether `shutdown` has run.
    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn synthesize(&self, text: &str, voice_key: &str, speed: f64) -> TtsResult<PathBuf> {
        if self.stop_requested.load(Ordering::Relaxed) {
            return Err(TtsError::Stopped);
        }
        self.calls.lock().push(SynthesisCall {
            text: text.to_owned(),
            voice_key: voice_key.to_owned(),
            speed,
        });
        if self.failing.load(Ordering::Relaxed) {
            return Err(TtsError::Api {
                status: 500,
                message: "mock failure".into(),
            });
        }
        if text.trim().is_empty() {
            return Err(TtsError::EmptyText);
        }
        let path = self.store.new_artifact_path(voice_key);
        tokio::fs::write(&path, vec![0u8; self.artifact_bytes]).await?;
        Ok(path)
    }

    fn stop_all(&self) {
        self.stop_requested.store(true, Ordering::Relaxed);
    }

    fn reset_stop(&self) {
        self.stop_requested.store(false, Ordering::Relaxed);
    }

    fn purge_artifacts(&self, max_age: Duration) -> usize {
        self.store.purge_older_than(max_age)
    }

    async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.store.purge_older_than(Duration::ZERO);
    }
}
