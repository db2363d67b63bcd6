//! Speech synthesizer trait.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::TtsResult;

/// Core synthesis trait: render text to a playable audio artifact.
///
/// Implementors must be `Send + Sync` — the orchestrator calls `synthesize`
/// from per-session tasks while control handlers call `stop_all` and
/// `purge_artifacts` concurrently.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizer identifier (e.g. `"azure-tts"`, `"mock"`).
    fn name(&self) -> &str;

    /// Render `text` with the given voice key and rate multiplier, returning
    /// the path of the written artifact.
    ///
    /// A single attempt is made. Callers tolerate failure per turn (the
    /// `speaking` event carries a null audio reference).
    async fn synthesize(&self, text: &str, voice_key: &str, speed: f64) -> TtsResult<PathBuf>;

    /// Request that any in-flight synthesis stop as soon as possible.
    ///
    /// Best effort: an HTTP request already in flight completes, but further
    /// `synthesize` calls fail with [`TtsError::Stopped`] until
    /// [`reset_stop`](Self::reset_stop) is called.
    ///
    /// [`TtsError::Stopped`]: crate::errors::TtsError::Stopped
    fn stop_all(&self);

    /// Clear the stop flag so new conversations can synthesize again.
    fn reset_stop(&self);

    /// Delete artifacts older than `max_age`. Returns the number removed.
    fn purge_artifacts(&self, max_age: Duration) -> usize;

    /// One-time teardown at process exit: purge all artifacts and release
    /// upstream resources. Idempotent.
    async fn shutdown(&self);
}
