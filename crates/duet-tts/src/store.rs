//! Audio artifact store.
//!
//! Owns the directory synthesized audio is written into, names new
//! artifacts, and handles their removal: best-effort immediate deletes,
//! deferred deletes on a detached background task, and age-based purges.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

/// Prefix of every artifact filename this store manages.
const ARTIFACT_PREFIX: &str = "azure_";

/// Manages the audio artifact directory.
#[derive(Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store, ensuring the directory exists.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The managed directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a new mp3 artifact, unique via a millisecond timestamp.
    #[must_use]
    pub fn new_artifact_path(&self, voice_key: &str) -> PathBuf {
        let timestamp = chrono::Utc::now().timestamp_millis();
        self.dir
            .join(format!("{ARTIFACT_PREFIX}{voice_key}_{timestamp}.mp3"))
    }

    /// Best-effort removal of one artifact. Returns whether a file was removed.
    pub fn remove(&self, path: &Path) -> bool {
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed audio artifact");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not delete audio artifact");
                false
            }
        }
    }

    /// Schedule removal of an artifact after `delay` on a detached task.
    ///
    /// The task is deliberately not awaited; a failed deletion is logged and
    /// never affects the caller.
    pub fn schedule_removal(path: PathBuf, delay: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "deferred artifact deletion failed");
                }
            } else {
                debug!(path = %path.display(), "deferred artifact deletion completed");
            }
        })
    }

    /// Delete managed artifacts older than `max_age`. Returns the count removed.
    ///
    /// Only files carrying the store's naming prefix and an audio extension
    /// are touched.
    pub fn purge_older_than(&self, max_age: Duration) -> usize {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return 0;
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !is_managed_artifact(&path) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if modified <= cutoff && self.remove(&path) {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "purged audio artifacts");
        }
        removed
    }
}

/// Whether a path looks like an artifact this store created.
fn is_managed_artifact(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(ARTIFACT_PREFIX));
    let ext_matches = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp3") || e.eq_ignore_ascii_case("wav"));
    name_matches && ext_matches
}
