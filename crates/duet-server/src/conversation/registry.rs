//! Session registry — process-wide table of active conversation state.
//!
//! Single source of truth for "is this session still live". Each entry
//! carries the stop flag (read before and after every blocking step of the
//! turn loop) and the two mirrored turn histories. Absence of an entry is
//! treated as "must not proceed", never as "ok to continue", so every
//! cleanup path can simply delete the entry.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use duet_core::Entity;
use duet_llm::ChatMessage;
use tracing::debug;

/// Errors from registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A session with this id already exists; callers must clean up first.
    #[error("session already exists: {0}")]
    AlreadyExists(String),
}

/// Per-session mutable state.
struct SessionEntry {
    stop_requested: AtomicBool,
    histories: Mutex<Histories>,
}

/// The two mirrored transcript views.
#[derive(Default)]
struct Histories {
    entity_a: Vec<ChatMessage>,
    entity_b: Vec<ChatMessage>,
}

/// Process-wide table of active sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh session entry.
    ///
    /// Fails with [`RegistryError::AlreadyExists`] if an entry is present —
    /// starting over requires cleanup first.
    pub fn create(&self, id: &str) -> Result<(), RegistryError> {
        match self.sessions.entry(id.to_owned()) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyExists(id.to_owned())),
            Entry::Vacant(vacant) => {
                let _ = vacant.insert(SessionEntry {
                    stop_requested: AtomicBool::new(false),
                    histories: Mutex::new(Histories::default()),
                });
                debug!(session_id = id, "session registered");
                Ok(())
            }
        }
    }

    /// Set the stop flag if the session exists. No-op otherwise.
    pub fn mark_stopped(&self, id: &str) {
        if let Some(entry) = self.sessions.get(id) {
            entry.stop_requested.store(true, Ordering::Relaxed);
        }
    }

    /// Delete the entry. Idempotent — multiple cleanup triggers may race.
    pub fn remove(&self, id: &str) {
        if self.sessions.remove(id).is_some() {
            debug!(session_id = id, "session removed");
        }
    }

    /// Whether the session must not proceed.
    ///
    /// Returns `true` when the entry is absent OR its stop flag is set.
    #[must_use]
    pub fn is_stopped(&self, id: &str) -> bool {
        self.sessions
            .get(id)
            .is_none_or(|entry| entry.stop_requested.load(Ordering::Relaxed))
    }

    /// Whether an entry exists for this id.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Record a spoken turn in both mirrored histories.
    ///
    /// The speaker's own history gains an `assistant` turn and the other
    /// entity's history gains the same text as a `user` turn, so each
    /// entity's next generation call sees a coherent transcript from its
    /// own point of view. No-op if the session is gone.
    pub fn push_turn(&self, id: &str, speaker: Entity, text: &str) {
        let Some(entry) = self.sessions.get(id) else {
            return;
        };
        let mut histories = entry.histories.lock();
        let histories = &mut *histories;
        let (own, other) = match speaker {
            Entity::A => (&mut histories.entity_a, &mut histories.entity_b),
            Entity::B => (&mut histories.entity_b, &mut histories.entity_a),
        };
        own.push(ChatMessage::assistant(text));
        other.push(ChatMessage::user(text));
    }

    /// Snapshot of one entity's mirrored history. Empty if the session is gone.
    #[must_use]
    pub fn history_for(&self, id: &str, entity: Entity) -> Vec<ChatMessage> {
        self.sessions.get(id).map_or_else(Vec::new, |entry| {
            let histories = entry.histories.lock();
            match entity {
                Entity::A => histories.entity_a.clone(),
                Entity::B => histories.entity_b.clone(),
            }
        })
    }
}
