//! Chat message and completion option types.

use serde::{Deserialize, Serialize};

use duet_core::constants::{DEFAULT_TEMPERATURE, DEFAULT_TOP_P, MAX_COMPLETION_TOKENS};

/// Role of a chat message within one entity's view of the transcript.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A turn spoken by the other entity (from this entity's point of view).
    User,
    /// A turn this entity spoke itself.
    Assistant,
}

/// One turn of a two-party transcript.
///
/// Each entity's history mirrors the other's: A's `assistant` turn appears
/// in B's history as `user`, so every generation call sees a coherent
/// conversation from its own point of view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who spoke, relative to the history's owner.
    pub role: Role,
    /// Utterance text.
    pub content: String,
}

impl ChatMessage {
    /// A turn spoken by the other entity.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// A turn spoken by the history's owner.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling options for one completion call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompletionOptions {
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus-sampling top-p.
    pub top_p: f64,
    /// Token cap for the completion.
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            max_tokens: MAX_COMPLETION_TOKENS,
        }
    }
}
