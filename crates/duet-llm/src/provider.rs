//! Completion provider trait and error taxonomy.
//!
//! Every generation backend implements [`CompletionProvider`]: one
//! blocking-from-the-caller's-view completion per turn, single attempt, no
//! retry. The orchestrator treats any error as a skipped turn, so the
//! taxonomy here exists for logging and tests rather than control flow.

use async_trait::async_trait;

use crate::types::{ChatMessage, CompletionOptions};

/// Result type alias for provider operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors that can occur during a completion call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Upstream returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },

    /// Upstream returned a success status but no completion text.
    #[error("completion returned no text")]
    EmptyCompletion,
}

impl LlmError {
    /// Error category string for logging.
    pub fn category(&self) -> &str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) => "parse",
            Self::Api { .. } => "api",
            Self::EmptyCompletion => "empty",
        }
    }
}

/// Core generation trait.
///
/// Implementors must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider identifier (e.g. `"azure-openai"`, `"mock"`).
    fn name(&self) -> &str;

    /// Generate one completion for the given system prompt and history.
    ///
    /// `history` is the calling entity's mirrored view of the transcript.
    /// A single attempt is made; callers tolerate failure per turn.
    async fn complete(
        &self,
        system: &str,
        history: &[ChatMessage],
        options: &CompletionOptions,
    ) -> LlmResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_categories() {
        let err = LlmError::Api {
            status: 429,
            message: "rate limited".into(),
        };
        assert_eq!(err.category(), "api");
        assert_eq!(LlmError::EmptyCompletion.category(), "empty");
        let json_err = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        assert_eq!(LlmError::Json(json_err).category(), "parse");
    }

    #[test]
    fn api_error_display() {
        let err = LlmError::Api {
            status: 401,
            message: "bad key".into(),
        };
        assert_eq!(err.to_string(), "API error (401): bad key");
    }

    #[test]
    fn provider_is_object_safe() {
        fn assert_object_safe(_: &dyn CompletionProvider) {}
        let _ = assert_object_safe;
    }

    #[test]
    fn provider_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn CompletionProvider>();
    }
}
