//! Synthesis error types.

use thiserror::Error;

/// Errors that can occur during speech synthesis.
#[derive(Debug, Error)]
pub enum TtsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing the artifact to disk failed.
    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Upstream returned a non-success status.
    #[error("synthesis error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },

    /// The text to synthesize was empty after trimming.
    #[error("nothing to synthesize")]
    EmptyText,

    /// Synthesis was refused because a stop was requested.
    #[error("synthesis stopped")]
    Stopped,
}

/// Result type for synthesis operations.
pub type TtsResult<T> = Result<T, TtsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = TtsError::Api {
            status: 403,
            message: "quota".into(),
        };
        assert_eq!(err.to_string(), "synthesis error (403): quota");
    }

    #[test]
    fn io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: TtsError = io_err.into();
        assert!(matches!(err, TtsError::Io(_)));
    }
}
