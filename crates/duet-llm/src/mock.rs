//! Scripted completion provider for deterministic testing without API calls.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::provider::{CompletionProvider, LlmError, LlmResult};
use crate::types::{ChatMessage, CompletionOptions};

/// Pre-programmed outcome for one `complete` call.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return this text.
    Text(String),
    /// Fail with an API error carrying this message.
    Failure(String),
    /// Fail with `EmptyCompletion`.
    Empty,
}

impl MockResponse {
    /// Convenience: a text response.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

/// A call observed by the mock, for assertions.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    /// The system prompt as the orchestrator sent it.
    pub system: String,
    /// Number of history messages in the call.
    pub history_len: usize,
    /// Sampling temperature used.
    pub temperature: f64,
}

/// Mock provider that returns pre-programmed responses in sequence.
///
/// When the script is exhausted the last response repeats, so a mock built
/// with a single `Text` behaves like an endless happy-path backend.
pub struct MockProvider {
    responses: Vec<MockResponse>,
    call_count: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockProvider {
    /// Create a mock with a scripted response sequence.
    #[must_use]
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses,
            call_count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always answers with the same text.
    #[must_use]
    pub fn repeating(text: &str) -> Self {
        Self::new(vec![MockResponse::text(text)])
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Snapshot of all observed calls.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        system: &str,
        history: &[ChatMessage],
        options: &CompletionOptions,
    ) -> LlmResult<String> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.calls.lock().push(RecordedCall {
            system: system.to_owned(),
            history_len: history.len(),
            temperature: options.temperature,
        });

        let response = if self.responses.is_empty() {
            &MockResponse::Empty
        } else {
            &self.responses[idx.min(self.responses.len() - 1)]
        };

        match response {
            MockResponse::Text(text) => Ok(text.clone()),
            MockResponse::Failure(message) => Err(LlmError::Api {
                status: 500,
                message: message.clone(),
            }),
            MockResponse::Empty => Err(LlmError::EmptyCompletion),
        }
    }
}
