//! # duet-llm
//!
//! Generation collaborator for the Duet dialogue engine.
//!
//! Exposes the [`CompletionProvider`] trait (one synchronous-per-turn,
//! single-attempt completion call), the Azure OpenAI implementation, and a
//! scripted mock for tests.

#![deny(unsafe_code)]

pub mod azure;
pub mod mock;
pub mod provider;
pub mod types;

pub use azure::AzureOpenAiProvider;
pub use mock::{MockProvider, MockResponse};
pub use provider::{CompletionProvider, LlmError, LlmResult};
pub use types::{ChatMessage, CompletionOptions, Role};
