//! # duet-tts
//!
//! Synthesis collaborator for the Duet dialogue engine.
//!
//! Exposes the [`SpeechSynthesizer`] trait (text → audio artifact on local
//! storage), the Azure Cognitive Services implementation, the artifact store
//! that owns the audio directory, playback-duration estimation, and a mock
//! for tests.

#![deny(unsafe_code)]

pub mod azure;
pub mod duration;
pub mod errors;
pub mod mock;
pub mod store;
pub mod synthesizer;
pub mod voices;

pub use azure::AzureSynthesizer;
pub use errors::{TtsError, TtsResult};
pub use mock::MockSynthesizer;
pub use store::ArtifactStore;
pub use synthesizer::SpeechSynthesizer;
