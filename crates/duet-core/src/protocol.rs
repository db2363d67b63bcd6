//! Client/server wire protocol.
//!
//! One persistent WebSocket per client carries JSON messages discriminated by
//! a `type` field. The client drives the conversation (`start`, `stop`) and
//! acknowledges playback (`audio_finished`); the server streams turn events
//! back (`speaking`, `finished_speaking`, `stopped`, `error`).

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_RESPONSE_LENGTH_WORDS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};

/// One of the two conversing personas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Entity {
    /// Entity 1 — speaks the seed turn.
    A,
    /// Entity 2 — replies.
    B,
}

impl Entity {
    /// Wire index (`1` or `2`).
    #[must_use]
    pub fn index(self) -> u8 {
        match self {
            Self::A => 1,
            Self::B => 2,
        }
    }

    /// The opposite entity.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Parameters of a `start` control message.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// System prompt for entity 1 (required, capped at 375 characters).
    pub system1: String,
    /// System prompt for entity 2 (required, capped at 375 characters).
    pub system2: String,
    /// Voice key for entity 1.
    #[serde(default = "default_voice1")]
    pub voice1: String,
    /// Voice key for entity 2.
    #[serde(default = "default_voice2")]
    pub voice2: String,
    /// Speech-rate multiplier for entity 1 (1.0 = normal).
    #[serde(default = "default_speed")]
    pub speed1: f64,
    /// Speech-rate multiplier for entity 2.
    #[serde(default = "default_speed")]
    pub speed2: f64,
    /// Sampling temperature for entity 1.
    #[serde(default = "default_temperature")]
    pub temperature1: f64,
    /// Sampling temperature for entity 2.
    #[serde(default = "default_temperature")]
    pub temperature2: f64,
    /// Nucleus-sampling top-p for entity 1.
    #[serde(default = "default_top_p")]
    pub top_p1: f64,
    /// Nucleus-sampling top-p for entity 2.
    #[serde(default = "default_top_p")]
    pub top_p2: f64,
    /// Response-length ceiling in words for entity 1.
    #[serde(default = "default_response_length")]
    pub response_length1: u32,
    /// Response-length ceiling in words for entity 2.
    #[serde(default = "default_response_length")]
    pub response_length2: u32,
}

fn default_voice1() -> String {
    "Brian".to_owned()
}

fn default_voice2() -> String {
    "Ava".to_owned()
}

fn default_speed() -> f64 {
    1.0
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_top_p() -> f64 {
    DEFAULT_TOP_P
}

fn default_response_length() -> u32 {
    DEFAULT_RESPONSE_LENGTH_WORDS
}

/// Control messages received from the client.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Begin a new conversation (replacing any running one).
    Start(StartRequest),
    /// Cancel and tear down the current conversation.
    Stop,
    /// The most recent `speaking` artifact finished playing.
    AudioFinished,
}

/// Events sent to the client.
///
/// `Deserialize` is derived so test clients can read events back off the
/// wire without a parallel type.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Terminal failure: validation, configuration, or an unhandled error.
    Error {
        /// Human-readable description.
        message: String,
    },
    /// A turn's audio is ready; the client should play it.
    #[serde(rename_all = "camelCase")]
    Speaking {
        /// Which entity is speaking (`1` or `2`).
        entity: u8,
        /// URL of the playable artifact, or `null` when synthesis failed.
        audio_url: Option<String>,
        /// The spoken text.
        text: String,
    },
    /// The current turn's playback window is over.
    FinishedSpeaking,
    /// Acknowledges that a `stop` request completed.
    Stopped,
}

impl ServerMessage {
    /// Convenience constructor for error events.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
