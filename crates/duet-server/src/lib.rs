//! # duet-server
//!
//! The Duet conversation engine and its HTTP/WebSocket front end.
//!
//! The heart of the crate is the `conversation` module: the per-session
//! state registry, the audio-playback handshake coordinator, the task
//! supervisor enforcing one live orchestration task per session, the
//! turn-loop orchestrator itself, and the idempotent cleanup coordinator.
//! The `websocket` and `server` modules wrap that engine in an Axum server
//! with one persistent WebSocket per client.

#![deny(unsafe_code)]

pub mod config;
pub mod context;
pub mod conversation;
pub mod health;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use context::ConversationContext;
pub use server::DuetServer;
