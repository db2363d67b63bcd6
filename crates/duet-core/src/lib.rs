//! # duet-core
//!
//! Foundation types for the Duet dialogue server.
//!
//! This crate provides the shared vocabulary the other Duet crates depend on:
//!
//! - **Branded IDs**: `ConnectionId` as a newtype for type safety
//! - **Protocol**: `ClientMessage` / `ServerMessage` wire enums
//! - **Constants**: turn caps, prompt limits, playback margins

#![deny(unsafe_code)]

pub mod constants;
pub mod ids;
pub mod protocol;

pub use ids::ConnectionId;
pub use protocol::{ClientMessage, Entity, ServerMessage, StartRequest};
