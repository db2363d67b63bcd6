//! The conversation engine: session registry, playback handshake, task
//! supervision, the turn-loop orchestrator, and cleanup.
//!
//! The free functions here are the control-message dispatch surface shared
//! by the WebSocket session loop and the tests: `start` replaces any prior
//! task and clears stale state before launching, `stop` and disconnect
//! cancel-and-wait then clean up, and `audio_finished` signals the
//! handshake coordinator directly.

pub mod cleanup;
pub mod handshake;
pub mod orchestrator;
pub mod registry;
pub mod supervisor;

use std::sync::Arc;

use tracing::debug;

use duet_core::{ServerMessage, StartRequest};

use crate::context::ConversationContext;
use crate::websocket::connection::ClientConnection;
use self::orchestrator::ConversationOrchestrator;

/// Handle a `start` control message.
///
/// Cancels any running task for the session (waiting for its full unwind),
/// clears stale state, then launches and registers a fresh orchestrator.
/// The prior task's cleanup completes before the new task's first
/// generation call can begin.
pub async fn start_conversation(
    ctx: &Arc<ConversationContext>,
    connection: &Arc<ClientConnection>,
    request: StartRequest,
) {
    let session_id = connection.session_id().to_owned();
    debug!(session_id, "start requested");

    ctx.supervisor.cancel_and_wait(&session_id).await;
    ctx.cleanup.run(&session_id).await;

    let spawn_ctx = Arc::clone(ctx);
    let spawn_conn = Arc::clone(connection);
    ctx.supervisor
        .replace(&session_id, move |token, run_id| {
            let orchestrator =
                ConversationOrchestrator::new(spawn_ctx, spawn_conn, &request, token, run_id);
            tokio::spawn(orchestrator.run())
        })
        .await;
}

/// Handle a `stop` control message.
///
/// Cancels the task, waits for its unwind, runs cleanup again (idempotent —
/// the task's own finalizer usually got there first), and acknowledges with
/// `stopped`.
pub async fn stop_conversation(ctx: &Arc<ConversationContext>, connection: &Arc<ClientConnection>) {
    let session_id = connection.session_id();
    debug!(session_id, "stop requested");

    ctx.registry.mark_stopped(session_id);
    ctx.supervisor.cancel_and_wait(session_id).await;
    ctx.cleanup.run(session_id).await;

    let _ = connection.send_message(&ServerMessage::Stopped);
}

/// Handle an `audio_finished` control message.
pub fn handle_audio_finished(ctx: &Arc<ConversationContext>, session_id: &str) {
    ctx.handshake.signal(session_id);
}

/// Handle transport disconnect: same teardown as `stop`, without the ack.
pub async fn handle_disconnect(ctx: &Arc<ConversationContext>, session_id: &str) {
    debug!(session_id, "client disconnected, tearing down");
    ctx.registry.mark_stopped(session_id);
    ctx.supervisor.cancel_and_wait(session_id).await;
    ctx.cleanup.run(session_id).await;
}
