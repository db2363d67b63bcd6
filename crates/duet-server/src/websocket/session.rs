//! WebSocket session lifecycle — handles a single connected client from
//! upgrade through disconnect.
//!
//! The read loop parses control messages and dispatches them to the
//! conversation engine; a spawned outbound task forwards events from the
//! connection channel and keeps the ping/pong heartbeat. Disconnect runs
//! the same teardown as an explicit stop.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use duet_core::{ClientMessage, ConnectionId, ServerMessage};

use crate::config::ServerConfig;
use crate::context::ConversationContext;
use crate::conversation::{
    handle_audio_finished, handle_disconnect, start_conversation, stop_conversation,
};

use super::connection::ClientConnection;

/// Run a WebSocket session for a connected client.
///
/// 1. Spawns the outbound forwarder with periodic Ping frames
/// 2. Dispatches incoming text frames as control messages
/// 3. Tears the conversation down on disconnect
#[instrument(skip_all)]
pub async fn run_ws_session(ws: WebSocket, ctx: Arc<ConversationContext>, config: ServerConfig) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<String>(config.outbound_buffer);
    let connection = Arc::new(ClientConnection::new(ConnectionId::new(), send_tx));
    let session_id = connection.session_id().to_owned();
    info!(session_id, "client connected");

    // Outbound forwarder with heartbeat.
    let outbound_conn = Arc::clone(&connection);
    let ping_interval = config.heartbeat_interval;
    let pong_timeout = config.heartbeat_timeout;
    let outbound = tokio::spawn(async move {
        let mut interval = tokio::time::interval(ping_interval);
        // Skip the immediate first tick
        let _ = interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = interval.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_pong_elapsed() > pong_timeout
                    {
                        warn!("client unresponsive for {pong_timeout:?}, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Process incoming control messages.
    while let Some(Ok(msg)) = ws_rx.next().await {
        let text = match msg {
            Message::Text(ref t) => t.to_string(),
            Message::Binary(ref data) => match std::str::from_utf8(data) {
                Ok(s) => s.to_owned(),
                Err(_) => {
                    info!(session_id, len = data.len(), "ignoring non-UTF8 binary frame");
                    continue;
                }
            },
            Message::Close(_) => {
                info!(session_id, "client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                connection.mark_alive();
                continue;
            }
        };

        dispatch_message(&text, &ctx, &connection).await;
    }

    handle_disconnect(&ctx, &session_id).await;
    outbound.abort();
    info!(session_id, "session closed");
}

/// Parse one control message and route it to the engine.
///
/// Parse failures are answered with a single `error` event, not a
/// disconnect — a confused client keeps its connection.
pub async fn dispatch_message(
    text: &str,
    ctx: &Arc<ConversationContext>,
    connection: &Arc<ClientConnection>,
) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Start(request)) => start_conversation(ctx, connection, request).await,
        Ok(ClientMessage::Stop) => stop_conversation(ctx, connection).await,
        Ok(ClientMessage::AudioFinished) => handle_audio_finished(ctx, connection.session_id()),
        Err(e) => {
            warn!(session_id = connection.session_id(), error = %e, "invalid control message");
            let _ = connection.send_message(&ServerMessage::error(format!("Invalid message: {e}")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_tts::{ArtifactStore, MockSynthesizer};

    fn make_ctx() -> (tempfile::TempDir, Arc<ConversationContext>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ArtifactStore::new(dir.path().join("voices")).unwrap());
        let synth = Arc::new(MockSynthesizer::new(Arc::clone(&store)));
        let ctx = ConversationContext::new(None, synth as _, store);
        (dir, ctx)
    }

    fn make_connection() -> (Arc<ClientConnection>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(32);
        (
            Arc::new(ClientConnection::new(ConnectionId::new(), tx)),
            rx,
        )
    }

    #[tokio::test]
    async fn invalid_json_yields_error_event() {
        let (_tmp, ctx) = make_ctx();
        let (conn, mut rx) = make_connection();

        dispatch_message("not json", &ctx, &conn).await;

        let event: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(event["type"], "error");
        assert!(event["message"].as_str().unwrap().contains("Invalid message"));
    }

    #[tokio::test]
    async fn unknown_type_yields_error_event() {
        let (_tmp, ctx) = make_ctx();
        let (conn, mut rx) = make_connection();

        dispatch_message(r#"{"type":"fast_forward"}"#, &ctx, &conn).await;

        let event: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(event["type"], "error");
    }

    #[tokio::test]
    async fn stop_without_conversation_still_acks() {
        let (_tmp, ctx) = make_ctx();
        let (conn, mut rx) = make_connection();

        dispatch_message(r#"{"type":"stop"}"#, &ctx, &conn).await;

        let event: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(event["type"], "stopped");
    }

    #[tokio::test]
    async fn audio_finished_without_conversation_is_silent() {
        let (_tmp, ctx) = make_ctx();
        let (conn, mut rx) = make_connection();

        dispatch_message(r#"{"type":"audio_finished"}"#, &ctx, &conn).await;

        assert!(rx.try_recv().is_err());
        assert!(!ctx.handshake.is_prepared(conn.session_id()));
    }
}
