//! `DuetServer` — Axum HTTP + WebSocket server.
//!
//! Routes: `/ws` (the one persistent client channel), `/health`, `/api`
//! (service info), and `/audio` (static serving of synthesized artifacts so
//! `speaking.audioUrl` resolves). CORS and request tracing wrap the router.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderValue;
use axum::response::{Json, Response};
use axum::routing::get;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use duet_core::constants::VERSION;

use crate::config::ServerConfig;
use crate::context::ConversationContext;
use crate::health::{self, HealthResponse};
use crate::websocket::run_ws_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Conversation engine dependencies.
    pub ctx: Arc<ConversationContext>,
    /// Server runtime configuration.
    pub config: ServerConfig,
    /// When the server started.
    pub start_time: Instant,
}

/// The main Duet server.
pub struct DuetServer {
    config: ServerConfig,
    ctx: Arc<ConversationContext>,
    start_time: Instant,
}

impl DuetServer {
    /// Create a new server.
    #[must_use]
    pub fn new(config: ServerConfig, ctx: Arc<ConversationContext>) -> Self {
        Self {
            config,
            ctx,
            start_time: Instant::now(),
        }
    }

    /// The server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the Axum router with all routes and layers.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = AppState {
            ctx: Arc::clone(&self.ctx),
            config: self.config.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/api", get(api_info_handler))
            .route("/ws", get(ws_handler))
            .nest_service("/audio", ServeDir::new(&self.config.audio_dir))
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&self.config.cors_origins))
            .with_state(state)
    }

    /// Bind and serve until the shutdown token fires.
    pub async fn serve(&self, shutdown: CancellationToken) -> std::io::Result<()> {
        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    }
}

/// Build the CORS layer from the configured origin list.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let active = state.ctx.registry.len();
    Json(health::health_check(state.start_time, active))
}

/// GET /api — basic service info.
async fn api_info_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Duet dialogue server",
        "version": VERSION,
    }))
}

/// GET /ws — upgrade to the persistent client channel.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws_session(socket, state.ctx, state.config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use duet_tts::{ArtifactStore, MockSynthesizer};
    use tower::ServiceExt;

    fn make_server() -> (tempfile::TempDir, DuetServer) {
        let dir = tempfile::tempdir().unwrap();
        let audio_dir = dir.path().join("voices");
        let store = Arc::new(ArtifactStore::new(&audio_dir).unwrap());
        let synth = Arc::new(MockSynthesizer::new(Arc::clone(&store)));
        let ctx = ConversationContext::new(None, synth as _, store);
        let config = ServerConfig {
            audio_dir,
            port: 0,
            ..ServerConfig::default()
        };
        (dir, DuetServer::new(config, ctx))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let (_tmp, server) = make_server();
        let resp = server
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["active_sessions"], 0);
    }

    #[tokio::test]
    async fn api_endpoint_reports_version() {
        let (_tmp, server) = make_server();
        let resp = server
            .router()
            .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["version"], VERSION);
    }

    #[tokio::test]
    async fn audio_route_serves_artifacts() {
        let (_tmp, server) = make_server();
        std::fs::write(server.config().audio_dir.join("azure_Brian_1.mp3"), b"mp3").unwrap();

        let resp = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/audio/azure_Brian_1.mp3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"mp3");
    }

    #[tokio::test]
    async fn ws_route_requires_upgrade() {
        let (_tmp, server) = make_server();
        let resp = server
            .router()
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        // A plain GET is rejected, but the route exists
        assert_ne!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (_tmp, server) = make_server();
        let resp = server
            .router()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn cors_layer_tolerates_bad_origins() {
        // Unparsable origins are dropped rather than panicking
        let _ = cors_layer(&["http://localhost:8000".into(), "\u{0}bad".into()]);
    }
}
