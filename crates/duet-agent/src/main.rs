//! # duet-agent
//!
//! Duet dialogue server binary — loads settings, constructs the upstream
//! collaborators, and serves until SIGINT/SIGTERM. Shutdown drains the
//! server and closes the synthesizer, purging all resident audio artifacts.

#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use duet_llm::{AzureOpenAiProvider, CompletionProvider};
use duet_server::config::ServerConfig;
use duet_server::context::ConversationContext;
use duet_server::server::DuetServer;
use duet_server::shutdown::ShutdownCoordinator;
use duet_settings::DuetSettings;
use duet_tts::{ArtifactStore, AzureSynthesizer, SpeechSynthesizer};

/// Duet dialogue server.
#[derive(Parser, Debug)]
#[command(name = "duet-agent", about = "Duet two-persona spoken dialogue server")]
struct Cli {
    /// Host to bind (overrides settings if specified).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings if specified).
    #[arg(long)]
    port: Option<u16>,

    /// Audio artifact directory (overrides settings if specified).
    #[arg(long)]
    audio_dir: Option<String>,

    /// Log level filter when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Initialize the global tracing subscriber with stderr output.
fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();
    let _ = subscriber.try_init();
}

/// Build the generation collaborator if credentials are configured.
fn build_provider(settings: &DuetSettings) -> Option<Arc<dyn CompletionProvider>> {
    if settings.openai.is_configured() {
        Some(Arc::new(AzureOpenAiProvider::new(
            settings.openai.endpoint.clone(),
            settings.openai.key.clone(),
            settings.openai.deployment.clone(),
            settings.openai.api_version.clone(),
        )))
    } else {
        warn!("Azure OpenAI credentials not configured; starts will be rejected");
        None
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mut settings = duet_settings::load_settings().context("failed to load settings")?;
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if let Some(audio_dir) = cli.audio_dir {
        settings.server.audio_dir = audio_dir;
    }

    let config = ServerConfig::from_settings(&settings.server);
    let store = Arc::new(
        ArtifactStore::new(&config.audio_dir).with_context(|| {
            format!("failed to create audio directory {}", config.audio_dir.display())
        })?,
    );

    if !settings.speech.is_configured() {
        warn!("Azure Speech credentials not configured; turns will have no audio");
    }
    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(AzureSynthesizer::new(
        settings.speech.endpoint.clone(),
        settings.speech.key.clone(),
        Arc::clone(&store),
    ));

    let provider = build_provider(&settings);
    let ctx = ConversationContext::new(provider, Arc::clone(&synthesizer), store);

    let shutdown = ShutdownCoordinator::new();
    let server = DuetServer::new(config, ctx);

    info!(version = duet_core::constants::VERSION, "starting duet-agent");

    let server_token = shutdown.token();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.serve(server_token).await {
            tracing::error!(error = %e, "server exited with error");
        }
    });

    wait_for_signal().await;
    info!("shutdown signal received");

    shutdown
        .graceful_shutdown(&synthesizer, vec![server_handle], None)
        .await;

    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "could not install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
