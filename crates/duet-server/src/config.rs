//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use duet_settings::ServerSettings;

/// Runtime configuration for the Duet server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (0 for auto-assign).
    pub port: u16,
    /// Directory served under `/audio` and used for artifacts.
    pub audio_dir: PathBuf,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
    /// Interval between server-initiated Ping frames.
    pub heartbeat_interval: Duration,
    /// Disconnect clients unresponsive to pings for this long.
    pub heartbeat_timeout: Duration,
    /// Outbound event channel capacity per connection.
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_settings(&ServerSettings::default())
    }
}

impl ServerConfig {
    /// Derive the runtime config from loaded settings.
    #[must_use]
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            audio_dir: PathBuf::from(&settings.audio_dir),
            cors_origins: settings.cors_origins.clone(),
            heartbeat_interval: Duration::from_secs(settings.heartbeat_interval_secs),
            heartbeat_timeout: Duration::from_secs(settings.heartbeat_timeout_secs),
            outbound_buffer: 256,
        }
    }
}
