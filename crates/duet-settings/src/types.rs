//! Settings type definitions.

use serde::{Deserialize, Serialize};

/// Top-level Duet settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DuetSettings {
    /// Server network and runtime settings.
    pub server: ServerSettings,
    /// Azure OpenAI generation settings.
    pub openai: OpenAiSettings,
    /// Azure Speech synthesis settings.
    pub speech: SpeechSettings,
}

/// Server network and runtime settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// HTTP/WebSocket port.
    pub port: u16,
    /// Directory where synthesized audio artifacts are written.
    pub audio_dir: String,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
    /// WebSocket heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Disconnect clients unresponsive to pings for this long, in seconds.
    pub heartbeat_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            audio_dir: "voices".to_string(),
            cors_origins: vec![
                "http://localhost:8000".to_string(),
                "http://127.0.0.1:8000".to_string(),
            ],
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
        }
    }
}

/// Azure OpenAI generation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenAiSettings {
    /// API key. Empty means generation is unconfigured.
    pub key: String,
    /// Resource endpoint, e.g. `https://example.openai.azure.com`.
    pub endpoint: String,
    /// Deployment name of the chat model.
    pub deployment: String,
    /// REST API version.
    pub api_version: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            key: String::new(),
            endpoint: String::new(),
            deployment: "gpt-4o-mini".to_string(),
            api_version: "2024-02-01".to_string(),
        }
    }
}

impl OpenAiSettings {
    /// Whether both key and endpoint are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.key.is_empty() && !self.endpoint.is_empty()
    }
}

/// Azure Speech synthesis settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeechSettings {
    /// Subscription key. Empty means synthesis is unconfigured.
    pub key: String,
    /// Service endpoint, e.g. `https://eastus.tts.speech.microsoft.com`.
    pub endpoint: String,
}

impl SpeechSettings {
    /// Whether both key and endpoint are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.key.is_empty() && !self.endpoint.is_empty()
    }
}
