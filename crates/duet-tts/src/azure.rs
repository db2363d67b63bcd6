//! Azure Cognitive Services TTS client.
//!
//! Synthesizes over REST: an SSML document is POSTed to
//! `{endpoint}/cognitiveservices/v1` and the compressed mp3 response body
//! (`audio-24khz-48kbitrate-mono-mp3`) is written into the artifact store.
//! Compressed output keeps network transfer and client start-of-playback
//! latency low.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{info, warn};

use crate::errors::{TtsError, TtsResult};
use crate::store::ArtifactStore;
use crate::synthesizer::SpeechSynthesizer;
use crate::voices::azure_voice_name;

/// Output format requested from the service.
const OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

/// Azure TTS synthesizer.
pub struct AzureSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    key: String,
    store: Arc<ArtifactStore>,
    stop_requested: AtomicBool,
    closed: AtomicBool,
}

impl AzureSynthesizer {
    /// Create a new synthesizer writing artifacts into `store`.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        key: impl Into<String>,
        store: Arc<ArtifactStore>,
    ) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_owned();
        info!(endpoint = %endpoint, "Azure TTS synthesizer initialized (mp3 output)");
        Self {
            client: reqwest::Client::new(),
            endpoint,
            key: key.into(),
            store,
            stop_requested: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    fn synthesis_url(&self) -> String {
        format!("{}/cognitiveservices/v1", self.endpoint)
    }
}

/// Build the SSML document for one synthesis request.
///
/// A prosody element is added only when the rate differs from normal, as a
/// signed percentage (`speed` 1.0 = normal, 0.5 = slow, 2.0 = fast).
#[allow(clippy::cast_possible_truncation)]
pub fn build_ssml(text: &str, voice_name: &str, speed: f64) -> String {
    let escaped = escape_xml(text);
    let rate_percent = ((speed - 1.0) * 100.0).round() as i32;
    let body = if rate_percent == 0 {
        escaped
    } else {
        format!("<prosody rate=\"{rate_percent:+}%\">{escaped}</prosody>")
    };
    format!(
        "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" xml:lang=\"en-US\">\
         <voice name=\"{voice_name}\">{body}</voice></speak>"
    )
}

/// Escape the XML special characters that can occur in generated text.
fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[async_trait]
impl SpeechSynthesizer for AzureSynthesizer {
    fn name(&self) -> &str {
        "azure-tts"
    }

    async fn synthesize(&self, text: &str, voice_key: &str, speed: f64) -> TtsResult<PathBuf> {
        if self.stop_requested.load(Ordering::Relaxed) {
            return Err(TtsError::Stopped);
        }

        let cleaned = text.trim();
        if cleaned.is_empty() {
            return Err(TtsError::EmptyText);
        }

        let voice_name = azure_voice_name(voice_key);
        let ssml = build_ssml(cleaned, voice_name, speed);

        let start = Instant::now();
        let response = self
            .client
            .post(self.synthesis_url())
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header(CONTENT_TYPE, "application/ssml+xml")
            .body(ssml)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TtsError::Api { status, message });
        }

        let audio = response.bytes().await?;
        let path = self.store.new_artifact_path(voice_key);
        tokio::fs::write(&path, &audio).await?;

        #[allow(clippy::cast_possible_truncation)]
        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            voice = voice_name,
            bytes = audio.len(),
            elapsed_ms,
            path = %path.display(),
            "synthesis completed"
        );

        Ok(path)
    }

    fn stop_all(&self) {
        self.stop_requested.store(true, Ordering::Relaxed);
        info!("stop requested for all synthesis");
    }

    fn reset_stop(&self) {
        self.stop_requested.store(false, Ordering::Relaxed);
    }

    fn purge_artifacts(&self, max_age: Duration) -> usize {
        self.store.purge_older_than(max_age)
    }

    async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_all();
        let removed = self.store.purge_older_than(Duration::ZERO);
        if removed > 0 {
            warn!(removed, "purged artifacts left behind at shutdown");
        }
        info!("Azure TTS synthesizer shut down");
    }
}
