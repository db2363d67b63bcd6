//! Playback-duration estimation for audio artifacts.
//!
//! The estimate sizes the client-ack timeout and the deferred-deletion
//! delay; it is a scheduling input, not a precise media property. Compressed
//! mp3 artifacts are estimated from byte size at the synthesis bitrate
//! (48 kbit/s ≈ 6000 bytes per second). WAV containers carry frame counts,
//! so those are probed. Anything else takes a fixed fallback.

use std::fs::File;
use std::path::Path;

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use duet_core::constants::FALLBACK_PLAYBACK_SECS;

/// Assumed mp3 data rate: 48 kbit/s mono ≈ 6000 bytes per second.
pub const MP3_BYTES_PER_SEC: f64 = 6000.0;

/// Estimate how long an artifact will take to play, in seconds.
#[must_use]
pub fn estimate_playback_secs(path: &Path) -> f64 {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let estimate = match ext.as_deref() {
        Some("mp3") => mp3_estimate(path),
        Some("wav") => probe_wav_secs(path),
        _ => None,
    };

    estimate.unwrap_or_else(|| {
        debug!(path = %path.display(), "falling back to fixed playback duration");
        FALLBACK_PLAYBACK_SECS
    })
}

/// Byte-size estimate for mp3 at the assumed synthesis bitrate.
#[allow(clippy::cast_precision_loss)]
fn mp3_estimate(path: &Path) -> Option<f64> {
    let size = std::fs::metadata(path).ok()?.len();
    Some(size as f64 / MP3_BYTES_PER_SEC)
}

/// Probe a WAV container for its exact frame count and sample rate.
#[allow(clippy::cast_precision_loss)]
fn probe_wav_secs(path: &Path) -> Option<f64> {
    let file = File::open(path).ok()?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    let _ = hint.with_extension("wav");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)?;

    let frames = track.codec_params.n_frames?;
    let rate = track.codec_params.sample_rate?;
    if rate == 0 {
        return None;
    }
    Some(frames as f64 / f64::from(rate))
}
