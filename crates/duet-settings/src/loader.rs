//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::DuetSettings;

/// Resolve the path to the settings file (`~/.duet/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".duet").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<DuetSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<DuetSettings> {
    let defaults = serde_json::to_value(DuetSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: DuetSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are silently ignored (fall back to file/default). The
/// credential variables keep the names the upstream services document.
pub fn apply_env_overrides(settings: &mut DuetSettings) {
    if let Some(v) = read_env_string("DUET_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("DUET_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_string("DUET_AUDIO_DIR") {
        settings.server.audio_dir = v;
    }

    if let Some(v) = read_env_string("AZURE_OPENAI_KEY") {
        settings.openai.key = v;
    }
    if let Some(v) = read_env_string("AZURE_OPENAI_ENDPOINT") {
        settings.openai.endpoint = v;
    }
    if let Some(v) = read_env_string("AZURE_OPENAI_DEPLOYMENT") {
        settings.openai.deployment = v;
    }

    if let Some(v) = read_env_string("SPEECHKEY") {
        settings.speech.key = v;
    }
    if let Some(v) = read_env_string("SPEECHENDPOINT") {
        settings.speech.endpoint = v;
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    std::env::var(name)
        .ok()
        .and_then(|v| parse_u16_range(&v, min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_yields_defaults() {
        let settings =
            load_settings_from_path(Path::new("/nonexistent/duet/settings.json")).unwrap();
        assert_eq!(settings.server.port, DuetSettings::default().server.port);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_settings_from_path(&path).is_err());
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server":{"port":9191},"openai":{"key":"k","endpoint":"https://x"}}"#,
        )
        .unwrap();
        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.server.port, 9191);
        // Untouched values keep their defaults
        assert_eq!(settings.server.host, "0.0.0.0");
        assert!(settings.openai.is_configured());
    }

    #[test]
    fn deep_merge_recurses_into_objects() {
        let target = json!({"a": {"x": 1, "y": 2}, "b": 3});
        let source = json!({"a": {"y": 20}});
        let merged = deep_merge(target, source);
        assert_eq!(merged, json!({"a": {"x": 1, "y": 20}, "b": 3}));
    }

    #[test]
    fn deep_merge_replaces_arrays() {
        let target = json!({"list": [1, 2, 3]});
        let source = json!({"list": [9]});
        assert_eq!(deep_merge(target, source), json!({"list": [9]}));
    }

    #[test]
    fn deep_merge_skips_nulls() {
        let target = json!({"keep": "me"});
        let source = json!({"keep": null});
        assert_eq!(deep_merge(target, source), json!({"keep": "me"}));
    }

    #[test]
    fn parse_u16_range_bounds() {
        assert_eq!(parse_u16_range("8000", 1, 65535), Some(8000));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("not a number", 1, 65535), None);
        assert_eq!(parse_u16_range("70", 1, 65), None);
    }

    #[test]
    fn settings_path_under_home() {
        let path = settings_path();
        assert!(path.ends_with(".duet/settings.json"));
    }
}
