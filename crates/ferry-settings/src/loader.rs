//! Settings loading: defaults → JSON file → `FERRY_*` env overrides.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::warn;

use crate::errors::Result;
use crate::types::FerrySettings;

/// Default settings file location (`~/.ferry/settings.json`).
#[must_use]
pub fn settings_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ferry")
        .join("settings.json")
}

/// Deep-merge `overlay` into `base`. Objects merge recursively; any other
/// value in `overlay` replaces the one in `base`.
#[must_use]
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings from the default path with env overrides.
pub fn load_settings() -> Result<FerrySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific file path with env overrides.
///
/// A missing file is not an error: defaults plus env overrides apply.
pub fn load_settings_from_path(path: &Path) -> Result<FerrySettings> {
    let defaults = serde_json::to_value(FerrySettings::default())?;

    let merged = if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        let file_value: Value = serde_json::from_str(&raw)?;
        deep_merge(defaults, file_value)
    } else {
        defaults
    };

    let mut settings: FerrySettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&mut settings);
    Ok(settings)
}

/// Apply `FERRY_*` environment variable overrides (highest priority).
fn apply_env_overrides(settings: &mut FerrySettings) {
    if let Some(v) = env_parse::<f64>("FERRY_ACCEPT_THRESHOLD") {
        settings.routing.accept_threshold = v;
    }
    if let Some(v) = env_parse::<f64>("FERRY_FALLBACK_CONFIDENCE_CAP") {
        settings.routing.fallback_confidence_cap = v;
    }
    if let Some(v) = env_parse::<f64>("FERRY_SIMILARITY_THRESHOLD") {
        settings.cache.similarity_threshold = v;
    }
    if let Some(v) = env_parse::<usize>("FERRY_CACHE_CAPACITY") {
        settings.cache.capacity = v;
    }
    if let Some(v) = env_parse::<u64>("FERRY_CACHE_TTL_SECS") {
        settings.cache.ttl_secs = v;
    }
    if let Some(v) = env_parse::<u64>("FERRY_GATEWAY_TIMEOUT_MS") {
        settings.gateway.timeout_ms = v;
    }
    if let Some(v) = env_parse::<u64>("FERRY_DISPATCH_TIMEOUT_MS") {
        settings.dispatch.timeout_ms = v;
    }
    if let Ok(v) = std::env::var("FERRY_GATEWAY_BASE_URL")
        && !v.is_empty()
    {
        settings.gateway.base_url = v;
    }
    if let Ok(v) = std::env::var("FERRY_GATEWAY_API_KEY")
        && !v.is_empty()
    {
        settings.gateway.api_key = Some(v);
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(name, %raw, "ignoring unparseable env override");
            None
        }
    }
}

/// Repair invariants a file or env override may have broken.
fn validate(settings: &mut FerrySettings) {
    let routing = &mut settings.routing;
    routing.accept_threshold = routing.accept_threshold.clamp(0.0, 1.0);
    if routing.fallback_confidence_cap >= routing.accept_threshold {
        let clamped = routing.accept_threshold * 0.9;
        warn!(
            cap = routing.fallback_confidence_cap,
            threshold = routing.accept_threshold,
            clamped,
            "fallback confidence cap must stay below the acceptance threshold; clamping"
        );
        routing.fallback_confidence_cap = clamped;
    }
    settings.cache.similarity_threshold = settings.cache.similarity_threshold.clamp(0.0, 1.0);
    if settings.cache.capacity == 0 {
        warn!("cache capacity 0 disables the cache");
        settings.cache.enabled = false;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
