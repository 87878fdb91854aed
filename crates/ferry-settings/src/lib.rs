//! # ferry-settings
//!
//! Configuration management with layered sources for Ferry.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`FerrySettings::default()`]
//! 2. **User file** — `~/.ferry/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `FERRY_*` overrides (highest priority)
//!
//! Components receive an `Arc<FerrySettings>` at construction; the global
//! accessor exists for the binary's startup path and for tools that have
//! no injection seam.
//!
//! # Usage
//!
//! ```no_run
//! use ferry_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("acceptance threshold: {}", settings.routing.accept_threshold);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

/// Global settings cache.
///
/// `RwLock<Option<Arc<...>>>` instead of `OnceLock` so the value can be
/// swapped on reload. Reads are cheap (shared lock + `Arc::clone`).
static SETTINGS: RwLock<Option<Arc<FerrySettings>>> = RwLock::new(None);

/// Get the global settings instance.
///
/// On first call, loads from `~/.ferry/settings.json` with env overrides.
/// Returns compiled defaults if loading fails. Returns an `Arc` so callers
/// hold a consistent snapshot even across a concurrent reload.
pub fn get_settings() -> Arc<FerrySettings> {
    {
        let guard = SETTINGS.read();
        if let Some(ref s) = *guard {
            return Arc::clone(s);
        }
    }

    let mut guard = SETTINGS.write();
    // Another thread may have initialized while we waited for the lock.
    if let Some(ref s) = *guard {
        return Arc::clone(s);
    }

    let settings = Arc::new(match load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            FerrySettings::default()
        }
    });
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Replace the cached settings with a specific value.
///
/// Useful for tests and for startup paths where the file was already
/// loaded explicitly.
pub fn init_settings(settings: FerrySettings) {
    let mut guard = SETTINGS.write();
    *guard = Some(Arc::new(settings));
}

/// Reload settings from a file path and swap the cache atomically.
pub fn reload_settings_from_path(path: &Path) {
    let new = Arc::new(match load_settings_from_path(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, ?path, "failed to reload settings, falling back to defaults");
            FerrySettings::default()
        }
    });
    let mut guard = SETTINGS.write();
    *guard = Some(new);
    tracing::info!(?path, "settings reloaded from disk");
}

/// Reset the global settings cache (test-only).
#[cfg(test)]
pub(crate) fn reset_settings() {
    let mut guard = SETTINGS.write();
    *guard = None;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
