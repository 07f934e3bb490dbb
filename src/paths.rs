//! Application directory paths.
//!
//! Single source of truth for the filesystem locations the bot uses. Uses
//! the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data | `~/Library/Application Support/rollcall/` | `~/.local/share/rollcall/` |
//! | Config | `~/Library/Application Support/rollcall/` | `~/.config/rollcall/` |
//!
//! # Environment Overrides
//!
//! - `ROLLCALL_DATA_DIR` — overrides [`data_dir`]
//! - `ROLLCALL_CONFIG_DIR` — overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds the SQLite database. Resolves to `dirs::data_dir()/rollcall/` by
/// default; override with the `ROLLCALL_DATA_DIR` environment variable.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("ROLLCALL_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("rollcall"))
        .unwrap_or_else(|| PathBuf::from("/tmp/rollcall-data"))
}

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/rollcall/` by default; override with
/// the `ROLLCALL_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("ROLLCALL_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("rollcall"))
        .unwrap_or_else(|| PathBuf::from("/tmp/rollcall-config"))
}

/// Main config file path (`config_dir()/rollcall.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("rollcall.toml")
}

/// Default database path (`data_dir()/rollcall.db`).
#[must_use]
pub fn database_file() -> PathBuf {
    data_dir().join("rollcall.db")
}
