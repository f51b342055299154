//! Default locations used across commands.

use std::path::PathBuf;

/// Returns the default store directory.
///
/// Uses the platform data directory:
/// - Linux: `~/.local/share/dynasync/store` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/dynasync/store`
/// - Windows: `{FOLDERID_RoamingAppData}\dynasync\store`
///
/// Falls back to `.dynasync-store` in the current directory if the platform
/// data directory cannot be determined.
///
/// Overridden by the `--store` flag, the `DYNASYNC_STORE` environment
/// variable, the repository config and the global config, in that order.
pub fn default_store_root() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("dynasync").join("store"))
        .unwrap_or_else(|| PathBuf::from(".dynasync-store"))
}

/// Returns the path of the per-user `global.yaml`.
pub fn global_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".dynasync-config"))
        .join("dynasync")
        .join("global.yaml")
}

/// Author identity from the environment, or `"unknown"`.
pub fn default_author() -> String {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
