//! Default values for strata configuration.
//!
//! This module provides centralized default values used across the engine
//! and the CLI, ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILENAME: &str = "strata.yaml";

/// Default bound for every remote call, in milliseconds.
pub const DEFAULT_SYNC_TIMEOUT_MS: u64 = 5000;

/// Icon used by compiled schemas when no ancestor names one.
pub const DEFAULT_ICON: &str = "file";

/// Editor used by compiled field schemas when no ancestor names one.
pub const DEFAULT_FIELD_EDITOR: &str = "struct";

/// Returns the default storage root for the file-backed local store.
///
/// Uses the platform-appropriate data directory:
/// - Linux: `~/.local/share/strata` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/strata`
/// - Windows: `{FOLDERID_RoamingAppData}\strata`
///
/// Falls back to `.strata-data` in the current directory if the platform
/// data directory cannot be determined.
///
/// This can be overridden by the `storage` key in `strata.yaml`, the
/// `--storage` CLI flag or the `STRATA_STORAGE` environment variable.
pub fn default_storage_root() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("strata"))
        .unwrap_or_else(|| PathBuf::from(".strata-data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_storage_root_returns_path() {
        let root = default_storage_root();
        assert!(root.ends_with("strata") || root.ends_with(".strata-data"));
    }

    #[test]
    fn test_default_storage_root_is_absolute_or_fallback() {
        let root = default_storage_root();
        assert!(
            root.is_absolute() || root.starts_with(".strata-data"),
            "Expected absolute path or fallback, got: {:?}",
            root
        );
    }
}
