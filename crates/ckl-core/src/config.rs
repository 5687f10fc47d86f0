//! Configuration structures for the ck-live engine.
//!
//! - [`LayoutConfig`] - Conventional folder and file names
//! - [`WatchConfig`] - File watcher settings (debouncing, recursion)
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a manifest only needs to name what it changes.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Conventional names of the folders and files the engine reads and writes.
///
/// # Examples
///
/// ```
/// use ckl_core::LayoutConfig;
///
/// let layout = LayoutConfig::default();
/// assert_eq!(layout.locales_folder, "ts-locales");
/// assert_eq!(layout.assets_folder, "ts-assets");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Package sub-folder holding `<culture>.json` translation files.
    pub locales_folder: String,

    /// Package sub-folder holding asset files.
    pub assets_folder: String,

    /// Application sub-folder holding the engine's own state.
    ///
    /// Changes inside it never trigger reloads.
    pub cache_folder: String,

    /// Name of the persisted state file inside `cache_folder`.
    pub state_file_name: String,

    /// Application sub-folder receiving generated locales and assets.
    pub output_folder: String,

    /// Application sub-folders whose changes are reported to the caller.
    pub watched_folders: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            locales_folder: "ts-locales".to_owned(),
            assets_folder: "ts-assets".to_owned(),
            cache_folder: ".ck-live".to_owned(),
            state_file_name: "LiveState.dat".to_owned(),
            output_folder: "ck-gen".to_owned(),
            watched_folders: vec!["ck-gen-transform".to_owned()],
        }
    }
}

impl LayoutConfig {
    /// Checks that every folder name is a single non-empty path segment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("locales_folder", &self.locales_folder),
            ("assets_folder", &self.assets_folder),
            ("cache_folder", &self.cache_folder),
            ("state_file_name", &self.state_file_name),
            ("output_folder", &self.output_folder),
        ];
        for (option, value) in names
            .into_iter()
            .chain(self.watched_folders.iter().map(|f| ("watched_folders", f)))
        {
            if value.is_empty() {
                return Err(ConfigError::invalid_option(option, "must not be empty"));
            }
            if value.contains(['/', '\\']) || value == ".." {
                return Err(ConfigError::invalid_option(
                    option,
                    format!("'{value}' must be a single folder name"),
                ));
            }
        }
        if self.locales_folder == self.assets_folder {
            return Err(ConfigError::invalid_option(
                "assets_folder",
                "must differ from locales_folder",
            ));
        }
        Ok(())
    }
}

/// Configuration for the file watcher.
///
/// # Examples
///
/// ```
/// use ckl_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 100);
/// assert!(config.recursive);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Whether file watching is enabled at all.
    pub enabled: bool,

    /// Debounce window in milliseconds.
    ///
    /// Multiple file changes within this window are batched into a single event.
    pub debounce_ms: u64,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 100,
            recursive: true,
        }
    }
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use ckl_core::Config;
///
/// let config: Config = serde_json::from_str(r#"{"watch": {"debounce_ms": 250}}"#).unwrap();
/// assert_eq!(config.watch.debounce_ms, 250);
/// assert_eq!(config.layout.output_folder, "ck-gen");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder and file naming conventions.
    pub layout: LayoutConfig,

    /// File watcher configuration.
    pub watch: WatchConfig,
}
