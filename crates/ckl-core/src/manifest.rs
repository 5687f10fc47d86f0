//! The application manifest.
//!
//! The manifest lists the packages contributing resources, in dependency
//! order, together with the engine [`Config`]. It replaces any ambient package
//! discovery: every consumer receives the packages it works on explicitly.
//!
//! ```json
//! {
//!   "packages": [
//!     { "name": "CK.Core", "kind": "regular", "path": "packages/ck-core" },
//!     { "name": "App", "kind": "local", "path": "src/app" }
//!   ],
//!   "config": { "watch": { "debounce_ms": 200 } }
//! }
//! ```

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::ConfigError;
use crate::hash::FxHashSet;
use crate::types::LocalPackage;

/// Whether a package's resources are fixed at build time or tracked live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
    /// Content fixed at build time, merged once.
    Regular,
    /// Content on local disk, reloaded on change during a live session.
    Local,
}

/// One entry of the manifest package list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Unique package name.
    pub name: String,

    /// Regular or local.
    pub kind: PackageKind,

    /// Package root directory. Relative paths resolve against the manifest
    /// directory.
    pub path: Utf8PathBuf,
}

/// The application manifest.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use ckl_core::{AppManifest, PackageKind};
///
/// let json = r#"{ "packages": [{ "name": "Lib", "kind": "regular", "path": "lib" }] }"#;
/// let manifest = AppManifest::from_json(json, Utf8Path::new("/app")).unwrap();
/// assert_eq!(manifest.packages[0].kind, PackageKind::Regular);
/// assert_eq!(manifest.packages[0].path.as_str(), "/app/lib");
/// assert_eq!(manifest.state_file().as_str(), "/app/.ck-live/LiveState.dat");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppManifest {
    /// Application root (the manifest directory).
    #[serde(skip)]
    pub root: Utf8PathBuf,

    /// Packages in dependency order.
    pub packages: Vec<PackageManifest>,

    /// Engine configuration.
    pub config: Config,
}

impl AppManifest {
    /// Default manifest file name.
    pub const DEFAULT_FILE_NAME: &'static str = "ck-live.json";

    /// Loads and validates a manifest file.
    ///
    /// The application root and every package path are canonicalized so they
    /// compare equal to the absolute paths reported by file watchers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] / [`ConfigError::Parse`] when the file cannot
    /// be read, and the validation errors of [`validate`](Self::validate).
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let parent = path
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .unwrap_or(Utf8Path::new("."));
        let root = parent
            .canonicalize_utf8()
            .map_err(|_| ConfigError::MissingDirectory(parent.to_owned()))?;

        let mut manifest = Self::from_json(&json, &root)?;
        for package in &mut manifest.packages {
            package.path = package
                .path
                .canonicalize_utf8()
                .map_err(|_| ConfigError::MissingDirectory(package.path.clone()))?;
        }
        manifest.validate()?;
        debug!(path = %path, packages = manifest.packages.len(), "Manifest loaded");
        Ok(manifest)
    }

    /// Parses a manifest and resolves package paths against `root`.
    ///
    /// Only the structural checks run here; directories are not required to
    /// exist.
    pub fn from_json(json: &str, root: &Utf8Path) -> Result<Self, ConfigError> {
        let mut manifest: Self = serde_json::from_str(json)?;
        manifest.root = root.to_owned();
        for package in &mut manifest.packages {
            if package.path.is_relative() {
                package.path = root.join(&package.path);
            }
        }
        manifest.check_names()?;
        manifest.config.layout.validate()?;
        Ok(manifest)
    }

    /// Validates the manifest: unique names, valid layout, and existing
    /// package directories.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_names()?;
        self.config.layout.validate()?;
        if let Some(missing) = self.packages.iter().find(|p| !p.path.is_dir()) {
            return Err(ConfigError::MissingDirectory(missing.path.clone()));
        }
        Ok(())
    }

    fn check_names(&self) -> Result<(), ConfigError> {
        let mut seen = FxHashSet::default();
        for package in &self.packages {
            if package.name.is_empty() {
                return Err(ConfigError::invalid_option("packages", "package name must not be empty"));
            }
            if !seen.insert(package.name.as_str()) {
                return Err(ConfigError::DuplicatePackage(package.name.clone()));
            }
        }
        Ok(())
    }

    /// Returns the local packages with their `IdxLocal` assigned in manifest
    /// order.
    #[must_use]
    pub fn local_packages(&self) -> Vec<Arc<LocalPackage>> {
        self.packages
            .iter()
            .filter(|p| p.kind == PackageKind::Local)
            .enumerate()
            .map(|(idx, p)| Arc::new(LocalPackage::new(idx, &p.name, &p.path)))
            .collect()
    }

    /// Returns the folder holding the engine's own state.
    #[must_use]
    pub fn cache_dir(&self) -> Utf8PathBuf {
        self.root.join(&self.config.layout.cache_folder)
    }

    /// Returns the persisted state file path.
    #[must_use]
    pub fn state_file(&self) -> Utf8PathBuf {
        self.cache_dir().join(&self.config.layout.state_file_name)
    }

    /// Returns the generated output folder.
    #[must_use]
    pub fn output_dir(&self) -> Utf8PathBuf {
        self.root.join(&self.config.layout.output_folder)
    }

    /// Returns the absolute paths of the watched application folders.
    #[must_use]
    pub fn watched_folders(&self) -> Vec<Utf8PathBuf> {
        self.config
            .layout
            .watched_folders
            .iter()
            .map(|name| self.root.join(name))
            .collect()
    }
}
