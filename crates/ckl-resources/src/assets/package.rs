//! Loading asset files from a package's `ts-assets` folder.

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ckl_core::{LayoutConfig, ResourceLocator, ResourceOverrideKind, Timestamp, UTC_MIN_VALUE};
use ignore::WalkBuilder;
use serde::Deserialize;
use tracing::debug;

use crate::error::ResourceError;
use crate::kind::ResourceKind;
use crate::merge::{MergeEntry, PackageSet, PackageSource};

/// Name of the optional manifest at the root of an assets folder.
pub const ASSETS_MANIFEST: &str = "assets.json";

/// One asset: where it comes from, how it overrides, and when it last changed.
///
/// `last_write_time` is [`UTC_MIN_VALUE`] for assets of regular packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    /// The contributing file.
    pub origin: ResourceLocator,
    /// Override kind from the assets manifest.
    pub kind: ResourceOverrideKind,
    /// Last write time of a local file.
    pub last_write_time: Timestamp,
}

impl AssetEntry {
    /// Creates an asset entry.
    #[must_use]
    pub const fn new(
        origin: ResourceLocator,
        kind: ResourceOverrideKind,
        last_write_time: Timestamp,
    ) -> Self {
        Self {
            origin,
            kind,
            last_write_time,
        }
    }

    /// Returns the file to copy the asset from.
    #[must_use]
    pub fn source_path(&self) -> Utf8PathBuf {
        self.origin.file_path()
    }
}

impl MergeEntry for AssetEntry {
    fn kind(&self) -> ResourceOverrideKind {
        self.kind
    }

    fn set_kind(&mut self, kind: ResourceOverrideKind) {
        self.kind = kind;
    }

    fn origin(&self) -> &ResourceLocator {
        &self.origin
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AssetsManifest {
    regular: Vec<String>,
    optional: Vec<String>,
    always: Vec<String>,
}

impl AssetsManifest {
    fn kinds(self) -> Vec<(String, ResourceOverrideKind)> {
        let tag = |paths: Vec<String>, kind| paths.into_iter().map(move |p| (p, kind));
        tag(self.regular, ResourceOverrideKind::Regular)
            .chain(tag(self.optional, ResourceOverrideKind::Optional))
            .chain(tag(self.always, ResourceOverrideKind::Always))
            .collect()
    }
}

/// The assets contributed by one package, keyed by `/`-separated path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageAssetSet {
    package: String,
    assets: BTreeMap<String, AssetEntry>,
}

impl PackageAssetSet {
    /// Creates a set from its parts.
    #[must_use]
    pub fn from_parts(package: impl Into<String>, assets: BTreeMap<String, AssetEntry>) -> Self {
        Self {
            package: package.into(),
            assets,
        }
    }

    /// Returns the assets, sorted by path.
    #[inline]
    #[must_use]
    pub fn assets(&self) -> &BTreeMap<String, AssetEntry> {
        &self.assets
    }
}

/// Converts a file path under `dir` to a `/`-separated logical path.
fn logical_path(dir: &Utf8Path, path: &Utf8Path) -> Option<String> {
    let relative = path.strip_prefix(dir).ok()?;
    let parts: Vec<&str> = relative.components().map(|c| c.as_str()).collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn read_manifest(path: &Utf8Path) -> Result<AssetsManifest, ResourceError> {
    let json = std::fs::read_to_string(path).map_err(|e| ResourceError::read(path, e))?;
    serde_json::from_str(&json).map_err(|e| ResourceError::parse(path, e))
}

impl PackageSet for PackageAssetSet {
    const KIND: ResourceKind = ResourceKind::Assets;

    fn load(source: PackageSource<'_>, layout: &LayoutConfig) -> Result<Option<Self>, ResourceError> {
        let folder = &layout.assets_folder;
        let dir = source.root.join(folder);
        if !dir.is_dir() {
            debug!(package = %source.name, "No assets folder");
            return Ok(None);
        }
        let container = Arc::new(source.container(folder));
        let manifest_path = dir.join(ASSETS_MANIFEST);

        let walker = WalkBuilder::new(&dir)
            .standard_filters(false)
            .follow_links(false)
            .threads(1)
            .build();

        let mut assets = BTreeMap::new();
        for result in walker {
            let entry = result?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = Utf8Path::from_path(entry.path())
                .ok_or_else(|| ResourceError::NonUtf8Path(entry.path().to_owned()))?;
            if path == manifest_path.as_path() {
                continue;
            }
            let Some(logical) = logical_path(&dir, path) else {
                continue;
            };
            let last_write_time = if source.is_local() {
                let modified = entry
                    .metadata()?
                    .modified()
                    .map_err(|e| ResourceError::read(path, e))?;
                Timestamp::from_system_time(modified)
            } else {
                UTC_MIN_VALUE
            };
            let origin = ResourceLocator::new(Arc::clone(&container), logical.as_str());
            assets.insert(
                logical,
                AssetEntry::new(origin, ResourceOverrideKind::None, last_write_time),
            );
        }

        if manifest_path.is_file() {
            for (logical, kind) in read_manifest(&manifest_path)?.kinds() {
                let Some(asset) = assets.get_mut(&logical) else {
                    return Err(ResourceError::invalid(
                        &manifest_path,
                        format!("listed asset '{logical}' does not exist"),
                    ));
                };
                asset.kind = kind;
            }
        }

        debug!(package = %source.name, assets = assets.len(), "Assets loaded");
        Ok(Some(Self::from_parts(source.name, assets)))
    }

    fn package_name(&self) -> &str {
        &self.package
    }

    fn len(&self) -> usize {
        self.assets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckl_core::ContainerKind;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("ts-assets");
        fs::create_dir_all(assets.join("img")).unwrap();
        fs::write(assets.join("img/logo.png"), b"png").unwrap();
        fs::write(assets.join("styles.css"), b"body {}").unwrap();
        fs::write(assets.join(".hidden"), b"kept").unwrap();
        fs::write(assets.join(ASSETS_MANIFEST), r#"{ "regular": ["img/logo.png"] }"#).unwrap();
        dir
    }

    #[test]
    fn test_load_regular_package() {
        let dir = fixture();
        let source = PackageSource {
            name: "Lib",
            root: Utf8Path::from_path(dir.path()).unwrap(),
            kind: ContainerKind::Embedded,
        };
        let set = PackageAssetSet::load(source, &LayoutConfig::default()).unwrap().unwrap();
        let paths: Vec<_> = set.assets().keys().map(String::as_str).collect();
        assert_eq!(paths, [".hidden", "img/logo.png", "styles.css"]);

        let logo = &set.assets()["img/logo.png"];
        assert_eq!(logo.kind, ResourceOverrideKind::Regular);
        assert!(logo.last_write_time.is_min());
        assert_eq!(set.assets()["styles.css"].kind, ResourceOverrideKind::None);
        assert!(logo.source_path().as_std_path().is_file());
    }

    #[test]
    fn test_load_local_package_has_write_times() {
        let dir = fixture();
        let source = PackageSource {
            name: "App",
            root: Utf8Path::from_path(dir.path()).unwrap(),
            kind: ContainerKind::FileSystem,
        };
        let set = PackageAssetSet::load(source, &LayoutConfig::default()).unwrap().unwrap();
        assert!(set.assets().values().all(|a| !a.last_write_time.is_min()));
        assert!(set.assets()["styles.css"].source_path().as_std_path().is_file());
    }

    #[test]
    fn test_manifest_listing_unknown_asset() {
        let dir = fixture();
        fs::write(
            dir.path().join("ts-assets").join(ASSETS_MANIFEST),
            r#"{ "always": ["missing.png"] }"#,
        )
        .unwrap();
        let source = PackageSource {
            name: "Lib",
            root: Utf8Path::from_path(dir.path()).unwrap(),
            kind: ContainerKind::Embedded,
        };
        let err = PackageAssetSet::load(source, &LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, ResourceError::InvalidResource { .. }));
    }

    #[test]
    fn test_logical_path() {
        let dir = Utf8Path::new("/p/ts-assets");
        assert_eq!(
            logical_path(dir, Utf8Path::new("/p/ts-assets/a/b.png")).as_deref(),
            Some("a/b.png")
        );
        assert_eq!(logical_path(dir, dir), None);
        assert_eq!(logical_path(dir, Utf8Path::new("/q/x.png")), None);
    }
}
