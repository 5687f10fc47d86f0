//! The flat asset aggregate.

use std::collections::BTreeMap;

use super::package::{AssetEntry, PackageAssetSet};
use crate::error::{MergeConflict, ResourceError};
use crate::kind::ResourceKind;
use crate::merge::{FinalSet, PackageSet, apply_override};

/// The override-resolved asset map of one or more asset sets.
///
/// Every addition is checked against the combined content so far, so a
/// `Regular` override can target an asset contributed several packages
/// earlier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalResourceAssetSet {
    assets: BTreeMap<String, AssetEntry>,
    partial: bool,
}

/// Differences between two asset views, as paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetChanges<'a> {
    /// Assets that are new or whose origin or write time changed.
    pub updated: Vec<&'a str>,
    /// Assets that no longer exist.
    pub removed: Vec<&'a str>,
}

impl AssetChanges<'_> {
    /// Returns `true` when both views are identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.removed.is_empty()
    }
}

impl FinalResourceAssetSet {
    /// Creates a set from deserialized entries.
    #[must_use]
    pub fn from_parts(assets: BTreeMap<String, AssetEntry>, partial: bool) -> Self {
        Self { assets, partial }
    }

    /// Returns the winning entry for a path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&AssetEntry> {
        self.assets.get(path)
    }

    /// Returns the assets, sorted by path.
    #[inline]
    #[must_use]
    pub fn assets(&self) -> &BTreeMap<String, AssetEntry> {
        &self.assets
    }

    /// Compares this view with a previous one.
    ///
    /// With no previous view every asset is reported as updated.
    #[must_use]
    pub fn changes_since<'a>(&'a self, previous: Option<&'a Self>) -> AssetChanges<'a> {
        let Some(previous) = previous else {
            return AssetChanges {
                updated: self.assets.keys().map(String::as_str).collect(),
                removed: Vec::new(),
            };
        };
        let updated = self
            .assets
            .iter()
            .filter(|(path, entry)| {
                previous.assets.get(*path).is_none_or(|old| {
                    old.origin != entry.origin || old.last_write_time != entry.last_write_time
                })
            })
            .map(|(path, _)| path.as_str())
            .collect();
        let removed = previous
            .assets
            .keys()
            .filter(|path| !self.assets.contains_key(*path))
            .map(String::as_str)
            .collect();
        AssetChanges { updated, removed }
    }

    fn add_entries<'a>(
        &mut self,
        entries: impl IntoIterator<Item = (&'a String, &'a AssetEntry)>,
        package: impl Fn(&AssetEntry) -> String,
    ) -> Result<(), ResourceError> {
        for (path, entry) in entries {
            apply_override(&mut self.assets, path, entry.clone(), self.partial, false).map_err(|reason| {
                MergeConflict {
                    kind: ResourceKind::Assets,
                    package: package(entry),
                    culture: None,
                    key: path.clone(),
                    reason,
                }
            })?;
        }
        Ok(())
    }
}

impl FinalSet for FinalResourceAssetSet {
    type Package = PackageAssetSet;

    fn new(partial: bool) -> Self {
        Self {
            assets: BTreeMap::new(),
            partial,
        }
    }

    fn is_partial(&self) -> bool {
        self.partial
    }

    fn len(&self) -> usize {
        self.assets.len()
    }

    fn add_package(&mut self, package: &PackageAssetSet) -> Result<(), ResourceError> {
        self.add_entries(package.assets(), |_| package.package_name().to_owned())
    }

    fn add_final(&mut self, other: &Self) -> Result<(), ResourceError> {
        self.add_entries(&other.assets, |entry| entry.origin.package_name().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConflictReason;
    use ckl_core::{
        ResourceContainer, ResourceLocator, ResourceOverrideKind, Timestamp, UTC_MIN_VALUE,
    };
    use std::sync::Arc;

    fn package(name: &str, entries: &[(&str, ResourceOverrideKind)]) -> PackageAssetSet {
        let container = Arc::new(ResourceContainer::embedded(name, format!("/{name}/ts-assets")));
        let assets = entries
            .iter()
            .map(|(path, kind)| {
                let origin = ResourceLocator::new(Arc::clone(&container), *path);
                ((*path).to_owned(), AssetEntry::new(origin, *kind, UTC_MIN_VALUE))
            })
            .collect();
        PackageAssetSet::from_parts(name, assets)
    }

    #[test]
    fn test_regular_override_targets_earlier_package() {
        let mut set = FinalResourceAssetSet::new(false);
        set.add_package(&package("A", &[("logo.png", ResourceOverrideKind::None)])).unwrap();
        set.add_package(&package("B", &[("other.png", ResourceOverrideKind::None)])).unwrap();
        set.add_package(&package("C", &[("logo.png", ResourceOverrideKind::Regular)])).unwrap();
        assert_eq!(set.get("logo.png").unwrap().origin.package_name(), "C");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_conflicts() {
        let mut set = FinalResourceAssetSet::new(false);
        set.add_package(&package("A", &[("logo.png", ResourceOverrideKind::None)])).unwrap();

        let err = set
            .add_package(&package("B", &[("logo.png", ResourceOverrideKind::None)]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "merge conflict: package 'B' redefines assets key 'logo.png' already defined by A:logo.png"
        );

        let err = set
            .add_package(&package("B", &[("none.png", ResourceOverrideKind::Regular)]))
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Conflict(MergeConflict {
                reason: ConflictReason::MissingTarget,
                ..
            })
        ));
    }

    #[test]
    fn test_optional_and_always() {
        let mut set = FinalResourceAssetSet::new(false);
        set.add_package(&package("A", &[("a.png", ResourceOverrideKind::None)])).unwrap();
        set.add_package(&package(
            "B",
            &[
                ("a.png", ResourceOverrideKind::Optional),
                ("b.png", ResourceOverrideKind::Optional),
                ("c.png", ResourceOverrideKind::Always),
            ],
        ))
        .unwrap();
        assert_eq!(set.get("a.png").unwrap().origin.package_name(), "B");
        assert!(set.get("b.png").is_none());
        assert_eq!(set.get("c.png").unwrap().kind, ResourceOverrideKind::Always);
    }

    #[test]
    fn test_changes_since() {
        let mut old = FinalResourceAssetSet::new(false);
        old.add_package(&package(
            "A",
            &[("a.png", ResourceOverrideKind::None), ("gone.png", ResourceOverrideKind::None)],
        ))
        .unwrap();

        let mut new = FinalResourceAssetSet::new(false);
        new.add_package(&package(
            "A",
            &[("a.png", ResourceOverrideKind::None), ("b.png", ResourceOverrideKind::None)],
        ))
        .unwrap();
        let changes = new.changes_since(Some(&old));
        assert_eq!(changes.updated, ["b.png"]);
        assert_eq!(changes.removed, ["gone.png"]);

        let mut touched = new.clone();
        let container = Arc::new(ResourceContainer::file_system("A", "/A/ts-assets/"));
        touched.assets.insert(
            "a.png".to_owned(),
            AssetEntry::new(
                ResourceLocator::new(container, "a.png"),
                ResourceOverrideKind::None,
                Timestamp::from_micros(5),
            ),
        );
        assert_eq!(touched.changes_since(Some(&new)).updated, ["a.png"]);
        assert!(new.changes_since(Some(&new)).is_empty());
        assert_eq!(new.changes_since(None).updated.len(), 2);
    }
}
