//! Shared merge machinery: the package/final set traits and the override rule.
//!
//! Every resource kind resolves keys with the same four-way policy
//! ([`ResourceOverrideKind`]). [`apply_override`] is the single place the rule
//! lives; the locale and asset aggregates call it per key.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use camino::Utf8Path;
use ckl_core::{
    ContainerKind, LayoutConfig, LocalPackage, PackageManifest, ResourceContainer, ResourceLocator,
    ResourceOverrideKind,
};

use crate::error::{ConflictReason, ResourceError};
use crate::kind::ResourceKind;

/// A package as seen by a loader: its name, root folder and container kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageSource<'a> {
    /// Package name.
    pub name: &'a str,
    /// Package root directory.
    pub root: &'a Utf8Path,
    /// `Embedded` for regular packages, `FileSystem` for local ones.
    pub kind: ContainerKind,
}

impl<'a> PackageSource<'a> {
    /// Source of a regular package.
    #[must_use]
    pub fn regular(package: &'a PackageManifest) -> Self {
        Self {
            name: &package.name,
            root: &package.path,
            kind: ContainerKind::Embedded,
        }
    }

    /// Source of a local package.
    #[must_use]
    pub fn local(package: &'a LocalPackage) -> Self {
        Self {
            name: package.name(),
            root: package.root(),
            kind: ContainerKind::FileSystem,
        }
    }

    /// Returns `true` when the resources are read live from disk.
    #[inline]
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self.kind, ContainerKind::FileSystem)
    }

    /// Creates the container for one resource folder of this package.
    ///
    /// Local containers keep a trailing separator on their root.
    #[must_use]
    pub fn container(&self, folder: &str) -> ResourceContainer {
        let mut root = self.root.join(folder).into_string();
        if self.is_local() {
            root.push(std::path::MAIN_SEPARATOR);
        }
        ResourceContainer::new(self.kind, self.name, root)
    }
}

/// Resources of one kind contributed by one package.
pub trait PackageSet: Sized + Send {
    /// The resource kind this set holds.
    const KIND: ResourceKind;

    /// Loads the set from the package folder.
    ///
    /// Returns `Ok(None)` when the package has no folder for this kind.
    ///
    /// # Errors
    ///
    /// Read, parse and validation errors of the resource files.
    fn load(source: PackageSource<'_>, layout: &LayoutConfig) -> Result<Option<Self>, ResourceError>;

    /// Returns the contributing package name.
    fn package_name(&self) -> &str;

    /// Returns the number of resources in the set.
    fn len(&self) -> usize;

    /// Returns `true` when the set holds no resource.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An override-resolved aggregate of package sets.
///
/// A *partial* set is one that does not start the application view: override
/// checks that need earlier content are deferred until it is folded into a
/// full target with [`add_final`](Self::add_final).
pub trait FinalSet: Sized + Send + Sync {
    /// The package set this aggregate accumulates.
    type Package: PackageSet;

    /// Creates an empty aggregate.
    fn new(partial: bool) -> Self;

    /// Returns `true` for a partial aggregate.
    fn is_partial(&self) -> bool;

    /// Returns the number of resolved resources.
    fn len(&self) -> usize;

    /// Returns `true` when the aggregate holds no resource.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds one package set, applying override rules against the combined
    /// content so far.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Conflict`] when an override rule is violated. The
    /// aggregate must be discarded after an error.
    fn add_package(&mut self, package: &Self::Package) -> Result<(), ResourceError>;

    /// Folds another aggregate into this one, re-applying each entry's stored
    /// override kind.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Conflict`] when an override rule is violated.
    fn add_final(&mut self, other: &Self) -> Result<(), ResourceError>;
}

/// An entry in a final aggregate map.
pub(crate) trait MergeEntry {
    fn kind(&self) -> ResourceOverrideKind;
    fn set_kind(&mut self, kind: ResourceOverrideKind);
    fn origin(&self) -> &ResourceLocator;
}

/// What [`apply_override`] did with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeOutcome {
    Added,
    Replaced,
    /// `Optional` override of an absent key in a full set.
    Skipped,
    /// `Regular`/`Optional` override of an absent key in a partial set.
    Deferred,
}

/// Applies the override rule for one key.
///
/// - `None` requires the key to be absent (an existing deferred `Optional`
///   entry yields to it).
/// - `Regular` requires the key to exist.
/// - `Optional` replaces an existing key and is skipped otherwise.
/// - `Always` inserts or replaces.
///
/// A replaced entry keeps the kind of its first contributor, unless that
/// contributor was a deferred `Optional`.
///
/// `inherited` marks an override whose target lives outside `map` (a parent
/// culture): it is stored as applied even in a full set. Only a partial set
/// holds deferred entries.
pub(crate) fn apply_override<E: MergeEntry>(
    map: &mut BTreeMap<String, E>,
    key: &str,
    mut entry: E,
    partial: bool,
    inherited: bool,
) -> Result<MergeOutcome, ConflictReason> {
    match map.entry(key.to_owned()) {
        Entry::Occupied(mut slot) => {
            let previous = slot.get().kind();
            if entry.kind() == ResourceOverrideKind::None {
                if !partial || previous != ResourceOverrideKind::Optional {
                    return Err(ConflictReason::AlreadyDefined {
                        previous: slot.get().origin().to_string(),
                    });
                }
            } else if previous != ResourceOverrideKind::Optional {
                entry.set_kind(previous);
            }
            slot.insert(entry);
            Ok(MergeOutcome::Replaced)
        }
        Entry::Vacant(slot) => match entry.kind() {
            ResourceOverrideKind::None | ResourceOverrideKind::Always => {
                slot.insert(entry);
                Ok(MergeOutcome::Added)
            }
            ResourceOverrideKind::Regular | ResourceOverrideKind::Optional if inherited && !partial => {
                slot.insert(entry);
                Ok(MergeOutcome::Added)
            }
            ResourceOverrideKind::Regular if partial => {
                slot.insert(entry);
                Ok(MergeOutcome::Deferred)
            }
            ResourceOverrideKind::Regular => Err(ConflictReason::MissingTarget),
            ResourceOverrideKind::Optional if partial => {
                slot.insert(entry);
                Ok(MergeOutcome::Deferred)
            }
            ResourceOverrideKind::Optional => Ok(MergeOutcome::Skipped),
        },
    }
}
