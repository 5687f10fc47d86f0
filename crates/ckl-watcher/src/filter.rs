//! Path classification for watch events.
//!
//! This module turns a raw changed path into a [`ChangeEvent`], or `None` when
//! the path is irrelevant. Classification runs on the blocking watcher thread
//! before events reach the channel, so irrelevant paths never cross it.
//!
//! # Design
//!
//! The [`ChangeFilter`] trait is a pure function of the path plus immutable
//! captured state. Filters hold no mutable state and can be called from
//! several watch callbacks at once.
//!
//! - [`LocalPackagesFilter`] - the primary state file and local package roots
//! - [`FolderFilter`] - one watched application folder
//! - [`CompositeFilter`] - the first match of a list of filters
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use camino::Utf8Path;
//! use ckl_core::LocalPackage;
//! use ckl_watcher::{ChangeEvent, ChangeFilter, LocalPackagesFilter};
//!
//! let pkg = Arc::new(LocalPackage::new(0, "pkgA", "/proj/pkgA/"));
//! let filter = LocalPackagesFilter::new("/proj/.ck-live/LiveState.dat", vec![pkg]);
//!
//! assert!(matches!(
//!     filter.classify(Utf8Path::new("/proj/pkgA/ts-locales/fr.json")),
//!     Some(ChangeEvent::Local { sub_path, .. }) if sub_path.as_str() == "ts-locales/fr.json"
//! ));
//! assert!(filter.classify(Utf8Path::new("/proj/other/file.txt")).is_none());
//! ```

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ckl_core::LocalPackage;
use smallvec::SmallVec;

use crate::events::ChangeEvent;

/// Classifies a changed path.
///
/// # Thread Safety
///
/// Filters must be [`Send`] and [`Sync`] because they are used from the
/// blocking watcher thread. They must also be `'static` to be moved into
/// the spawned task.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use ckl_watcher::{ChangeEvent, ChangeFilter};
///
/// struct StateOnly;
///
/// impl ChangeFilter for StateOnly {
///     fn classify(&self, path: &Utf8Path) -> Option<ChangeEvent> {
///         (path.file_name() == Some("LiveState.dat")).then_some(ChangeEvent::PrimaryStateChanged)
///     }
/// }
/// ```
pub trait ChangeFilter: Send + Sync + 'static {
    /// Returns the classification of `path`, or `None` to discard it.
    fn classify(&self, path: &Utf8Path) -> Option<ChangeEvent>;
}

/// Returns `path` relative to `root`: empty for the root itself, `None`
/// outside of it. Matching is component-wise, so `/a/bc` is not under `/a/b`.
fn relative_to(root: &Utf8Path, path: &Utf8Path) -> Option<Utf8PathBuf> {
    path.strip_prefix(root).ok().map(Utf8Path::to_path_buf)
}

/// Classifies the primary state file and changes under local packages.
///
/// Rules, first match wins:
///
/// 1. The exact state file path is [`ChangeEvent::PrimaryStateChanged`],
///    even when it lies inside a package.
/// 2. Paths under an excluded folder (the engine's cache and output) are
///    ignored.
/// 3. The root of a package, or any path under it, is a
///    [`ChangeEvent::Local`] for the first such package.
#[derive(Debug, Clone)]
pub struct LocalPackagesFilter {
    state_file: Utf8PathBuf,
    packages: Vec<Arc<LocalPackage>>,
    excluded: SmallVec<[Utf8PathBuf; 2]>,
}

impl LocalPackagesFilter {
    /// Creates a filter for the given state file and packages.
    #[must_use]
    pub fn new(state_file: impl Into<Utf8PathBuf>, packages: Vec<Arc<LocalPackage>>) -> Self {
        Self {
            state_file: state_file.into(),
            packages,
            excluded: SmallVec::new(),
        }
    }

    /// Ignores every path under `dir`, except the state file itself.
    #[must_use]
    pub fn exclude(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        let dir = dir.into();
        if !self.excluded.contains(&dir) {
            self.excluded.push(dir);
        }
        self
    }

    /// Returns the state file path.
    #[inline]
    #[must_use]
    pub fn state_file(&self) -> &Utf8Path {
        &self.state_file
    }

    /// Returns the tracked packages.
    #[inline]
    #[must_use]
    pub fn packages(&self) -> &[Arc<LocalPackage>] {
        &self.packages
    }

    fn is_excluded(&self, path: &Utf8Path) -> bool {
        self.excluded.iter().any(|dir| path.starts_with(dir))
    }
}

impl ChangeFilter for LocalPackagesFilter {
    fn classify(&self, path: &Utf8Path) -> Option<ChangeEvent> {
        if path == self.state_file.as_path() {
            return Some(ChangeEvent::PrimaryStateChanged);
        }
        if self.is_excluded(path) {
            return None;
        }
        self.packages.iter().find_map(|package| {
            package.relative_path(path).map(|sub_path| ChangeEvent::Local {
                package: Arc::clone(package),
                sub_path,
            })
        })
    }
}

/// Reports changes under one watched application folder.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use ckl_watcher::{ChangeFilter, FolderFilter};
///
/// let filter = FolderFilter::new("/proj/ck-gen-transform");
/// assert!(filter.classify(Utf8Path::new("/proj/ck-gen-transform/a.ts")).is_some());
/// assert!(filter.classify(Utf8Path::new("/proj/ck-gen-transformer/a.ts")).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderFilter {
    folder: Utf8PathBuf,
}

impl FolderFilter {
    /// Creates a filter for `folder`.
    #[must_use]
    pub fn new(folder: impl Into<Utf8PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// Returns the watched folder.
    #[inline]
    #[must_use]
    pub fn folder(&self) -> &Utf8Path {
        &self.folder
    }
}

impl ChangeFilter for FolderFilter {
    fn classify(&self, path: &Utf8Path) -> Option<ChangeEvent> {
        relative_to(&self.folder, path).map(|sub_path| ChangeEvent::Folder {
            folder: self.folder.clone(),
            sub_path,
        })
    }
}

/// A filter returning the first match of its sub-filters, in order.
///
/// An empty composite filter classifies nothing.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use ckl_watcher::{ChangeEvent, ChangeFilter, CompositeFilter, FolderFilter, LocalPackagesFilter};
///
/// let filter = CompositeFilter::new()
///     .or(LocalPackagesFilter::new("/proj/.ck-live/LiveState.dat", Vec::new()))
///     .or(FolderFilter::new("/proj/ck-gen-transform"));
///
/// assert_eq!(
///     filter.classify(Utf8Path::new("/proj/.ck-live/LiveState.dat")),
///     Some(ChangeEvent::PrimaryStateChanged)
/// );
/// assert!(filter.classify(Utf8Path::new("/proj/README.md")).is_none());
/// ```
pub struct CompositeFilter {
    filters: Vec<Box<dyn ChangeFilter>>,
}

impl CompositeFilter {
    /// Creates a new empty composite filter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Adds a filter, tried after the ones already added.
    #[must_use]
    pub fn or<F: ChangeFilter>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Returns the number of sub-filters.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` when there are no sub-filters.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for CompositeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompositeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeFilter")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl ChangeFilter for CompositeFilter {
    fn classify(&self, path: &Utf8Path) -> Option<ChangeEvent> {
        self.filters.iter().find_map(|f| f.classify(path))
    }
}

impl<F: ChangeFilter + ?Sized> ChangeFilter for Box<F> {
    fn classify(&self, path: &Utf8Path) -> Option<ChangeEvent> {
        (**self).classify(path)
    }
}

impl<F: ChangeFilter + ?Sized> ChangeFilter for Arc<F> {
    fn classify(&self, path: &Utf8Path) -> Option<ChangeEvent> {
        (**self).classify(path)
    }
}
