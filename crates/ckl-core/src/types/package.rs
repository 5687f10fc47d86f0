//! Local package references.

use camino::{Utf8Path, Utf8PathBuf};

/// A package whose resources live in an on-disk directory that can change at
/// any time during a live session.
///
/// The `idx` addresses the package inside serialized segment lists without
/// re-embedding its identity: segment index `n` refers to the `n`-th entry of
/// the local package array used when the state file was written.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use ckl_core::LocalPackage;
///
/// let pkg = LocalPackage::new(0, "App", "/proj/pkgA/");
/// assert_eq!(pkg.root().as_str(), "/proj/pkgA");
/// assert_eq!(
///     pkg.relative_path(Utf8Path::new("/proj/pkgA/ts-locales/fr.json")).map(|p| p.into_string()),
///     Some("ts-locales/fr.json".to_owned())
/// );
/// assert!(pkg.relative_path(Utf8Path::new("/proj/pkgAB/file.txt")).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalPackage {
    idx: usize,
    name: String,
    root: Utf8PathBuf,
    /// `root` followed by a single separator.
    prefix: String,
}

impl LocalPackage {
    /// Creates a local package reference. Trailing separators on `root` are
    /// ignored.
    #[must_use]
    pub fn new(idx: usize, name: impl Into<String>, root: impl AsRef<Utf8Path>) -> Self {
        let trimmed = root
            .as_ref()
            .as_str()
            .trim_end_matches(['/', std::path::MAIN_SEPARATOR]);
        let root = Utf8PathBuf::from(trimmed);
        let prefix = format!("{trimmed}{}", std::path::MAIN_SEPARATOR);
        Self {
            idx,
            name: name.into(),
            root,
            prefix,
        }
    }

    /// Returns the index of this package in the local package array.
    #[inline]
    #[must_use]
    pub const fn idx(&self) -> usize {
        self.idx
    }

    /// Returns the package name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the package root directory, without trailing separator.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the package root followed by a separator.
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the path of a resource sub-folder such as `ts-locales`.
    #[must_use]
    pub fn folder(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    /// Returns `path` relative to the package root, or `None` when `path` is
    /// outside the package.
    ///
    /// The root directory itself maps to an empty relative path.
    #[must_use]
    pub fn relative_path(&self, path: &Utf8Path) -> Option<Utf8PathBuf> {
        let path = path.as_str();
        if path.len() == self.prefix.len() - 1 && self.prefix.starts_with(path) {
            return Some(Utf8PathBuf::new());
        }
        path.strip_prefix(self.prefix.as_str()).map(Utf8PathBuf::from)
    }
}
