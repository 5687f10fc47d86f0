//! Resource containers.
//!
//! A container owns a set of resources. Regular packages are captured into
//! [`ContainerKind::Embedded`] containers at build time; local packages are
//! read from [`ContainerKind::FileSystem`] containers that may change while a
//! live session runs.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// The storage behind a [`ResourceContainer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ContainerKind {
    /// Content fixed at build time (packaged library resources).
    Embedded = 0,
    /// Content read from a local directory that can change at any time.
    FileSystem = 1,
}

impl ContainerKind {
    /// Returns the byte used for this kind in the state file.
    #[inline]
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Decodes a kind byte, returning `None` for unknown values.
    ///
    /// # Examples
    ///
    /// ```
    /// use ckl_core::ContainerKind;
    ///
    /// assert_eq!(ContainerKind::from_byte(1), Some(ContainerKind::FileSystem));
    /// assert_eq!(ContainerKind::from_byte(7), None);
    /// ```
    #[inline]
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Embedded),
            1 => Some(Self::FileSystem),
            _ => None,
        }
    }
}

/// An identified owner of resources.
///
/// Containers are shared behind an `Arc` by every [`ResourceLocator`] that
/// points into them. Equality is structural: two containers are equal when
/// kind, name and root are equal.
///
/// [`ResourceLocator`]: crate::ResourceLocator
///
/// # Examples
///
/// ```
/// use ckl_core::{ContainerKind, ResourceContainer};
///
/// let c = ResourceContainer::file_system("App", "/proj/app/ts-assets");
/// assert_eq!(c.kind(), ContainerKind::FileSystem);
/// assert_eq!(c.resource_path("img/logo.png").as_str(), "/proj/app/ts-assets/img/logo.png");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceContainer {
    kind: ContainerKind,
    name: String,
    root: Utf8PathBuf,
}

impl ResourceContainer {
    /// Creates a container of the given kind.
    #[must_use]
    pub fn new(kind: ContainerKind, name: impl Into<String>, root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            kind,
            name: name.into(),
            root: root.into(),
        }
    }

    /// Creates an embedded container for a regular package.
    #[must_use]
    pub fn embedded(name: impl Into<String>, root: impl Into<Utf8PathBuf>) -> Self {
        Self::new(ContainerKind::Embedded, name, root)
    }

    /// Creates a file system container for a local package.
    #[must_use]
    pub fn file_system(name: impl Into<String>, root: impl Into<Utf8PathBuf>) -> Self {
        Self::new(ContainerKind::FileSystem, name, root)
    }

    /// Returns the container kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Returns the display name (the owning package name).
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the directory the resources were (or are) read from.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns `true` for containers whose content can change during a session.
    #[inline]
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self.kind, ContainerKind::FileSystem)
    }

    /// Resolves a `/`-separated logical path to a file path under the root.
    #[must_use]
    pub fn resource_path(&self, path: &str) -> Utf8PathBuf {
        self.root.join(path)
    }
}

impl std::fmt::Display for ResourceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ContainerKind::Embedded => write!(f, "{} (embedded)", self.name),
            ContainerKind::FileSystem => write!(f, "{} ({})", self.name, self.root),
        }
    }
}
