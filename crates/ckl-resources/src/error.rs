//! Error types for the ckl-resources crate.
//!
//! This module provides [`ResourceError`] for loading, merging and writing
//! resources, and [`MergeConflict`] describing an override rule violation.

use camino::Utf8PathBuf;

use crate::kind::ResourceKind;

/// Why an override rule rejected a contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// A definition (`None` kind) targets a key that already exists.
    AlreadyDefined {
        /// The resource that defined the key first.
        previous: String,
    },
    /// A `Regular` override targets a key that does not exist.
    MissingTarget,
}

/// An override rule violation, naming the package and the key.
///
/// # Examples
///
/// ```
/// use ckl_resources::{ConflictReason, MergeConflict, ResourceKind};
///
/// let conflict = MergeConflict {
///     kind: ResourceKind::Locales,
///     package: "App".to_owned(),
///     culture: Some("fr".to_owned()),
///     key: "Title".to_owned(),
///     reason: ConflictReason::MissingTarget,
/// };
/// assert_eq!(
///     conflict.to_string(),
///     "package 'App' overrides missing locales key 'Title' (culture 'fr')"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConflict {
    /// Resource kind being merged.
    pub kind: ResourceKind,
    /// Package whose contribution was rejected.
    pub package: String,
    /// Culture of the translation, for locales.
    pub culture: Option<String>,
    /// Translation key or asset path.
    pub key: String,
    /// Violated rule.
    pub reason: ConflictReason,
}

impl std::fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            ConflictReason::AlreadyDefined { previous } => write!(
                f,
                "package '{}' redefines {} key '{}' already defined by {previous}",
                self.package, self.kind, self.key
            )?,
            ConflictReason::MissingTarget => write!(
                f,
                "package '{}' overrides missing {} key '{}'",
                self.package, self.kind, self.key
            )?,
        }
        if let Some(culture) = &self.culture {
            write!(f, " (culture '{culture}')")?;
        }
        Ok(())
    }
}

/// Errors that can occur while loading, merging or writing resources.
///
/// # Error Recovery Strategy
///
/// - **Conflicts** ([`ResourceError::Conflict`]): fatal to a build; during a
///   live session the previous view is kept
/// - **Read/parse errors**: fatal to a build; during a live session the
///   previous view is kept until the file is fixed
/// - **Write errors**: output may be incomplete, rerun the build
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// An override rule was violated.
    #[error("merge conflict: {0}")]
    Conflict(MergeConflict),

    /// Failed to read a resource file or folder.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The path that couldn't be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A resource file is not valid JSON.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// The file that couldn't be parsed.
        path: Utf8PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A resource file is valid JSON but not a valid resource.
    #[error("invalid resource {path}: {reason}")]
    InvalidResource {
        /// The offending file.
        path: Utf8PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// Failed to walk an asset folder.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// Failed to write generated output.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The path that couldn't be written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ResourceError {
    /// Creates a new [`ResourceError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ResourceError::Parse`] error.
    #[inline]
    pub fn parse(path: impl Into<Utf8PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ResourceError::InvalidResource`] error.
    #[inline]
    pub fn invalid(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidResource {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new [`ResourceError::Write`] error.
    #[inline]
    pub fn write(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for override rule violations.
    #[inline]
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Read { path, .. }
            | Self::Parse { path, .. }
            | Self::InvalidResource { path, .. }
            | Self::Write { path, .. } => Some(path),
            Self::Conflict(_) | Self::Walk(_) | Self::NonUtf8Path(_) => None,
        }
    }
}

impl From<MergeConflict> for ResourceError {
    fn from(conflict: MergeConflict) -> Self {
        Self::Conflict(conflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_conflict_display_already_defined() {
        let err = ResourceError::from(MergeConflict {
            kind: ResourceKind::Assets,
            package: "Theme".to_owned(),
            culture: None,
            key: "img/logo.png".to_owned(),
            reason: ConflictReason::AlreadyDefined {
                previous: "Lib:img/logo.png".to_owned(),
            },
        });
        assert!(err.is_conflict());
        assert!(err.path().is_none());
        assert_eq!(
            err.to_string(),
            "merge conflict: package 'Theme' redefines assets key 'img/logo.png' already defined by Lib:img/logo.png"
        );
    }

    #[test]
    fn test_read_error_path() {
        let err = ResourceError::read(
            "pkg/ts-locales/fr.json",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_conflict());
        assert_eq!(err.path().map(|p| p.as_str()), Some("pkg/ts-locales/fr.json"));
    }

    #[test]
    fn test_invalid_resource_display() {
        let err = ResourceError::invalid("x.json", "root must be an object");
        assert_eq!(err.to_string(), "invalid resource x.json: root must be an object");
    }
}
