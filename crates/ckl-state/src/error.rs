//! Error types for the ckl-state crate.

use camino::Utf8PathBuf;

/// Errors that can occur while writing or reading a state file.
///
/// Every read error is fatal to a live session: the session must not start
/// against an inconsistent state, and the remedy is a fresh build.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The data ends before the structure it describes.
    #[error("state data is truncated")]
    Truncated,

    /// The data does not start with the state file magic.
    #[error("not a state file (bad magic)")]
    BadMagic,

    /// The format version is not supported.
    #[error("unsupported state format version {0}")]
    UnsupportedVersion(u8),

    /// An override kind byte is out of range.
    #[error("invalid override kind byte {0}")]
    InvalidOverrideKind(u8),

    /// A segment index is negative (other than `-1`) or past the local
    /// package array.
    #[error("invalid segment index {index} ({locals} local packages)")]
    InvalidSegmentIndex {
        /// The index found.
        index: i64,
        /// Length of the local package array.
        locals: usize,
    },

    /// A container reference has an unknown tag, kind or pool index.
    #[error("invalid container reference: {0}")]
    InvalidContainerRef(String),

    /// A string is not valid UTF-8.
    #[error("invalid UTF-8 string in state data")]
    InvalidUtf8,

    /// The data decodes but describes an impossible state.
    #[error("corrupt state data: {0}")]
    Corrupt(String),

    /// A length does not fit the format.
    #[error("value too large to serialize: {0}")]
    TooLarge(usize),

    /// Failed to read a state file.
    #[error("failed to read state file {path}: {source}")]
    Read {
        /// The state file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a state file.
    #[error("failed to write state file {path}: {source}")]
    Write {
        /// The state file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error on an in-memory or caller-provided stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StateError {
    /// Creates a new [`StateError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`StateError::Write`] error.
    #[inline]
    pub fn write(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` when the data itself is malformed, as opposed to an
    /// I/O failure.
    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        !matches!(self, Self::Read { .. } | Self::Write { .. } | Self::Io(_))
    }

    /// Returns `true` when the state file does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }

    /// Returns the state file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Read { path, .. } | Self::Write { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_classification() {
        assert!(StateError::Truncated.is_corrupt());
        assert!(StateError::BadMagic.is_corrupt());
        let missing = StateError::read("/app/.ck-live/LiveState.dat", io::Error::from(io::ErrorKind::NotFound));
        assert!(!missing.is_corrupt());
        assert!(missing.is_not_found());
        assert_eq!(missing.path().map(|p| p.as_str()), Some("/app/.ck-live/LiveState.dat"));
    }

    #[test]
    fn test_error_display() {
        let err = StateError::InvalidSegmentIndex { index: 4, locals: 2 };
        assert_eq!(err.to_string(), "invalid segment index 4 (2 local packages)");
    }
}
