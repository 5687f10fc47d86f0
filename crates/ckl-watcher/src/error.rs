//! Error types for the ckl-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while watching files or running a live session.

use camino::Utf8PathBuf;
use ckl_resources::ResourceError;
use ckl_state::StateError;

/// Errors that can occur during file watching and live sessions.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): Fatal - propagate immediately
/// - **Path not found** ([`WatchError::PathNotFound`]): Fatal - path must exist
/// - **Channel closed** ([`WatchError::ChannelClosed`]): Fatal - communication broken
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): Recoverable - skip and continue
/// - **State errors** ([`WatchError::State`]): Fatal - rebuild, then reopen the session
/// - **Resource errors** ([`WatchError::Resource`]): Fatal when opening a
///   session; reload failures are reported as outcomes instead
/// - **I/O errors** ([`WatchError::Io`]): Fatal - propagate immediately
///
/// # Examples
///
/// ```
/// use ckl_watcher::WatchError;
///
/// fn handle_error(err: WatchError) {
///     if err.is_fatal() {
///         eprintln!("Fatal watcher error: {err}");
///     } else {
///         eprintln!("Warning: {err}");
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The specified path does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The event channel was closed unexpectedly.
    #[error("event channel closed unexpectedly")]
    ChannelClosed,

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// The state file could not be read.
    #[error(transparent)]
    State(#[from] StateError),

    /// Resources could not be loaded or merged.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Returns `true` if this error is recoverable (watching can continue).
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_))
    }

    /// Returns `true` if this error is fatal (watching should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns `true` when a fresh build may fix the error: the state file
    /// is missing or malformed, or resources do not merge.
    #[must_use]
    pub fn needs_rebuild(&self) -> bool {
        matches!(self, Self::State(_) | Self::Resource(_))
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) => Some(path),
            Self::State(e) => e.path(),
            Self::Resource(e) => e.path(),
            Self::Notify(_) | Self::ChannelClosed | Self::NonUtf8Path(_) | Self::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_watch_error_path_not_found() {
        let err = WatchError::path_not_found("/proj/missing");
        assert!(err.is_fatal());
        assert!(!err.needs_rebuild());
        assert_eq!(err.path().map(|p| p.as_str()), Some("/proj/missing"));
        assert_eq!(err.to_string(), "path does not exist: /proj/missing");
    }

    #[test]
    fn test_watch_error_state() {
        let err = WatchError::from(StateError::read(
            "/proj/.ck-live/LiveState.dat",
            io::Error::from(io::ErrorKind::NotFound),
        ));
        assert!(err.is_fatal());
        assert!(err.needs_rebuild());
        assert_eq!(err.path().map(|p| p.as_str()), Some("/proj/.ck-live/LiveState.dat"));
    }

    #[test]
    fn test_watch_error_non_utf8() {
        let err = WatchError::NonUtf8Path(std::path::PathBuf::from("x"));
        assert!(err.is_recoverable());
        assert!(err.path().is_none());
    }
}
