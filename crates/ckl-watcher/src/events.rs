//! Classified change events.
//!
//! # Event Flow
//!
//! ```text
//! File System Change
//!        │
//!        ▼
//! notify-debouncer-mini (100ms debounce)
//!        │
//!        ▼
//! ChangeFilter::classify ──► None: dropped
//!        │
//!        ▼
//!   FileEvent { path, change }
//!        │
//!        ▼
//!   FileEventBatch ──► LiveSession::process_batch
//! ```

use std::sync::Arc;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use ckl_core::LocalPackage;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// What a changed path means to a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The primary state file changed: the session must be reset.
    PrimaryStateChanged,

    /// A path under a tracked local package changed.
    Local {
        /// The owning package.
        package: Arc<LocalPackage>,
        /// Path relative to the package root; empty for the root itself.
        sub_path: Utf8PathBuf,
    },

    /// A path under a watched application folder changed.
    Folder {
        /// The watched folder.
        folder: Utf8PathBuf,
        /// Path relative to the folder; empty for the folder itself.
        sub_path: Utf8PathBuf,
    },
}

impl ChangeEvent {
    /// Returns `true` for the reset sentinel.
    #[inline]
    #[must_use]
    pub const fn is_reset(&self) -> bool {
        matches!(self, Self::PrimaryStateChanged)
    }

    /// Returns the sub-path of a local or folder change.
    #[must_use]
    pub fn sub_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Local { sub_path, .. } | Self::Folder { sub_path, .. } => Some(sub_path),
            Self::PrimaryStateChanged => None,
        }
    }
}

/// A classified file change event with a UTF-8 path guarantee.
///
/// The event does not distinguish between create, modify, or delete
/// operations since the debouncer intentionally abstracts these details.
///
/// # Examples
///
/// ```
/// use ckl_watcher::{ChangeEvent, FileEvent};
/// use camino::Utf8PathBuf;
///
/// let event = FileEvent::new(Utf8PathBuf::from("/app/.ck-live/LiveState.dat"), ChangeEvent::PrimaryStateChanged);
/// assert!(event.change.is_reset());
/// assert_eq!(event.file_name(), Some("LiveState.dat"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// The absolute path that changed.
    pub path: Utf8PathBuf,

    /// The classification of the path.
    pub change: ChangeEvent,

    /// When this event was received.
    pub timestamp: Instant,
}

impl FileEvent {
    /// Creates a new file event. The timestamp is set to the current instant.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf, change: ChangeEvent) -> Self {
        Self::with_timestamp(path, change, Instant::now())
    }

    /// Creates a new file event with a specific timestamp.
    #[inline]
    #[must_use]
    pub const fn with_timestamp(path: Utf8PathBuf, change: ChangeEvent, timestamp: Instant) -> Self {
        Self {
            path,
            change,
            timestamp,
        }
    }

    /// Returns the file name without the directory path.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }
}

/// A batch of file events received together.
///
/// Uses [`SmallVec`] with inline storage for up to 8 events, avoiding heap
/// allocation in the common case of small batches.
///
/// # Examples
///
/// ```
/// use ckl_watcher::{ChangeEvent, FileEvent, FileEventBatch};
/// use camino::Utf8PathBuf;
///
/// let mut batch = FileEventBatch::new();
/// batch.push(FileEvent::new(Utf8PathBuf::from("/app/.ck-live/LiveState.dat"), ChangeEvent::PrimaryStateChanged));
///
/// assert_eq!(batch.len(), 1);
/// assert!(batch.is_reset());
/// ```
#[derive(Debug, Clone)]
pub struct FileEventBatch {
    /// The events in this batch.
    pub events: SmallVec<[FileEvent; 8]>,

    /// The timestamp when this batch was created.
    pub received_at: Instant,
}

impl FileEventBatch {
    /// Creates a new empty batch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: SmallVec::new(),
            received_at: Instant::now(),
        }
    }

    /// Creates a batch from events.
    #[inline]
    #[must_use]
    pub fn from_events(events: impl IntoIterator<Item = FileEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            received_at: Instant::now(),
        }
    }

    /// Adds an event to the batch.
    #[inline]
    pub fn push(&mut self, event: FileEvent) {
        self.events.push(event);
    }

    /// Returns the number of events in this batch.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if the batch contains no events.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns an iterator over the events.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &FileEvent> {
        self.events.iter()
    }

    /// Returns `true` when any event is the reset sentinel.
    #[must_use]
    pub fn is_reset(&self) -> bool {
        self.events.iter().any(|e| e.change.is_reset())
    }

    /// Returns the unique paths in this batch.
    #[must_use]
    pub fn unique_paths(&self) -> Vec<&Utf8PathBuf> {
        let mut paths: Vec<&Utf8PathBuf> = self.events.iter().map(|e| &e.path).collect();
        paths.sort();
        paths.dedup();
        paths
    }
}

impl Default for FileEventBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl IntoIterator for FileEventBatch {
    type Item = FileEvent;
    type IntoIter = smallvec::IntoIter<[FileEvent; 8]>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a FileEventBatch {
    type Item = &'a FileEvent;
    type IntoIter = std::slice::Iter<'a, FileEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl FromIterator<FileEvent> for FileEventBatch {
    fn from_iter<T: IntoIterator<Item = FileEvent>>(iter: T) -> Self {
        Self::from_events(iter)
    }
}

/// Summary statistics for a batch of events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBatchStats {
    /// Total number of events in the batch.
    pub total_events: usize,

    /// Number of events under local packages.
    pub local_events: usize,

    /// Number of events under watched folders.
    pub folder_events: usize,

    /// Number of unique paths affected.
    pub unique_files: usize,

    /// Whether the batch resets the session.
    pub reset: bool,
}

impl EventBatchStats {
    /// Computes statistics for a batch of events.
    #[must_use]
    pub fn from_batch(batch: &FileEventBatch) -> Self {
        let count = |f: fn(&ChangeEvent) -> bool| batch.iter().filter(|e| f(&e.change)).count();
        Self {
            total_events: batch.len(),
            local_events: count(|c| matches!(c, ChangeEvent::Local { .. })),
            folder_events: count(|c| matches!(c, ChangeEvent::Folder { .. })),
            unique_files: batch.unique_paths().len(),
            reset: batch.is_reset(),
        }
    }
}
