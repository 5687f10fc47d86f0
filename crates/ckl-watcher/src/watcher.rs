//! File watcher with async event streaming.
//!
//! This module provides the [`FileWatcher`] type that bridges the synchronous
//! `notify` file watching crate to the async tokio runtime.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Blocking Thread (spawn_blocking)             │
//! │  ┌──────────────────┐    ┌────────────────┐    ┌────────────┐  │
//! │  │ RecommendedWatcher│ -> │ Debouncer      │ -> │ Callback   │  │
//! │  │ (notify, N roots)│    │ (100ms window) │    │ (classify) │  │
//! │  └──────────────────┘    └────────────────┘    └─────┬──────┘  │
//! └──────────────────────────────────────────────────────│─────────┘
//!                                                        │
//!                                          blocking_send │
//!                                                        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │  ┌──────────────────┐    ┌────────────────┐                     │
//! │  │ FileWatcher      │    │ mpsc::Receiver │ -> LiveSession      │
//! │  │ (shutdown ctrl)  │    │ (events)       │                     │
//! │  └──────────────────┘    └────────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use ckl_watcher::{FileWatcher, FolderFilter};
//! use ckl_core::WatchConfig;
//! use camino::Utf8PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WatchConfig::default();
//!     let root = Utf8PathBuf::from("/path/to/app/ck-gen-transform");
//!     let filter = FolderFilter::new(root.clone());
//!
//!     let mut watcher = FileWatcher::new(&[root], &config, filter).await?;
//!
//!     while let Some(batch) = watcher.recv_batch().await {
//!         println!("{} paths changed", batch.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use ckl_core::WatchConfig;

use crate::error::WatchError;
use crate::events::{FileEvent, FileEventBatch};
use crate::filter::ChangeFilter;

/// Default channel capacity for file events.
const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// A file watcher that streams classified events to an async context.
///
/// `FileWatcher` manages a background thread that runs the `notify` file watcher
/// with debouncing over one or more roots. Each changed path is classified by
/// a [`ChangeFilter`]; only classified paths are sent through the tokio mpsc
/// channel.
///
/// # Lifecycle
///
/// 1. **Creation**: `FileWatcher::new()` validates the roots, creates channels,
///    and spawns a blocking task with the notify watcher.
///
/// 2. **Event Reception**: Use `recv()`, `recv_batch()` or `try_recv()`.
///
/// 3. **Shutdown**: Call `shutdown()` for graceful shutdown, or simply drop
///    the watcher. Dropping sends a shutdown signal.
///
/// # Examples
///
/// ```no_run
/// use ckl_watcher::{FileWatcher, FolderFilter};
/// use ckl_core::WatchConfig;
/// use camino::Utf8PathBuf;
///
/// # async fn example() -> Result<(), ckl_watcher::WatchError> {
/// let root = Utf8PathBuf::from("./ck-gen-transform").canonicalize_utf8()?;
/// let mut watcher = FileWatcher::new(
///     &[root.clone()],
///     &WatchConfig::default(),
///     FolderFilter::new(root),
/// ).await?;
///
/// while let Some(event) = watcher.recv().await {
///     println!("Changed: {}", event.path);
/// }
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    /// Shutdown signal sender.
    ///
    /// Set to `None` after shutdown is initiated.
    shutdown_tx: Option<oneshot::Sender<()>>,

    /// Handle to the blocking watcher task.
    task_handle: Option<JoinHandle<Result<(), WatchError>>>,

    /// Event receiver for async consumption.
    event_rx: mpsc::Receiver<FileEvent>,

    /// The canonical roots being watched.
    roots: Vec<Utf8PathBuf>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("roots", &self.roots)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Creates a new file watcher for the specified roots.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if a root doesn't exist.
    /// Returns [`WatchError::Notify`] if the watcher fails to initialize.
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn new<F: ChangeFilter>(
        roots: &[Utf8PathBuf],
        config: &WatchConfig,
        filter: F,
    ) -> Result<Self, WatchError> {
        Self::with_capacity(roots, config, filter, DEFAULT_CHANNEL_CAPACITY).await
    }

    /// Creates a file watcher with a custom channel capacity.
    ///
    /// Use this when you need to handle bursts of file changes and want
    /// to prevent backpressure from blocking the watcher thread.
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn with_capacity<F: ChangeFilter>(
        roots: &[Utf8PathBuf],
        config: &WatchConfig,
        filter: F,
        channel_capacity: usize,
    ) -> Result<Self, WatchError> {
        let roots = canonical_roots(roots)?;

        let (event_tx, event_rx) = mpsc::channel(channel_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task_roots = roots.clone();
        let debounce_ms = config.debounce_ms;
        let recursive = config.recursive;

        let task_handle = tokio::task::spawn_blocking(move || {
            run_watcher_loop(task_roots, debounce_ms, recursive, event_tx, shutdown_rx, filter)
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            event_rx,
            roots,
        })
    }

    /// Receives the next file event asynchronously.
    ///
    /// Returns `None` when the watcher has been shut down or the channel
    /// is closed.
    pub async fn recv(&mut self) -> Option<FileEvent> {
        self.event_rx.recv().await
    }

    /// Waits for the next event, then drains every event already queued
    /// into one batch.
    ///
    /// Returns `None` when the channel is closed.
    pub async fn recv_batch(&mut self) -> Option<FileEventBatch> {
        let first = self.event_rx.recv().await?;
        let mut batch = FileEventBatch::new();
        batch.push(first);
        while let Ok(event) = self.event_rx.try_recv() {
            batch.push(event);
        }
        Some(batch)
    }

    /// Tries to receive a file event without blocking.
    ///
    /// Returns `Ok(event)` if an event is available, `Err(TryRecvError::Empty)`
    /// if the channel is empty, or `Err(TryRecvError::Disconnected)` if the
    /// watcher has been shut down.
    pub fn try_recv(&mut self) -> Result<FileEvent, mpsc::error::TryRecvError> {
        self.event_rx.try_recv()
    }

    /// Returns a mutable reference to the event receiver.
    ///
    /// This is useful when you need to use the receiver directly with
    /// `tokio::select!` or other channel operations.
    pub fn events(&mut self) -> &mut mpsc::Receiver<FileEvent> {
        &mut self.event_rx
    }

    /// Returns the canonical roots being watched.
    #[must_use]
    pub fn roots(&self) -> &[Utf8PathBuf] {
        &self.roots
    }

    /// Returns `true` if the watcher is still running.
    ///
    /// The watcher may stop running if the shutdown signal is sent or
    /// if an error occurs in the blocking task.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Gracefully shuts down the watcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher thread panicked or encountered
    /// an error during operation.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore error if receiver is already dropped
            let _ = tx.send(());
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => result?,
                Err(_join_error) => return Err(WatchError::ChannelClosed),
            }
        }

        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // The task stops when it receives the shutdown signal.
    }
}

/// Canonicalizes the roots and drops duplicates.
fn canonical_roots(roots: &[Utf8PathBuf]) -> Result<Vec<Utf8PathBuf>, WatchError> {
    let mut canonical = Vec::with_capacity(roots.len());
    for root in roots {
        if !root.exists() {
            return Err(WatchError::path_not_found(root.clone()));
        }
        let root = root.canonicalize_utf8()?;
        if !canonical.contains(&root) {
            canonical.push(root);
        }
    }
    Ok(canonical)
}

/// Runs the notify watcher loop in a blocking context.
///
/// This function is called from `spawn_blocking` and runs the synchronous
/// notify debouncer, forwarding classified events to the async channel.
#[allow(clippy::needless_pass_by_value)] // Roots must be owned for the blocking task lifetime
fn run_watcher_loop<F: ChangeFilter>(
    roots: Vec<Utf8PathBuf>,
    debounce_ms: u64,
    recursive: bool,
    event_tx: mpsc::Sender<FileEvent>,
    shutdown_rx: oneshot::Receiver<()>,
    filter: F,
) -> Result<(), WatchError> {
    let timeout = Duration::from_millis(debounce_ms);

    let tx = event_tx;
    let debouncer_result: Result<Debouncer<notify::RecommendedWatcher>, notify::Error> =
        new_debouncer(timeout, move |res: DebounceEventResult| match res {
            Ok(events) => {
                for event in events {
                    let utf8_path = match Utf8PathBuf::try_from(event.path) {
                        Ok(p) => p,
                        Err(e) => {
                            let invalid_path = e.into_path_buf();
                            warn!(
                                path = %invalid_path.display(),
                                "Skipping non-UTF-8 path in file event"
                            );
                            continue;
                        }
                    };

                    let Some(change) = filter.classify(&utf8_path) else {
                        trace!(path = %utf8_path, "Ignored file event");
                        continue;
                    };

                    if tx.blocking_send(FileEvent::new(utf8_path, change)).is_err() {
                        debug!("Event channel closed, stopping watcher");
                        break;
                    }
                }
            }
            Err(error) => warn!(error = %error, "Debouncer error"),
        });

    let mut debouncer = debouncer_result?;

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };

    for root in &roots {
        debouncer.watcher().watch(root.as_std_path(), mode)?;
    }

    info!(roots = roots.len(), recursive = recursive, "File watcher started");

    // Block until shutdown signal is received
    let _ = shutdown_rx.blocking_recv();

    info!(roots = roots.len(), "File watcher stopped");

    Ok(())
}

/// Returns the roots to watch for `paths`: existing directories only, with
/// paths nested in another one removed.
#[must_use]
pub fn minimal_roots<'a>(paths: impl IntoIterator<Item = &'a Utf8Path>) -> Vec<Utf8PathBuf> {
    let mut roots: Vec<Utf8PathBuf> = paths
        .into_iter()
        .filter(|p| p.is_dir())
        .map(Utf8Path::to_path_buf)
        .collect();
    roots.sort();
    roots.dedup();
    let mut minimal: Vec<Utf8PathBuf> = Vec::with_capacity(roots.len());
    for root in roots {
        if !minimal.iter().any(|kept| root.starts_with(kept)) {
            minimal.push(root);
        }
    }
    minimal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FolderFilter;
    use std::fs;
    use tempfile::TempDir;

    fn create_temp_dir() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = Utf8Path::from_path(temp_dir.path())
            .expect("Invalid path")
            .canonicalize_utf8()
            .expect("Canonical path");
        (temp_dir, path)
    }

    #[tokio::test]
    async fn test_watcher_creation() {
        let (_temp_dir, path) = create_temp_dir();

        let watcher = FileWatcher::new(
            std::slice::from_ref(&path),
            &WatchConfig::default(),
            FolderFilter::new(path.clone()),
        )
        .await
        .expect("Watcher should be created");

        assert!(watcher.is_running());
        assert_eq!(watcher.roots(), &[path]);
    }

    #[tokio::test]
    async fn test_watcher_path_not_found() {
        let path = Utf8PathBuf::from("/nonexistent/path/that/does/not/exist");

        let result = FileWatcher::new(
            std::slice::from_ref(&path),
            &WatchConfig::default(),
            FolderFilter::new(path.clone()),
        )
        .await;

        match result {
            Err(WatchError::PathNotFound(p)) => assert_eq!(p, path),
            other => panic!("Expected PathNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_watcher_shutdown() {
        let (_temp_dir, path) = create_temp_dir();

        let watcher = FileWatcher::with_capacity(
            std::slice::from_ref(&path),
            &WatchConfig::default(),
            FolderFilter::new(path.clone()),
            10,
        )
        .await
        .expect("Failed to create watcher");

        assert!(watcher.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_watcher_receives_classified_events() {
        let (_temp_dir, path) = create_temp_dir();
        let watched = path.join("watched");
        fs::create_dir_all(&watched).expect("Failed to create dir");

        let config = WatchConfig {
            enabled: true,
            debounce_ms: 50,
            recursive: true,
        };
        let mut watcher = FileWatcher::new(
            std::slice::from_ref(&path),
            &config,
            FolderFilter::new(watched.clone()),
        )
        .await
        .expect("Failed to create watcher");

        fs::write(path.join("ignored.txt"), "no").expect("Failed to write file");
        fs::write(watched.join("test.txt"), "hello").expect("Failed to write file");

        let batch = tokio::time::timeout(Duration::from_secs(2), watcher.recv_batch()).await;
        watcher.shutdown().await.expect("Shutdown failed");

        // Timing-dependent, may not always fire in CI
        if let Ok(Some(batch)) = batch {
            assert!(batch.iter().all(|e| e.path.starts_with(&watched)));
        }
    }

    #[test]
    fn test_minimal_roots() {
        let (_temp_dir, path) = create_temp_dir();
        let nested = path.join("a/b");
        let sibling = path.join("c");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(&sibling).unwrap();
        let missing = path.join("missing");

        let roots = minimal_roots([
            nested.as_path(),
            path.join("a").as_path(),
            sibling.as_path(),
            missing.as_path(),
            sibling.as_path(),
        ]);
        assert_eq!(roots, vec![path.join("a"), sibling]);
    }
}
