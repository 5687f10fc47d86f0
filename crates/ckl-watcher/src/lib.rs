//! Change classification, debounced file watching and live sessions.
//!
//! This crate drives the watch side of the engine: it classifies changed
//! paths against a previously built application, streams them from the
//! `notify` crate (debounced through `notify-debouncer-mini`) into a tokio
//! context, and applies them to the live resource views.
//!
//! # Overview
//!
//! - [`ChangeFilter`] implementations classify a path as a reset (the state
//!   file changed), a change under a local package, a change under a
//!   watched folder, or nothing.
//! - [`FileWatcher`] watches several roots and classifies at the source.
//! - [`LiveSession`] resumes a build from its state file and reloads the
//!   local packages a batch touches.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Blocking Thread (spawn_blocking)             │
//! │  ┌──────────────────┐    ┌────────────────┐    ┌────────────┐  │
//! │  │ RecommendedWatcher│ -> │ Debouncer      │ -> │ Callback   │  │
//! │  │ (notify)         │    │ (100ms window) │    │ (classify) │  │
//! │  └──────────────────┘    └────────────────┘    └─────┬──────┘  │
//! └──────────────────────────────────────────────────────│─────────┘
//!                                                        │
//!                                          blocking_send │
//!                                                        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │  ┌──────────────────┐    ┌────────────────┐    ┌────────────┐  │
//! │  │ FileWatcher      │    │ recv_batch()   │ -> │ LiveSession│  │
//! │  │ (shutdown ctrl)  │    │ (FileEventBatch│    │ (reload)   │  │
//! │  └──────────────────┘    └────────────────┘    └────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Crate Dependencies
//!
//! ```text
//! ckl-cli ──► ckl-watcher ──► ckl-state ──► ckl-resources ──► ckl-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use ckl_core::AppManifest;
//! use ckl_watcher::{FileWatcher, LiveSession};
//! use camino::Utf8Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manifest = AppManifest::load(Utf8Path::new("ck-live.json"))?;
//!     let mut session = LiveSession::open(&manifest.state_file(), &manifest.root, &manifest.config)?
//!         .with_output(manifest.output_dir());
//!
//!     let mut watcher =
//!         FileWatcher::new(&session.watch_roots(), &manifest.config.watch, session.filter()).await?;
//!
//!     while let Some(batch) = watcher.recv_batch().await {
//!         if session.process_batch(&batch).iter().any(|o| o.is_reset()) {
//!             break;
//!         }
//!     }
//!     watcher.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! Opening a session fails with [`WatchError`]; [`WatchError::needs_rebuild`]
//! tells the caller to wait for a fresh build. Once a session runs, reload
//! failures are reported as [`SessionOutcome::ReloadFailed`] and the
//! previous views stay in place.
//!
//! # Performance Considerations
//!
//! - **Classifying at Source**: Irrelevant paths are dropped on the blocking
//!   thread and never reach the channel.
//!
//! - **Bounded Channel**: The event channel has a capacity of 100 events
//!   by default, preventing unbounded memory growth if the consumer is slow.
//!
//! - **Coalescing**: A batch reloads each (package, kind) pair once.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod session;
pub mod watcher;

// Re-export error types
pub use error::WatchError;

// Re-export event types
pub use events::{ChangeEvent, EventBatchStats, FileEvent, FileEventBatch};

// Re-export filter types
pub use filter::{ChangeFilter, CompositeFilter, FolderFilter, LocalPackagesFilter};

// Re-export session types
pub use session::{LiveSession, SessionOutcome};

// Re-export watcher types
pub use watcher::{FileWatcher, minimal_roots};
