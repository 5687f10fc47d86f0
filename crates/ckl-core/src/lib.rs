//! Core types, configuration, and errors for the ck-live resource engine.
//!
//! This crate provides the leaf types shared by every other crate of the
//! workspace:
//!
//! - Resource identity: [`ResourceContainer`], [`ResourceLocator`]
//! - The four-way [`ResourceOverrideKind`] merge policy
//! - [`LocalPackage`] references tracked during a live session
//! - Configuration ([`Config`]) and the application manifest ([`AppManifest`])
//! - Type aliases for `FxHashMap`/`FxHashSet`
//!
//! # Crate Dependencies
//!
//! ```text
//! ckl-cli ──► ckl-watcher ──► ckl-state ──► ckl-resources ──► ckl-core
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod types;

pub use config::{Config, LayoutConfig, WatchConfig};
pub use error::ConfigError;
pub use hash::{FxHashMap, FxHashSet};
pub use manifest::{AppManifest, PackageKind, PackageManifest};
pub use types::{
    ContainerKind, LocalPackage, ResourceContainer, ResourceLocator, ResourceOverrideKind,
    Timestamp, UTC_MIN_VALUE,
};
