//! Locale and asset resource sets with override-resolving merges.
//!
//! Packages contribute resources of two kinds: translations
//! ([`PackageLocaleSet`]) and asset files ([`PackageAssetSet`]). This crate
//! folds a dependency-ordered package sequence into a compact list of
//! [`Segment`]s, where consecutive regular packages are merged into one final
//! set and local packages stay individually trackable, and keeps the resolved
//! application view up to date when a local package changes.
//!
//! # Architecture
//!
//! ```text
//! packages (manifest order)
//!     │
//!     ├── regular ──► PackageSet::load (rayon) ──► SegmentBuilder::add_regular
//!     └── local ─────────────────────────────────► SegmentBuilder::add_local
//!                                                        │
//!                                              Vec<Segment<F>>
//!                                                        │
//!                                   LiveResources::new (load locals, fold)
//!                                                        │
//!                                   full view F ──► output (ck-gen/…)
//! ```
//!
//! The two kinds share the machinery through the [`FinalSet`] and
//! [`PackageSet`] traits:
//!
//! | Kind     | Package set         | Final aggregate            |
//! |----------|---------------------|----------------------------|
//! | Locales  | [`PackageLocaleSet`] | [`FinalLocaleCultureSet`]  |
//! | Assets   | [`PackageAssetSet`]  | [`FinalResourceAssetSet`]  |

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod assets;
mod build;
mod error;
mod kind;
mod live;
pub mod locales;
mod merge;
pub mod output;
mod segment;

pub use assets::{AssetEntry, FinalResourceAssetSet, PackageAssetSet};
pub use build::build_resources;
pub use error::{ConflictReason, MergeConflict, ResourceError};
pub use kind::ResourceKind;
pub use live::LiveResources;
pub use locales::{FinalLocaleCultureSet, LocaleCultureSet, PackageLocaleSet, Translation};
pub use merge::{FinalSet, PackageSet, PackageSource};
pub use segment::{Segment, SegmentBuilder};
