//! Domain types shared across the workspace.
//!
//! # Module Organization
//!
//! - [`container`] - Resource containers (embedded or on-disk)
//! - [`locator`] - Resource locators (container + logical path)
//! - [`override_kind`] - The merge policy attached to every resource
//! - [`package`] - Local package references
//! - [`time`] - Last-write-time values and the `UTC_MIN_VALUE` sentinel
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use ckl_core::{ResourceContainer, ResourceLocator, ResourceOverrideKind};
//! ```

mod container;
mod locator;
mod override_kind;
mod package;
mod time;

pub use container::{ContainerKind, ResourceContainer};
pub use locator::ResourceLocator;
pub use override_kind::ResourceOverrideKind;
pub use package::LocalPackage;
pub use time::{Timestamp, UTC_MIN_VALUE};
