//! Translations: per-package culture sets and the culture tree aggregate.
//!
//! - [`culture`] - Culture name normalization and fallback chain
//! - [`package`] - [`PackageLocaleSet`], loaded from `ts-locales/<culture>.json`
//! - [`final_set`] - [`FinalLocaleCultureSet`], the resolved culture tree

pub mod culture;
mod final_set;
mod package;

pub use culture::{DEFAULT_CULTURE, culture_chain, normalize_culture, parent_culture};
pub use final_set::{FinalLocaleCultureSet, LocaleCultureSet, Translation};
pub use package::PackageLocaleSet;
