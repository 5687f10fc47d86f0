//! Asset files: per-package asset sets and the flat asset aggregate.

mod final_set;
mod package;

pub use final_set::{AssetChanges, FinalResourceAssetSet};
pub use package::{ASSETS_MANIFEST, AssetEntry, PackageAssetSet};
