//! Resource kinds.

use ckl_core::LayoutConfig;
use serde::{Deserialize, Serialize};

/// The kinds of resources a package can contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Translations, one file per culture.
    Locales,
    /// Asset files, keyed by relative path.
    Assets,
}

impl ResourceKind {
    /// All kinds, in state file order.
    pub const ALL: [Self; 2] = [Self::Locales, Self::Assets];

    /// Returns the package sub-folder holding this kind of resource.
    ///
    /// # Examples
    ///
    /// ```
    /// use ckl_core::LayoutConfig;
    /// use ckl_resources::ResourceKind;
    ///
    /// let layout = LayoutConfig::default();
    /// assert_eq!(ResourceKind::Locales.folder(&layout), "ts-locales");
    /// assert_eq!(ResourceKind::Assets.folder(&layout), "ts-assets");
    /// ```
    #[must_use]
    pub fn folder(self, layout: &LayoutConfig) -> &str {
        match self {
            Self::Locales => &layout.locales_folder,
            Self::Assets => &layout.assets_folder,
        }
    }

    /// Returns the kind whose folder is the first component of a
    /// package-relative path.
    #[must_use]
    pub fn from_relative_path(path: &str, layout: &LayoutConfig) -> Option<Self> {
        let first = path.split(['/', '\\']).next()?;
        Self::ALL.into_iter().find(|kind| kind.folder(layout) == first)
    }

    /// Returns a short lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Locales => "locales",
            Self::Assets => "assets",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
