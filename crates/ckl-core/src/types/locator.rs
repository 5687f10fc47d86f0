//! Resource locators.

use std::sync::Arc;

use camino::Utf8PathBuf;

use super::container::ResourceContainer;

/// Identifies one resource: its owning container and its logical path.
///
/// Two locators are equal iff they have the same container and the same path.
/// The container is shared, so cloning a locator is cheap.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use ckl_core::{ResourceContainer, ResourceLocator};
///
/// let container = Arc::new(ResourceContainer::embedded("Lib", "/pkg/lib/ts-locales"));
/// let a = ResourceLocator::new(Arc::clone(&container), "en.json");
/// let b = ResourceLocator::new(container, "en.json");
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "Lib:en.json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceLocator {
    container: Arc<ResourceContainer>,
    path: String,
}

impl ResourceLocator {
    /// Creates a locator for `path` inside `container`.
    #[must_use]
    pub fn new(container: Arc<ResourceContainer>, path: impl Into<String>) -> Self {
        Self {
            container,
            path: path.into(),
        }
    }

    /// Returns the owning container.
    #[inline]
    #[must_use]
    pub fn container(&self) -> &Arc<ResourceContainer> {
        &self.container
    }

    /// Returns the logical, `/`-separated path inside the container.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the name of the package that owns this resource.
    #[inline]
    #[must_use]
    pub fn package_name(&self) -> &str {
        self.container.name()
    }

    /// Returns the on-disk location of this resource.
    #[must_use]
    pub fn file_path(&self) -> Utf8PathBuf {
        self.container.resource_path(&self.path)
    }
}

impl std::fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.container.name(), self.path)
    }
}
