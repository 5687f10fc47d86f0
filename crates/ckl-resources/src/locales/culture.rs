//! Culture names and their parent chain.

/// Name of the invariant root culture, and of its file (`default.json`).
pub const DEFAULT_CULTURE: &str = "default";

/// Normalizes a culture name: trimmed, lower case, `_` replaced by `-`.
///
/// # Examples
///
/// ```
/// use ckl_resources::locales::normalize_culture;
///
/// assert_eq!(normalize_culture(" en_GB "), "en-gb");
/// assert_eq!(normalize_culture("Default"), "default");
/// ```
#[must_use]
pub fn normalize_culture(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

/// Returns the parent of a normalized culture, or `None` for the root.
///
/// # Examples
///
/// ```
/// use ckl_resources::locales::parent_culture;
///
/// assert_eq!(parent_culture("zh-hant-tw"), Some("zh-hant"));
/// assert_eq!(parent_culture("en"), Some("default"));
/// assert_eq!(parent_culture("default"), None);
/// ```
#[must_use]
pub fn parent_culture(culture: &str) -> Option<&str> {
    if culture == DEFAULT_CULTURE {
        return None;
    }
    Some(culture.rsplit_once('-').map_or(DEFAULT_CULTURE, |(parent, _)| parent))
}

/// Returns the lookup chain of a culture, most specific first, always ending
/// with [`DEFAULT_CULTURE`].
#[must_use]
pub fn culture_chain(culture: &str) -> Vec<&str> {
    let mut chain = vec![culture];
    let mut current = culture;
    while let Some(parent) = parent_culture(current) {
        chain.push(parent);
        current = parent;
    }
    chain
}

/// Returns `true` when `name` is a usable culture name once normalized.
pub(crate) fn is_valid_culture(name: &str) -> bool {
    !name.is_empty()
        && name
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()))
}
