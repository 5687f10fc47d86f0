//! The override policy governing every merge step.

use serde::{Deserialize, Serialize};

/// Governs whether a contributed resource may replace an earlier one under the
/// same key.
///
/// | Kind       | Key absent            | Key present        |
/// |------------|-----------------------|--------------------|
/// | `None`     | added                 | merge error        |
/// | `Regular`  | merge error           | replaced           |
/// | `Optional` | silently skipped      | replaced           |
/// | `Always`   | added                 | replaced           |
///
/// # Examples
///
/// ```
/// use ckl_core::ResourceOverrideKind;
///
/// let (kind, key) = ResourceOverrideKind::split_key_marker("O?:Menu.Title");
/// assert_eq!(kind, ResourceOverrideKind::Optional);
/// assert_eq!(key, "Menu.Title");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ResourceOverrideKind {
    /// The key must not already exist.
    #[default]
    None = 0,
    /// The key must already exist (safe override).
    Regular = 1,
    /// Override only if the key already exists, skip otherwise.
    Optional = 2,
    /// Add or replace regardless.
    Always = 3,
}

impl ResourceOverrideKind {
    /// Key prefixes recognised by [`split_key_marker`](Self::split_key_marker).
    const MARKERS: [(&'static str, Self); 3] = [
        ("O?:", Self::Optional),
        ("O!:", Self::Always),
        ("O:", Self::Regular),
    ];

    /// Returns the byte used for this kind in the state file.
    #[inline]
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Decodes a kind byte, returning `None` for unknown values.
    #[inline]
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::None),
            1 => Some(Self::Regular),
            2 => Some(Self::Optional),
            3 => Some(Self::Always),
            _ => None,
        }
    }

    /// Returns `true` if this kind declares an override rather than a definition.
    #[inline]
    #[must_use]
    pub const fn is_override(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns a short lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Regular => "regular",
            Self::Optional => "optional",
            Self::Always => "always",
        }
    }

    /// Splits an optional override marker (`O:`, `O?:`, `O!:`) off a key.
    ///
    /// Keys without a marker are definitions ([`ResourceOverrideKind::None`]).
    #[must_use]
    pub fn split_key_marker(key: &str) -> (Self, &str) {
        Self::MARKERS
            .iter()
            .find_map(|(marker, kind)| key.strip_prefix(marker).map(|rest| (*kind, rest)))
            .unwrap_or((Self::None, key))
    }
}

impl std::fmt::Display for ResourceOverrideKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_kind_bytes() {
        for kind in [
            ResourceOverrideKind::None,
            ResourceOverrideKind::Regular,
            ResourceOverrideKind::Optional,
            ResourceOverrideKind::Always,
        ] {
            assert_eq!(ResourceOverrideKind::from_byte(kind.as_byte()), Some(kind));
        }
        assert_eq!(ResourceOverrideKind::from_byte(4), None);
    }

    #[test]
    fn test_split_key_marker() {
        assert_eq!(
            ResourceOverrideKind::split_key_marker("Title"),
            (ResourceOverrideKind::None, "Title")
        );
        assert_eq!(
            ResourceOverrideKind::split_key_marker("O:Title"),
            (ResourceOverrideKind::Regular, "Title")
        );
        assert_eq!(
            ResourceOverrideKind::split_key_marker("O?:Title"),
            (ResourceOverrideKind::Optional, "Title")
        );
        assert_eq!(
            ResourceOverrideKind::split_key_marker("O!:Title"),
            (ResourceOverrideKind::Always, "Title")
        );
        // Only a leading marker counts.
        assert_eq!(
            ResourceOverrideKind::split_key_marker("Menu.O:Title"),
            (ResourceOverrideKind::None, "Menu.O:Title")
        );
    }

    #[test]
    fn test_override_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&ResourceOverrideKind::Optional).unwrap(),
            r#""optional""#
        );
        assert!(ResourceOverrideKind::Always.is_override());
        assert!(!ResourceOverrideKind::None.is_override());
    }
}
