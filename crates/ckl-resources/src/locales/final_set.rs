//! The resolved culture tree.

use std::collections::BTreeMap;

use ckl_core::{ResourceLocator, ResourceOverrideKind};

use super::culture::{DEFAULT_CULTURE, culture_chain, normalize_culture, parent_culture};
use super::package::PackageLocaleSet;
use crate::error::{MergeConflict, ResourceError};
use crate::kind::ResourceKind;
use crate::merge::{FinalSet, MergeEntry, PackageSet, apply_override};

/// A translated text with its origin and override kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Translated text.
    pub text: String,
    /// The locale file that contributed the text.
    pub origin: ResourceLocator,
    /// Override kind of the contributing key.
    pub kind: ResourceOverrideKind,
}

impl Translation {
    /// Creates a translation.
    #[must_use]
    pub fn new(text: impl Into<String>, origin: ResourceLocator, kind: ResourceOverrideKind) -> Self {
        Self {
            text: text.into(),
            origin,
            kind,
        }
    }
}

impl MergeEntry for Translation {
    fn kind(&self) -> ResourceOverrideKind {
        self.kind
    }

    fn set_kind(&mut self, kind: ResourceOverrideKind) {
        self.kind = kind;
    }

    fn origin(&self) -> &ResourceLocator {
        &self.origin
    }
}

/// One node of the culture tree: its own translations and its more specific
/// child cultures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleCultureSet {
    culture: String,
    translations: BTreeMap<String, Translation>,
    children: Vec<LocaleCultureSet>,
}

impl LocaleCultureSet {
    /// Creates an empty node.
    #[must_use]
    pub fn new(culture: impl Into<String>) -> Self {
        Self::from_parts(culture, BTreeMap::new(), Vec::new())
    }

    /// Creates a node from its parts.
    #[must_use]
    pub fn from_parts(
        culture: impl Into<String>,
        translations: BTreeMap<String, Translation>,
        children: Vec<Self>,
    ) -> Self {
        Self {
            culture: culture.into(),
            translations,
            children,
        }
    }

    /// Returns the normalized culture name.
    #[inline]
    #[must_use]
    pub fn culture(&self) -> &str {
        &self.culture
    }

    /// Returns the translations defined on this node, sorted by key.
    #[inline]
    #[must_use]
    pub fn translations(&self) -> &BTreeMap<String, Translation> {
        &self.translations
    }

    /// Returns the child cultures, in creation order.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    fn child_mut(&mut self, culture: &str) -> &mut Self {
        let idx = match self.children.iter().position(|c| c.culture == culture) {
            Some(idx) => idx,
            None => {
                self.children.push(Self::new(culture));
                self.children.len() - 1
            }
        };
        &mut self.children[idx]
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Self>) {
        out.push(self);
        for child in &self.children {
            child.collect(out);
        }
    }
}

/// The culture tree resolved from one or more locale sets.
///
/// The root is the [`DEFAULT_CULTURE`] node. A lookup for `en-gb` consults the
/// `en-gb` node, then `en`, then the root.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use ckl_core::{ResourceContainer, ResourceLocator, ResourceOverrideKind};
/// use ckl_resources::{FinalLocaleCultureSet, FinalSet, PackageLocaleSet, Translation};
///
/// let origin = ResourceLocator::new(Arc::new(ResourceContainer::embedded("Lib", "/lib")), "en.json");
/// let mut package = PackageLocaleSet::new("Lib");
/// package.insert("en", "Hello", Translation::new("Hello", origin, ResourceOverrideKind::None));
///
/// let mut set = FinalLocaleCultureSet::new(false);
/// set.add_package(&package).unwrap();
/// assert_eq!(set.translate("en-GB", "Hello").map(|t| t.text.as_str()), Some("Hello"));
/// assert!(set.translate("fr", "Hello").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalLocaleCultureSet {
    root: LocaleCultureSet,
    partial: bool,
}

impl FinalLocaleCultureSet {
    /// Creates a set from a deserialized tree.
    #[must_use]
    pub fn from_root(root: LocaleCultureSet, partial: bool) -> Self {
        Self { root, partial }
    }

    /// Returns the root node.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &LocaleCultureSet {
        &self.root
    }

    /// Returns the node of a culture, creating it and its ancestors if needed.
    fn ensure_node(&mut self, culture: &str) -> &mut LocaleCultureSet {
        let chain = culture_chain(culture);
        let mut node = &mut self.root;
        for name in chain.iter().rev().skip(1) {
            node = node.child_mut(name);
        }
        node
    }

    /// Returns the node of a culture, if it exists.
    #[must_use]
    pub fn find(&self, culture: &str) -> Option<&LocaleCultureSet> {
        let culture = normalize_culture(culture);
        let chain = culture_chain(&culture);
        let mut node = &self.root;
        for name in chain.iter().rev().skip(1) {
            node = node.children.iter().find(|c| c.culture == *name)?;
        }
        Some(node)
    }

    /// Looks up a key, falling back through parent cultures to the root.
    #[must_use]
    pub fn translate(&self, culture: &str, key: &str) -> Option<&Translation> {
        let culture = normalize_culture(culture);
        culture_chain(&culture)
            .into_iter()
            .filter_map(|name| self.find(name))
            .find_map(|node| node.translations.get(key))
    }

    /// Returns every key visible from `culture` with its resolved translation.
    #[must_use]
    pub fn resolved(&self, culture: &str) -> BTreeMap<&str, &Translation> {
        let culture = normalize_culture(culture);
        let mut resolved = BTreeMap::new();
        for node in culture_chain(&culture)
            .into_iter()
            .rev()
            .filter_map(|name| self.find(name))
        {
            for (key, translation) in &node.translations {
                resolved.insert(key.as_str(), translation);
            }
        }
        resolved
    }

    /// Returns every node, parents before children.
    #[must_use]
    pub fn cultures(&self) -> Vec<&LocaleCultureSet> {
        let mut out = Vec::new();
        self.root.collect(&mut out);
        out
    }

    fn add_translations<'a>(
        &mut self,
        culture: &str,
        translations: impl IntoIterator<Item = (&'a String, &'a Translation)>,
        package: impl Fn(&Translation) -> String,
    ) -> Result<(), ResourceError> {
        let partial = self.partial;
        for (key, translation) in translations {
            // An override may target the text a parent culture provides.
            let inherited = !partial
                && translation.kind.is_override()
                && parent_culture(culture).is_some_and(|parent| self.translate(parent, key).is_some());
            let node = self.ensure_node(culture);
            apply_override(&mut node.translations, key, translation.clone(), partial, inherited)
                .map_err(|reason| MergeConflict {
                    kind: ResourceKind::Locales,
                    package: package(translation),
                    culture: Some(culture.to_owned()),
                    key: key.clone(),
                    reason,
                })?;
        }
        Ok(())
    }
}

impl Default for FinalLocaleCultureSet {
    fn default() -> Self {
        <Self as FinalSet>::new(false)
    }
}

impl FinalSet for FinalLocaleCultureSet {
    type Package = PackageLocaleSet;

    fn new(partial: bool) -> Self {
        Self {
            root: LocaleCultureSet::new(DEFAULT_CULTURE),
            partial,
        }
    }

    fn is_partial(&self) -> bool {
        self.partial
    }

    fn len(&self) -> usize {
        self.cultures().iter().map(|c| c.translations.len()).sum()
    }

    fn add_package(&mut self, package: &PackageLocaleSet) -> Result<(), ResourceError> {
        for (culture, translations) in package.cultures() {
            self.add_translations(culture, translations, |_| package.package_name().to_owned())?;
        }
        Ok(())
    }

    fn add_final(&mut self, other: &Self) -> Result<(), ResourceError> {
        for node in other.cultures() {
            self.add_translations(&node.culture, &node.translations, |t| {
                t.origin.package_name().to_owned()
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConflictReason;
    use crate::merge::PackageSet;
    use ckl_core::ResourceContainer;
    use std::sync::Arc;

    fn package(name: &str, entries: &[(&str, &str, &str, ResourceOverrideKind)]) -> PackageLocaleSet {
        let container = Arc::new(ResourceContainer::embedded(name, format!("/{name}/ts-locales")));
        let mut set = PackageLocaleSet::new(name);
        for (culture, key, text, kind) in entries {
            let origin = ResourceLocator::new(Arc::clone(&container), format!("{culture}.json"));
            set.insert(culture, *key, Translation::new(*text, origin, *kind));
        }
        set
    }

    use ResourceOverrideKind::{Always, None as Def, Optional, Regular};

    #[test]
    fn test_culture_fallback() {
        let mut set = FinalLocaleCultureSet::default();
        set.add_package(&package(
            "Lib",
            &[
                ("default", "Title", "Title", Def),
                ("en", "Hello", "Hello", Def),
                ("en-gb", "Colour", "Colour", Def),
            ],
        ))
        .unwrap();

        assert_eq!(set.translate("en-GB", "Hello").unwrap().text, "Hello");
        assert_eq!(set.translate("en-GB", "Colour").unwrap().text, "Colour");
        assert_eq!(set.translate("en-gb", "Title").unwrap().text, "Title");
        assert!(set.translate("en", "Colour").is_none());
        assert_eq!(set.translate("fr", "Title").unwrap().text, "Title");

        let resolved = set.resolved("en-gb");
        assert_eq!(resolved.keys().copied().collect::<Vec<_>>(), ["Colour", "Hello", "Title"]);
    }

    #[test]
    fn test_tree_shape() {
        let mut set = FinalLocaleCultureSet::default();
        set.add_package(&package("Lib", &[("zh-hant-tw", "K", "v", Def), ("en", "K", "v", Def)]))
            .unwrap();
        let names: Vec<_> = set.cultures().iter().map(|c| c.culture()).collect();
        assert_eq!(names, ["default", "en", "zh", "zh-hant", "zh-hant-tw"]);
        assert_eq!(set.len(), 2);
        assert!(set.find("zh-Hant").is_some());
        assert!(set.find("de").is_none());
    }

    #[test]
    fn test_override_rules_across_packages() {
        let mut set = FinalLocaleCultureSet::default();
        set.add_package(&package("Lib", &[("en", "Hello", "Hello", Def)])).unwrap();
        set.add_package(&package(
            "Theme",
            &[
                ("en", "Hello", "Hi", Regular),
                ("en", "Missing", "x", Optional),
                ("en", "Forced", "y", Always),
            ],
        ))
        .unwrap();

        let hello = set.translate("en", "Hello").unwrap();
        assert_eq!(hello.text, "Hi");
        assert_eq!(hello.origin.package_name(), "Theme");
        assert_eq!(hello.kind, Def);
        assert!(set.translate("en", "Missing").is_none());
        assert_eq!(set.translate("en", "Forced").unwrap().text, "y");
    }

    #[test]
    fn test_conflict_names_package_culture_and_key() {
        let mut set = FinalLocaleCultureSet::default();
        set.add_package(&package("Lib", &[("fr", "Hello", "Bonjour", Def)])).unwrap();
        let err = set
            .add_package(&package("App", &[("fr", "Hello", "Salut", Def)]))
            .unwrap_err();
        let conflict = match err {
            ResourceError::Conflict(conflict) => conflict,
            other => unreachable!("expected conflict, got {other}"),
        };
        assert_eq!(conflict.package, "App");
        assert_eq!(conflict.culture.as_deref(), Some("fr"));
        assert_eq!(conflict.key, "Hello");
        assert_eq!(
            conflict.reason,
            ConflictReason::AlreadyDefined {
                previous: "Lib:fr.json".to_owned()
            }
        );
    }

    #[test]
    fn test_regular_override_in_partial_set_resolves_on_fold() {
        let mut base = FinalLocaleCultureSet::new(false);
        base.add_package(&package("Lib", &[("en", "Hello", "Hello", Def)])).unwrap();

        let mut later = FinalLocaleCultureSet::new(true);
        later
            .add_package(&package("Theme", &[("en", "Hello", "Hi", Regular)]))
            .unwrap();

        let mut full = FinalLocaleCultureSet::new(false);
        full.add_final(&base).unwrap();
        full.add_final(&later).unwrap();
        assert_eq!(full.translate("en", "Hello").unwrap().text, "Hi");

        let mut orphan = FinalLocaleCultureSet::new(false);
        let err = orphan.add_final(&later).unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Conflict(MergeConflict {
                reason: ConflictReason::MissingTarget,
                ..
            })
        ));
    }

    #[test]
    fn test_fold_equals_direct_merge() {
        let a = package("A", &[("default", "K1", "1", Def), ("en", "K2", "2", Def)]);
        let b = package("B", &[("en", "K2", "2b", Regular), ("en-us", "K3", "3", Def)]);

        let mut direct = FinalLocaleCultureSet::new(false);
        direct.add_package(&a).unwrap();
        direct.add_package(&b).unwrap();

        let mut folded = FinalLocaleCultureSet::new(false);
        folded.add_final(&direct).unwrap();
        assert_eq!(folded, direct);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_override_targets_parent_culture() {
        let mut set = FinalLocaleCultureSet::default();
        set.add_package(&package("Lib", &[("en", "Hello", "Hello", Def)])).unwrap();
        set.add_package(&package(
            "App",
            &[("en-gb", "Hello", "Hiya", Regular), ("en-gb", "Bye", "Ta", Optional)],
        ))
        .unwrap();

        assert_eq!(set.translate("en-GB", "Hello").unwrap().text, "Hiya");
        assert_eq!(set.translate("en", "Hello").unwrap().text, "Hello");
        assert!(set.translate("en-GB", "Bye").is_none());

        let err = set
            .add_package(&package("Other", &[("fr", "Hello", "Salut", Regular)]))
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Conflict(MergeConflict {
                reason: ConflictReason::MissingTarget,
                ..
            })
        ));
    }

    #[test]
    fn test_applied_parent_override_blocks_later_definition() {
        for kind in [Regular, Optional] {
            let mut set = FinalLocaleCultureSet::default();
            set.add_package(&package("Lib", &[("en", "Hello", "Hello", Def)])).unwrap();
            set.add_package(&package("Theme", &[("en-gb", "Hello", "Hiya", kind)]))
                .unwrap();

            let err = set
                .add_package(&package("Late", &[("en-gb", "Hello", "Dup", Def)]))
                .unwrap_err();
            let conflict = match err {
                ResourceError::Conflict(conflict) => conflict,
                other => unreachable!("expected conflict, got {other}"),
            };
            assert_eq!(conflict.package, "Late");
            assert_eq!(
                conflict.reason,
                ConflictReason::AlreadyDefined {
                    previous: "Theme:en-gb.json".to_owned()
                }
            );
        }
    }

    #[test]
    fn test_fold_resolves_child_override_after_parent_definition() {
        // Within a partial set the en-gb override is recorded before the en
        // definition; folding visits parents first, so it finds its target.
        let mut later = FinalLocaleCultureSet::new(true);
        later
            .add_package(&package("B", &[("en-gb", "K", "child", Regular)]))
            .unwrap();
        later.add_package(&package("C", &[("en", "K", "parent", Def)])).unwrap();

        let mut full = FinalLocaleCultureSet::new(false);
        full.add_final(&later).unwrap();
        assert_eq!(full.translate("en-GB", "K").unwrap().text, "child");
        assert_eq!(full.translate("en", "K").unwrap().text, "parent");

        let mut direct = FinalLocaleCultureSet::new(false);
        assert!(
            direct
                .add_package(&package("B", &[("en-gb", "K", "child", Regular)]))
                .is_err()
        );
    }
}
