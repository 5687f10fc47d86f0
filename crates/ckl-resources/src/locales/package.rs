//! Loading translations from a package's `ts-locales` folder.

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ckl_core::{LayoutConfig, ResourceLocator, ResourceOverrideKind};
use serde_json::{Map, Value};
use tracing::debug;

use super::culture::{is_valid_culture, normalize_culture};
use super::final_set::Translation;
use crate::error::ResourceError;
use crate::kind::ResourceKind;
use crate::merge::{PackageSet, PackageSource};

/// The translations contributed by one package, per normalized culture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageLocaleSet {
    package: String,
    cultures: BTreeMap<String, BTreeMap<String, Translation>>,
}

impl PackageLocaleSet {
    /// Creates an empty set for a package.
    #[must_use]
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            cultures: BTreeMap::new(),
        }
    }

    /// Inserts a translation, replacing any previous one for the same key.
    pub fn insert(&mut self, culture: &str, key: impl Into<String>, translation: Translation) {
        self.cultures
            .entry(normalize_culture(culture))
            .or_default()
            .insert(key.into(), translation);
    }

    /// Returns the translations per culture, sorted by culture name.
    pub fn cultures(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, Translation>)> {
        self.cultures.iter()
    }

    /// Parses one locale file's JSON content.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Parse`] for invalid JSON and
    /// [`ResourceError::InvalidResource`] for non-object roots, non-string
    /// leaves, empty or duplicate keys.
    pub fn add_file(
        &mut self,
        culture: &str,
        json: &str,
        origin: &ResourceLocator,
        path: &Utf8Path,
    ) -> Result<(), ResourceError> {
        let value: Value = serde_json::from_str(json).map_err(|e| ResourceError::parse(path, e))?;
        let Value::Object(map) = value else {
            return Err(ResourceError::invalid(path, "root must be a JSON object"));
        };
        let translations = self.cultures.entry(normalize_culture(culture)).or_default();
        flatten(&map, "", ResourceOverrideKind::None, origin, path, translations)
    }
}

fn flatten(
    map: &Map<String, Value>,
    prefix: &str,
    inherited: ResourceOverrideKind,
    origin: &ResourceLocator,
    path: &Utf8Path,
    out: &mut BTreeMap<String, Translation>,
) -> Result<(), ResourceError> {
    for (raw, value) in map {
        let (marker, name) = ResourceOverrideKind::split_key_marker(raw);
        let kind = if marker.is_override() { marker } else { inherited };
        let name = name.trim();
        if name.is_empty() {
            return Err(ResourceError::invalid(path, format!("empty key '{raw}'")));
        }
        let key = if prefix.is_empty() {
            name.to_owned()
        } else {
            format!("{prefix}.{name}")
        };
        match value {
            Value::String(text) => {
                if out.contains_key(&key) {
                    return Err(ResourceError::invalid(path, format!("duplicate key '{key}'")));
                }
                out.insert(key, Translation::new(text.as_str(), origin.clone(), kind));
            }
            Value::Object(nested) => flatten(nested, &key, kind, origin, path, out)?,
            _ => {
                return Err(ResourceError::invalid(
                    path,
                    format!("translation '{key}' must be a string"),
                ));
            }
        }
    }
    Ok(())
}

impl PackageSet for PackageLocaleSet {
    const KIND: ResourceKind = ResourceKind::Locales;

    fn load(source: PackageSource<'_>, layout: &LayoutConfig) -> Result<Option<Self>, ResourceError> {
        let folder = &layout.locales_folder;
        let dir = source.root.join(folder);
        if !dir.is_dir() {
            debug!(package = %source.name, "No locales folder");
            return Ok(None);
        }
        let container = Arc::new(source.container(folder));

        let mut files: Vec<(String, Utf8PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| ResourceError::read(&dir, e))? {
            let entry = entry.map_err(|e| ResourceError::read(&dir, e))?;
            let path = Utf8PathBuf::try_from(entry.path())
                .map_err(|e| ResourceError::NonUtf8Path(e.into_path_buf()))?;
            if !path.is_file() || path.extension() != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem() else {
                continue;
            };
            let culture = normalize_culture(stem);
            if !is_valid_culture(&culture) {
                return Err(ResourceError::invalid(&path, format!("invalid culture name '{stem}'")));
            }
            if let Some((_, other)) = files.iter().find(|(c, _)| *c == culture) {
                return Err(ResourceError::invalid(
                    &path,
                    format!("culture '{culture}' is also defined by {other}"),
                ));
            }
            files.push((culture, path));
        }
        files.sort();

        let mut set = Self::new(source.name);
        for (culture, path) in &files {
            let json = std::fs::read_to_string(path).map_err(|e| ResourceError::read(path, e))?;
            let Some(file_name) = path.file_name() else {
                continue;
            };
            let origin = ResourceLocator::new(Arc::clone(&container), file_name);
            set.add_file(culture, &json, &origin, path)?;
        }
        debug!(
            package = %source.name,
            cultures = files.len(),
            translations = set.len(),
            "Locales loaded"
        );
        Ok(Some(set))
    }

    fn package_name(&self) -> &str {
        &self.package
    }

    fn len(&self) -> usize {
        self.cultures.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckl_core::{ContainerKind, ResourceContainer};
    use std::fs;

    fn origin() -> ResourceLocator {
        ResourceLocator::new(Arc::new(ResourceContainer::embedded("Lib", "/lib")), "en.json")
    }

    fn parse(json: &str) -> Result<PackageLocaleSet, ResourceError> {
        let mut set = PackageLocaleSet::new("Lib");
        set.add_file("en", json, &origin(), Utf8Path::new("en.json"))?;
        Ok(set)
    }

    #[test]
    fn test_flatten_with_markers() {
        let set = parse(
            r#"{
                "Title": "Hello",
                "O:Menu": { "File": "File", "O!:Quit": "Quit" },
                "O?:Footer": "Bye"
            }"#,
        )
        .unwrap();
        let (_, en) = set.cultures().next().unwrap();
        let kinds: Vec<_> = en.iter().map(|(k, t)| (k.as_str(), t.kind)).collect();
        assert_eq!(
            kinds,
            [
                ("Footer", ResourceOverrideKind::Optional),
                ("Menu.File", ResourceOverrideKind::Regular),
                ("Menu.Quit", ResourceOverrideKind::Always),
                ("Title", ResourceOverrideKind::None),
            ]
        );
    }

    #[test]
    fn test_invalid_content() {
        assert!(matches!(parse("[1]"), Err(ResourceError::InvalidResource { .. })));
        assert!(matches!(parse(r#"{"A": 1}"#), Err(ResourceError::InvalidResource { .. })));
        assert!(matches!(parse(r#"{"O:": "x"}"#), Err(ResourceError::InvalidResource { .. })));
        assert!(matches!(
            parse(r#"{"A.B": "x", "A": {"B": "y"}}"#),
            Err(ResourceError::InvalidResource { .. })
        ));
        assert!(matches!(parse("{"), Err(ResourceError::Parse { .. })));
    }

    #[test]
    fn test_add_file_normalizes_culture() {
        let mut set = PackageLocaleSet::new("Lib");
        set.add_file("EN_gb", r#"{"Colour": "Colour"}"#, &origin(), Utf8Path::new("EN_gb.json"))
            .unwrap();
        set.insert("en-GB", "Hello", Translation::new("Hiya", origin(), ResourceOverrideKind::None));

        let cultures: Vec<_> = set.cultures().map(|(c, t)| (c.as_str(), t.len())).collect();
        assert_eq!(cultures, [("en-gb", 2)]);
    }

    #[test]
    fn test_load_from_folder() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let locales = root.join("ts-locales");
        fs::create_dir(&locales).unwrap();
        fs::write(locales.join("default.json"), r#"{"Title": "Title"}"#).unwrap();
        fs::write(locales.join("en_GB.json"), r#"{"Colour": "Colour"}"#).unwrap();
        fs::write(locales.join("notes.txt"), "ignored").unwrap();

        let source = PackageSource {
            name: "App",
            root,
            kind: ContainerKind::FileSystem,
        };
        let set = PackageLocaleSet::load(source, &LayoutConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(set.package_name(), "App");
        assert_eq!(set.len(), 2);
        let cultures: Vec<_> = set.cultures().map(|(c, _)| c.as_str()).collect();
        assert_eq!(cultures, ["default", "en-gb"]);

        let (_, en_gb) = set.cultures().nth(1).unwrap();
        let origin = &en_gb["Colour"].origin;
        assert_eq!(origin.path(), "en_GB.json");
        assert!(origin.container().is_local());
    }

    #[test]
    fn test_missing_folder_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let source = PackageSource {
            name: "App",
            root: Utf8Path::from_path(dir.path()).unwrap(),
            kind: ContainerKind::Embedded,
        };
        assert!(PackageLocaleSet::load(source, &LayoutConfig::default()).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_culture_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let locales = root.join("ts-locales");
        fs::create_dir(&locales).unwrap();
        fs::write(locales.join("en-gb.json"), "{}").unwrap();
        fs::write(locales.join("EN_gb.json"), "{}").unwrap();
        let source = PackageSource {
            name: "App",
            root,
            kind: ContainerKind::Embedded,
        };
        assert!(matches!(
            PackageLocaleSet::load(source, &LayoutConfig::default()),
            Err(ResourceError::InvalidResource { .. })
        ));
    }
}
