//! Generated output: resolved locale files and installed asset copies.
//!
//! ```text
//! <output>/ts-locales/<culture>.json   resolved translations, one per culture
//! <output>/assets/<path>               copy of the winning asset
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use ckl_core::LayoutConfig;
use tracing::{debug, info};

use crate::assets::FinalResourceAssetSet;
use crate::error::ResourceError;
use crate::locales::FinalLocaleCultureSet;

/// Output sub-folder receiving asset copies.
pub const ASSETS_OUTPUT_FOLDER: &str = "assets";

/// Returns the folder receiving resolved locale files.
#[must_use]
pub fn locales_output_dir(output: &Utf8Path, layout: &LayoutConfig) -> Utf8PathBuf {
    output.join(&layout.locales_folder)
}

/// Returns the folder receiving asset copies.
#[must_use]
pub fn assets_output_dir(output: &Utf8Path) -> Utf8PathBuf {
    output.join(ASSETS_OUTPUT_FOLDER)
}

/// Counts of files touched by an output pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputReport {
    /// Files written or copied.
    pub written: usize,
    /// Stale files removed.
    pub removed: usize,
}

/// Renders the resolved translations of one culture as pretty JSON.
///
/// # Errors
///
/// Serialization errors, which only occur for invalid maps.
pub fn render_culture(view: &FinalLocaleCultureSet, culture: &str) -> Result<String, serde_json::Error> {
    let texts: BTreeMap<&str, &str> = view
        .resolved(culture)
        .into_iter()
        .map(|(key, translation)| (key, translation.text.as_str()))
        .collect();
    let mut json = serde_json::to_string_pretty(&texts)?;
    json.push('\n');
    Ok(json)
}

/// Writes one `<culture>.json` per culture node into `dir`, and removes the
/// files of cultures that no longer exist.
///
/// Files whose content is unchanged are left untouched.
///
/// # Errors
///
/// [`ResourceError::Write`] when a file cannot be written or removed.
pub fn write_locales(view: &FinalLocaleCultureSet, dir: &Utf8Path) -> Result<OutputReport, ResourceError> {
    fs::create_dir_all(dir).map_err(|e| ResourceError::write(dir, e))?;
    let mut report = OutputReport::default();

    let mut expected = Vec::new();
    for node in view.cultures() {
        let file_name = format!("{}.json", node.culture());
        let path = dir.join(&file_name);
        let json = render_culture(view, node.culture()).map_err(|e| ResourceError::parse(&path, e))?;
        if fs::read_to_string(&path).ok().as_deref() != Some(json.as_str()) {
            fs::write(&path, json).map_err(|e| ResourceError::write(&path, e))?;
            report.written += 1;
        }
        expected.push(file_name);
    }

    for entry in fs::read_dir(dir).map_err(|e| ResourceError::read(dir, e))? {
        let entry = entry.map_err(|e| ResourceError::read(dir, e))?;
        let Ok(path) = Utf8PathBuf::try_from(entry.path()) else {
            continue;
        };
        let stale = path.extension() == Some("json")
            && path.file_name().is_some_and(|name| !expected.iter().any(|e| e == name));
        if stale {
            fs::remove_file(&path).map_err(|e| ResourceError::write(&path, e))?;
            report.removed += 1;
        }
    }

    debug!(dir = %dir, written = report.written, removed = report.removed, "Locales written");
    Ok(report)
}

/// Installs asset copies into `dir`, touching only what changed since
/// `previous`.
///
/// With no previous view every asset is copied.
///
/// # Errors
///
/// [`ResourceError::Read`] when a source is missing and
/// [`ResourceError::Write`] when a copy or removal fails.
pub fn install_assets(
    view: &FinalResourceAssetSet,
    previous: Option<&FinalResourceAssetSet>,
    dir: &Utf8Path,
) -> Result<OutputReport, ResourceError> {
    let changes = view.changes_since(previous);
    let mut report = OutputReport::default();

    for path in &changes.removed {
        let target = dir.join(path);
        match fs::remove_file(&target) {
            Ok(()) => report.removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ResourceError::write(target, e)),
        }
    }

    for path in &changes.updated {
        let Some(entry) = view.get(path) else {
            continue;
        };
        let source = entry.source_path();
        let target = dir.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| ResourceError::write(parent, e))?;
        }
        fs::copy(&source, &target).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ResourceError::read(&source, e)
            } else {
                ResourceError::write(&target, e)
            }
        })?;
        report.written += 1;
    }

    if !changes.is_empty() {
        info!(dir = %dir, copied = report.written, removed = report.removed, "Assets installed");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::FinalSet;
    use crate::{AssetEntry, PackageAssetSet, PackageLocaleSet, Translation};
    use ckl_core::{ResourceContainer, ResourceLocator, ResourceOverrideKind, UTC_MIN_VALUE};
    use std::sync::Arc;

    fn locales() -> FinalLocaleCultureSet {
        let container = Arc::new(ResourceContainer::embedded("Lib", "/lib/ts-locales"));
        let origin = ResourceLocator::new(container, "en.json");
        let mut package = PackageLocaleSet::new("Lib");
        for (culture, key, text) in [
            ("default", "Title", "App"),
            ("en", "Hello", "Hello"),
            ("en-gb", "Colour", "Colour"),
        ] {
            package.insert(
                culture,
                key,
                Translation::new(text, origin.clone(), ResourceOverrideKind::None),
            );
        }
        let mut set = FinalLocaleCultureSet::new(false);
        set.add_package(&package).unwrap();
        set
    }

    #[test]
    fn test_render_culture() {
        let json = render_culture(&locales(), "en-gb").unwrap();
        insta::assert_snapshot!(json.trim_end(), @r#"
        {
          "Colour": "Colour",
          "Hello": "Hello",
          "Title": "App"
        }
        "#);
    }

    #[test]
    fn test_write_locales_removes_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = Utf8Path::from_path(dir.path()).unwrap().join("ts-locales");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("fr.json"), "{}").unwrap();
        fs::write(out.join("README.md"), "keep").unwrap();

        let view = locales();
        let report = write_locales(&view, &out).unwrap();
        assert_eq!(report, OutputReport { written: 3, removed: 1 });
        assert!(out.join("en-gb.json").is_file());
        assert!(out.join("README.md").is_file());

        let again = write_locales(&view, &out).unwrap();
        assert_eq!(again, OutputReport::default());
    }

    #[test]
    fn test_install_assets_diff() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let source = root.join("lib/ts-assets");
        fs::create_dir_all(source.join("img")).unwrap();
        fs::write(source.join("img/a.png"), "a").unwrap();
        fs::write(source.join("b.png"), "b").unwrap();

        let container = Arc::new(ResourceContainer::embedded("Lib", source.as_str()));
        let entry = |path: &str| {
            (
                path.to_owned(),
                AssetEntry::new(
                    ResourceLocator::new(Arc::clone(&container), path),
                    ResourceOverrideKind::None,
                    UTC_MIN_VALUE,
                ),
            )
        };

        let mut first = FinalResourceAssetSet::new(false);
        first
            .add_package(&PackageAssetSet::from_parts("Lib", [entry("img/a.png"), entry("b.png")].into()))
            .unwrap();
        let out = root.join("ck-gen/assets");
        let report = install_assets(&first, None, &out).unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(fs::read_to_string(out.join("img/a.png")).unwrap(), "a");

        let mut second = FinalResourceAssetSet::new(false);
        second
            .add_package(&PackageAssetSet::from_parts("Lib", [entry("img/a.png")].into()))
            .unwrap();
        let report = install_assets(&second, Some(&first), &out).unwrap();
        assert_eq!(report, OutputReport { written: 0, removed: 1 });
        assert!(!out.join("b.png").exists());
    }
}
