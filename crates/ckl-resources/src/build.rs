//! Build-time merge of a whole application.

use std::sync::Arc;

use ckl_core::{AppManifest, LocalPackage, PackageKind};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::ResourceError;
use crate::live::LiveResources;
use crate::merge::{FinalSet, PackageSet, PackageSource};
use crate::segment::SegmentBuilder;

/// Merges every package of the manifest, in order, into a live segment list.
///
/// Regular packages are loaded in parallel and then folded in manifest
/// order. `locals` must be the manifest's local packages with their indices
/// (see [`AppManifest::local_packages`]); sharing them across resource kinds
/// keeps one identity per local package.
///
/// # Errors
///
/// The first load error or override rule violation. Nothing is kept.
pub fn build_resources<F: FinalSet>(
    manifest: &AppManifest,
    locals: &[Arc<LocalPackage>],
) -> Result<LiveResources<F>, ResourceError> {
    let layout = &manifest.config.layout;
    let regulars: Vec<_> = manifest
        .packages
        .iter()
        .filter(|p| p.kind == PackageKind::Regular)
        .collect();

    let loaded = regulars
        .par_iter()
        .map(|package| F::Package::load(PackageSource::regular(package), layout))
        .collect::<Result<Vec<_>, _>>()?;
    let mut loaded = loaded.into_iter();

    let mut builder = SegmentBuilder::<F>::new();
    let mut next_local = locals.iter();
    for package in &manifest.packages {
        match package.kind {
            PackageKind::Regular => {
                if let Some(set) = loaded.next().flatten() {
                    debug!(kind = %F::Package::KIND, package = %package.name, "Merging regular package");
                    builder.add_regular(&set)?;
                }
            }
            PackageKind::Local => {
                if let Some(local) = next_local.next() {
                    builder.add_local(Arc::clone(local));
                }
            }
        }
    }

    let segments = builder.finish();
    info!(
        kind = %F::Package::KIND,
        packages = manifest.packages.len(),
        segments = segments.len(),
        "Segments built"
    );
    LiveResources::new(segments, layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::FinalResourceAssetSet;
    use crate::locales::FinalLocaleCultureSet;
    use crate::segment::Segment;
    use camino::Utf8Path;
    use std::fs;

    fn write(root: &Utf8Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn manifest(root: &Utf8Path) -> AppManifest {
        let json = r#"{
            "packages": [
                { "name": "Lib", "kind": "regular", "path": "lib" },
                { "name": "Theme", "kind": "regular", "path": "theme" },
                { "name": "App", "kind": "local", "path": "app" },
                { "name": "Extra", "kind": "regular", "path": "extra" }
            ]
        }"#;
        AppManifest::from_json(json, root).unwrap()
    }

    #[test]
    fn test_build_locales_and_assets() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        write(root, "lib/ts-locales/en.json", r#"{"Hello": "Hello"}"#);
        write(root, "lib/ts-assets/logo.png", "lib");
        write(root, "theme/ts-locales/en.json", r#"{"O:Hello": "Hi"}"#);
        write(root, "app/ts-locales/en-gb.json", r#"{"Colour": "Colour"}"#);
        write(root, "extra/ts-assets/logo.png", "extra");
        write(root, "extra/ts-assets/assets.json", r#"{"regular": ["logo.png"]}"#);

        let manifest = manifest(root);
        let locals = manifest.local_packages();

        let locales = build_resources::<FinalLocaleCultureSet>(&manifest, &locals).unwrap();
        assert_eq!(locales.segments().len(), 2);
        assert!(matches!(locales.segments()[1], Segment::Local(_)));
        assert_eq!(locales.view().translate("en-GB", "Hello").unwrap().text, "Hi");
        assert_eq!(locales.view().translate("en-GB", "Colour").unwrap().text, "Colour");

        let assets = build_resources::<FinalResourceAssetSet>(&manifest, &locals).unwrap();
        let shape: Vec<_> = assets.segments().iter().map(Segment::is_regular).collect();
        assert_eq!(shape, [true, false, true]);
        assert!(assets.segments()[2].as_regular().unwrap().is_partial());
        assert_eq!(assets.view().get("logo.png").unwrap().origin.package_name(), "Extra");
    }

    #[test]
    fn test_build_conflict_fails() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        write(root, "lib/ts-assets/logo.png", "lib");
        write(root, "extra/ts-assets/logo.png", "extra");
        fs::create_dir_all(root.join("app")).unwrap();

        let manifest = manifest(root);
        let err = build_resources::<FinalResourceAssetSet>(&manifest, &manifest.local_packages())
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("'Extra'"));
    }
}
