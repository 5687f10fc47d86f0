//! Live segments: the segment list plus the loaded local packages.

use std::sync::Arc;

use ckl_core::{FxHashMap, LayoutConfig, LocalPackage};
use tracing::{debug, info};

use crate::error::ResourceError;
use crate::merge::{FinalSet, PackageSet, PackageSource};
use crate::segment::Segment;

impl<F: FinalSet> Segment<F> {
    /// Applies this segment to a target accumulator.
    ///
    /// A `Regular` segment folds its final set, which never changes. A `Local`
    /// segment re-reads its package folder; it returns `Ok(false)` without
    /// touching the target when the folder does not exist.
    ///
    /// # Errors
    ///
    /// Load errors of a local package and override rule violations.
    pub fn apply(&self, target: &mut F, layout: &LayoutConfig) -> Result<bool, ResourceError> {
        match self {
            Self::Regular(set) => {
                target.add_final(set)?;
                Ok(true)
            }
            Self::Local(package) => match F::Package::load(PackageSource::local(package), layout)? {
                Some(set) => {
                    target.add_package(&set)?;
                    Ok(true)
                }
                None => Ok(false),
            },
        }
    }
}

/// A segment list kept live: local packages are loaded once and reloaded on
/// demand, and the full application view is recomputed after each reload.
///
/// The view only changes when a reload succeeds; a failing reload leaves the
/// previous local content and view in place.
pub struct LiveResources<F: FinalSet> {
    segments: Vec<Segment<F>>,
    locals: FxHashMap<usize, Option<F::Package>>,
    view: Arc<F>,
    layout: LayoutConfig,
}

impl<F: FinalSet> LiveResources<F> {
    /// Loads every local segment and computes the full view.
    ///
    /// # Errors
    ///
    /// Load errors of local packages and override rule violations of the
    /// composed view.
    pub fn new(segments: Vec<Segment<F>>, layout: &LayoutConfig) -> Result<Self, ResourceError> {
        let mut locals = FxHashMap::default();
        for package in segments.iter().filter_map(Segment::as_local) {
            let set = F::Package::load(PackageSource::local(package), layout)?;
            locals.insert(package.idx(), set);
        }
        let view = compose(&segments, |idx| locals.get(&idx).and_then(Option::as_ref))?;
        debug!(
            kind = %F::Package::KIND,
            segments = segments.len(),
            resources = view.len(),
            "Live resources ready"
        );
        Ok(Self {
            segments,
            locals,
            view: Arc::new(view),
            layout: layout.clone(),
        })
    }

    /// Returns the full application view.
    #[inline]
    #[must_use]
    pub fn view(&self) -> &Arc<F> {
        &self.view
    }

    /// Returns the segment list.
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment<F>] {
        &self.segments
    }

    /// Returns `true` when the local package `idx` is one of the segments.
    #[must_use]
    pub fn tracks(&self, idx: usize) -> bool {
        self.locals.contains_key(&idx)
    }

    /// Returns the loaded content of a local package, if it has any.
    #[must_use]
    pub fn local_set(&self, idx: usize) -> Option<&F::Package> {
        self.locals.get(&idx).and_then(Option::as_ref)
    }

    fn local(&self, idx: usize) -> Option<&Arc<LocalPackage>> {
        self.segments
            .iter()
            .filter_map(Segment::as_local)
            .find(|package| package.idx() == idx)
    }

    /// Reloads one local package from disk and recomputes the view.
    ///
    /// Returns `Ok(false)` when the package is not tracked or its resource
    /// folder no longer exists (its contributions are dropped from the view).
    ///
    /// # Errors
    ///
    /// Load errors and override rule violations. The previous state is kept.
    pub fn reload_local(&mut self, idx: usize) -> Result<bool, ResourceError> {
        let Some(package) = self.local(idx).cloned() else {
            return Ok(false);
        };
        let loaded = F::Package::load(PackageSource::local(&package), &self.layout)?;
        let found = loaded.is_some();

        let view = compose(&self.segments, |i| {
            if i == idx {
                loaded.as_ref()
            } else {
                self.locals.get(&i).and_then(Option::as_ref)
            }
        })?;

        info!(
            kind = %F::Package::KIND,
            package = %package.name(),
            resources = view.len(),
            "Local package reloaded"
        );
        self.locals.insert(idx, loaded);
        self.view = Arc::new(view);
        Ok(found)
    }
}

impl<F: FinalSet> std::fmt::Debug for LiveResources<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveResources")
            .field("kind", &F::Package::KIND)
            .field("segments", &self.segments.len())
            .field("locals", &self.locals.len())
            .field("resources", &self.view.len())
            .finish_non_exhaustive()
    }
}

/// Folds every segment, in order, into a full view.
fn compose<'a, F: FinalSet>(
    segments: &[Segment<F>],
    local: impl Fn(usize) -> Option<&'a F::Package>,
) -> Result<F, ResourceError>
where
    F::Package: 'a,
{
    let mut view = F::new(false);
    for segment in segments {
        match segment {
            Segment::Regular(set) => view.add_final(set)?,
            Segment::Local(package) => {
                if let Some(set) = local(package.idx()) {
                    view.add_package(set)?;
                }
            }
        }
    }
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::FinalResourceAssetSet;
    use crate::locales::FinalLocaleCultureSet;
    use crate::segment::SegmentBuilder;
    use camino::Utf8Path;
    use ckl_core::ContainerKind;
    use std::fs;

    fn write(root: &Utf8Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn regular(root: &Utf8Path) -> crate::locales::PackageLocaleSet {
        let source = PackageSource {
            name: "Lib",
            root,
            kind: ContainerKind::Embedded,
        };
        crate::locales::PackageLocaleSet::load(source, &LayoutConfig::default())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_reload_local() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let lib = root.join("lib");
        let app = root.join("app");
        write(&lib, "ts-locales/en.json", r#"{"Hello": "Hello", "Bye": "Bye"}"#);
        write(&app, "ts-locales/en.json", r#"{"O:Hello": "Hi"}"#);

        let mut builder = SegmentBuilder::<FinalLocaleCultureSet>::new();
        builder.add_regular(&regular(&lib)).unwrap();
        builder.add_local(Arc::new(LocalPackage::new(0, "App", &app)));
        let mut live = LiveResources::new(builder.finish(), &LayoutConfig::default()).unwrap();
        assert!(live.tracks(0));
        assert_eq!(live.view().translate("en", "Hello").unwrap().text, "Hi");

        write(&app, "ts-locales/en.json", r#"{"O:Hello": "Hey", "O:Bye": "Ciao"}"#);
        assert!(live.reload_local(0).unwrap());
        assert_eq!(live.view().translate("en", "Hello").unwrap().text, "Hey");
        assert_eq!(live.view().translate("en", "Bye").unwrap().text, "Ciao");

        // A conflicting edit keeps the previous state.
        write(&app, "ts-locales/en.json", r#"{"Hello": "Dup"}"#);
        assert!(live.reload_local(0).unwrap_err().is_conflict());
        assert_eq!(live.view().translate("en", "Hello").unwrap().text, "Hey");

        // A broken file too.
        write(&app, "ts-locales/en.json", "{ not json");
        assert!(live.reload_local(0).is_err());
        assert_eq!(live.view().translate("en", "Bye").unwrap().text, "Ciao");

        // Removing the folder drops the package's contributions.
        fs::remove_dir_all(app.join("ts-locales")).unwrap();
        assert!(!live.reload_local(0).unwrap());
        assert_eq!(live.view().translate("en", "Hello").unwrap().text, "Hello");
        assert!(live.local_set(0).is_none());

        assert!(!live.reload_local(7).unwrap());
    }

    #[test]
    fn test_segment_apply() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        write(root, "ts-assets/a.png", "a");
        let layout = LayoutConfig::default();

        let present = Segment::<FinalResourceAssetSet>::Local(Arc::new(LocalPackage::new(0, "A", root)));
        let missing = Segment::<FinalResourceAssetSet>::Local(Arc::new(LocalPackage::new(
            1,
            "B",
            root.join("nope"),
        )));

        let mut target = FinalResourceAssetSet::new(false);
        assert!(present.apply(&mut target, &layout).unwrap());
        assert!(!missing.apply(&mut target, &layout).unwrap());
        assert_eq!(target.len(), 1);

        let regular = Segment::Regular(Arc::new(target.clone()));
        let mut other = FinalResourceAssetSet::new(false);
        assert!(regular.apply(&mut other, &layout).unwrap());
        assert_eq!(other, target);
    }
}
