//! The segment list produced by the merge builder.

use std::sync::Arc;

use ckl_core::LocalPackage;
use tracing::debug;

use crate::error::ResourceError;
use crate::merge::FinalSet;

/// One entry of a segment list.
///
/// A `Regular` segment is the merge of one or more consecutive regular
/// packages and never changes during a live session. A `Local` segment is a
/// single local package, reloaded from disk on change.
#[derive(Debug)]
pub enum Segment<F> {
    /// Merged run of regular packages.
    Regular(Arc<F>),
    /// A local package, by reference.
    Local(Arc<LocalPackage>),
}

impl<F> Clone for Segment<F> {
    fn clone(&self) -> Self {
        match self {
            Self::Regular(set) => Self::Regular(Arc::clone(set)),
            Self::Local(package) => Self::Local(Arc::clone(package)),
        }
    }
}

impl<F> Segment<F> {
    /// Returns the local package of a `Local` segment.
    #[must_use]
    pub fn as_local(&self) -> Option<&Arc<LocalPackage>> {
        match self {
            Self::Local(package) => Some(package),
            Self::Regular(_) => None,
        }
    }

    /// Returns the final set of a `Regular` segment.
    #[must_use]
    pub fn as_regular(&self) -> Option<&Arc<F>> {
        match self {
            Self::Regular(set) => Some(set),
            Self::Local(_) => None,
        }
    }

    /// Returns `true` for a `Regular` segment.
    #[inline]
    #[must_use]
    pub const fn is_regular(&self) -> bool {
        matches!(self, Self::Regular(_))
    }
}

/// Folds a dependency-ordered package sequence into a segment list.
///
/// Consecutive regular packages accumulate into one open final set; a local
/// package closes it. The resulting list never holds two adjacent `Regular`
/// segments.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use ckl_core::LocalPackage;
/// use ckl_resources::{FinalResourceAssetSet, SegmentBuilder};
///
/// let mut builder = SegmentBuilder::<FinalResourceAssetSet>::new();
/// builder.add_local(Arc::new(LocalPackage::new(0, "App", "/proj/app")));
/// let segments = builder.finish();
/// assert_eq!(segments.len(), 1);
/// assert!(!segments[0].is_regular());
/// ```
#[derive(Debug)]
pub struct SegmentBuilder<F> {
    segments: Vec<Segment<F>>,
    current: Option<F>,
}

impl<F> Default for SegmentBuilder<F> {
    fn default() -> Self {
        Self {
            segments: Vec::new(),
            current: None,
        }
    }
}

impl<F: FinalSet> SegmentBuilder<F> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a regular package set to the open accumulator, opening one if
    /// needed.
    ///
    /// A new accumulator is partial unless it starts the segment list.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Conflict`] when the package violates an override rule
    /// against the accumulated content.
    pub fn add_regular(&mut self, package: &F::Package) -> Result<(), ResourceError> {
        let partial = !self.segments.is_empty();
        let current = self.current.get_or_insert_with(|| {
            debug!(partial, "Opening regular accumulator");
            F::new(partial)
        });
        current.add_package(package)
    }

    /// Closes the open accumulator and appends a local package segment.
    pub fn add_local(&mut self, package: Arc<LocalPackage>) {
        self.flush();
        debug!(package = %package.name(), idx = package.idx(), "Local segment");
        self.segments.push(Segment::Local(package));
    }

    /// Appends an already merged final set, merging it into the open
    /// accumulator when there is one.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Conflict`] when folding into the open accumulator
    /// fails.
    pub fn add_final(&mut self, set: Arc<F>) -> Result<(), ResourceError> {
        match &mut self.current {
            Some(current) => current.add_final(&set),
            None => {
                if let Some(Segment::Regular(last)) = self.segments.last_mut() {
                    let mut merged = F::new(last.is_partial());
                    merged.add_final(last)?;
                    merged.add_final(&set)?;
                    *last = Arc::new(merged);
                } else {
                    self.segments.push(Segment::Regular(set));
                }
                Ok(())
            }
        }
    }

    fn flush(&mut self) {
        if let Some(current) = self.current.take() {
            debug!(resources = current.len(), "Closing regular accumulator");
            self.segments.push(Segment::Regular(Arc::new(current)));
        }
    }

    /// Flushes the open accumulator and returns the segment list.
    #[must_use]
    pub fn finish(mut self) -> Vec<Segment<F>> {
        self.flush();
        self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetEntry, FinalResourceAssetSet, PackageAssetSet};
    use ckl_core::{ResourceContainer, ResourceLocator, ResourceOverrideKind, UTC_MIN_VALUE};

    fn package(name: &str, paths: &[&str]) -> PackageAssetSet {
        let container = Arc::new(ResourceContainer::embedded(name, format!("/{name}")));
        let assets = paths
            .iter()
            .map(|path| {
                (
                    (*path).to_owned(),
                    AssetEntry::new(
                        ResourceLocator::new(Arc::clone(&container), *path),
                        ResourceOverrideKind::None,
                        UTC_MIN_VALUE,
                    ),
                )
            })
            .collect();
        PackageAssetSet::from_parts(name, assets)
    }

    fn local(idx: usize) -> Arc<LocalPackage> {
        Arc::new(LocalPackage::new(idx, format!("L{idx}"), format!("/l{idx}")))
    }

    fn shape(segments: &[Segment<FinalResourceAssetSet>]) -> String {
        segments
            .iter()
            .map(|s| match s {
                Segment::Regular(set) if set.is_partial() => "R*".to_owned(),
                Segment::Regular(_) => "R".to_owned(),
                Segment::Local(p) => format!("L{}", p.idx()),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_empty_builder_yields_no_segment() {
        let builder = SegmentBuilder::<FinalResourceAssetSet>::new();
        assert!(builder.finish().is_empty());
    }

    #[test]
    fn test_consecutive_regulars_merge() {
        let mut builder = SegmentBuilder::<FinalResourceAssetSet>::new();
        builder.add_regular(&package("A", &["a.png"])).unwrap();
        builder.add_regular(&package("B", &["b.png"])).unwrap();
        builder.add_local(local(0));
        builder.add_regular(&package("C", &["c.png"])).unwrap();
        builder.add_local(local(1));
        builder.add_local(local(2));
        builder.add_regular(&package("D", &["d.png"])).unwrap();

        let segments = builder.finish();
        assert_eq!(shape(&segments), "R L0 R* L1 L2 R*");
        assert_eq!(segments[0].as_regular().unwrap().len(), 2);
    }

    #[test]
    fn test_no_adjacent_regular_segments_for_any_order() {
        // Every sequence of 6 additions, encoded as bits (1 = regular).
        for mask in 0u32..64 {
            let mut builder = SegmentBuilder::<FinalResourceAssetSet>::new();
            let mut locals = 0;
            for bit in 0..6 {
                if mask & (1 << bit) != 0 {
                    let name = format!("P{bit}");
                    let path = format!("{bit}.png");
                    builder.add_regular(&package(&name, &[path.as_str()])).unwrap();
                } else {
                    builder.add_local(local(locals));
                    locals += 1;
                }
            }
            let segments = builder.finish();
            assert!(
                segments.windows(2).all(|w| !(w[0].is_regular() && w[1].is_regular())),
                "adjacent regular segments for mask {mask:06b}"
            );
            for (i, segment) in segments.iter().enumerate() {
                if let Some(set) = segment.as_regular() {
                    assert_eq!(set.is_partial(), i > 0);
                }
            }
        }
    }

    #[test]
    fn test_add_final_keeps_runs_maximal() {
        let mut first = FinalResourceAssetSet::new(false);
        first.add_package(&package("A", &["a.png"])).unwrap();
        let mut second = FinalResourceAssetSet::new(true);
        second.add_package(&package("B", &["b.png"])).unwrap();

        let mut builder = SegmentBuilder::new();
        builder.add_final(Arc::new(first)).unwrap();
        builder.add_final(Arc::new(second)).unwrap();
        let segments = builder.finish();
        assert_eq!(shape(&segments), "R");
        assert_eq!(segments[0].as_regular().unwrap().len(), 2);
    }

    #[test]
    fn test_conflict_aborts() {
        let mut builder = SegmentBuilder::<FinalResourceAssetSet>::new();
        builder.add_regular(&package("A", &["a.png"])).unwrap();
        let err = builder.add_regular(&package("B", &["a.png"])).unwrap_err();
        assert!(err.is_conflict());
    }
}
