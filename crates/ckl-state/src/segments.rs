//! Segment list serialization.
//!
//! Each segment is written as a signed index: `-1` is followed by a full
//! aggregate, `n >= 0` refers to the `n`-th entry of the local package array
//! and carries nothing else. Reading binds local segments by position, so the
//! same array must be used on both sides.

use std::io::{Read, Write};
use std::sync::Arc;

use ckl_core::LocalPackage;
use ckl_resources::{Segment, SegmentBuilder};
use tracing::trace;

use crate::codec::{StateReader, StateWriter};
use crate::error::StateError;
use crate::finals::FinalCodec;

/// Segment index announcing an inline aggregate.
pub const REGULAR_SEGMENT: i32 = -1;

/// Writes a segment list.
///
/// # Errors
///
/// [`StateError::InvalidSegmentIndex`] when a local segment is not the entry
/// of `locals` at its own index, and I/O errors.
pub fn write_segments<F: FinalCodec, W: Write>(
    writer: &mut StateWriter<W>,
    segments: &[Segment<F>],
    locals: &[Arc<LocalPackage>],
) -> Result<(), StateError> {
    writer.write_count(segments.len())?;
    for segment in segments {
        match segment {
            Segment::Regular(set) => {
                writer.write_i32(REGULAR_SEGMENT)?;
                set.write_to(writer)?;
            }
            Segment::Local(package) => {
                let idx = package.idx();
                let bound = locals.get(idx).is_some_and(|l| **l == **package);
                let index = i32::try_from(idx).ok().filter(|_| bound).ok_or(
                    StateError::InvalidSegmentIndex {
                        index: i64::try_from(idx).unwrap_or(i64::MAX),
                        locals: locals.len(),
                    },
                )?;
                writer.write_i32(index)?;
            }
        }
    }
    Ok(())
}

/// Reads a segment list, binding local segments to `locals` by position.
///
/// The first segment's aggregate is read as a full set, later ones as
/// partial sets. Adjacent regular segments are merged on the way.
///
/// # Errors
///
/// [`StateError::InvalidSegmentIndex`] for an index other than `-1` that is
/// not a position in `locals`, [`StateError::Corrupt`] when adjacent
/// aggregates cannot be merged, and any decoding error.
pub fn read_segments<F: FinalCodec, R: Read>(
    reader: &mut StateReader<R>,
    locals: &[Arc<LocalPackage>],
) -> Result<Vec<Segment<F>>, StateError> {
    let count = reader.read_count()?;
    let mut builder = SegmentBuilder::new();
    for position in 0..count {
        let index = reader.read_i32()?;
        if index == REGULAR_SEGMENT {
            let set = F::read_from(reader, position > 0)?;
            builder
                .add_final(Arc::new(set))
                .map_err(|e| StateError::Corrupt(e.to_string()))?;
            continue;
        }
        let package = usize::try_from(index)
            .ok()
            .and_then(|idx| locals.get(idx))
            .ok_or(StateError::InvalidSegmentIndex {
                index: i64::from(index),
                locals: locals.len(),
            })?;
        trace!(index, package = %package.name(), "Local segment");
        builder.add_local(Arc::clone(package));
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckl_core::{ResourceContainer, ResourceLocator, ResourceOverrideKind, UTC_MIN_VALUE};
    use ckl_resources::{AssetEntry, FinalResourceAssetSet, FinalSet, PackageAssetSet};

    fn final_set(name: &str, path: &str, partial: bool) -> FinalResourceAssetSet {
        let container = Arc::new(ResourceContainer::embedded(name, format!("/{name}")));
        let entry = AssetEntry::new(
            ResourceLocator::new(container, path),
            ResourceOverrideKind::None,
            UTC_MIN_VALUE,
        );
        let mut set = FinalResourceAssetSet::new(partial);
        set.add_package(&PackageAssetSet::from_parts(name, [(path.to_owned(), entry)].into()))
            .unwrap();
        set
    }

    fn locals() -> Vec<Arc<LocalPackage>> {
        vec![
            Arc::new(LocalPackage::new(0, "App", "/app")),
            Arc::new(LocalPackage::new(1, "Site", "/site")),
        ]
    }

    #[test]
    fn test_segment_list_shape_survives() {
        let locals = locals();
        let segments: Vec<Segment<FinalResourceAssetSet>> = vec![
            Segment::Regular(Arc::new(final_set("Lib", "a.png", false))),
            Segment::Local(Arc::clone(&locals[1])),
            Segment::Regular(Arc::new(final_set("Theme", "b.png", true))),
            Segment::Local(Arc::clone(&locals[0])),
        ];

        let mut writer = StateWriter::new(Vec::new());
        write_segments(&mut writer, &segments, &locals).unwrap();
        let bytes = writer.into_inner().unwrap();
        assert_eq!(&bytes[4..8], &REGULAR_SEGMENT.to_le_bytes());

        let mut reader = StateReader::new(bytes.as_slice());
        let decoded: Vec<Segment<FinalResourceAssetSet>> = read_segments(&mut reader, &locals).unwrap();
        assert_eq!(decoded.len(), 4);
        assert!(!decoded[0].as_regular().unwrap().is_partial());
        assert!(Arc::ptr_eq(decoded[1].as_local().unwrap(), &locals[1]));
        assert_eq!(**decoded[2].as_regular().unwrap(), **segments[2].as_regular().unwrap());
        assert!(decoded[2].as_regular().unwrap().is_partial());
        assert_eq!(decoded[3].as_local().unwrap().name(), "App");

        let mut writer = StateWriter::new(Vec::new());
        write_segments(&mut writer, &decoded, &locals).unwrap();
        assert_eq!(writer.into_inner().unwrap(), bytes);
    }

    #[test]
    fn test_empty_list() {
        let mut writer = StateWriter::new(Vec::new());
        write_segments::<FinalResourceAssetSet, _>(&mut writer, &[], &[]).unwrap();
        let bytes = writer.into_inner().unwrap();
        assert_eq!(bytes, [0, 0, 0, 0]);
        let mut reader = StateReader::new(bytes.as_slice());
        assert!(read_segments::<FinalResourceAssetSet, _>(&mut reader, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_index_out_of_local_array() {
        let mut writer = StateWriter::new(Vec::new());
        writer.write_count(1).unwrap();
        writer.write_i32(2).unwrap();
        let bytes = writer.into_inner().unwrap();
        let mut reader = StateReader::new(bytes.as_slice());
        let err = read_segments::<FinalResourceAssetSet, _>(&mut reader, &locals()).unwrap_err();
        assert!(matches!(err, StateError::InvalidSegmentIndex { index: 2, locals: 2 }));

        let mut writer = StateWriter::new(Vec::new());
        writer.write_count(1).unwrap();
        writer.write_i32(-2).unwrap();
        let bytes = writer.into_inner().unwrap();
        let mut reader = StateReader::new(bytes.as_slice());
        assert!(read_segments::<FinalResourceAssetSet, _>(&mut reader, &locals()).is_err());
    }

    #[test]
    fn test_unbound_local_segment_is_rejected() {
        let stranger = Arc::new(LocalPackage::new(0, "Other", "/other"));
        let segments: Vec<Segment<FinalResourceAssetSet>> = vec![Segment::Local(stranger)];
        let mut writer = StateWriter::new(Vec::new());
        let err = write_segments(&mut writer, &segments, &locals()).unwrap_err();
        assert!(matches!(err, StateError::InvalidSegmentIndex { .. }));
    }

    #[test]
    fn test_adjacent_aggregates_are_merged() {
        let mut writer = StateWriter::new(Vec::new());
        writer.write_count(2).unwrap();
        writer.write_i32(REGULAR_SEGMENT).unwrap();
        final_set("A", "a.png", false).write_to(&mut writer).unwrap();
        writer.write_i32(REGULAR_SEGMENT).unwrap();
        final_set("B", "b.png", true).write_to(&mut writer).unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut reader = StateReader::new(bytes.as_slice());
        let segments = read_segments::<FinalResourceAssetSet, _>(&mut reader, &[]).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].as_regular().unwrap().len(), 2);
    }
}
