//! The whole state file.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::sync::Arc;

use camino::Utf8Path;
use ckl_core::LocalPackage;
use ckl_resources::{FinalLocaleCultureSet, FinalResourceAssetSet, FinalSet, LiveResources, Segment};
use tracing::{debug, info};

use crate::codec::{MAX_PREALLOC, StateReader, StateWriter};
use crate::error::StateError;
use crate::segments::{read_segments, write_segments};

/// State file magic.
pub const MAGIC: &[u8; 4] = b"CKLS";

/// Current format version.
pub const FORMAT_VERSION: u8 = 1;

/// Everything a live session needs to resume a build: the local package
/// array and the segment list of each resource kind.
#[derive(Debug, Clone)]
pub struct LiveState {
    /// Local packages; segment indices address this array.
    pub locals: Vec<Arc<LocalPackage>>,
    /// Locale segments.
    pub locales: Vec<Segment<FinalLocaleCultureSet>>,
    /// Asset segments.
    pub assets: Vec<Segment<FinalResourceAssetSet>>,
}

impl LiveState {
    /// Captures the segment lists of a build.
    #[must_use]
    pub fn from_resources(
        locals: Vec<Arc<LocalPackage>>,
        locales: &LiveResources<FinalLocaleCultureSet>,
        assets: &LiveResources<FinalResourceAssetSet>,
    ) -> Self {
        Self {
            locals,
            locales: locales.segments().to_vec(),
            assets: assets.segments().to_vec(),
        }
    }

    /// Writes the state to a stream.
    ///
    /// # Errors
    ///
    /// I/O errors and unbound local segments.
    pub fn to_writer<W: Write>(&self, inner: W) -> Result<W, StateError> {
        let mut writer = StateWriter::new(inner);
        writer.write_bytes(MAGIC)?;
        writer.write_u8(FORMAT_VERSION)?;

        writer.write_count(self.locals.len())?;
        for (position, package) in self.locals.iter().enumerate() {
            if package.idx() != position {
                return Err(StateError::InvalidSegmentIndex {
                    index: i64::try_from(package.idx()).unwrap_or(i64::MAX),
                    locals: self.locals.len(),
                });
            }
            writer.write_str(package.name())?;
            writer.write_str(package.root().as_str())?;
        }

        write_segments(&mut writer, &self.locales, &self.locals)?;
        write_segments(&mut writer, &self.assets, &self.locals)?;
        debug!(containers = writer.pooled_containers(), "State encoded");
        writer.into_inner()
    }

    /// Reads a state from a stream. The stream must end with the state.
    ///
    /// # Errors
    ///
    /// Any malformed, truncated or trailing data.
    pub fn from_reader<R: Read>(inner: R) -> Result<Self, StateError> {
        let mut reader = StateReader::new(inner);
        let mut magic = [0u8; 4];
        reader.read_bytes(&mut magic).map_err(|e| match e {
            StateError::Truncated => StateError::BadMagic,
            other => other,
        })?;
        if &magic != MAGIC {
            return Err(StateError::BadMagic);
        }
        let version = reader.read_u8()?;
        if version != FORMAT_VERSION {
            return Err(StateError::UnsupportedVersion(version));
        }

        let count = reader.read_count()?;
        let mut locals = Vec::with_capacity(count.min(MAX_PREALLOC));
        for idx in 0..count {
            let name = reader.read_string()?;
            let root = reader.read_string()?;
            locals.push(Arc::new(LocalPackage::new(idx, name, root)));
        }

        let locales = read_segments(&mut reader, &locals)?;
        let assets = read_segments(&mut reader, &locals)?;
        if !reader.at_end()? {
            return Err(StateError::Corrupt("trailing data after asset segments".to_owned()));
        }
        Ok(Self {
            locals,
            locales,
            assets,
        })
    }

    /// Writes the state file through a temporary sibling and a rename.
    ///
    /// # Errors
    ///
    /// [`StateError::Write`] for file system failures.
    pub fn write(&self, path: &Utf8Path) -> Result<(), StateError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StateError::write(parent, e))?;
        }
        let temp_path = path.with_extension("tmp");
        let file = File::create(&temp_path).map_err(|e| StateError::write(&temp_path, e))?;
        let written = self
            .to_writer(BufWriter::new(file))
            .map_err(|e| match e {
                StateError::Io(source) => StateError::write(&temp_path, source),
                other => other,
            })
            .and_then(|mut writer| writer.flush().map_err(|e| StateError::write(&temp_path, e)))
            .and_then(|()| fs::rename(&temp_path, path).map_err(|e| StateError::write(path, e)));
        if let Err(error) = written {
            if let Err(e) = fs::remove_file(&temp_path) {
                debug!(path = %temp_path, error = %e, "Failed to remove temporary state file");
            }
            return Err(error);
        }

        info!(
            path = %path,
            locals = self.locals.len(),
            locale_segments = self.locales.len(),
            asset_segments = self.assets.len(),
            "State file written"
        );
        Ok(())
    }

    /// Reads a state file.
    ///
    /// # Errors
    ///
    /// [`StateError::Read`] when the file cannot be opened, and the decoding
    /// errors of [`from_reader`](Self::from_reader).
    pub fn read(path: &Utf8Path) -> Result<Self, StateError> {
        let file = File::open(path).map_err(|e| StateError::read(path, e))?;
        let state = Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            StateError::Io(source) => StateError::read(path, source),
            other => other,
        })?;
        debug!(path = %path, locals = state.locals.len(), "State file read");
        Ok(state)
    }

    /// Returns the total number of segments across kinds.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.locales.len() + self.assets.len()
    }

    /// Returns the number of resources held by regular segments.
    #[must_use]
    pub fn regular_resources(&self) -> usize {
        fn count<F: FinalSet>(segments: &[Segment<F>]) -> usize {
            segments
                .iter()
                .filter_map(Segment::as_regular)
                .map(|set| set.len())
                .sum()
        }
        count(&self.locales) + count(&self.assets)
    }
}
