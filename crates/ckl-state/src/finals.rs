//! Serialization of the final aggregates.
//!
//! ```text
//! locale node: culture:str count:u32 { locator key:str text:str kind:u8 }*
//!              children:u32 { locale node }*
//! asset set:   count:u32 { path:str locator kind:u8 last_write_time:i64 }*
//! ```

use std::collections::BTreeMap;
use std::io::{Read, Write};

use ckl_resources::locales::parent_culture;
use ckl_resources::{
    AssetEntry, FinalLocaleCultureSet, FinalResourceAssetSet, FinalSet, LocaleCultureSet,
    Translation,
};

use crate::codec::{MAX_PREALLOC, StateReader, StateWriter};
use crate::error::StateError;

/// Deepest culture tree accepted when reading (`a-b-c-…`).
const MAX_CULTURE_DEPTH: usize = 16;

/// A final aggregate that can be written to and read from the state format.
///
/// The partial flag is not stored: it follows from the segment position.
pub trait FinalCodec: FinalSet {
    /// Writes the aggregate.
    ///
    /// # Errors
    ///
    /// I/O errors and oversized values.
    fn write_to<W: Write>(&self, writer: &mut StateWriter<W>) -> Result<(), StateError>;

    /// Reads an aggregate written by [`write_to`](Self::write_to).
    ///
    /// # Errors
    ///
    /// Any malformed or truncated input.
    fn read_from<R: Read>(reader: &mut StateReader<R>, partial: bool) -> Result<Self, StateError>;
}

fn write_node<W: Write>(node: &LocaleCultureSet, w: &mut StateWriter<W>) -> Result<(), StateError> {
    w.write_str(node.culture())?;
    w.write_count(node.translations().len())?;
    for (key, translation) in node.translations() {
        w.write_locator(&translation.origin)?;
        w.write_str(key)?;
        w.write_str(&translation.text)?;
        w.write_override_kind(translation.kind)?;
    }
    w.write_count(node.children().len())?;
    for child in node.children() {
        write_node(child, w)?;
    }
    Ok(())
}

fn read_node<R: Read>(
    r: &mut StateReader<R>,
    parent: Option<&str>,
    depth: usize,
) -> Result<LocaleCultureSet, StateError> {
    if depth > MAX_CULTURE_DEPTH {
        return Err(StateError::Corrupt("culture tree is too deep".to_owned()));
    }
    let culture = r.read_string()?;
    let expected_parent = parent_culture(&culture);
    if expected_parent != parent {
        return Err(StateError::Corrupt(format!(
            "culture '{culture}' stored under '{}'",
            parent.unwrap_or("<root>")
        )));
    }

    let count = r.read_count()?;
    let mut translations = BTreeMap::new();
    for _ in 0..count {
        let origin = r.read_locator()?;
        let key = r.read_string()?;
        let text = r.read_string()?;
        let kind = r.read_override_kind()?;
        if translations
            .insert(key.clone(), Translation::new(text, origin, kind))
            .is_some()
        {
            return Err(StateError::Corrupt(format!(
                "duplicate key '{key}' in culture '{culture}'"
            )));
        }
    }

    let child_count = r.read_count()?;
    let mut children = Vec::with_capacity(child_count.min(MAX_PREALLOC));
    for _ in 0..child_count {
        children.push(read_node(r, Some(culture.as_str()), depth + 1)?);
    }
    Ok(LocaleCultureSet::from_parts(culture, translations, children))
}

impl FinalCodec for FinalLocaleCultureSet {
    fn write_to<W: Write>(&self, writer: &mut StateWriter<W>) -> Result<(), StateError> {
        write_node(self.root(), writer)
    }

    fn read_from<R: Read>(reader: &mut StateReader<R>, partial: bool) -> Result<Self, StateError> {
        Ok(Self::from_root(read_node(reader, None, 0)?, partial))
    }
}

impl FinalCodec for FinalResourceAssetSet {
    fn write_to<W: Write>(&self, writer: &mut StateWriter<W>) -> Result<(), StateError> {
        writer.write_count(self.assets().len())?;
        for (path, entry) in self.assets() {
            writer.write_str(path)?;
            writer.write_locator(&entry.origin)?;
            writer.write_override_kind(entry.kind)?;
            writer.write_timestamp(entry.last_write_time)?;
        }
        Ok(())
    }

    fn read_from<R: Read>(reader: &mut StateReader<R>, partial: bool) -> Result<Self, StateError> {
        let count = reader.read_count()?;
        let mut assets = BTreeMap::new();
        for _ in 0..count {
            let path = reader.read_string()?;
            let origin = reader.read_locator()?;
            let kind = reader.read_override_kind()?;
            let last_write_time = reader.read_timestamp()?;
            if assets
                .insert(path.clone(), AssetEntry::new(origin, kind, last_write_time))
                .is_some()
            {
                return Err(StateError::Corrupt(format!("duplicate asset '{path}'")));
            }
        }
        Ok(Self::from_parts(assets, partial))
    }
}
