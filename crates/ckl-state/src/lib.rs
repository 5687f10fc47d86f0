//! Binary persistence of merge segment lists.
//!
//! A build writes the segment lists of every resource kind to one state file;
//! a live session reads them back and reloads only the local segments.
//!
//! # File Layout
//!
//! ```text
//! "CKLS" version:u8
//! locals:   count:u32 { name:str root:str }*
//! locales:  count:u32 { index:i32 [aggregate if index == -1] }*
//! assets:   count:u32 { index:i32 [aggregate if index == -1] }*
//! ```
//!
//! Integers are little-endian and strings are a `u32` byte length followed by
//! UTF-8. A segment index `>= 0` addresses the local package array written at
//! the start of the file.
//!
//! # Modules
//!
//! - [`codec`] - [`StateWriter`]/[`StateReader`] primitives and the container pool
//! - [`finals`] - [`FinalCodec`] for both final aggregates
//! - [`segments`] - Segment list serialization
//! - [`live_state`] - The whole state file
//! - [`summary`] - Printable description of a state file

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod finals;
pub mod live_state;
pub mod segments;
pub mod summary;

pub use codec::{StateReader, StateWriter};
pub use error::StateError;
pub use finals::FinalCodec;
pub use live_state::LiveState;
pub use segments::{read_segments, write_segments};
pub use summary::{SegmentSummary, StateSummary};
