//! A printable description of a state file, for `ck-live inspect`.

use std::fmt;

use ckl_resources::{FinalSet, Segment};
use serde::Serialize;

use crate::live_state::LiveState;

/// One segment, described.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentSummary {
    /// Merged regular packages.
    Regular {
        /// Whether the aggregate is partial.
        partial: bool,
        /// Number of resolved resources.
        resources: usize,
    },
    /// A local package.
    Local {
        /// Index in the local package array.
        index: usize,
        /// Package name.
        package: String,
    },
}

impl SegmentSummary {
    fn list<F: FinalSet>(segments: &[Segment<F>]) -> Vec<Self> {
        segments
            .iter()
            .map(|segment| match segment {
                Segment::Regular(set) => Self::Regular {
                    partial: set.is_partial(),
                    resources: set.len(),
                },
                Segment::Local(package) => Self::Local {
                    index: package.idx(),
                    package: package.name().to_owned(),
                },
            })
            .collect()
    }
}

/// A local package entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalSummary {
    /// Package name.
    pub name: String,
    /// Package root.
    pub root: String,
}

/// Description of a whole state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSummary {
    /// Local package array.
    pub locals: Vec<LocalSummary>,
    /// Locale segments.
    pub locales: Vec<SegmentSummary>,
    /// Asset segments.
    pub assets: Vec<SegmentSummary>,
}

impl From<&LiveState> for StateSummary {
    fn from(state: &LiveState) -> Self {
        Self {
            locals: state
                .locals
                .iter()
                .map(|p| LocalSummary {
                    name: p.name().to_owned(),
                    root: p.root().to_string(),
                })
                .collect(),
            locales: SegmentSummary::list(&state.locales),
            assets: SegmentSummary::list(&state.assets),
        }
    }
}

impl fmt::Display for SegmentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regular { partial, resources } => {
                write!(f, "regular  {resources} resources")?;
                if *partial {
                    f.write_str(" (partial)")?;
                }
                Ok(())
            }
            Self::Local { index, package } => write!(f, "local    #{index} {package}"),
        }
    }
}

impl fmt::Display for StateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Local packages: {}", self.locals.len())?;
        for (idx, local) in self.locals.iter().enumerate() {
            writeln!(f, "  #{idx} {} {}", local.name, local.root)?;
        }
        for (title, segments) in [("Locales", &self.locales), ("Assets", &self.assets)] {
            writeln!(f, "{title} segments: {}", segments.len())?;
            for segment in segments {
                writeln!(f, "  {segment}")?;
            }
        }
        Ok(())
    }
}
