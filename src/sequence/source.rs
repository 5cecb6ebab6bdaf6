use std::{collections::BTreeSet, path::Path};

use anyhow::Context;

use crate::{
    cache::descriptor::FrameKey,
    foundation::core::{FrameIndex, FrameRange},
    foundation::error::{SeqError, SeqResult},
    sequence::pattern::FramePattern,
};

/// Read-only view of the current sequence configuration.
///
/// Implementations must be deterministic: the same frame always yields the same key until the
/// configuration itself is replaced.
pub trait SequenceSource: Send + Sync {
    /// First available frame, `None` for an empty sequence.
    fn first_frame(&self) -> Option<FrameIndex>;

    /// Last available frame, `None` for an empty sequence.
    fn last_frame(&self) -> Option<FrameIndex>;

    /// Closest available frame to `f`, `None` for an empty sequence.
    fn nearest_frame(&self, f: FrameIndex) -> Option<FrameIndex>;

    /// Canonical file identifier for frame `f`.
    fn frame_key_for(&self, f: FrameIndex) -> FrameKey;

    /// Number of available frames.
    fn frame_count(&self) -> u64;

    /// Inclusive range spanned by the available frames.
    fn frame_range(&self) -> Option<FrameRange> {
        let first = self.first_frame()?;
        let last = self.last_frame()?;
        FrameRange::new(first, last).ok()
    }
}

/// Image sequence on disk described by a [`FramePattern`] and the frames present.
#[derive(Clone, Debug)]
pub struct FileSequence {
    pattern: FramePattern,
    frames: Frames,
}

/// Available frames: a contiguous range is kept as its bounds, never expanded.
#[derive(Clone, Debug)]
enum Frames {
    Range(FrameRange),
    Listed(BTreeSet<u64>),
}

impl Frames {
    fn first(&self) -> Option<u64> {
        match self {
            Self::Range(r) => Some(r.first.0),
            Self::Listed(set) => set.first().copied(),
        }
    }

    fn last(&self) -> Option<u64> {
        match self {
            Self::Range(r) => Some(r.last.0),
            Self::Listed(set) => set.last().copied(),
        }
    }

    fn nearest(&self, f: u64) -> Option<u64> {
        let (below, above) = match self {
            Self::Range(r) => return Some(r.clamp(FrameIndex(f)).0),
            Self::Listed(set) => (
                set.range(..=f).next_back().copied(),
                set.range(f..).next().copied(),
            ),
        };
        match (below, above) {
            // Ties go to the lower frame.
            (Some(b), Some(a)) => Some(if f - b <= a - f { b } else { a }),
            (Some(b), None) => Some(b),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }

    fn count(&self) -> u64 {
        match self {
            Self::Range(r) => r.len_frames(),
            Self::Listed(set) => set.len() as u64,
        }
    }
}

impl FileSequence {
    /// Sequence where every frame of `range` is assumed to exist.
    pub fn from_range(pattern: &str, range: FrameRange) -> SeqResult<Self> {
        Ok(Self {
            pattern: FramePattern::parse(pattern)?,
            frames: Frames::Range(range),
        })
    }

    /// Sequence built from an explicit list of frames (duplicates are ignored).
    pub fn from_frames(
        pattern: &str,
        frames: impl IntoIterator<Item = FrameIndex>,
    ) -> SeqResult<Self> {
        Ok(Self {
            pattern: FramePattern::parse(pattern)?,
            frames: Frames::Listed(frames.into_iter().map(|f| f.0).collect()),
        })
    }

    /// Discover frames by listing the pattern's directory.
    ///
    /// A still-image pattern yields frame 0 when the file exists, and an empty sequence
    /// otherwise.
    pub fn scan(pattern: &str) -> SeqResult<Self> {
        let pattern = FramePattern::parse(pattern)?;
        let dir = listing_dir(&pattern);

        let mut frames = BTreeSet::new();
        if pattern.is_still() {
            if Path::new(&pattern.format(0)).is_file() {
                frames.insert(0);
            }
        } else {
            let file_pattern = pattern.file_pattern();
            let entries = std::fs::read_dir(dir)
                .with_context(|| format!("list sequence directory '{dir}'"))
                .map_err(|e| SeqError::sequence(format!("{e:#}")))?;
            for entry in entries {
                let entry = entry
                    .with_context(|| format!("read entry in '{dir}'"))
                    .map_err(|e| SeqError::sequence(format!("{e:#}")))?;
                let name = entry.file_name();
                let Some(name) = name.to_str() else {
                    continue;
                };
                if let Some(f) = file_pattern.parse_frame(name) {
                    frames.insert(f);
                }
            }
        }

        tracing::debug!(%pattern, frames = frames.len(), "scanned image sequence");
        Ok(Self {
            pattern,
            frames: Frames::Listed(frames),
        })
    }

    /// Pattern this sequence expands.
    pub fn pattern(&self) -> &FramePattern {
        &self.pattern
    }
}

impl SequenceSource for FileSequence {
    fn first_frame(&self) -> Option<FrameIndex> {
        self.frames.first().map(FrameIndex)
    }

    fn last_frame(&self) -> Option<FrameIndex> {
        self.frames.last().map(FrameIndex)
    }

    fn nearest_frame(&self, f: FrameIndex) -> Option<FrameIndex> {
        self.frames.nearest(f.0).map(FrameIndex)
    }

    fn frame_key_for(&self, f: FrameIndex) -> FrameKey {
        FrameKey::new(self.pattern.format(f.0))
    }

    fn frame_count(&self) -> u64 {
        self.frames.count()
    }
}

/// Directory to list for `pattern`. A pattern directly under the root lists `/`.
fn listing_dir(pattern: &FramePattern) -> &str {
    match pattern.dir() {
        Some("") => "/",
        Some(dir) => dir,
        None => ".",
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/source.rs"]
mod tests;
