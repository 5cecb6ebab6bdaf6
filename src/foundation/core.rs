use crate::foundation::error::{SeqError, SeqResult};

/// Logical frame number inside an image sequence.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl std::fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive frame range `[first, last]` of a sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// First valid frame.
    pub first: FrameIndex,
    /// Last valid frame (inclusive).
    pub last: FrameIndex,
}

impl FrameRange {
    /// Create a validated range with `first <= last`.
    pub fn new(first: FrameIndex, last: FrameIndex) -> SeqResult<Self> {
        if first.0 > last.0 {
            return Err(SeqError::validation("FrameRange first must be <= last"));
        }
        Ok(Self { first, last })
    }

    /// Number of frames contained in the range, saturating at `u64::MAX`.
    pub fn len_frames(self) -> u64 {
        (self.last.0 - self.first.0).saturating_add(1)
    }

    /// Return `true` when `f` is inside `[first, last]`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.first.0 <= f.0 && f.0 <= self.last.0
    }

    /// Clamp a frame index into this range.
    pub fn clamp(self, f: FrameIndex) -> FrameIndex {
        FrameIndex(f.0.clamp(self.first.0, self.last.0))
    }

    /// Iterate every frame in the range.
    pub fn iter(self) -> impl Iterator<Item = FrameIndex> {
        (self.first.0..=self.last.0).map(FrameIndex)
    }
}

/// Bounding box of valid pixel data, in pixels.
///
/// Half-open on the right and top: columns `left..right`, rows `bottom..top`. Row `bottom` is the
/// lowest scanline of the image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DataWindow {
    /// First column.
    pub left: i32,
    /// First row.
    pub bottom: i32,
    /// One past the last column.
    pub right: i32,
    /// One past the last row.
    pub top: i32,
}

impl DataWindow {
    /// Build a window from its corner coordinates.
    pub fn new(left: i32, bottom: i32, right: i32, top: i32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Window anchored at the origin with the given size.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(
            0,
            0,
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
        )
    }

    /// Width in pixels (zero for inverted windows).
    pub fn width(self) -> u32 {
        u32::try_from(self.right.saturating_sub(self.left)).unwrap_or(0)
    }

    /// Height in pixels (zero for inverted windows).
    pub fn height(self) -> u32 {
        u32::try_from(self.top.saturating_sub(self.bottom)).unwrap_or(0)
    }

    /// Return `true` when the window holds no pixels.
    pub fn is_empty(self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// One color channel of a scanline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Red.
    Red,
    /// Green.
    Green,
    /// Blue.
    Blue,
    /// Alpha (coverage).
    Alpha,
}

impl Channel {
    /// All channels in storage order.
    pub const ALL: [Channel; 4] = [Channel::Red, Channel::Green, Channel::Blue, Channel::Alpha];

    /// Storage slot of this channel.
    pub fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
            Channel::Alpha => 3,
        }
    }

    fn bit(self) -> u8 {
        1 << self.index()
    }
}

/// Small bit set of [`Channel`]s.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChannelSet(u8);

impl ChannelSet {
    /// Empty set.
    pub fn none() -> Self {
        Self(0)
    }

    /// Red, green and blue.
    pub fn rgb() -> Self {
        Self::none()
            .with(Channel::Red)
            .with(Channel::Green)
            .with(Channel::Blue)
    }

    /// Red, green, blue and alpha.
    pub fn rgba() -> Self {
        Self::rgb().with(Channel::Alpha)
    }

    /// Return a copy with `c` added.
    pub fn with(mut self, c: Channel) -> Self {
        self.insert(c);
        self
    }

    /// Add `c` to the set.
    pub fn insert(&mut self, c: Channel) {
        self.0 |= c.bit();
    }

    /// Return `true` when `c` is in the set.
    pub fn contains(self, c: Channel) -> bool {
        self.0 & c.bit() != 0
    }

    /// Shorthand for `contains(Channel::Alpha)`.
    pub fn has_alpha(self) -> bool {
        self.contains(Channel::Alpha)
    }

    /// Number of channels in the set.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Return `true` when no channel is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate channels in storage order.
    pub fn iter(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Channel> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        let mut out = Self::none();
        for c in iter {
            out.insert(c);
        }
        out
    }
}

impl serde::Serialize for ChannelSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> serde::Deserialize<'de> for ChannelSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let channels = Vec::<Channel>::deserialize(deserializer)?;
        Ok(channels.into_iter().collect())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
