use std::sync::Arc;

use crate::{
    decode::decoder::Decoder,
    decode::row::Row,
    foundation::core::{ChannelSet, DataWindow, FrameIndex},
    foundation::error::SeqResult,
};

/// Canonical identifier of one frame's backing file.
///
/// Cheap to clone; equality is exact string match.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameKey(Arc<str>);

impl FrameKey {
    /// Wrap a file identifier.
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text after the last `.` of the file name, if any.
    pub fn extension(&self) -> Option<&str> {
        let name = self.0.rsplit(['/', '\\']).next().unwrap_or(self.as_str());
        let (_, ext) = name.rsplit_once('.')?;
        (!ext.is_empty()).then_some(ext)
    }
}

impl std::fmt::Debug for FrameKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FrameKey({:?})", &*self.0)
    }
}

impl std::fmt::Display for FrameKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrameKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FrameKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Header metadata of one frame paired with the live decoder that read it.
///
/// Only built after a successful header read and color-space initialization, so every descriptor
/// other threads can observe is complete.
pub struct Descriptor {
    key: FrameKey,
    data_window: DataWindow,
    channels: ChannelSet,
    color_space_initialized: bool,
    decoder: Box<dyn Decoder>,
}

impl Descriptor {
    pub(crate) fn new(key: FrameKey, decoder: Box<dyn Decoder>) -> Self {
        Self {
            key,
            data_window: decoder.data_window(),
            channels: decoder.channels(),
            color_space_initialized: true,
            decoder,
        }
    }

    /// Frame this descriptor was decoded for.
    pub fn key(&self) -> &FrameKey {
        &self.key
    }

    /// Bounding box of valid pixels.
    pub fn data_window(&self) -> DataWindow {
        self.data_window
    }

    /// Channels the file provides.
    pub fn channels(&self) -> ChannelSet {
        self.channels
    }

    /// Whether the decoder's color space has been set up.
    pub fn color_space_initialized(&self) -> bool {
        self.color_space_initialized
    }

    /// Produce row `row.y()` of this frame into `row`.
    ///
    /// Safe to call from several threads at once.
    pub fn render(&self, time: FrameIndex, row: &mut Row) -> SeqResult<()> {
        self.decoder.render(time, row)
    }
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("key", &self.key)
            .field("data_window", &self.data_window)
            .field("channels", &self.channels)
            .field("color_space_initialized", &self.color_space_initialized)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/descriptor.rs"]
mod tests;
