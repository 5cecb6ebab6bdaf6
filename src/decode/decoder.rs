use crate::{
    cache::descriptor::FrameKey,
    decode::row::Row,
    foundation::core::{ChannelSet, DataWindow, FrameIndex},
    foundation::error::SeqResult,
};

/// Format-specific reader for one frame file.
///
/// The header methods take `&mut self` and run before the decoder is shared. `render` takes
/// `&self` and may be called from many threads once the descriptor is cached.
pub trait Decoder: Send + Sync {
    /// Read metadata (dimensions, channels) without decoding pixels.
    fn read_header(&mut self, key: &FrameKey) -> SeqResult<()>;

    /// Prepare the transfer from file values to linear light. Called once, after a successful
    /// header read.
    fn initialize_color_space(&mut self);

    /// Fill `row` with linear-light values of row `row.y()`.
    fn render(&self, time: FrameIndex, row: &mut Row) -> SeqResult<()>;

    /// Bounding box reported by the header.
    fn data_window(&self) -> DataWindow;

    /// Channels reported by the header.
    fn channels(&self) -> ChannelSet;
}

/// Builds fresh [`Decoder`] instances for one file type.
pub trait DecoderFactory: Send + Sync {
    /// Construct a decoder. Failures surface as
    /// [`SeqError::NoDecoderFound`](crate::SeqError::NoDecoderFound).
    fn build(&self) -> SeqResult<Box<dyn Decoder>>;
}

impl<F> DecoderFactory for F
where
    F: Fn() -> SeqResult<Box<dyn Decoder>> + Send + Sync,
{
    fn build(&self) -> SeqResult<Box<dyn Decoder>> {
        self()
    }
}
