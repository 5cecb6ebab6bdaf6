//! seqcache is the reading core of an image-sequence node.
//!
//! A [`Reader`] turns a frame time into pixels in three steps:
//!
//! 1. **Resolve**: `FrameIndex -> FrameKey` through a [`SequenceSource`] (file pattern + frames)
//! 2. **Describe**: `FrameKey -> Descriptor` through the [`DecodeCoordinator`], which caches one
//!    header [`Descriptor`] per file and never runs two header decodes for the same file at once
//! 3. **Render**: the descriptor's [`Decoder`] fills a [`Row`] of linear-light floats, outside
//!    any cache lock
//!
//! Previews of the first frame are built on a background thread with
//! [`Reader::show_file_preview`] and delivered to a [`PreviewSink`].
//!
//! Decoders are looked up by file extension in a [`DecoderRegistry`]; the built-in
//! [`ImageFileDecoder`] covers the formats of the `image` crate.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cache;
mod decode;
mod foundation;
mod reader;
mod sequence;

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
mod test_support;

pub use cache::coordinator::DecodeCoordinator;
pub use cache::descriptor::{Descriptor, FrameKey};
pub use cache::store::{CacheStats, DescriptorCache};
pub use decode::decoder::{Decoder, DecoderFactory};
pub use decode::image_file::{ImageFileDecoder, Transfer};
pub use decode::pixel_cache::{DEFAULT_PIXEL_CACHE_BYTES, PixelCache};
pub use decode::registry::{BUILTIN_IMAGE_EXTENSIONS, DecoderRegistry};
pub use decode::row::Row;
pub use foundation::color::{clamp01, linear_to_srgb, srgb_to_linear};
pub use foundation::core::{Channel, ChannelSet, DataWindow, FrameIndex, FrameRange};
pub use foundation::error::{SeqError, SeqResult};
pub use reader::node::{FramePixels, Reader};
pub use reader::opts::ReaderOpts;
pub use reader::preview::{
    PreviewHandle, PreviewImage, PreviewOutcome, PreviewSink, compute_preview, nearest_index,
    preview_size,
};
pub use sequence::pattern::FramePattern;
pub use sequence::source::{FileSequence, SequenceSource};
