use std::sync::{Arc, PoisonError, RwLock};

use rayon::prelude::*;

use crate::{
    cache::coordinator::DecodeCoordinator,
    cache::descriptor::{Descriptor, FrameKey},
    cache::store::CacheStats,
    decode::registry::DecoderRegistry,
    decode::row::Row,
    foundation::color::{clamp01, linear_to_srgb, to_u8},
    foundation::core::{Channel, ChannelSet, DataWindow, FrameIndex},
    foundation::error::{SeqError, SeqResult},
    reader::opts::ReaderOpts,
    reader::preview::PreviewState,
    sequence::source::SequenceSource,
};

/// Every row of one frame's data window, bottom-up.
#[derive(Clone, Debug)]
pub struct FramePixels {
    /// Window the rows cover.
    pub data_window: DataWindow,
    /// Channels carried by each row.
    pub channels: ChannelSet,
    /// `rows[i]` holds row `data_window.bottom + i`.
    pub rows: Vec<Row>,
}

impl FramePixels {
    /// Convert to a top-down sRGB-encoded RGBA8 image. Missing alpha is opaque.
    pub fn to_display_rgba8(&self) -> image::RgbaImage {
        let w = self.data_window.width();
        let h = self.data_window.height();
        let mut img = image::RgbaImage::new(w, h);
        for (i, row) in self.rows.iter().enumerate() {
            let line = h - 1 - i as u32;
            for x in 0..w {
                img.put_pixel(x, line, display_pixel(row, x as usize));
            }
        }
        img
    }
}

/// Image-sequence reader node.
///
/// Maps frame times to files through a [`SequenceSource`], caches each file's header
/// [`Descriptor`] through a [`DecodeCoordinator`], and produces rows by delegating to the cached
/// decoder. All methods take `&self`; share the reader across render threads with an `Arc`.
pub struct Reader {
    sequence: RwLock<Arc<dyn SequenceSource>>,
    coordinator: DecodeCoordinator,
    opts: ReaderOpts,
    pool: Option<rayon::ThreadPool>,
    pub(crate) preview: PreviewState,
}

impl Reader {
    /// Create a reader over `sequence`, resolving decoders through `registry`.
    pub fn new(
        sequence: Arc<dyn SequenceSource>,
        registry: DecoderRegistry,
        opts: ReaderOpts,
    ) -> SeqResult<Self> {
        opts.validate()?;
        let pool = opts.render_threads.map(build_thread_pool).transpose()?;
        Ok(Self {
            sequence: RwLock::new(sequence),
            coordinator: DecodeCoordinator::new(registry),
            opts,
            pool,
            preview: PreviewState::default(),
        })
    }

    /// Node class name.
    pub fn class_name(&self) -> &'static str {
        "Reader"
    }

    /// Node description.
    pub fn description(&self) -> &'static str {
        "The reader node can read image file sequences."
    }

    /// Options this reader was built with.
    pub fn opts(&self) -> &ReaderOpts {
        &self.opts
    }

    /// Current sequence configuration.
    pub fn sequence(&self) -> Arc<dyn SequenceSource> {
        Arc::clone(&self.sequence.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the sequence and drop every cached descriptor.
    pub fn set_sequence(&self, sequence: Arc<dyn SequenceSource>) {
        *self.sequence.write().unwrap_or_else(PoisonError::into_inner) = sequence;
        self.coordinator.clear();
        tracing::debug!("sequence replaced, descriptor cache cleared");
    }

    /// Descriptor cache and decode coordination used by this reader.
    pub fn coordinator(&self) -> &DecodeCoordinator {
        &self.coordinator
    }

    /// Snapshot of the descriptor cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.coordinator.stats()
    }

    /// First frame of the sequence.
    pub fn first_frame(&self) -> Option<FrameIndex> {
        self.sequence().first_frame()
    }

    /// Last frame of the sequence.
    pub fn last_frame(&self) -> Option<FrameIndex> {
        self.sequence().last_frame()
    }

    /// Closest available frame to `f`.
    pub fn nearest_frame(&self, f: FrameIndex) -> Option<FrameIndex> {
        self.sequence().nearest_frame(f)
    }

    /// File identifier for frame `f` exactly, without nearest-frame resolution.
    pub fn frame_key_for(&self, f: FrameIndex) -> FrameKey {
        self.sequence().frame_key_for(f)
    }

    /// Return `true` when the sequence has at least one frame.
    pub fn has_frames(&self) -> bool {
        self.sequence().frame_count() > 0
    }

    /// Canonical file identifier serving `time`.
    ///
    /// Times outside the sequence, or falling on a missing frame, resolve to the nearest available
    /// frame.
    pub fn resolve(&self, time: FrameIndex) -> SeqResult<FrameKey> {
        let seq = self.sequence();
        let frame = seq
            .nearest_frame(time)
            .ok_or_else(|| SeqError::sequence("image sequence has no frames"))?;
        Ok(seq.frame_key_for(frame))
    }

    /// Cached header descriptor for `time`, decoding it on first use.
    pub fn descriptor(&self, time: FrameIndex) -> SeqResult<Arc<Descriptor>> {
        let key = self.resolve(time)?;
        self.coordinator.get_or_decode_header(&key)
    }

    /// Data window of the frame at `time`.
    #[tracing::instrument(skip(self))]
    pub fn region_of_definition(&self, time: FrameIndex) -> SeqResult<DataWindow> {
        Ok(self.descriptor(time)?.data_window())
    }

    /// Produce row `row.y()` of the frame at `time` into `row`.
    ///
    /// The header is resolved through the coordinator; the pixel work runs afterwards without
    /// holding any coordinator lock.
    pub fn render(&self, time: FrameIndex, row: &mut Row) -> SeqResult<()> {
        let descriptor = self.descriptor(time)?;
        render_with(&descriptor, time, row)
    }

    /// Render every row of the frame's data window, in parallel.
    #[tracing::instrument(skip(self))]
    pub fn render_frame(&self, time: FrameIndex) -> SeqResult<FramePixels> {
        let descriptor = self.descriptor(time)?;
        let window = descriptor.data_window();
        let channels = descriptor.channels();

        let render_rows = || {
            (window.bottom..window.top)
                .into_par_iter()
                .map(|y| -> SeqResult<Row> {
                    let mut row = Row::new(y, window.left, window.right, channels);
                    render_with(&descriptor, time, &mut row)?;
                    Ok(row)
                })
                .collect::<SeqResult<Vec<Row>>>()
        };
        let rows = match &self.pool {
            Some(pool) => pool.install(render_rows),
            None => render_rows(),
        }?;

        Ok(FramePixels {
            data_window: window,
            channels,
            rows,
        })
    }
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("coordinator", &self.coordinator)
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

fn render_with(descriptor: &Descriptor, time: FrameIndex, row: &mut Row) -> SeqResult<()> {
    descriptor.render(time, row).map_err(|e| match e {
        SeqError::RenderFailed { .. } => e,
        other => SeqError::render(descriptor.key().as_str(), other.to_string()),
    })
}

/// Display-encode column `x` of `row`: sRGB for color, clamped linear alpha.
pub(crate) fn display_pixel(row: &Row, x: usize) -> image::Rgba<u8> {
    let color = |c: Channel| {
        row.channel(c)
            .and_then(|p| p.get(x))
            .map_or(0.0, |&v| clamp01(linear_to_srgb(v)))
    };
    let alpha = row
        .channel(Channel::Alpha)
        .and_then(|p| p.get(x))
        .map_or(1.0, |&v| clamp01(v));
    image::Rgba([
        to_u8(color(Channel::Red)),
        to_u8(color(Channel::Green)),
        to_u8(color(Channel::Blue)),
        to_u8(alpha),
    ])
}

fn build_thread_pool(threads: usize) -> SeqResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("seqcache-render-{i}"))
        .build()
        .map_err(|e| SeqError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/reader/node.rs"]
mod tests;
