use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    thread::JoinHandle,
};

use crate::{
    decode::row::Row,
    foundation::core::DataWindow,
    foundation::error::{SeqError, SeqResult},
    reader::node::{Reader, display_pixel},
};

/// Display-ready preview: straight-alpha sRGB RGBA8, top-down.
pub type PreviewImage = image::RgbaImage;

/// Receives finished previews (typically the GUI thread's mailbox).
pub trait PreviewSink: Send + Sync {
    /// Called once per published preview, from the preview task's thread.
    ///
    /// Must not call back into [`Reader::preview`]; hand the image off instead.
    fn on_preview_ready(&self, image: &PreviewImage);
}

impl<F> PreviewSink for F
where
    F: Fn(&PreviewImage) + Send + Sync,
{
    fn on_preview_ready(&self, image: &PreviewImage) {
        self(image)
    }
}

/// How a preview task ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// The preview was stored on the reader and handed to the sink.
    Published,
    /// A newer request arrived first; nothing was published.
    Superseded,
    /// The preview could not be produced; the reader's preview was cleared.
    Failed(SeqError),
}

/// Handle on a running preview task.
pub struct PreviewHandle {
    generation: u64,
    join: JoinHandle<PreviewOutcome>,
}

impl PreviewHandle {
    /// Request number of this task; later requests have larger numbers.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Return `true` once the task has stopped.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Block until the task stops.
    pub fn join(self) -> PreviewOutcome {
        self.join.join().unwrap_or_else(|_| {
            PreviewOutcome::Failed(SeqError::render("<preview>", "preview task panicked"))
        })
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("generation", &self.generation)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Latest published preview plus the request counter used for cancel-and-restart.
#[derive(Default)]
pub(crate) struct PreviewState {
    generation: AtomicU64,
    latest: Mutex<Option<Arc<PreviewImage>>>,
}

impl PreviewState {
    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Store `image` and notify `sink` if `generation` is still the newest request.
    ///
    /// The sink runs under the `latest` lock, so notifications arrive in publish order and the
    /// last one always carries the stored image.
    fn publish(&self, generation: u64, image: PreviewImage, sink: &dyn PreviewSink) -> bool {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_current(generation) {
            return false;
        }
        let image = Arc::new(image);
        sink.on_preview_ready(&image);
        *latest = Some(image);
        true
    }

    fn clear(&self, generation: u64) {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_current(generation) {
            *latest = None;
        }
    }

    fn latest(&self) -> Option<Arc<PreviewImage>> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Preview dimensions for `window` under the `(max_w, max_h)` bounds.
///
/// Each axis is bounded on its own: `(min(W, max_w), min(H, max_h))`.
pub fn preview_size(window: DataWindow, max_w: u32, max_h: u32) -> (u32, u32) {
    (window.width().min(max_w), window.height().min(max_h))
}

/// Nearest source index for output index `i` when `out_len` samples cover `src_len`.
pub fn nearest_index(i: u32, out_len: u32, src_len: u32) -> u32 {
    if out_len == 0 || src_len == 0 {
        return 0;
    }
    let zoom = f64::from(out_len) / f64::from(src_len);
    let nearest = (f64::from(i) / zoom + 0.5) as u32;
    nearest.min(src_len - 1)
}

/// Build the preview of the sequence's first frame synchronously.
///
/// `cancelled` is polled between rows; when it returns `true` the work stops and `Ok(None)` is
/// returned.
pub fn compute_preview(
    reader: &Reader,
    cancelled: &dyn Fn() -> bool,
) -> SeqResult<Option<PreviewImage>> {
    let time = reader
        .first_frame()
        .ok_or_else(|| SeqError::sequence("image sequence has no frames"))?;
    let descriptor = reader.descriptor(time)?;
    let window = descriptor.data_window();
    if window.is_empty() {
        return Err(SeqError::render(
            descriptor.key().as_str(),
            "data window is empty",
        ));
    }

    let opts = reader.opts();
    let (w, h) = preview_size(window, opts.preview_max_width, opts.preview_max_height);
    let src_cols: Vec<usize> = (0..w)
        .map(|j| nearest_index(j, w, window.width()) as usize)
        .collect();

    let mut img = PreviewImage::new(w, h);
    let mut row = Row::new(
        window.bottom,
        window.left,
        window.right,
        descriptor.channels(),
    );
    for i in 0..h {
        if cancelled() {
            return Ok(None);
        }
        let y = window.bottom + nearest_index(i, h, window.height()) as i32;
        row.set_y(y);
        reader.render(time, &mut row)?;

        // Source rows run bottom-up, image lines top-down.
        let line = h - 1 - i;
        for (j, &x) in src_cols.iter().enumerate() {
            img.put_pixel(j as u32, line, display_pixel(&row, x));
        }
    }
    Ok(Some(img))
}

impl Reader {
    /// Start building a preview on a background thread.
    ///
    /// Policy is cancel-and-restart: starting a new preview makes every older task stop at its
    /// next row without publishing. Only the newest task stores its image (see
    /// [`Reader::preview`]) and notifies `sink`.
    pub fn show_file_preview(
        self: &Arc<Self>,
        sink: Arc<dyn PreviewSink>,
    ) -> SeqResult<PreviewHandle> {
        let generation = self.preview.begin();
        let reader = Arc::clone(self);
        let join = std::thread::Builder::new()
            .name(format!("seqcache-preview-{generation}"))
            .spawn(move || reader.run_preview(generation, sink.as_ref()))
            .map_err(|e| SeqError::validation(format!("failed to spawn preview task: {e}")))?;
        Ok(PreviewHandle { generation, join })
    }

    /// Most recently published preview.
    pub fn preview(&self) -> Option<Arc<PreviewImage>> {
        self.preview.latest()
    }

    #[tracing::instrument(skip(self, sink))]
    fn run_preview(&self, generation: u64, sink: &dyn PreviewSink) -> PreviewOutcome {
        let cancelled = || !self.preview.is_current(generation);
        match compute_preview(self, &cancelled) {
            Ok(Some(image)) => {
                if self.preview.publish(generation, image, sink) {
                    PreviewOutcome::Published
                } else {
                    tracing::debug!("preview superseded before publishing");
                    PreviewOutcome::Superseded
                }
            }
            Ok(None) => {
                tracing::debug!("preview superseded");
                PreviewOutcome::Superseded
            }
            Err(e) => {
                tracing::warn!(error = %e, "preview failed");
                self.preview.clear(generation);
                PreviewOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/reader/preview.rs"]
mod tests;
