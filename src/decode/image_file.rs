use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use image::ImageDecoder as _;

use crate::{
    cache::descriptor::FrameKey,
    decode::decoder::Decoder,
    decode::pixel_cache::{PixelCache, Pixels},
    decode::row::Row,
    foundation::color::srgb_to_linear,
    foundation::core::{Channel, ChannelSet, DataWindow, FrameIndex},
    foundation::error::{SeqError, SeqResult},
};

/// How stored values map to linear light.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transfer {
    /// Integer formats: values are sRGB encoded.
    Srgb,
    /// Float formats (EXR, HDR): values are already linear.
    Linear,
}

#[derive(Clone, Debug)]
struct Header {
    width: u32,
    height: u32,
    has_alpha: bool,
    is_float: bool,
}

/// [`Decoder`] for the raster formats the `image` crate understands.
///
/// The header read only probes dimensions and color type. Pixels are decoded on demand,
/// converted to linear RGBA `f32`, and held in the shared [`PixelCache`] rather than in the
/// decoder, so a cached descriptor never pins a full frame.
pub struct ImageFileDecoder {
    key: Option<FrameKey>,
    header: Option<Header>,
    transfer: Option<Transfer>,
    cache: Arc<PixelCache>,
    slot: u64,
    // Serializes decodes of this file so parallel rows decode it once.
    decoding: Mutex<()>,
}

impl ImageFileDecoder {
    /// Decoder with no header read yet, keeping its pixels in `cache`.
    pub fn new(cache: Arc<PixelCache>) -> Self {
        let slot = cache.allocate_slot();
        Self {
            key: None,
            header: None,
            transfer: None,
            cache,
            slot,
            decoding: Mutex::new(()),
        }
    }

    /// Transfer chosen by `initialize_color_space`.
    pub fn transfer(&self) -> Option<Transfer> {
        self.transfer
    }

    // Row-major top-down RGBA f32, linear light.
    fn pixels(&self, key: &FrameKey, header: &Header) -> SeqResult<Pixels> {
        if let Some(p) = self.cache.get(self.slot) {
            return Ok(p);
        }
        let _decoding = self.decoding.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(p) = self.cache.get(self.slot) {
            return Ok(p);
        }

        let transfer = self.transfer.unwrap_or(if header.is_float {
            Transfer::Linear
        } else {
            Transfer::Srgb
        });
        let decoded = decode_linear_rgba(key, transfer)
            .map_err(|e| SeqError::render_from_anyhow(key.as_str(), &e))?;
        let expected = (header.width as usize) * (header.height as usize) * 4;
        if decoded.len() != expected {
            return Err(SeqError::render(
                key.as_str(),
                "decoded pixel size does not match the header",
            ));
        }

        let decoded = Arc::new(decoded);
        self.cache.insert(self.slot, Arc::clone(&decoded));
        tracing::debug!(%key, "decoded frame pixels");
        Ok(decoded)
    }
}

impl Drop for ImageFileDecoder {
    fn drop(&mut self) {
        self.cache.remove(self.slot);
    }
}

impl Decoder for ImageFileDecoder {
    fn read_header(&mut self, key: &FrameKey) -> SeqResult<()> {
        let header =
            probe_header(key).map_err(|e| SeqError::header_from_anyhow(key.as_str(), &e))?;
        if header.width == 0 || header.height == 0 {
            return Err(SeqError::header(key.as_str(), "image has zero size"));
        }
        self.key = Some(key.clone());
        self.header = Some(header);
        Ok(())
    }

    fn initialize_color_space(&mut self) {
        self.transfer = self.header.as_ref().map(|h| {
            if h.is_float {
                Transfer::Linear
            } else {
                Transfer::Srgb
            }
        });
    }

    fn render(&self, _time: FrameIndex, row: &mut Row) -> SeqResult<()> {
        let (Some(key), Some(header)) = (self.key.as_ref(), self.header.as_ref()) else {
            return Err(SeqError::render("<unread>", "render called before read_header"));
        };
        let pixels = self.pixels(key, header)?;

        let width = header.width as i64;
        let height = header.height as i64;
        let y = i64::from(row.y());
        let left = i64::from(row.left());
        let src_line = (0..height).contains(&y).then(|| (height - 1 - y) as usize);

        for c in Channel::ALL {
            let Some(plane) = row.channel_mut(c) else {
                continue;
            };
            let Some(line) = src_line else {
                plane.fill(0.0);
                continue;
            };
            let base = line * header.width as usize * 4;
            for (i, out) in plane.iter_mut().enumerate() {
                let x = left + i as i64;
                *out = if (0..width).contains(&x) {
                    pixels[base + x as usize * 4 + c.index()]
                } else {
                    0.0
                };
            }
        }
        Ok(())
    }

    fn data_window(&self) -> DataWindow {
        self.header
            .as_ref()
            .map(|h| DataWindow::from_size(h.width, h.height))
            .unwrap_or_default()
    }

    fn channels(&self) -> ChannelSet {
        match &self.header {
            Some(h) if h.has_alpha => ChannelSet::rgba(),
            Some(_) => ChannelSet::rgb(),
            None => ChannelSet::none(),
        }
    }
}

fn probe_header(key: &FrameKey) -> anyhow::Result<Header> {
    let decoder = image::ImageReader::open(key.as_str())
        .with_context(|| format!("open '{key}'"))?
        .with_guessed_format()
        .with_context(|| format!("guess format of '{key}'"))?
        .into_decoder()
        .with_context(|| format!("read header of '{key}'"))?;
    let (width, height) = decoder.dimensions();
    let color = decoder.color_type();
    Ok(Header {
        width,
        height,
        has_alpha: color.has_alpha(),
        is_float: matches!(
            color,
            image::ColorType::Rgb32F | image::ColorType::Rgba32F
        ),
    })
}

fn decode_linear_rgba(key: &FrameKey, transfer: Transfer) -> anyhow::Result<Vec<f32>> {
    let img = image::ImageReader::open(key.as_str())
        .with_context(|| format!("open '{key}'"))?
        .with_guessed_format()
        .with_context(|| format!("guess format of '{key}'"))?
        .decode()
        .with_context(|| format!("decode pixels of '{key}'"))?;

    let mut data = img.to_rgba32f().into_raw();
    if transfer == Transfer::Srgb {
        for px in data.chunks_exact_mut(4) {
            px[0] = srgb_to_linear(px[0]);
            px[1] = srgb_to_linear(px[1]);
            px[2] = srgb_to_linear(px[2]);
        }
    }
    Ok(data)
}

#[cfg(test)]
#[path = "../../tests/unit/decode/image_file.rs"]
mod tests;
