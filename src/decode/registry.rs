use std::{collections::HashMap, sync::Arc};

use crate::{
    cache::descriptor::FrameKey,
    decode::decoder::{Decoder, DecoderFactory},
    decode::image_file::ImageFileDecoder,
    decode::pixel_cache::PixelCache,
    foundation::error::{SeqError, SeqResult},
};

/// Extensions served by [`ImageFileDecoder`].
pub const BUILTIN_IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "tga", "tif", "tiff", "exr", "hdr", "webp", "gif", "pnm", "ppm",
];

/// Maps file extensions to decoder factories.
///
/// Populated once at startup and then shared read-only. Extensions are matched
/// case-insensitively.
#[derive(Clone, Default)]
pub struct DecoderRegistry {
    factories: HashMap<String, Arc<dyn DecoderFactory>>,
}

impl DecoderRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with [`ImageFileDecoder`] bound to [`BUILTIN_IMAGE_EXTENSIONS`], sharing a
    /// [`PixelCache`] with the default budget.
    pub fn with_builtin_decoders() -> Self {
        Self::with_builtin_decoders_in(Arc::new(PixelCache::default()))
    }

    /// Like [`with_builtin_decoders`](Self::with_builtin_decoders), with every decoder keeping
    /// its pixels in `pixels`.
    pub fn with_builtin_decoders_in(pixels: Arc<PixelCache>) -> Self {
        let mut out = Self::new();
        let factory: Arc<dyn DecoderFactory> =
            Arc::new(move || -> SeqResult<Box<dyn Decoder>> {
                Ok(Box::new(ImageFileDecoder::new(Arc::clone(&pixels))))
            });
        for ext in BUILTIN_IMAGE_EXTENSIONS {
            out.factories.insert((*ext).to_owned(), Arc::clone(&factory));
        }
        out
    }

    /// Bind `extension` (without the dot) to `factory`, replacing any previous binding.
    pub fn register(&mut self, extension: &str, factory: impl DecoderFactory + 'static) {
        self.factories.insert(
            normalize_extension(extension),
            Arc::new(factory) as Arc<dyn DecoderFactory>,
        );
    }

    /// Return `true` when a factory is bound to `extension`.
    pub fn supports(&self, extension: &str) -> bool {
        self.factories.contains_key(&normalize_extension(extension))
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        let mut out: Vec<String> = self.factories.keys().cloned().collect();
        out.sort();
        out
    }

    /// Build a decoder able to read `key`.
    pub fn find_decoder(&self, key: &FrameKey) -> SeqResult<Box<dyn Decoder>> {
        let Some(ext) = key.extension() else {
            return Err(SeqError::no_decoder(key.as_str(), "file name has no extension"));
        };
        let factory = self.factories.get(&normalize_extension(ext)).ok_or_else(|| {
            SeqError::no_decoder(
                key.as_str(),
                format!("no decoder registered for file type '{ext}'"),
            )
        })?;
        factory.build().map_err(|e| match e {
            SeqError::NoDecoderFound { .. } => e,
            other => SeqError::no_decoder(
                key.as_str(),
                format!("failed to create the decoder: {other}"),
            ),
        })
    }
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
#[path = "../../tests/unit/decode/registry.rs"]
mod tests;
