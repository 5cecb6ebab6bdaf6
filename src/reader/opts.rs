use std::path::Path;

use anyhow::Context;

use crate::{
    decode::pixel_cache::DEFAULT_PIXEL_CACHE_BYTES,
    foundation::error::{SeqError, SeqResult},
};

/// Tunables of a [`Reader`](crate::Reader).
///
/// Deserializes from JSON; missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderOpts {
    /// Upper bound on preview width in pixels.
    pub preview_max_width: u32,
    /// Upper bound on preview height in pixels.
    pub preview_max_height: u32,
    /// Worker threads for full-frame renders. `None` uses the global rayon pool.
    pub render_threads: Option<usize>,
    /// Budget in MiB for decoded pixels held by the built-in decoders.
    pub pixel_cache_mb: usize,
}

impl Default for ReaderOpts {
    fn default() -> Self {
        Self {
            preview_max_width: 64,
            preview_max_height: 64,
            render_threads: None,
            pixel_cache_mb: DEFAULT_PIXEL_CACHE_BYTES / (1024 * 1024),
        }
    }
}

impl ReaderOpts {
    /// Parse and validate options from a JSON document.
    pub fn from_json_str(json: &str) -> SeqResult<Self> {
        let opts: Self = serde_json::from_str(json)
            .map_err(|e| SeqError::validation(format!("invalid reader options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Read, parse and validate options from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> SeqResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read reader options '{}'", path.display()))
            .map_err(|e| SeqError::validation(format!("{e:#}")))?;
        Self::from_json_str(&json)
    }

    /// Pixel budget in bytes.
    pub fn pixel_cache_bytes(&self) -> usize {
        self.pixel_cache_mb.saturating_mul(1024 * 1024)
    }

    /// Reject values the reader cannot work with.
    pub fn validate(&self) -> SeqResult<()> {
        if self.preview_max_width == 0 || self.preview_max_height == 0 {
            return Err(SeqError::validation("preview bounds must be >= 1"));
        }
        if self.render_threads == Some(0) {
            return Err(SeqError::validation(
                "render_threads must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/reader/opts.rs"]
mod tests;
