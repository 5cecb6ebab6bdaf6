/// Convenience result type used across seqcache.
pub type SeqResult<T> = Result<T, SeqError>;

/// Top-level error taxonomy used by reader APIs.
///
/// Every variant is recoverable at the call site: none of them leave partial state in the
/// descriptor cache. The type is `Clone` so one decode outcome can be handed to every thread
/// that waited on it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SeqError {
    /// No decoder is registered for the frame's file type, or the factory failed to build one.
    #[error("no decoder found: {key}: {reason}")]
    NoDecoderFound {
        /// Frame key the decoder was requested for.
        key: String,
        /// Human-readable cause.
        reason: String,
    },

    /// A decoder was built but reported failure while reading the header.
    #[error("header read failed: {key}: {reason}")]
    HeaderReadFailed {
        /// Frame key whose header could not be read.
        key: String,
        /// Human-readable cause.
        reason: String,
    },

    /// Pixel production failed after a valid header.
    #[error("render failed: {key}: {reason}")]
    RenderFailed {
        /// Frame key being rendered.
        key: String,
        /// Human-readable cause.
        reason: String,
    },

    /// Invalid user-provided configuration or arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// The image sequence cannot answer the request (e.g. it has no frames).
    #[error("sequence error: {0}")]
    Sequence(String),
}

impl SeqError {
    /// Build a [`SeqError::NoDecoderFound`] value.
    pub fn no_decoder(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NoDecoderFound {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`SeqError::HeaderReadFailed`] value.
    pub fn header(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HeaderReadFailed {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`SeqError::RenderFailed`] value.
    pub fn render(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RenderFailed {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`SeqError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SeqError::Sequence`] value.
    pub fn sequence(msg: impl Into<String>) -> Self {
        Self::Sequence(msg.into())
    }

    /// Flatten an `anyhow` chain into a header failure for `key`.
    pub(crate) fn header_from_anyhow(key: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::header(key, format!("{err:#}"))
    }

    /// Flatten an `anyhow` chain into a render failure for `key`.
    pub(crate) fn render_from_anyhow(key: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::render(key, format!("{err:#}"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
