use crate::foundation::core::FourCC;

/// Convenience result type used across frameseq.
pub type FrameSeqResult<T> = Result<T, FrameSeqError>;

/// Top-level error taxonomy for parsing, compositing and playback.
#[derive(thiserror::Error, Debug)]
pub enum FrameSeqError {
    /// Magic bytes do not belong to any supported container.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// A read demanded more bytes than the stream has left.
    #[error("truncated stream: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        /// Logical stream position of the failed read.
        offset: u64,
        /// Bytes the read required.
        needed: u64,
        /// Bytes actually remaining.
        available: u64,
    },

    /// A chunk body parser consumed more than the chunk's declared length.
    #[error("chunk '{tag}' at offset {offset} read {consumed} bytes past declared length {length}")]
    OutOfChunkBounds {
        /// Tag of the offending chunk.
        tag: FourCC,
        /// Offset of the chunk header.
        offset: u64,
        /// Declared payload length.
        length: u32,
        /// Bytes actually consumed by the body parser.
        consumed: u64,
    },

    /// Checksum mismatch or an illegal field value.
    #[error("malformed chunk: {0}")]
    MalformedChunk(String),

    /// A pixel buffer was requested with a zero dimension.
    #[error("invalid buffer size {width}x{height}")]
    BufferSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// The raster decoder could not turn a frame blob into pixels.
    #[error("raster decode error: {0}")]
    Decode(String),

    /// Underlying byte source failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FrameSeqError {
    /// Build a [`FrameSeqError::InvalidSignature`] value.
    pub fn invalid_signature(msg: impl Into<String>) -> Self {
        Self::InvalidSignature(msg.into())
    }

    /// Build a [`FrameSeqError::MalformedChunk`] value.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedChunk(msg.into())
    }

    /// Build a [`FrameSeqError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// `true` when the session should degrade to a still image instead of failing.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedChunk(_) | Self::OutOfChunkBounds { .. })
    }

    /// `true` when the current session cannot continue with this byte source.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Truncated { .. } | Self::Io(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
