//! Boundary to pixel codecs. The core hands over self-contained byte blobs and gets back
//! premultiplied RGBA8 buffers.

use crate::foundation::core::{Format, Size};
use crate::foundation::error::FrameSeqResult;
use crate::render::buffer::PixelBuffer;

/// `image`-crate backed decoder.
pub mod decoder;
/// GIF LZW expansion via `weezl`.
pub mod lzw;

pub use decoder::ImageRasterDecoder;

/// One unit of work for a [`RasterDecoder`].
#[derive(Debug, Clone, Copy)]
pub enum RasterRequest<'a> {
    /// A standalone PNG or WebP image.
    Encoded {
        /// Container of `bytes`.
        format: Format,
        /// Complete encoded image.
        bytes: &'a [u8],
    },
    /// Concatenated GIF LZW sub-block payloads for one image.
    GifIndexed {
        /// LZW stream.
        data: &'a [u8],
        /// LZW minimum code size.
        min_code_size: u8,
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// RGB color table.
        palette: &'a [[u8; 3]],
        /// Index rendered as transparent.
        transparent: Option<u8>,
        /// Rows are in 4-pass interlaced order.
        interlaced: bool,
    },
}

/// Turns frame blobs into pixels.
///
/// Output is downscaled by `sample` (floor of each dimension). `into` is a buffer the
/// implementation may reshape and fill instead of allocating.
pub trait RasterDecoder: Send {
    /// Decode one frame.
    fn decode(
        &mut self,
        request: RasterRequest<'_>,
        sample: u32,
        into: Option<PixelBuffer>,
    ) -> FrameSeqResult<PixelBuffer>;

    /// Read only the declared dimensions of an encoded image.
    fn probe(&mut self, format: Format, bytes: &[u8]) -> FrameSeqResult<Size>;
}

impl<T: RasterDecoder + ?Sized> RasterDecoder for Box<T> {
    fn decode(
        &mut self,
        request: RasterRequest<'_>,
        sample: u32,
        into: Option<PixelBuffer>,
    ) -> FrameSeqResult<PixelBuffer> {
        (**self).decode(request, sample, into)
    }

    fn probe(&mut self, format: Format, bytes: &[u8]) -> FrameSeqResult<Size> {
        (**self).probe(format, bytes)
    }
}

/// Reuse `into` when given, else allocate.
pub(crate) fn target_buffer(into: Option<PixelBuffer>, width: u32, height: u32) -> PixelBuffer {
    match into {
        Some(mut buf) => {
            buf.reshape(width, height);
            buf
        }
        None => PixelBuffer::new(width, height),
    }
}
