use std::io::Cursor;

use crate::foundation::core::{Format, Rgba8, Size};
use crate::foundation::error::{FrameSeqError, FrameSeqResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::raster::lzw::{decode_indices, interlaced_rows};
use crate::raster::{RasterDecoder, RasterRequest, target_buffer};
use crate::render::buffer::PixelBuffer;

/// Default [`RasterDecoder`]: PNG and WebP through the `image` crate, GIF through `weezl`.
///
/// Downscaling picks every `sample`-th pixel.
#[derive(Debug, Default)]
pub struct ImageRasterDecoder {
    indices: Vec<u8>,
}

impl ImageRasterDecoder {
    /// New decoder with empty scratch space.
    pub fn new() -> Self {
        Self::default()
    }
}

fn image_format(format: Format) -> image::ImageFormat {
    match format {
        Format::Png => image::ImageFormat::Png,
        Format::WebP => image::ImageFormat::WebP,
        Format::Gif => image::ImageFormat::Gif,
    }
}

fn sampled_dims(width: u32, height: u32, sample: u32) -> FrameSeqResult<(u32, u32)> {
    let s = sample.max(1);
    let (w, h) = (width / s, height / s);
    if w == 0 || h == 0 {
        return Err(FrameSeqError::BufferSize {
            width: w,
            height: h,
        });
    }
    Ok((w, h))
}

impl RasterDecoder for ImageRasterDecoder {
    fn decode(
        &mut self,
        request: RasterRequest<'_>,
        sample: u32,
        into: Option<PixelBuffer>,
    ) -> FrameSeqResult<PixelBuffer> {
        match request {
            RasterRequest::Encoded { format, bytes } => decode_encoded(format, bytes, sample, into),
            RasterRequest::GifIndexed {
                data,
                min_code_size,
                width,
                height,
                palette,
                transparent,
                interlaced,
            } => {
                let (ow, oh) = sampled_dims(width, height, sample)?;
                let pixel_count = width as usize * height as usize;
                let produced =
                    decode_indices(data, min_code_size, pixel_count, &mut self.indices)?;
                if produced < pixel_count {
                    tracing::debug!(produced, pixel_count, "gif image data ends early");
                }

                let rows = interlaced.then(|| interlaced_rows(height));
                let s = sample.max(1) as usize;
                let mut out = target_buffer(into, ow, oh);
                let dst = out.data_mut();
                for oy in 0..oh as usize {
                    let sy = oy * s;
                    let stored = rows.as_ref().map_or(sy, |r| r[sy] as usize);
                    for ox in 0..ow as usize {
                        let i = stored * width as usize + ox * s;
                        if i >= produced {
                            continue;
                        }
                        let idx = self.indices[i];
                        if transparent == Some(idx) {
                            continue;
                        }
                        if let Some(c) = palette.get(usize::from(idx)) {
                            let d = (oy * ow as usize + ox) * 4;
                            let px = Rgba8::new(c[0], c[1], c[2], 255).premultiplied();
                            dst[d..d + 4].copy_from_slice(&px);
                        }
                    }
                }
                Ok(out)
            }
        }
    }

    fn probe(&mut self, format: Format, bytes: &[u8]) -> FrameSeqResult<Size> {
        let (w, h) = image::ImageReader::with_format(Cursor::new(bytes), image_format(format))
            .into_dimensions()
            .map_err(|e| FrameSeqError::decode(format!("probe {}: {e}", format.name())))?;
        Ok(Size::new(w, h))
    }
}

fn decode_encoded(
    format: Format,
    bytes: &[u8],
    sample: u32,
    into: Option<PixelBuffer>,
) -> FrameSeqResult<PixelBuffer> {
    let img = image::load_from_memory_with_format(bytes, image_format(format))
        .map_err(|e| FrameSeqError::decode(format!("{} frame: {e}", format.name())))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let (ow, oh) = sampled_dims(width, height, sample)?;

    let mut out = target_buffer(into, ow, oh);
    let src = rgba.as_raw();
    let s = sample.max(1) as usize;
    if s == 1 {
        out.data_mut().copy_from_slice(src);
    } else {
        let dst = out.data_mut();
        for oy in 0..oh as usize {
            for ox in 0..ow as usize {
                let si = ((oy * s) * width as usize + ox * s) * 4;
                let di = (oy * ow as usize + ox) * 4;
                dst[di..di + 4].copy_from_slice(&src[si..si + 4]);
            }
        }
    }
    premultiply_rgba8_in_place(out.data_mut());
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/raster/decoder.rs"]
mod tests;
