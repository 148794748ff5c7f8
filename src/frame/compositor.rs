use std::io::{Read, Seek};
use std::sync::Arc;

use crate::container::{apng, gif, webp};
use crate::foundation::core::{Format, IntRect, Size};
use crate::foundation::error::{FrameSeqError, FrameSeqResult};
use crate::frame::blend::{self, PremulRgba8};
use crate::frame::model::{AnimationInfo, Blend, Disposal, FrameContext, FramePayload};
use crate::io::reader::BinaryReader;
use crate::io::writer::ByteWriter;
use crate::raster::{RasterDecoder, RasterRequest};
use crate::render::buffer::PixelBuffer;
use crate::render::pool::BufferPool;

const TRANSPARENT: PremulRgba8 = [0, 0, 0, 0];

/// Rebuilds displayed frames from differential frame data.
///
/// Owns the persistent output canvas, the restore-to-previous snapshot and the scratch
/// writer used to synthesize standalone frame images. One compositor per session.
pub struct Compositor {
    info: Arc<AnimationInfo>,
    sample: u32,
    canvas: Size,
    output: Option<PixelBuffer>,
    snapshot: Option<PixelBuffer>,
    previous: Option<(Disposal, IntRect)>,
    writer: ByteWriter,
    gif_data: Vec<u8>,
}

impl Compositor {
    /// Compositor for `info` at downscale factor `sample`.
    pub fn new(info: Arc<AnimationInfo>, sample: u32) -> Self {
        let sample = sample.max(1);
        let canvas = info.viewport.sampled(sample);
        let writer = ByteWriter::new(info.format.byte_order());
        Self {
            info,
            sample,
            canvas,
            output: None,
            snapshot: None,
            previous: None,
            writer,
            gif_data: Vec::new(),
        }
    }

    /// Animation being composited.
    pub fn info(&self) -> &Arc<AnimationInfo> {
        &self.info
    }

    /// Active downscale factor.
    pub fn sample(&self) -> u32 {
        self.sample
    }

    /// Output canvas size (viewport divided by the sample factor).
    pub fn canvas(&self) -> Size {
        self.canvas
    }

    /// Last composited canvas, if any frame was drawn.
    pub fn output(&self) -> Option<&PixelBuffer> {
        self.output.as_ref()
    }

    /// Lend the canvas out; [`Compositor::restore_output`] must follow before the next render.
    pub fn take_output(&mut self) -> Option<PixelBuffer> {
        self.output.take()
    }

    /// Return a canvas lent by [`Compositor::take_output`].
    pub fn restore_output(&mut self, buffer: PixelBuffer) {
        self.output = Some(buffer);
    }

    /// Composite frame `index` onto the canvas.
    ///
    /// The frame is decoded before anything is touched: on error the canvas and the
    /// disposal state are exactly as they were, so the caller can skip the frame.
    pub fn render<R: Read + Seek>(
        &mut self,
        index: usize,
        reader: &mut BinaryReader<R>,
        raster: &mut dyn RasterDecoder,
        pool: &BufferPool,
    ) -> FrameSeqResult<&PixelBuffer> {
        let info = Arc::clone(&self.info);
        let Some(frame) = info.frames.get(index) else {
            return Err(FrameSeqError::Other(anyhow::anyhow!(
                "frame index {index} out of range ({} frames)",
                info.frames.len()
            )));
        };
        let rect = frame.rect().sampled(self.sample);

        let decoded = if frame.size().sampled(self.sample).is_empty() {
            None
        } else {
            Some(self.decode_frame(index, reader, raster, pool)?)
        };

        let mut output = match self.output.take() {
            Some(buf) => buf,
            None => pool
                .obtain(self.canvas.width, self.canvas.height)
                .ok_or(FrameSeqError::BufferSize {
                    width: self.canvas.width,
                    height: self.canvas.height,
                })?,
        };

        let gif_opaque = matches!(frame.payload, FramePayload::Gif { transparent: None, .. });
        if index == 0 {
            output.fill(self.first_frame_fill(gif_opaque));
            self.previous = None;
        } else if let Some((disposal, prev_rect)) = self.previous {
            match disposal {
                Disposal::None => {}
                Disposal::Background => {
                    blend::fill_rect(&mut output, prev_rect, self.background_fill())
                }
                Disposal::Previous => {
                    if let Some(snapshot) = &self.snapshot {
                        blend::copy_rect(&mut output, snapshot, prev_rect);
                    }
                }
            }
        }

        let prev_disposal = self.previous.map(|(d, _)| d);
        if frame.disposal == Disposal::Previous && prev_disposal != Some(Disposal::Previous) {
            self.take_snapshot(&output, pool);
        }

        if frame.blend == Blend::Source {
            blend::fill_rect(&mut output, rect, TRANSPARENT);
        }
        if let Some(decoded) = decoded {
            blend::draw(&mut output, &decoded, rect.x, rect.y, frame.blend);
            pool.recycle(Some(decoded));
        }

        if gif_opaque && let Some(bg) = self.info.background {
            blend::underlay(&mut output, bg.premultiplied());
        }

        self.previous = Some((frame.disposal, rect));
        let output: &PixelBuffer = self.output.insert(output);
        Ok(output)
    }

    fn decode_frame<R: Read + Seek>(
        &mut self,
        index: usize,
        reader: &mut BinaryReader<R>,
        raster: &mut dyn RasterDecoder,
        pool: &BufferPool,
    ) -> FrameSeqResult<PixelBuffer> {
        let frame = &self.info.frames[index];
        let reuse = pool.obtain(frame.width / self.sample, frame.height / self.sample);
        let request = match &frame.payload {
            FramePayload::Apng { .. } => {
                let FrameContext::Apng { ihdr_tail, prefix } = &self.info.context else {
                    return Err(FrameSeqError::malformed("APNG frame without PNG context"));
                };
                apng::write_frame_png(reader, ihdr_tail, prefix, frame, &mut self.writer)?;
                RasterRequest::Encoded {
                    format: Format::Png,
                    bytes: self.writer.as_slice(),
                }
            }
            FramePayload::Webp { .. } => {
                webp::write_frame_webp(reader, frame, &mut self.writer)?;
                RasterRequest::Encoded {
                    format: Format::WebP,
                    bytes: self.writer.as_slice(),
                }
            }
            FramePayload::Gif {
                data_offset,
                min_code_size,
                palette,
                transparent,
                interlaced,
            } => {
                gif::read_image_data(reader, *data_offset, &mut self.gif_data)?;
                RasterRequest::GifIndexed {
                    data: &self.gif_data,
                    min_code_size: *min_code_size,
                    width: frame.width,
                    height: frame.height,
                    palette,
                    transparent: *transparent,
                    interlaced: *interlaced,
                }
            }
            FramePayload::Still => {
                self.writer.reset();
                reader.reset()?;
                let len = reader.available() as usize;
                reader.read_append(self.writer.vec_mut(), len)?;
                RasterRequest::Encoded {
                    format: self.info.format,
                    bytes: self.writer.as_slice(),
                }
            }
        };
        raster.decode(request, self.sample, reuse)
    }

    fn first_frame_fill(&self, gif_opaque: bool) -> PremulRgba8 {
        match self.info.format {
            Format::WebP if !self.info.has_alpha => self.background_fill(),
            Format::Gif if gif_opaque => self
                .info
                .background
                .map_or(TRANSPARENT, |c| c.premultiplied()),
            _ => TRANSPARENT,
        }
    }

    fn background_fill(&self) -> PremulRgba8 {
        match (self.info.format, self.info.background) {
            (Format::WebP, Some(bg)) if !self.info.has_alpha => bg.premultiplied(),
            _ => TRANSPARENT,
        }
    }

    fn take_snapshot(&mut self, output: &PixelBuffer, pool: &BufferPool) {
        let mut snap = match self.snapshot.take() {
            Some(buf) if buf.size() == output.size() => buf,
            other => {
                pool.recycle(other);
                match pool.obtain(output.width(), output.height()) {
                    Some(buf) => buf,
                    None => return,
                }
            }
        };
        snap.copy_from(output);
        self.snapshot = Some(snap);
    }

    /// Forget disposal state so the next render starts a fresh loop.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Return canvas and snapshot to `pool` and forget all state.
    pub fn release(&mut self, pool: &BufferPool) {
        pool.recycle(self.output.take());
        pool.recycle(self.snapshot.take());
        self.previous = None;
        self.writer = ByteWriter::new(self.info.format.byte_order());
        self.gif_data = Vec::new();
    }

    /// Bytes held by the canvas, snapshot and scratch space.
    pub fn memory_size(&self) -> usize {
        self.output.as_ref().map_or(0, PixelBuffer::capacity_bytes)
            + self.snapshot.as_ref().map_or(0, PixelBuffer::capacity_bytes)
            + self.writer.capacity()
            + self.gif_data.capacity()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/compositor.rs"]
mod tests;
