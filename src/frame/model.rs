use std::sync::Arc;

use serde::Serialize;

use crate::container::ChunkHeader;
use crate::foundation::core::{Format, IntRect, Rgba8, Size};

/// Duration substituted for frames that declare none (or an implausibly short one).
pub const DEFAULT_FRAME_DURATION_MS: u32 = 100;

/// What happens to a frame's rectangle before the next frame is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposal {
    /// Leave the canvas as drawn.
    #[default]
    None,
    /// Clear the rectangle to the background (transparent or the container's color).
    Background,
    /// Restore the rectangle to the contents before this frame was drawn.
    Previous,
}

/// How a decoded frame is combined with the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Blend {
    /// Replace the destination rectangle.
    Source,
    /// Alpha-composite over the destination.
    #[default]
    Over,
}

/// GIF color table, RGB triples.
pub type Palette = Arc<[[u8; 3]]>;

/// Where a frame's encoded pixels live in the byte source.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FramePayload {
    /// `IDAT` / `fdAT` chunks replayed into a standalone PNG.
    Apng {
        /// Image chunks in stream order.
        image: Vec<ChunkHeader>,
    },
    /// Image sub-chunks (`ALPH`, `VP8 `/`VP8L`) of an `ANMF` chunk.
    Webp {
        /// Offset of the first sub-chunk.
        offset: u64,
        /// Byte length of all sub-chunks.
        length: u32,
        /// An `ALPH` sub-chunk was present.
        alpha: bool,
        /// Bitstream is `VP8L`.
        lossless: bool,
    },
    /// LZW sub-blocks of a GIF image.
    Gif {
        /// Offset of the first sub-block size byte.
        data_offset: u64,
        /// LZW minimum code size.
        min_code_size: u8,
        /// Local table if present, else the global one.
        #[serde(skip)]
        palette: Palette,
        /// Palette index treated as transparent.
        transparent: Option<u8>,
        /// Rows stored in 4-pass interlaced order.
        interlaced: bool,
    },
    /// The whole stream is handed to the raster decoder as-is.
    Still,
}

/// One frame of an animation; immutable once parsed.
#[derive(Clone, Debug, Serialize)]
pub struct FrameDescriptor {
    /// Position in the frame list.
    pub index: usize,
    /// Left offset on the canvas.
    pub x: i32,
    /// Top offset on the canvas.
    pub y: i32,
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Display time in milliseconds, already normalized.
    pub duration_ms: u32,
    /// Disposal applied before the next frame.
    pub disposal: Disposal,
    /// Blend used when drawing this frame.
    pub blend: Blend,
    /// Encoded pixel location.
    pub payload: FramePayload,
}

impl FrameDescriptor {
    /// Destination rectangle in canvas coordinates.
    pub fn rect(&self) -> IntRect {
        IntRect::new(self.x, self.y, self.width, self.height)
    }

    /// Frame size in pixels.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// `true` if `x + width` and `y + height` stay within `canvas`.
    pub fn fits(&self, canvas: Size) -> bool {
        self.x >= 0
            && self.y >= 0
            && u64::from(self.x as u32) + u64::from(self.width) <= u64::from(canvas.width)
            && u64::from(self.y as u32) + u64::from(self.height) <= u64::from(canvas.height)
    }
}

/// Per-format data needed to rebuild standalone frame images.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameContext {
    /// Nothing shared between frames.
    #[default]
    None,
    /// PNG header bits and chunks replayed before every frame.
    Apng {
        /// IHDR bytes after width/height: depth, color type, compression, filter, interlace.
        ihdr_tail: [u8; 5],
        /// Non-image chunks preceding the first `fcTL`.
        prefix: Vec<ChunkHeader>,
    },
}

/// Everything the parser learned about an animation.
#[derive(Clone, Debug, Serialize)]
pub struct AnimationInfo {
    /// Container format.
    pub format: Format,
    /// `false` when the stream is a still image wrapped as a single frame.
    pub animated: bool,
    /// Full playthroughs before stopping; 0 means forever.
    pub loop_count: u32,
    /// Canvas size.
    pub viewport: Size,
    /// Frames in display order.
    pub frames: Vec<FrameDescriptor>,
    /// Background color declared by the container.
    pub background: Option<Rgba8>,
    /// Canvas may contain transparency.
    pub has_alpha: bool,
    /// Shared data for frame synthesis.
    pub context: FrameContext,
}

impl AnimationInfo {
    /// A single full-canvas frame decoded straight from the source bytes.
    pub fn still(format: Format, viewport: Size) -> Self {
        Self {
            format,
            animated: false,
            loop_count: 1,
            viewport,
            frames: vec![FrameDescriptor {
                index: 0,
                x: 0,
                y: 0,
                width: viewport.width,
                height: viewport.height,
                duration_ms: DEFAULT_FRAME_DURATION_MS,
                disposal: Disposal::None,
                blend: Blend::Source,
                payload: FramePayload::Still,
            }],
            background: None,
            has_alpha: true,
            context: FrameContext::None,
        }
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Sum of all frame durations for one playthrough.
    pub fn total_duration_ms(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.duration_ms)).sum()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/model.rs"]
mod tests;
