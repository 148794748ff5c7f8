//! `frameseq` decodes animated PNG, WebP and GIF containers into timed frame sequences.
//!
//! The pipeline has four layers:
//! - [`container`]: chunk-level parsing into an [`AnimationInfo`] of offset-based frames
//! - [`frame`]: disposal and blend aware compositing onto a persistent canvas
//! - [`raster`]: the pixel-codec boundary ([`RasterDecoder`]), `image`/`weezl` backed by default
//! - [`playback`]: a lane-scheduled [`Player`] that ticks frames and notifies listeners
//!
//! Pixels are premultiplied RGBA8 throughout.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Container parsers (APNG, WebP, GIF).
pub mod container;
/// Frame model and compositing.
pub mod frame;
/// Core value types, errors and pixel math.
pub mod foundation;
/// Byte sources, reader and writer.
pub mod io;
/// Timed playback.
pub mod playback;
/// Pixel decoding.
pub mod raster;
/// Pixel buffers and pooling.
pub mod render;

pub use container::{
    ChunkHeader, ContainerChunks, ParseOpts, ParsedContainer, detect_format, is_animated,
    parse_animation, parse_container,
};
pub use foundation::core::{ByteOrder, FourCC, Format, IntRect, Rgba8, Size};
pub use foundation::error::{FrameSeqError, FrameSeqResult};
pub use frame::compositor::Compositor;
pub use frame::model::{
    AnimationInfo, Blend, DEFAULT_FRAME_DURATION_MS, Disposal, FrameContext, FrameDescriptor,
    FramePayload,
};
pub use io::reader::BinaryReader;
pub use io::source::{ByteSource, FileSource, MemorySource, SeekableStream};
pub use io::writer::ByteWriter;
pub use playback::cursor::LoopCursor;
pub use playback::lanes::{Lane, LanePool};
pub use playback::listener::{ChannelListener, ListenerId, PlaybackEvent, RenderListener};
pub use playback::player::{Player, PlayerOpts, PlayerState};
pub use raster::{ImageRasterDecoder, RasterDecoder, RasterRequest};
pub use render::buffer::PixelBuffer;
pub use render::pool::{BufferPool, PoolOpts, PoolStats};
