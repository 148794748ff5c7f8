//! Chunk walkers for the three supported containers.
//!
//! Each format module exposes `parse_chunks` (typed chunk records, no pixel decoding),
//! `build_info` (chunks to [`AnimationInfo`]) and a frame synthesizer used by the
//! compositor to hand the raster decoder a self-contained image.

use std::io::{Read, Seek};

use serde::Serialize;

use crate::foundation::core::{ByteOrder, Format, FourCC};
use crate::foundation::error::{FrameSeqError, FrameSeqResult};
use crate::frame::model::AnimationInfo;
use crate::io::reader::BinaryReader;
use crate::io::source::ByteSource;

/// APNG / PNG chunk parser and per-frame PNG synthesis.
pub mod apng;
/// GIF block parser.
pub mod gif;
/// RIFF WebP chunk parser and per-frame WebP synthesis.
pub mod webp;

/// Location of one chunk (or GIF block) in the source stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChunkHeader {
    /// Offset of the first header byte.
    pub offset: u64,
    /// Payload length, excluding header and trailer.
    pub length: u32,
    /// Chunk tag; GIF blocks use synthetic tags.
    pub tag: FourCC,
    /// Bytes before the payload (length/tag fields, introducers).
    pub header_len: u8,
    /// Bytes after the payload (CRC, RIFF pad byte).
    pub trailer_len: u8,
}

impl ChunkHeader {
    /// Offset of the first payload byte.
    pub fn payload_offset(&self) -> u64 {
        self.offset + u64::from(self.header_len)
    }

    /// Offset one past the last byte of this chunk.
    pub fn end(&self) -> u64 {
        self.payload_offset() + u64::from(self.length) + u64::from(self.trailer_len)
    }
}

/// Parser switches.
#[derive(Debug, Clone, Copy)]
pub struct ParseOpts {
    /// Verify PNG CRC-32 trailers.
    pub verify_crc: bool,
}

impl Default for ParseOpts {
    fn default() -> Self {
        Self { verify_crc: true }
    }
}

/// Typed chunk list of a parsed container.
#[derive(Debug, Clone)]
pub enum ContainerChunks {
    /// PNG chunks.
    Apng(Vec<apng::ApngChunk>),
    /// RIFF chunks.
    WebP(Vec<webp::WebpChunk>),
    /// GIF blocks.
    Gif(Vec<gif::GifBlock>),
}

impl ContainerChunks {
    /// Headers of every top-level chunk, in stream order.
    pub fn headers(&self) -> Vec<ChunkHeader> {
        match self {
            Self::Apng(c) => c.iter().map(|c| *c.header()).collect(),
            Self::WebP(c) => c.iter().map(|c| *c.header()).collect(),
            Self::Gif(c) => c.iter().map(|c| *c.header()).collect(),
        }
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        match self {
            Self::Apng(c) => c.len(),
            Self::WebP(c) => c.len(),
            Self::Gif(c) => c.len(),
        }
    }

    /// `true` if no chunk was found after the signature.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Chunks plus the animation metadata derived from them.
#[derive(Debug, Clone)]
pub struct ParsedContainer {
    /// Raw chunk records.
    pub chunks: ContainerChunks,
    /// Derived animation description.
    pub info: AnimationInfo,
}

/// Sniff the container format from the first bytes, leaving the reader at its logical start.
pub fn detect_format<R: Read + Seek>(reader: &mut BinaryReader<R>) -> FrameSeqResult<Format> {
    reader.reset()?;
    let n = reader.available().min(12) as usize;
    let head = reader.read_vec(n)?;
    reader.reset()?;
    Format::sniff(&head).ok_or_else(|| {
        FrameSeqError::invalid_signature(format!(
            "unrecognised leading bytes {:02x?}",
            &head[..head.len().min(8)]
        ))
    })
}

/// Sniff and fully parse a container.
#[tracing::instrument(level = "debug", skip_all)]
pub fn parse_container<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    opts: ParseOpts,
) -> FrameSeqResult<ParsedContainer> {
    let format = detect_format(reader)?;
    reader.set_order(format.byte_order());
    let (chunks, info) = match format {
        Format::Png => {
            let chunks = apng::parse_chunks(reader, opts)?;
            let info = apng::build_info(&chunks)?;
            (ContainerChunks::Apng(chunks), info)
        }
        Format::WebP => {
            let chunks = webp::parse_chunks(reader, opts)?;
            let info = webp::build_info(&chunks)?;
            (ContainerChunks::WebP(chunks), info)
        }
        Format::Gif => {
            let chunks = gif::parse_chunks(reader, opts)?;
            let info = gif::build_info(&chunks)?;
            (ContainerChunks::Gif(chunks), info)
        }
    };
    tracing::debug!(
        format = format.name(),
        chunks = chunks.len(),
        frames = info.frames.len(),
        loop_count = info.loop_count,
        "parsed container"
    );
    Ok(ParsedContainer { chunks, info })
}

/// Parse a container down to its [`AnimationInfo`].
pub fn parse_animation<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    opts: ParseOpts,
) -> FrameSeqResult<AnimationInfo> {
    parse_container(reader, opts).map(|p| p.info)
}

/// `true` when the source parses as an animated container. Any error reads as `false`.
pub fn is_animated(source: &dyn ByteSource) -> bool {
    let Ok(stream) = source.open() else {
        return false;
    };
    let Ok(mut reader) = BinaryReader::new(stream, ByteOrder::BigEndian) else {
        return false;
    };
    match parse_animation(&mut reader, ParseOpts { verify_crc: false }) {
        Ok(info) => info.animated,
        Err(err) => {
            tracing::debug!(%err, "is_animated: parse failed");
            false
        }
    }
}

/// Read and check a fixed signature at the logical start.
pub(crate) fn expect_signature<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    expected: &[u8],
    what: &str,
) -> FrameSeqResult<()> {
    reader.reset()?;
    if reader.available() < expected.len() as u64 {
        return Err(FrameSeqError::invalid_signature(format!(
            "stream too short for {what} signature"
        )));
    }
    let got = reader.read_vec(expected.len())?;
    if got != expected {
        return Err(FrameSeqError::invalid_signature(format!("not a {what} stream")));
    }
    Ok(())
}

/// Check a body parser's consumption against the declared length and skip any remainder.
pub(crate) fn finish_body<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    tag: FourCC,
    offset: u64,
    body_start: u64,
    length: u32,
) -> FrameSeqResult<()> {
    let consumed = reader.position() - body_start;
    if consumed > u64::from(length) {
        return Err(FrameSeqError::OutOfChunkBounds {
            tag,
            offset,
            length,
            consumed,
        });
    }
    reader.skip(u64::from(length) - consumed)
}

#[cfg(test)]
#[path = "../../tests/unit/container/mod.rs"]
mod tests;
