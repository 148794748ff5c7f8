use std::io::{Read, Seek};

use serde::Serialize;

use crate::container::{ChunkHeader, ParseOpts, expect_signature, finish_body};
use crate::foundation::core::{ByteOrder, Format, FourCC, PNG_SIGNATURE, Size};
use crate::foundation::error::{FrameSeqError, FrameSeqResult};
use crate::frame::model::{
    AnimationInfo, Blend, DEFAULT_FRAME_DURATION_MS, Disposal, FrameContext, FrameDescriptor,
    FramePayload,
};
use crate::io::reader::BinaryReader;
use crate::io::writer::ByteWriter;

/// `IHDR` tag.
pub const IHDR: FourCC = FourCC::new(b"IHDR");
/// `acTL` tag.
pub const ACTL: FourCC = FourCC::new(b"acTL");
/// `fcTL` tag.
pub const FCTL: FourCC = FourCC::new(b"fcTL");
/// `fdAT` tag.
pub const FDAT: FourCC = FourCC::new(b"fdAT");
/// `IDAT` tag.
pub const IDAT: FourCC = FourCC::new(b"IDAT");
/// `IEND` tag.
pub const IEND: FourCC = FourCC::new(b"IEND");
const TRNS: FourCC = FourCC::new(b"tRNS");

const IEND_CHUNK: [u8; 12] = [0, 0, 0, 0, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82];

/// Body of an `fcTL` chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FrameControl {
    /// Sequence number shared with `fdAT`.
    pub sequence: u32,
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Left offset.
    pub x_offset: u32,
    /// Top offset.
    pub y_offset: u32,
    /// Delay numerator.
    pub delay_num: u16,
    /// Delay denominator; 0 means 100.
    pub delay_den: u16,
    /// 0 none, 1 background, 2 previous.
    pub dispose_op: u8,
    /// 0 source, 1 over.
    pub blend_op: u8,
}

impl FrameControl {
    /// Delay in milliseconds; anything under 10 ms plays as 100 ms.
    pub fn duration_ms(&self) -> u32 {
        let den = if self.delay_den == 0 {
            100
        } else {
            u32::from(self.delay_den)
        };
        let ms = u32::from(self.delay_num) * 1000 / den;
        if ms < 10 { DEFAULT_FRAME_DURATION_MS } else { ms }
    }
}

/// One PNG chunk.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApngChunk {
    /// Image header.
    Ihdr {
        /// Location.
        header: ChunkHeader,
        /// Canvas width.
        width: u32,
        /// Canvas height.
        height: u32,
        /// Depth, color type, compression, filter, interlace.
        tail: [u8; 5],
    },
    /// Animation control.
    Actl {
        /// Location.
        header: ChunkHeader,
        /// Declared frame count.
        num_frames: u32,
        /// Loop count, 0 = infinite.
        num_plays: u32,
    },
    /// Frame control.
    Fctl {
        /// Location.
        header: ChunkHeader,
        /// Parsed fields.
        control: FrameControl,
    },
    /// Frame data.
    Fdat {
        /// Location.
        header: ChunkHeader,
        /// Sequence number.
        sequence: u32,
    },
    /// Image data.
    Idat {
        /// Location.
        header: ChunkHeader,
    },
    /// End marker.
    Iend {
        /// Location.
        header: ChunkHeader,
    },
    /// Anything else; replayed verbatim when it precedes the first `fcTL`.
    Other {
        /// Location.
        header: ChunkHeader,
    },
}

impl ApngChunk {
    /// Location of this chunk.
    pub fn header(&self) -> &ChunkHeader {
        match self {
            Self::Ihdr { header, .. }
            | Self::Actl { header, .. }
            | Self::Fctl { header, .. }
            | Self::Fdat { header, .. }
            | Self::Idat { header }
            | Self::Iend { header }
            | Self::Other { header } => header,
        }
    }
}

/// Walk every chunk after the PNG signature, stopping at `IEND`.
#[tracing::instrument(level = "debug", skip_all)]
pub fn parse_chunks<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    opts: ParseOpts,
) -> FrameSeqResult<Vec<ApngChunk>> {
    reader.set_order(ByteOrder::BigEndian);
    expect_signature(reader, &PNG_SIGNATURE, "PNG")?;

    let mut chunks = Vec::new();
    while reader.available() > 0 {
        let Some(chunk) = parse_chunk(reader, opts)? else {
            continue;
        };
        let end = matches!(chunk, ApngChunk::Iend { .. });
        chunks.push(chunk);
        if end {
            break;
        }
    }
    Ok(chunks)
}

fn parse_chunk<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    opts: ParseOpts,
) -> FrameSeqResult<Option<ApngChunk>> {
    let offset = reader.position();
    let length = reader.read_u32()?;
    let tag = reader.read_fourcc()?;
    if length > i32::MAX as u32 {
        return Err(FrameSeqError::malformed(format!(
            "chunk '{tag}' at offset {offset} declares length {length}"
        )));
    }
    let header = ChunkHeader {
        offset,
        length,
        tag,
        header_len: 8,
        trailer_len: 4,
    };

    let body_start = reader.position();
    let chunk = match tag {
        IHDR => {
            let width = reader.read_u32()?;
            let height = reader.read_u32()?;
            let mut tail = [0u8; 5];
            reader.read(&mut tail, 0, 5)?;
            ApngChunk::Ihdr {
                header,
                width,
                height,
                tail,
            }
        }
        ACTL => ApngChunk::Actl {
            header,
            num_frames: reader.read_u32()?,
            num_plays: reader.read_u32()?,
        },
        FCTL => ApngChunk::Fctl {
            header,
            control: FrameControl {
                sequence: reader.read_u32()?,
                width: reader.read_u32()?,
                height: reader.read_u32()?,
                x_offset: reader.read_u32()?,
                y_offset: reader.read_u32()?,
                delay_num: reader.read_u16()?,
                delay_den: reader.read_u16()?,
                dispose_op: reader.read_u8()?,
                blend_op: reader.read_u8()?,
            },
        },
        FDAT => ApngChunk::Fdat {
            header,
            sequence: reader.read_u32()?,
        },
        IDAT => ApngChunk::Idat { header },
        IEND => ApngChunk::Iend { header },
        _ => ApngChunk::Other { header },
    };
    finish_body(reader, tag, offset, body_start, length)?;

    let stored = reader.read_u32()?;
    if opts.verify_crc {
        let actual = chunk_crc(reader, &header)?;
        if actual != stored {
            if tag.is_ancillary() && matches!(chunk, ApngChunk::Other { .. }) {
                tracing::warn!(%tag, offset, "crc mismatch in ancillary chunk, skipping it");
                return Ok(None);
            }
            return Err(FrameSeqError::malformed(format!(
                "crc mismatch in '{tag}' at offset {offset}: stored {stored:08x}, computed {actual:08x}"
            )));
        }
    }
    Ok(Some(chunk))
}

/// CRC-32 over tag and payload, computed with a fresh hasher.
fn chunk_crc<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    header: &ChunkHeader,
) -> FrameSeqResult<u32> {
    let resume = reader.position();
    reader.seek_to(header.offset + 4)?;

    let mut hasher = crc32fast::Hasher::new();
    let mut block = [0u8; 8192];
    let mut remaining = u64::from(header.length) + 4;
    while remaining > 0 {
        let n = remaining.min(block.len() as u64) as usize;
        reader.read(&mut block, 0, n)?;
        hasher.update(&block[..n]);
        remaining -= n as u64;
    }

    reader.seek_to(resume)?;
    Ok(hasher.finalize())
}

/// Group chunks into frames. A PNG without `acTL` becomes a still.
pub fn build_info(chunks: &[ApngChunk]) -> FrameSeqResult<AnimationInfo> {
    let Some((canvas, ihdr_tail)) = chunks.iter().find_map(|c| match c {
        ApngChunk::Ihdr {
            width,
            height,
            tail,
            ..
        } => Some((Size::new(*width, *height), *tail)),
        _ => None,
    }) else {
        return Err(FrameSeqError::malformed("missing IHDR chunk"));
    };
    if canvas.is_empty() {
        return Err(FrameSeqError::malformed(format!(
            "IHDR declares empty canvas {}x{}",
            canvas.width, canvas.height
        )));
    }
    let has_alpha = matches!(ihdr_tail[1], 4 | 6)
        || chunks.iter().any(|c| c.header().tag == TRNS);

    let actl = chunks.iter().find_map(|c| match c {
        ApngChunk::Actl {
            num_frames,
            num_plays,
            ..
        } => Some((*num_frames, *num_plays)),
        _ => None,
    });
    let Some((num_frames, num_plays)) = actl else {
        if !chunks.iter().any(|c| matches!(c, ApngChunk::Idat { .. })) {
            return Err(FrameSeqError::malformed("PNG has no IDAT chunk"));
        }
        let mut info = AnimationInfo::still(Format::Png, canvas);
        info.has_alpha = has_alpha;
        return Ok(info);
    };

    let mut prefix = Vec::new();
    let mut frames: Vec<FrameDescriptor> = Vec::new();
    for chunk in chunks {
        match chunk {
            ApngChunk::Fctl { control, .. } => {
                let frame = frame_from_control(frames.len(), control, canvas)?;
                frames.push(frame);
            }
            ApngChunk::Fdat { header, .. } | ApngChunk::Idat { header } => {
                match frames.last_mut().map(|f| &mut f.payload) {
                    Some(FramePayload::Apng { image }) => image.push(*header),
                    _ => tracing::trace!(tag = %header.tag, "image chunk outside any frame"),
                }
            }
            ApngChunk::Other { header } if frames.is_empty() => prefix.push(*header),
            _ => {}
        }
    }

    if frames.is_empty() {
        tracing::warn!("acTL present but no fcTL; treating as still image");
        let mut info = AnimationInfo::still(Format::Png, canvas);
        info.has_alpha = has_alpha;
        return Ok(info);
    }
    if num_frames as usize != frames.len() {
        tracing::warn!(
            declared = num_frames,
            found = frames.len(),
            "acTL frame count disagrees with fcTL count"
        );
    }

    Ok(AnimationInfo {
        format: Format::Png,
        animated: true,
        loop_count: num_plays,
        viewport: canvas,
        frames,
        background: None,
        has_alpha,
        context: FrameContext::Apng { ihdr_tail, prefix },
    })
}

fn frame_from_control(
    index: usize,
    control: &FrameControl,
    canvas: Size,
) -> FrameSeqResult<FrameDescriptor> {
    let mut disposal = match control.dispose_op {
        0 => Disposal::None,
        1 => Disposal::Background,
        2 => Disposal::Previous,
        other => {
            return Err(FrameSeqError::malformed(format!(
                "fcTL {index}: dispose_op {other}"
            )));
        }
    };
    // Nothing to restore before the first frame.
    if index == 0 && disposal == Disposal::Previous {
        disposal = Disposal::Background;
    }
    let blend = match control.blend_op {
        0 => Blend::Source,
        1 => Blend::Over,
        other => {
            return Err(FrameSeqError::malformed(format!(
                "fcTL {index}: blend_op {other}"
            )));
        }
    };
    if control.width == 0 || control.height == 0 {
        return Err(FrameSeqError::malformed(format!(
            "fcTL {index}: empty frame {}x{}",
            control.width, control.height
        )));
    }
    let x = i32::try_from(control.x_offset)
        .map_err(|_| FrameSeqError::malformed(format!("fcTL {index}: x_offset overflow")))?;
    let y = i32::try_from(control.y_offset)
        .map_err(|_| FrameSeqError::malformed(format!("fcTL {index}: y_offset overflow")))?;

    let frame = FrameDescriptor {
        index,
        x,
        y,
        width: control.width,
        height: control.height,
        duration_ms: control.duration_ms(),
        disposal,
        blend,
        payload: FramePayload::Apng { image: Vec::new() },
    };
    if !frame.fits(canvas) {
        return Err(FrameSeqError::malformed(format!(
            "fcTL {index}: rect ({x},{y}) {}x{} exceeds canvas {}x{}",
            control.width, control.height, canvas.width, canvas.height
        )));
    }
    Ok(frame)
}

/// Synthesize a standalone PNG for one frame into `out`.
///
/// `fdAT` bodies lose their sequence number and become `IDAT` with a recomputed CRC.
pub fn write_frame_png<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    ihdr_tail: &[u8; 5],
    prefix: &[ChunkHeader],
    frame: &FrameDescriptor,
    out: &mut ByteWriter,
) -> FrameSeqResult<()> {
    let FramePayload::Apng { image } = &frame.payload else {
        return Err(FrameSeqError::Other(anyhow::anyhow!(
            "frame {} does not carry PNG chunks",
            frame.index
        )));
    };
    if image.is_empty() {
        return Err(FrameSeqError::malformed(format!(
            "frame {} has no image data",
            frame.index
        )));
    }

    out.reset();
    out.put_bytes(&PNG_SIGNATURE);
    out.put_u32(13);
    let start = out.len();
    out.put_fourcc(IHDR);
    out.put_u32(frame.width);
    out.put_u32(frame.height);
    out.put_bytes(ihdr_tail);
    let crc = crc32fast::hash(&out.as_slice()[start..]);
    out.put_u32(crc);

    for chunk in prefix {
        reader.seek_to(chunk.offset)?;
        reader.read_append(out.vec_mut(), chunk.length as usize + 12)?;
    }

    for chunk in image {
        if chunk.tag == FDAT {
            let body = chunk.length.checked_sub(4).ok_or_else(|| {
                FrameSeqError::malformed(format!("fdAT at offset {} too short", chunk.offset))
            })?;
            out.put_u32(body);
            let start = out.len();
            out.put_fourcc(IDAT);
            reader.seek_to(chunk.payload_offset() + 4)?;
            reader.read_append(out.vec_mut(), body as usize)?;
            let crc = crc32fast::hash(&out.as_slice()[start..]);
            out.put_u32(crc);
        } else {
            reader.seek_to(chunk.offset)?;
            reader.read_append(out.vec_mut(), chunk.length as usize + 12)?;
        }
    }

    out.put_bytes(&IEND_CHUNK);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/container/apng.rs"]
mod tests;
