use std::io::{Read, Seek};

use serde::Serialize;

use crate::container::{ChunkHeader, ParseOpts, expect_signature, finish_body};
use crate::foundation::core::{ByteOrder, Format, FourCC, Rgba8, Size};
use crate::foundation::error::{FrameSeqError, FrameSeqResult};
use crate::frame::model::{
    AnimationInfo, Blend, DEFAULT_FRAME_DURATION_MS, Disposal, FrameContext, FrameDescriptor,
    FramePayload,
};
use crate::io::reader::BinaryReader;
use crate::io::writer::ByteWriter;

/// `VP8X` tag.
pub const VP8X: FourCC = FourCC::new(b"VP8X");
/// `ANIM` tag.
pub const ANIM: FourCC = FourCC::new(b"ANIM");
/// `ANMF` tag.
pub const ANMF: FourCC = FourCC::new(b"ANMF");
/// `ALPH` tag.
pub const ALPH: FourCC = FourCC::new(b"ALPH");
/// `VP8 ` tag (lossy).
pub const VP8: FourCC = FourCC::new(b"VP8 ");
/// `VP8L` tag (lossless).
pub const VP8L: FourCC = FourCC::new(b"VP8L");

const ANMF_HEADER_LEN: u32 = 16;

/// Feature bits of a `VP8X` chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Vp8xFlags(pub u8);

impl Vp8xFlags {
    /// ICC profile present.
    pub const ICC: u8 = 0x20;
    /// Alpha present.
    pub const ALPHA: u8 = 0x10;
    /// EXIF metadata present.
    pub const EXIF: u8 = 0x08;
    /// XMP metadata present.
    pub const XMP: u8 = 0x04;
    /// Animated.
    pub const ANIMATION: u8 = 0x02;

    /// Alpha flag.
    pub fn alpha(self) -> bool {
        self.0 & Self::ALPHA != 0
    }

    /// Animation flag.
    pub fn animation(self) -> bool {
        self.0 & Self::ANIMATION != 0
    }

    /// ICC flag.
    pub fn icc(self) -> bool {
        self.0 & Self::ICC != 0
    }

    /// EXIF flag.
    pub fn exif(self) -> bool {
        self.0 & Self::EXIF != 0
    }

    /// XMP flag.
    pub fn xmp(self) -> bool {
        self.0 & Self::XMP != 0
    }
}

/// Body of an `ANMF` chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AnimFrame {
    /// Left offset (already doubled).
    pub x: u32,
    /// Top offset (already doubled).
    pub y: u32,
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Duration in ms as stored.
    pub duration: u32,
    /// Bit 1: do not blend. Bit 0: dispose to background.
    pub flags: u8,
    /// Offset of the embedded image sub-chunks.
    pub payload_offset: u64,
    /// Length of the embedded image sub-chunks.
    pub payload_length: u32,
    /// An `ALPH` sub-chunk was seen.
    pub alpha: bool,
    /// The bitstream is `VP8L`.
    pub lossless: bool,
}

impl AnimFrame {
    /// Blend method from the flag byte.
    pub fn blend(&self) -> Blend {
        if self.flags & 0x02 != 0 {
            Blend::Source
        } else {
            Blend::Over
        }
    }

    /// Disposal method from the flag byte.
    pub fn disposal(&self) -> Disposal {
        if self.flags & 0x01 != 0 {
            Disposal::Background
        } else {
            Disposal::None
        }
    }
}

/// One RIFF chunk.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WebpChunk {
    /// Extended header.
    Vp8x {
        /// Location.
        header: ChunkHeader,
        /// Feature bits.
        flags: Vp8xFlags,
        /// Canvas size.
        canvas: Size,
    },
    /// Animation parameters.
    Anim {
        /// Location.
        header: ChunkHeader,
        /// Background color, converted from stored BGRA.
        background: Rgba8,
        /// Loop count, 0 = infinite.
        loop_count: u16,
    },
    /// Animation frame.
    Anmf {
        /// Location.
        header: ChunkHeader,
        /// Parsed fields.
        frame: AnimFrame,
    },
    /// Alpha plane of a still image.
    Alph {
        /// Location.
        header: ChunkHeader,
    },
    /// Lossy bitstream; `size` is read from the key frame header.
    Vp8 {
        /// Location.
        header: ChunkHeader,
        /// Declared image size.
        size: Option<Size>,
    },
    /// Lossless bitstream.
    Vp8l {
        /// Location.
        header: ChunkHeader,
        /// Declared image size.
        size: Option<Size>,
    },
    /// Metadata or unknown chunks.
    Other {
        /// Location.
        header: ChunkHeader,
    },
}

impl WebpChunk {
    /// Location of this chunk.
    pub fn header(&self) -> &ChunkHeader {
        match self {
            Self::Vp8x { header, .. }
            | Self::Anim { header, .. }
            | Self::Anmf { header, .. }
            | Self::Alph { header }
            | Self::Vp8 { header, .. }
            | Self::Vp8l { header, .. }
            | Self::Other { header } => header,
        }
    }
}

/// Walk the RIFF chunk list.
#[tracing::instrument(level = "debug", skip_all)]
pub fn parse_chunks<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    _opts: ParseOpts,
) -> FrameSeqResult<Vec<WebpChunk>> {
    reader.set_order(ByteOrder::LittleEndian);
    expect_signature(reader, b"RIFF", "RIFF")?;
    let riff_size = reader.read_u32()?;
    if reader.read_fourcc()? != FourCC::new(b"WEBP") {
        return Err(FrameSeqError::invalid_signature("RIFF form is not WEBP"));
    }
    let riff_end = (8 + u64::from(riff_size)).min(reader.len());

    let mut chunks = Vec::new();
    while reader.position() + 8 <= riff_end {
        chunks.push(parse_chunk(reader)?);
    }
    if reader.position() < riff_end {
        tracing::debug!(
            trailing = riff_end - reader.position(),
            "ignoring trailing bytes in RIFF body"
        );
    }
    Ok(chunks)
}

fn parse_chunk<R: Read + Seek>(reader: &mut BinaryReader<R>) -> FrameSeqResult<WebpChunk> {
    let offset = reader.position();
    let tag = reader.read_fourcc()?;
    let length = reader.read_u32()?;
    let mut header = ChunkHeader {
        offset,
        length,
        tag,
        header_len: 8,
        trailer_len: 0,
    };

    let body_start = reader.position();
    let chunk = match tag {
        VP8X => {
            let flags = Vp8xFlags(reader.read_u8()?);
            reader.skip(3)?;
            let width = reader.read_u24()? + 1;
            let height = reader.read_u24()? + 1;
            WebpChunk::Vp8x {
                header,
                flags,
                canvas: Size::new(width, height),
            }
        }
        ANIM => {
            let mut bgra = [0u8; 4];
            reader.read(&mut bgra, 0, 4)?;
            WebpChunk::Anim {
                header,
                background: Rgba8::new(bgra[2], bgra[1], bgra[0], bgra[3]),
                loop_count: reader.read_u16()?,
            }
        }
        ANMF => WebpChunk::Anmf {
            header,
            frame: parse_anmf(reader, &header)?,
        },
        ALPH => WebpChunk::Alph { header },
        VP8 => WebpChunk::Vp8 {
            header,
            size: probe_vp8(reader, length)?,
        },
        VP8L => WebpChunk::Vp8l {
            header,
            size: probe_vp8l(reader, length)?,
        },
        _ => WebpChunk::Other { header },
    };
    finish_body(reader, tag, offset, body_start, length)?;

    if length % 2 == 1 {
        if reader.available() > 0 {
            reader.skip(1)?;
            header.trailer_len = 1;
        } else {
            tracing::debug!(%tag, offset, "missing RIFF pad byte at end of stream");
        }
    }
    Ok(with_header(chunk, header))
}

fn with_header(mut chunk: WebpChunk, updated: ChunkHeader) -> WebpChunk {
    match &mut chunk {
        WebpChunk::Vp8x { header, .. }
        | WebpChunk::Anim { header, .. }
        | WebpChunk::Anmf { header, .. }
        | WebpChunk::Alph { header }
        | WebpChunk::Vp8 { header, .. }
        | WebpChunk::Vp8l { header, .. }
        | WebpChunk::Other { header } => *header = updated,
    }
    chunk
}

fn parse_anmf<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    header: &ChunkHeader,
) -> FrameSeqResult<AnimFrame> {
    let x = reader.read_u24()? * 2;
    let y = reader.read_u24()? * 2;
    let width = reader.read_u24()? + 1;
    let height = reader.read_u24()? + 1;
    let duration = reader.read_u24()?;
    let flags = reader.read_u8()?;

    let payload_offset = reader.position();
    let payload_length = header.length.saturating_sub(ANMF_HEADER_LEN);
    let payload_end = payload_offset + u64::from(payload_length);

    let mut alpha = false;
    let mut lossless = false;
    while reader.position() + 8 <= payload_end {
        let sub = reader.read_fourcc()?;
        let len = u64::from(reader.read_u32()?);
        match sub {
            ALPH => alpha = true,
            VP8L => lossless = true,
            _ => {}
        }
        let padded = len + (len & 1);
        let skip = padded.min(payload_end.saturating_sub(reader.position()));
        if skip < len {
            return Err(FrameSeqError::OutOfChunkBounds {
                tag: header.tag,
                offset: header.offset,
                length: header.length,
                consumed: reader.position() + len - (header.offset + 8),
            });
        }
        reader.skip(skip)?;
    }

    Ok(AnimFrame {
        x,
        y,
        width,
        height,
        duration,
        flags,
        payload_offset,
        payload_length,
        alpha,
        lossless,
    })
}

/// Frame size from a VP8 key frame header: 3-byte tag, start code, 14-bit dimensions.
fn probe_vp8<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    length: u32,
) -> FrameSeqResult<Option<Size>> {
    if length < 10 {
        return Ok(None);
    }
    let mut head = [0u8; 10];
    reader.read(&mut head, 0, 10)?;
    if head[3..6] != [0x9d, 0x01, 0x2a] {
        return Ok(None);
    }
    let w = u32::from(u16::from_le_bytes([head[6], head[7]]) & 0x3fff);
    let h = u32::from(u16::from_le_bytes([head[8], head[9]]) & 0x3fff);
    Ok(Some(Size::new(w, h)))
}

/// Frame size from a VP8L header: signature byte 0x2f, then 14-bit width-1 and height-1.
fn probe_vp8l<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    length: u32,
) -> FrameSeqResult<Option<Size>> {
    if length < 5 {
        return Ok(None);
    }
    let mut head = [0u8; 5];
    reader.read(&mut head, 0, 5)?;
    if head[0] != 0x2f {
        return Ok(None);
    }
    let bits = u32::from_le_bytes([head[1], head[2], head[3], head[4]]);
    let w = (bits & 0x3fff) + 1;
    let h = ((bits >> 14) & 0x3fff) + 1;
    Ok(Some(Size::new(w, h)))
}

/// Turn chunks into frames; a stream without `ANIM` is a still.
pub fn build_info(chunks: &[WebpChunk]) -> FrameSeqResult<AnimationInfo> {
    let vp8x = chunks.iter().find_map(|c| match c {
        WebpChunk::Vp8x { flags, canvas, .. } => Some((*flags, *canvas)),
        _ => None,
    });
    let anim = chunks.iter().find_map(|c| match c {
        WebpChunk::Anim {
            background,
            loop_count,
            ..
        } => Some((*background, *loop_count)),
        _ => None,
    });

    let Some((background, loop_count)) = anim else {
        let canvas = vp8x.map(|(_, canvas)| canvas).or_else(|| {
            chunks.iter().find_map(|c| match c {
                WebpChunk::Vp8 { size, .. } | WebpChunk::Vp8l { size, .. } => *size,
                _ => None,
            })
        });
        let Some(canvas) = canvas.filter(|c| !c.is_empty()) else {
            return Err(FrameSeqError::malformed("webp still without a readable size"));
        };
        let mut info = AnimationInfo::still(Format::WebP, canvas);
        info.has_alpha = vp8x.is_some_and(|(f, _)| f.alpha())
            || chunks
                .iter()
                .any(|c| matches!(c, WebpChunk::Alph { .. } | WebpChunk::Vp8l { .. }));
        return Ok(info);
    };

    let Some((flags, canvas)) = vp8x else {
        return Err(FrameSeqError::malformed("ANIM chunk without VP8X canvas"));
    };

    let mut frames = Vec::new();
    for chunk in chunks {
        let WebpChunk::Anmf { frame, .. } = chunk else {
            continue;
        };
        let index = frames.len();
        let descriptor = FrameDescriptor {
            index,
            x: frame.x as i32,
            y: frame.y as i32,
            width: frame.width,
            height: frame.height,
            duration_ms: if frame.duration == 0 {
                DEFAULT_FRAME_DURATION_MS
            } else {
                frame.duration
            },
            disposal: frame.disposal(),
            blend: frame.blend(),
            payload: FramePayload::Webp {
                offset: frame.payload_offset,
                length: frame.payload_length,
                alpha: frame.alpha,
                lossless: frame.lossless,
            },
        };
        if !descriptor.fits(canvas) {
            return Err(FrameSeqError::malformed(format!(
                "ANMF {index}: rect ({},{}) {}x{} exceeds canvas {}x{}",
                frame.x, frame.y, frame.width, frame.height, canvas.width, canvas.height
            )));
        }
        frames.push(descriptor);
    }
    if frames.is_empty() {
        return Err(FrameSeqError::malformed("ANIM chunk but no ANMF frames"));
    }

    Ok(AnimationInfo {
        format: Format::WebP,
        animated: true,
        loop_count: u32::from(loop_count),
        viewport: canvas,
        frames,
        background: Some(background),
        has_alpha: flags.alpha(),
        context: FrameContext::None,
    })
}

/// Synthesize a standalone still WebP from one `ANMF` payload into `out`.
pub fn write_frame_webp<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    frame: &FrameDescriptor,
    out: &mut ByteWriter,
) -> FrameSeqResult<()> {
    let FramePayload::Webp {
        offset,
        length,
        alpha,
        lossless,
    } = frame.payload
    else {
        return Err(FrameSeqError::Other(anyhow::anyhow!(
            "frame {} does not carry a webp payload",
            frame.index
        )));
    };

    out.reset();
    out.put_fourcc(FourCC::new(b"RIFF"));
    out.put_u32(0);
    out.put_fourcc(FourCC::new(b"WEBP"));
    out.put_fourcc(VP8X);
    out.put_u32(10);
    // VP8L carries its own alpha; without the flag decoders drop it.
    out.put_u8(if alpha || lossless { Vp8xFlags::ALPHA } else { 0 });
    out.put_u24(0);
    out.put_u24_minus_one(frame.width);
    out.put_u24_minus_one(frame.height);

    reader.seek_to(offset)?;
    reader.read_append(out.vec_mut(), length as usize)?;

    let riff_size = (out.len() - 8) as u32;
    out.patch_u32(4, riff_size);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/container/webp.rs"]
mod tests;
