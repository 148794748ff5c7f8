use std::io::{Read, Seek};
use std::sync::Arc;

use serde::Serialize;

use crate::container::{ChunkHeader, ParseOpts, expect_signature};
use crate::foundation::core::{ByteOrder, Format, FourCC, Rgba8, Size};
use crate::foundation::error::{FrameSeqError, FrameSeqResult};
use crate::frame::model::{
    AnimationInfo, Blend, Disposal, FrameContext, FrameDescriptor, FramePayload, Palette,
};
use crate::io::reader::BinaryReader;

/// Synthetic tag of the Logical Screen Descriptor.
pub const SCREEN: FourCC = FourCC::new(b"LSD ");
/// Synthetic tag of a Graphic Control Extension.
pub const CONTROL: FourCC = FourCC::new(b"GCE ");
/// Synthetic tag of an Application Extension.
pub const APPLICATION: FourCC = FourCC::new(b"APP ");
/// Synthetic tag of a Comment Extension.
pub const COMMENT: FourCC = FourCC::new(b"COM ");
/// Synthetic tag of a Plain Text Extension.
pub const PLAIN_TEXT: FourCC = FourCC::new(b"TXT ");
/// Synthetic tag of an unknown extension.
pub const EXTENSION: FourCC = FourCC::new(b"EXT ");
/// Synthetic tag of an Image Descriptor with its data.
pub const IMAGE: FourCC = FourCC::new(b"IMG ");
/// Synthetic tag of the trailer.
pub const TRAILER: FourCC = FourCC::new(b"END ");

/// Fallback delay for frames declaring 0, in centiseconds.
const DEFAULT_DELAY_CS: u16 = 10;
const MAX_LZW_CODE_SIZE: u8 = 11;

/// Graphic Control Extension fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GraphicControl {
    /// Raw disposal method, 0..=7.
    pub disposal: u8,
    /// Transparent palette index if the flag is set.
    pub transparent: Option<u8>,
    /// Delay in centiseconds as stored.
    pub delay_cs: u16,
    /// User input flag.
    pub user_input: bool,
}

impl GraphicControl {
    /// Disposal mapped onto the shared enum: 2 background, 3 previous, otherwise none.
    pub fn disposal_mode(&self) -> Disposal {
        match self.disposal {
            2 => Disposal::Background,
            3 => Disposal::Previous,
            _ => Disposal::None,
        }
    }

    /// Delay in milliseconds; 0 plays as 100 ms.
    pub fn duration_ms(&self) -> u32 {
        let cs = if self.delay_cs == 0 {
            DEFAULT_DELAY_CS
        } else {
            self.delay_cs
        };
        u32::from(cs) * 10
    }
}

/// Image Descriptor plus the location of its LZW data.
#[derive(Clone, Debug, Serialize)]
pub struct ImageDescriptor {
    /// Left offset.
    pub x: u16,
    /// Top offset.
    pub y: u16,
    /// Image width.
    pub width: u16,
    /// Image height.
    pub height: u16,
    /// Rows are interlaced.
    pub interlaced: bool,
    /// Local color table.
    #[serde(skip)]
    pub local_table: Option<Palette>,
    /// LZW minimum code size.
    pub min_code_size: u8,
    /// Offset of the first data sub-block.
    pub data_offset: u64,
}

/// One GIF block.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GifBlock {
    /// Logical Screen Descriptor and optional global color table.
    Screen {
        /// Location.
        header: ChunkHeader,
        /// Canvas size.
        canvas: Size,
        /// Global color table.
        #[serde(skip)]
        global_table: Option<Palette>,
        /// Background color index.
        background_index: u8,
        /// Pixel aspect ratio byte.
        aspect: u8,
    },
    /// Graphic Control Extension.
    Control {
        /// Location.
        header: ChunkHeader,
        /// Parsed fields.
        control: GraphicControl,
    },
    /// Application Extension.
    Application {
        /// Location.
        header: ChunkHeader,
        /// Identifier plus authentication code, e.g. `NETSCAPE2.0`.
        identifier: String,
        /// Loop count from a NETSCAPE / ANIMEXTS looping sub-block.
        loop_count: Option<u16>,
    },
    /// Comment, plain text or unknown extension, skipped over its sub-blocks.
    Skipped {
        /// Location.
        header: ChunkHeader,
        /// Extension label.
        label: u8,
    },
    /// Image Descriptor and data.
    Image {
        /// Location.
        header: ChunkHeader,
        /// Parsed fields.
        descriptor: ImageDescriptor,
    },
    /// Trailer byte.
    Trailer {
        /// Location.
        header: ChunkHeader,
    },
}

impl GifBlock {
    /// Location of this block.
    pub fn header(&self) -> &ChunkHeader {
        match self {
            Self::Screen { header, .. }
            | Self::Control { header, .. }
            | Self::Application { header, .. }
            | Self::Skipped { header, .. }
            | Self::Image { header, .. }
            | Self::Trailer { header } => header,
        }
    }
}

/// Walk the block stream. A missing trailer at a block boundary is accepted.
#[tracing::instrument(level = "debug", skip_all)]
pub fn parse_chunks<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    _opts: ParseOpts,
) -> FrameSeqResult<Vec<GifBlock>> {
    reader.set_order(ByteOrder::LittleEndian);
    expect_signature(reader, b"GIF8", "GIF")?;
    let version = reader.read_vec(2)?;
    if version != b"7a" && version != b"9a" {
        return Err(FrameSeqError::invalid_signature("unknown GIF version"));
    }

    let mut blocks = vec![parse_screen(reader)?];
    while reader.available() > 0 {
        let offset = reader.position();
        let introducer = reader.read_u8()?;
        let block = match introducer {
            0x21 => parse_extension(reader, offset)?,
            0x2c => parse_image(reader, offset)?,
            0x3b => GifBlock::Trailer {
                header: block_header(TRAILER, offset, 1, 0),
            },
            other => {
                return Err(FrameSeqError::malformed(format!(
                    "unknown GIF block introducer 0x{other:02x} at offset {offset}"
                )));
            }
        };
        let end = matches!(block, GifBlock::Trailer { .. });
        blocks.push(block);
        if end {
            break;
        }
    }
    Ok(blocks)
}

fn block_header(tag: FourCC, offset: u64, header_len: u8, length: u64) -> ChunkHeader {
    ChunkHeader {
        offset,
        length: length as u32,
        tag,
        header_len,
        trailer_len: 0,
    }
}

fn read_palette<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    flags: u8,
) -> FrameSeqResult<Palette> {
    let entries = 2usize << (flags & 0x07);
    let raw = reader.read_vec(entries * 3)?;
    let table: Vec<[u8; 3]> = raw.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
    Ok(Arc::from(table))
}

/// Skip data sub-blocks up to and including the zero terminator.
fn skip_sub_blocks<R: Read + Seek>(reader: &mut BinaryReader<R>) -> FrameSeqResult<()> {
    loop {
        let size = reader.read_u8()?;
        if size == 0 {
            return Ok(());
        }
        reader.skip(u64::from(size))?;
    }
}

fn parse_screen<R: Read + Seek>(reader: &mut BinaryReader<R>) -> FrameSeqResult<GifBlock> {
    let offset = reader.position();
    let width = reader.read_u16()?;
    let height = reader.read_u16()?;
    let flags = reader.read_u8()?;
    let background_index = reader.read_u8()?;
    let aspect = reader.read_u8()?;
    let global_table = if flags & 0x80 != 0 {
        Some(read_palette(reader, flags)?)
    } else {
        None
    };
    Ok(GifBlock::Screen {
        header: block_header(SCREEN, offset, 0, reader.position() - offset),
        canvas: Size::new(u32::from(width), u32::from(height)),
        global_table,
        background_index,
        aspect,
    })
}

fn parse_extension<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    offset: u64,
) -> FrameSeqResult<GifBlock> {
    let label = reader.read_u8()?;
    let block = match label {
        0xf9 => {
            let block_size = reader.read_u8()?;
            if block_size < 4 {
                return Err(FrameSeqError::malformed(format!(
                    "graphic control block size {block_size} at offset {offset}"
                )));
            }
            let packed = reader.read_u8()?;
            let delay_cs = reader.read_u16()?;
            let index = reader.read_u8()?;
            reader.skip(u64::from(block_size - 4))?;
            skip_sub_blocks(reader)?;
            GifBlock::Control {
                header: block_header(CONTROL, offset, 2, reader.position() - offset - 2),
                control: GraphicControl {
                    disposal: (packed >> 2) & 0x07,
                    transparent: (packed & 0x01 != 0).then_some(index),
                    delay_cs,
                    user_input: packed & 0x02 != 0,
                },
            }
        }
        0xff => {
            let id_len = reader.read_u8()?;
            let id = reader.read_vec(usize::from(id_len))?;
            let identifier = String::from_utf8_lossy(&id).into_owned();
            let looping = identifier == "NETSCAPE2.0" || identifier == "ANIMEXTS1.0";
            let mut loop_count = None;
            loop {
                let size = reader.read_u8()?;
                if size == 0 {
                    break;
                }
                if looping && size == 3 && reader.peek_byte()? == 1 {
                    reader.skip(1)?;
                    loop_count = Some(reader.read_u16()?);
                } else {
                    reader.skip(u64::from(size))?;
                }
            }
            GifBlock::Application {
                header: block_header(APPLICATION, offset, 2, reader.position() - offset - 2),
                identifier,
                loop_count,
            }
        }
        _ => {
            skip_sub_blocks(reader)?;
            let tag = match label {
                0xfe => COMMENT,
                0x01 => PLAIN_TEXT,
                _ => EXTENSION,
            };
            GifBlock::Skipped {
                header: block_header(tag, offset, 2, reader.position() - offset - 2),
                label,
            }
        }
    };
    Ok(block)
}

fn parse_image<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    offset: u64,
) -> FrameSeqResult<GifBlock> {
    let x = reader.read_u16()?;
    let y = reader.read_u16()?;
    let width = reader.read_u16()?;
    let height = reader.read_u16()?;
    let flags = reader.read_u8()?;
    let local_table = if flags & 0x80 != 0 {
        Some(read_palette(reader, flags)?)
    } else {
        None
    };
    let min_code_size = reader.read_u8()?;
    if min_code_size > MAX_LZW_CODE_SIZE {
        return Err(FrameSeqError::malformed(format!(
            "LZW code size {min_code_size} at offset {offset}"
        )));
    }
    let data_offset = reader.position();
    skip_sub_blocks(reader)?;

    Ok(GifBlock::Image {
        header: block_header(IMAGE, offset, 1, reader.position() - offset - 1),
        descriptor: ImageDescriptor {
            x,
            y,
            width,
            height,
            interlaced: flags & 0x40 != 0,
            local_table,
            min_code_size,
            data_offset,
        },
    })
}

/// Pair control extensions with images. Without a looping block the GIF plays once.
pub fn build_info(blocks: &[GifBlock]) -> FrameSeqResult<AnimationInfo> {
    let Some(GifBlock::Screen {
        canvas,
        global_table,
        background_index,
        ..
    }) = blocks.first()
    else {
        return Err(FrameSeqError::malformed("missing logical screen descriptor"));
    };
    let canvas = *canvas;
    if canvas.is_empty() {
        return Err(FrameSeqError::malformed(format!(
            "empty GIF canvas {}x{}",
            canvas.width, canvas.height
        )));
    }
    let background = global_table
        .as_ref()
        .and_then(|t| t.get(usize::from(*background_index)))
        .map(|c| Rgba8::new(c[0], c[1], c[2], 0xff));

    let mut frames = Vec::new();
    let mut pending: Option<GraphicControl> = None;
    let mut loop_block: Option<u16> = None;
    for block in blocks {
        match block {
            GifBlock::Control { control, .. } => pending = Some(*control),
            GifBlock::Application {
                loop_count: Some(n),
                ..
            } => loop_block = Some(*n),
            GifBlock::Image { descriptor: d, .. } => {
                // A control extension only applies to the image right after it.
                let control = pending.take().unwrap_or_default();
                let index = frames.len();
                let Some(palette) = d.local_table.clone().or_else(|| global_table.clone())
                else {
                    return Err(FrameSeqError::malformed(format!(
                        "image {index} has no color table"
                    )));
                };
                if d.width == 0 || d.height == 0 {
                    return Err(FrameSeqError::malformed(format!(
                        "image {index} is empty"
                    )));
                }
                let frame = FrameDescriptor {
                    index,
                    x: i32::from(d.x),
                    y: i32::from(d.y),
                    width: u32::from(d.width),
                    height: u32::from(d.height),
                    duration_ms: control.duration_ms(),
                    disposal: control.disposal_mode(),
                    blend: Blend::Over,
                    payload: FramePayload::Gif {
                        data_offset: d.data_offset,
                        min_code_size: d.min_code_size,
                        palette,
                        transparent: control.transparent,
                        interlaced: d.interlaced,
                    },
                };
                if !frame.fits(canvas) {
                    return Err(FrameSeqError::malformed(format!(
                        "image {index}: rect ({},{}) {}x{} exceeds canvas {}x{}",
                        d.x, d.y, d.width, d.height, canvas.width, canvas.height
                    )));
                }
                frames.push(frame);
            }
            _ => {}
        }
    }
    if frames.is_empty() {
        return Err(FrameSeqError::malformed("GIF contains no images"));
    }

    Ok(AnimationInfo {
        format: Format::Gif,
        animated: frames.len() > 1 || loop_block.is_some(),
        loop_count: loop_block.map_or(1, u32::from),
        viewport: canvas,
        frames,
        background,
        has_alpha: true,
        context: FrameContext::None,
    })
}

/// Concatenate an image's data sub-blocks into `out`.
pub fn read_image_data<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    data_offset: u64,
    out: &mut Vec<u8>,
) -> FrameSeqResult<()> {
    out.clear();
    reader.seek_to(data_offset)?;
    loop {
        let size = reader.read_u8()?;
        if size == 0 {
            return Ok(());
        }
        reader.read_append(out, usize::from(size))?;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/container/gif.rs"]
mod tests;
