use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::foundation::core::{ByteOrder, FourCC};
use crate::foundation::error::{FrameSeqError, FrameSeqResult};

/// Cursor over a seekable stream with container-specific integer order.
///
/// Positions are absolute stream offsets. [`BinaryReader::reset`] returns to the logical
/// start, which is byte 0 unless [`BinaryReader::mark_start`] moved it.
pub struct BinaryReader<R> {
    inner: R,
    order: ByteOrder,
    start: u64,
    pos: u64,
    len: u64,
}

impl<R: Read + Seek> BinaryReader<R> {
    /// Wrap a stream; the current stream position becomes the logical start.
    pub fn new(mut inner: R, order: ByteOrder) -> FrameSeqResult<Self> {
        let start = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(start))?;
        Ok(Self {
            inner,
            order,
            start,
            pos: start,
            len,
        })
    }

    /// Byte order used by the multi-byte reads.
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Switch byte order, e.g. after format detection.
    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// Absolute stream offset of the next read.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Total stream length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// `true` for a zero-length stream.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes remaining after the cursor.
    pub fn available(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    /// Make the current position the target of future [`BinaryReader::reset`] calls.
    pub fn mark_start(&mut self) {
        self.start = self.pos;
    }

    /// Seek back to the logical start.
    pub fn reset(&mut self) -> FrameSeqResult<()> {
        self.seek_to(self.start)
    }

    /// Seek to an absolute offset within the stream.
    pub fn seek_to(&mut self, offset: u64) -> FrameSeqResult<()> {
        if offset > self.len {
            return Err(FrameSeqError::Truncated {
                offset,
                needed: 0,
                available: 0,
            });
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        self.pos = offset;
        Ok(())
    }

    /// Fail with [`FrameSeqError::Truncated`] unless `n` bytes remain.
    pub fn ensure(&self, n: u64) -> FrameSeqResult<()> {
        let available = self.available();
        if n > available {
            return Err(FrameSeqError::Truncated {
                offset: self.pos,
                needed: n,
                available,
            });
        }
        Ok(())
    }

    /// Advance the cursor by `n` bytes.
    pub fn skip(&mut self, n: u64) -> FrameSeqResult<()> {
        self.ensure(n)?;
        self.seek_to(self.pos + n)
    }

    fn fill(&mut self, buf: &mut [u8]) -> FrameSeqResult<()> {
        self.ensure(buf.len() as u64)?;
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.pos += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(FrameSeqError::Truncated {
                offset: self.pos,
                needed: buf.len() as u64,
                available: self.available(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> FrameSeqResult<u8> {
        let mut b = [0u8; 1];
        self.fill(&mut b)?;
        Ok(b[0])
    }

    /// Look at the next byte without consuming it.
    pub fn peek_byte(&mut self) -> FrameSeqResult<u8> {
        let at = self.pos;
        let b = self.read_u8()?;
        self.seek_to(at)?;
        Ok(b)
    }

    /// Read a 16-bit integer in the configured order.
    pub fn read_u16(&mut self) -> FrameSeqResult<u16> {
        let mut b = [0u8; 2];
        self.fill(&mut b)?;
        Ok(match self.order {
            ByteOrder::BigEndian => u16::from_be_bytes(b),
            ByteOrder::LittleEndian => u16::from_le_bytes(b),
        })
    }

    /// Read a 24-bit integer in the configured order.
    pub fn read_u24(&mut self) -> FrameSeqResult<u32> {
        let mut b = [0u8; 3];
        self.fill(&mut b)?;
        Ok(match self.order {
            ByteOrder::BigEndian => u32::from_be_bytes([0, b[0], b[1], b[2]]),
            ByteOrder::LittleEndian => u32::from_le_bytes([b[0], b[1], b[2], 0]),
        })
    }

    /// Read a 32-bit integer in the configured order.
    pub fn read_u32(&mut self) -> FrameSeqResult<u32> {
        let mut b = [0u8; 4];
        self.fill(&mut b)?;
        Ok(match self.order {
            ByteOrder::BigEndian => u32::from_be_bytes(b),
            ByteOrder::LittleEndian => u32::from_le_bytes(b),
        })
    }

    /// Read a four-character tag. Tags are byte strings, never reordered.
    pub fn read_fourcc(&mut self) -> FrameSeqResult<FourCC> {
        let mut b = [0u8; 4];
        self.fill(&mut b)?;
        Ok(FourCC(b))
    }

    /// Fill `buf[offset..offset + count]`; returns `count`.
    pub fn read(&mut self, buf: &mut [u8], offset: usize, count: usize) -> FrameSeqResult<usize> {
        let end = offset
            .checked_add(count)
            .filter(|&end| end <= buf.len())
            .ok_or_else(|| {
                FrameSeqError::Other(anyhow::anyhow!(
                    "read range {offset}+{count} exceeds buffer of {}",
                    buf.len()
                ))
            })?;
        self.fill(&mut buf[offset..end])?;
        Ok(count)
    }

    /// Read `count` bytes, appending them to `out`.
    pub fn read_append(&mut self, out: &mut Vec<u8>, count: usize) -> FrameSeqResult<()> {
        self.ensure(count as u64)?;
        let at = out.len();
        out.resize(at + count, 0);
        self.fill(&mut out[at..])
    }

    /// Read `count` bytes into a fresh vector.
    pub fn read_vec(&mut self, count: usize) -> FrameSeqResult<Vec<u8>> {
        let mut out = Vec::new();
        self.read_append(&mut out, count)?;
        Ok(out)
    }

    /// Give back the wrapped stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
#[path = "../../tests/unit/io/reader.rs"]
mod tests;
