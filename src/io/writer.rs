use crate::foundation::core::{ByteOrder, FourCC};

/// Growable scratch buffer used to synthesize standalone frame images.
///
/// Owned by one compositor and reused across ticks; [`ByteWriter::reset`] keeps capacity.
#[derive(Debug, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
    order: ByteOrder,
}

impl ByteWriter {
    /// Empty writer with the given integer order.
    pub fn new(order: ByteOrder) -> Self {
        Self {
            buf: Vec::new(),
            order,
        }
    }

    /// Drop contents, keep allocation.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Mutable access for in-place patching (e.g. length back-fill).
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Backing vector, for readers that append directly.
    pub(crate) fn vec_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    /// Number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// `true` when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Allocated capacity, for memory accounting.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Append one byte.
    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Append a 16-bit integer.
    pub fn put_u16(&mut self, v: u16) {
        match self.order {
            ByteOrder::BigEndian => self.buf.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::LittleEndian => self.buf.extend_from_slice(&v.to_le_bytes()),
        }
    }

    /// Append the low 24 bits of `v`.
    pub fn put_u24(&mut self, v: u32) {
        match self.order {
            ByteOrder::BigEndian => self.buf.extend_from_slice(&v.to_be_bytes()[1..]),
            ByteOrder::LittleEndian => self.buf.extend_from_slice(&v.to_le_bytes()[..3]),
        }
    }

    /// Append a 32-bit integer.
    pub fn put_u32(&mut self, v: u32) {
        match self.order {
            ByteOrder::BigEndian => self.buf.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::LittleEndian => self.buf.extend_from_slice(&v.to_le_bytes()),
        }
    }

    /// Append a dimension stored minus one in 24 bits (WebP "1-based" fields).
    pub fn put_u24_minus_one(&mut self, v: u32) {
        self.put_u24(v.saturating_sub(1));
    }

    /// Append a tag verbatim.
    pub fn put_fourcc(&mut self, tag: FourCC) {
        self.buf.extend_from_slice(&tag.0);
    }

    /// Append raw bytes.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Overwrite four bytes at `at` with `v`, in the writer's order.
    pub fn patch_u32(&mut self, at: usize, v: u32) {
        let bytes = match self.order {
            ByteOrder::BigEndian => v.to_be_bytes(),
            ByteOrder::LittleEndian => v.to_le_bytes(),
        };
        if let Some(dst) = self.buf.get_mut(at..at + 4) {
            dst.copy_from_slice(&bytes);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/io/writer.rs"]
mod tests;
