use crate::foundation::core::Size;
use crate::foundation::math::unpremultiply_rgba8_in_place;

/// Row-major premultiplied RGBA8 pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("capacity", &self.data.capacity())
            .finish()
    }
}

impl PixelBuffer {
    /// Transparent buffer of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; byte_len(width, height)],
        }
    }

    /// Wrap existing premultiplied pixels; `None` if the length does not match.
    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == byte_len(width, height)).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixel bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Allocated bytes, which may exceed the visible size after a reshape.
    pub fn capacity_bytes(&self) -> usize {
        self.data.capacity()
    }

    /// Reuse the allocation for new dimensions; contents become transparent.
    pub fn reshape(&mut self, width: u32, height: u32) {
        self.data.clear();
        self.data.resize(byte_len(width, height), 0);
        self.width = width;
        self.height = height;
    }

    /// Set every pixel to `px`.
    pub fn fill(&mut self, px: [u8; 4]) {
        for d in self.data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
    }

    /// Copy all pixels from a buffer of identical size.
    pub fn copy_from(&mut self, other: &PixelBuffer) -> bool {
        if self.size() != other.size() {
            return false;
        }
        self.data.copy_from_slice(&other.data);
        true
    }

    /// Pixel at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Straight-alpha RGBA8 copy, for encoders.
    pub fn to_straight_rgba(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        unpremultiply_rgba8_in_place(&mut out);
        out
    }

    /// Straight-alpha `image` buffer.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.to_straight_rgba())
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4)
}

#[cfg(test)]
#[path = "../../tests/unit/render/buffer.rs"]
mod tests;
