use std::fmt;

/// Four-character chunk tag, stored in stream byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Build a tag from its four ASCII bytes.
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }

    /// Raw tag bytes.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// PNG "ancillary" bit: lowercase first letter.
    pub fn is_ancillary(&self) -> bool {
        self.0[0] & 0x20 != 0
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({self})")
    }
}

impl serde::Serialize for FourCC {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Multi-byte integer order of a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    /// PNG / APNG.
    BigEndian,
    /// RIFF (WebP) and GIF.
    LittleEndian,
}

/// Container formats understood by the parsers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// PNG, animated when an `acTL` chunk is present.
    Png,
    /// RIFF WebP, animated when an `ANIM` chunk is present.
    WebP,
    /// GIF87a / GIF89a.
    Gif,
}

impl Format {
    /// Identify a container from its leading bytes (12 are enough for every format).
    pub fn sniff(head: &[u8]) -> Option<Self> {
        if head.starts_with(&PNG_SIGNATURE) {
            return Some(Self::Png);
        }
        if head.len() >= 12 && &head[0..4] == b"RIFF" && &head[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }
        if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }
        None
    }

    /// Byte order of the container's integer fields.
    pub fn byte_order(self) -> ByteOrder {
        match self {
            Self::Png => ByteOrder::BigEndian,
            Self::WebP | Self::Gif => ByteOrder::LittleEndian,
        }
    }

    /// Human readable name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }
}

/// The 8-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Pixel dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Construct a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` when either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel count.
    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Dimensions reduced by an integer sample factor (floor).
    pub fn sampled(self, sample: u32) -> Self {
        let s = sample.max(1);
        Self::new(self.width / s, self.height / s)
    }
}

/// Integer rectangle in canvas pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct IntRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl IntRect {
    /// Construct a rectangle.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Scale down by `sample`, truncating both edges, so the result covers every sampled
    /// pixel the full-size rectangle touches up to its truncated far edge.
    pub fn sampled(self, sample: u32) -> Self {
        let s = i64::from(sample.max(1));
        let x0 = i64::from(self.x) / s;
        let y0 = i64::from(self.y) / s;
        let x1 = (i64::from(self.x) + i64::from(self.width)) / s;
        let y1 = (i64::from(self.y) + i64::from(self.height)) / s;
        Self {
            x: x0 as i32,
            y: y0 as i32,
            width: (x1 - x0).max(0) as u32,
            height: (y1 - y0).max(0) as u32,
        }
    }

    /// Intersect with `[0, size)` and return `(x0, y0, x1, y1)` in unsigned pixel space.
    pub fn clip_to(self, size: Size) -> Option<(u32, u32, u32, u32)> {
        let x0 = i64::from(self.x).max(0);
        let y0 = i64::from(self.y).max(0);
        let x1 = (i64::from(self.x) + i64::from(self.width)).min(i64::from(size.width));
        let y1 = (i64::from(self.y) + i64::from(self.height)).min(i64::from(size.height));
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

/// Straight (non-premultiplied) RGBA8 color as stored by containers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Construct a color.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Convert to premultiplied RGBA8 bytes.
    pub fn premultiplied(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
