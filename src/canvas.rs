//! Packed canvas layout.
//!
//! The whole grid lives in one byte string. Cell `(x, y)` is field number
//! `x + size * y`; each field is `depth` bits wide and fields are laid out
//! most-significant bit first, which is the order Redis `BITFIELD` uses for
//! `u4`/`u8` with `#N` offsets. The in-memory cache, the repair procedure and
//! clients decoding `/canvas` all go through the helpers here so they agree
//! with what Redis stores.

use serde::{Deserialize, Serialize};

use crate::error::{PlaceError, PlaceResult};
use crate::square::Square;

/// Bits per cell in the packed canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ColorDepth {
    /// Two cells per byte.
    Nibble,
    /// One cell per byte.
    #[default]
    Byte,
}

impl ColorDepth {
    pub fn bits(self) -> u32 {
        match self {
            ColorDepth::Nibble => 4,
            ColorDepth::Byte => 8,
        }
    }

    /// Redis `BITFIELD` type name for one field.
    pub fn bitfield_type(self) -> &'static str {
        match self {
            ColorDepth::Nibble => "u4",
            ColorDepth::Byte => "u8",
        }
    }
}

impl TryFrom<u8> for ColorDepth {
    type Error = PlaceError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            4 => Ok(ColorDepth::Nibble),
            8 => Ok(ColorDepth::Byte),
            other => Err(PlaceError::InvalidConfig(format!(
                "color depth must be 4 or 8 bits, got {other}"
            ))),
        }
    }
}

impl From<ColorDepth> for u8 {
    fn from(depth: ColorDepth) -> Self {
        depth.bits() as u8
    }
}

/// Geometry of a square canvas and its packed representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasLayout {
    size: u32,
    depth: ColorDepth,
}

impl CanvasLayout {
    pub fn new(size: u32, depth: ColorDepth) -> PlaceResult<Self> {
        if size == 0 {
            return Err(PlaceError::InvalidConfig(
                "canvas size must be positive".into(),
            ));
        }
        if u64::from(size) * u64::from(size) > u64::from(u32::MAX) {
            return Err(PlaceError::InvalidConfig(format!(
                "canvas size {size} is too large"
            )));
        }
        Ok(Self { size, depth })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn depth(&self) -> ColorDepth {
        self.depth
    }

    pub fn cells(&self) -> usize {
        self.size as usize * self.size as usize
    }

    /// Largest color code a field can hold, plus one.
    pub fn color_limit(&self) -> i64 {
        1i64 << self.depth.bits()
    }

    /// Length in bytes of the packed canvas: one byte per square.
    ///
    /// At 4 bits the fields fill the first `ceil(cells / 2)` bytes and the
    /// tail stays zero.
    pub fn byte_len(&self) -> usize {
        self.cells()
    }

    /// Cache key holding the packed canvas.
    pub fn cache_key(&self) -> String {
        format!("squares-{}", self.size)
    }

    pub fn field_index(&self, x: u32, y: u32) -> usize {
        x as usize + self.size as usize * y as usize
    }

    /// An empty canvas.
    pub fn blank(&self) -> Vec<u8> {
        vec![0; self.byte_len()]
    }

    /// Pad a short cache value with zeros or cut a long one to size.
    pub fn normalize(&self, mut bytes: Vec<u8>) -> Vec<u8> {
        bytes.resize(self.byte_len(), 0);
        bytes
    }

    /// Write `color` into field `index`. Out-of-range fields are ignored.
    pub fn set(&self, bytes: &mut [u8], index: usize, color: u8) {
        match self.depth {
            ColorDepth::Byte => {
                if let Some(byte) = bytes.get_mut(index) {
                    *byte = color;
                }
            }
            ColorDepth::Nibble => {
                let Some(byte) = bytes.get_mut(index / 2) else {
                    return;
                };
                let color = color & 0x0F;
                *byte = if index % 2 == 0 {
                    (*byte & 0x0F) | (color << 4)
                } else {
                    (*byte & 0xF0) | color
                };
            }
        }
    }

    /// Read field `index`; fields past the end read as zero.
    pub fn get(&self, bytes: &[u8], index: usize) -> u8 {
        match self.depth {
            ColorDepth::Byte => bytes.get(index).copied().unwrap_or(0),
            ColorDepth::Nibble => {
                let byte = bytes.get(index / 2).copied().unwrap_or(0);
                if index % 2 == 0 { byte >> 4 } else { byte & 0x0F }
            }
        }
    }

    /// Color at `(x, y)` in a packed canvas.
    pub fn color_at(&self, bytes: &[u8], x: u32, y: u32) -> u8 {
        self.get(bytes, self.field_index(x, y))
    }

    /// Build a canvas from scratch out of stored squares.
    pub fn pack<'a, I>(&self, squares: I) -> Vec<u8>
    where
        I: IntoIterator<Item = &'a Square>,
    {
        let mut bytes = self.blank();
        for square in squares {
            if square.x < self.size && square.y < self.size {
                self.set(&mut bytes, self.field_index(square.x, square.y), square.color);
            }
        }
        bytes
    }
}
