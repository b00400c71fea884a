//! Panel pigments and 4-bit packing
//!
//! The controller takes one 4-bit color index per pixel, two pixels per
//! byte, left pixel in the high nibble. Indices 0x4 and 0x7 are reserved on
//! this panel.

use embedded_graphics::pixelcolor::PixelColor;

/// One of the six pigments the panel can show.
///
/// The discriminant is the controller's color index.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Color {
    /// Black, index 0x0
    Black = 0x0,
    /// White, index 0x1 (panel background)
    #[default]
    White = 0x1,
    /// Yellow, index 0x2
    Yellow = 0x2,
    /// Red, index 0x3
    Red = 0x3,
    /// Blue, index 0x5
    Blue = 0x5,
    /// Green, index 0x6
    Green = 0x6,
}

impl Color {
    /// All pigments in index order.
    pub const ALL: [Self; 6] = [
        Self::Black,
        Self::White,
        Self::Yellow,
        Self::Red,
        Self::Blue,
        Self::Green,
    ];

    /// Controller color index.
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Look up a pigment by controller index. Reserved or out-of-range
    /// indices return `None`.
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0x0 => Some(Self::Black),
            0x1 => Some(Self::White),
            0x2 => Some(Self::Yellow),
            0x3 => Some(Self::Red),
            0x5 => Some(Self::Blue),
            0x6 => Some(Self::Green),
            _ => None,
        }
    }
}

impl PixelColor for Color {
    type Raw = ();
}

impl From<Color> for u8 {
    fn from(color: Color) -> Self {
        color.index()
    }
}

/// Pack two horizontally adjacent pixels into one controller byte.
// Both operands are masked to a nibble, so the shift stays within u8.
#[allow(clippy::arithmetic_side_effects)]
pub const fn pack_pair(left: Color, right: Color) -> u8 {
    ((left.index() & 0x0F) << 4) | (right.index() & 0x0F)
}

/// Pack `pixels` into `out`, two per byte, and return the number of bytes
/// written.
///
/// Stops at whichever runs out first. A trailing odd pixel is ignored; full
/// panel rows are always even.
pub fn pack_into(pixels: &[Color], out: &mut [u8]) -> usize {
    out.iter_mut()
        .zip(pixels.chunks_exact(2))
        .map(|(byte, pair)| {
            if let [left, right] = pair {
                *byte = pack_pair(*left, *right);
            }
        })
        .count()
}
