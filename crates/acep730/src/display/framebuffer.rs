//! Full-panel color frame
//!
//! One [`Color`] per pixel, row-major, borrowed from caller storage so the
//! 384 000-entry frame can live in a static on hardware and in a `Vec` on
//! the host.

use embedded_graphics::prelude::*;

use super::color::pack_pair;
use super::{Color, DriverError, DISPLAY_HEIGHT, DISPLAY_WIDTH, PIXEL_COUNT};

/// A borrowed, fixed-size 800×480 frame.
///
/// Implements [`DrawTarget`], so any `embedded-graphics` drawable renders
/// straight into it. Pixels outside the panel are ignored.
pub struct FrameBuffer<'a> {
    pixels: &'a mut [Color],
}

impl<'a> FrameBuffer<'a> {
    /// Wrap `pixels` as a frame.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidBuffer`] unless
    /// `pixels.len() == PIXEL_COUNT`.
    pub fn new(pixels: &'a mut [Color]) -> Result<Self, DriverError> {
        if pixels.len() != PIXEL_COUNT {
            return Err(DriverError::InvalidBuffer);
        }
        Ok(Self { pixels })
    }

    /// Set every pixel to `color`.
    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    /// Color at `(x, y)`, or `None` outside the panel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        Self::offset(x, y).and_then(|i| self.pixels.get(i).copied())
    }

    /// Set the pixel at `(x, y)`. Returns `false` if it lies outside the
    /// panel.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) -> bool {
        match Self::offset(x, y).and_then(|i| self.pixels.get_mut(i)) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[Color] {
        self.pixels
    }

    /// Packed controller bytes, two pixels per byte, in wire order.
    pub fn packed(&self) -> impl Iterator<Item = u8> + '_ {
        self.pixels
            .chunks_exact(2)
            .map(|pair| match pair {
                [left, right] => pack_pair(*left, *right),
                _ => 0,
            })
    }

    /// Split the frame into pixel runs that each pack into at most
    /// `packed_bytes` bytes.
    pub fn chunks(&self, packed_bytes: usize) -> core::slice::Chunks<'_, Color> {
        self.pixels.chunks(packed_bytes.saturating_mul(2).max(2))
    }

    fn offset(x: u32, y: u32) -> Option<usize> {
        if x >= DISPLAY_WIDTH || y >= DISPLAY_HEIGHT {
            return None;
        }
        // Bounded above by PIXEL_COUNT, which fits in usize.
        #[allow(clippy::arithmetic_side_effects)]
        Some((y * DISPLAY_WIDTH + x) as usize)
    }
}

impl DrawTarget for FrameBuffer<'_> {
    type Color = Color;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color);
        Ok(())
    }
}

impl OriginDimensions for FrameBuffer<'_> {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH, DISPLAY_HEIGHT)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use crate::display::color::pack_into;
    use crate::display::PACKED_FRAME_SIZE;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    fn storage() -> Vec<Color> {
        vec![Color::White; PIXEL_COUNT]
    }

    #[test]
    fn wrong_length_is_rejected() {
        let mut short = vec![Color::White; PIXEL_COUNT - 1];
        assert!(matches!(
            FrameBuffer::new(&mut short),
            Err(DriverError::InvalidBuffer)
        ));
        let mut long = vec![Color::White; PIXEL_COUNT + 2];
        assert!(FrameBuffer::new(&mut long).is_err());
    }

    #[test]
    fn all_white_frame_packs_to_white_index_bytes() {
        let mut pixels = storage();
        let frame = FrameBuffer::new(&mut pixels).unwrap();
        let packed: Vec<u8> = frame.packed().collect();
        assert_eq!(packed.len(), PACKED_FRAME_SIZE);
        assert!(packed.iter().all(|&b| b == 0x11));
    }

    #[test]
    fn set_pixel_lands_in_correct_nibble() {
        let mut pixels = storage();
        let mut frame = FrameBuffer::new(&mut pixels).unwrap();
        assert!(frame.set_pixel(0, 0, Color::Red));
        assert!(frame.set_pixel(3, 0, Color::Blue));
        assert!(frame.set_pixel(799, 479, Color::Green));
        let packed: Vec<u8> = frame.packed().collect();
        assert_eq!(packed[0], 0x31);
        assert_eq!(packed[1], 0x15);
        assert_eq!(packed[PACKED_FRAME_SIZE - 1], 0x16);
    }

    #[test]
    fn out_of_bounds_pixels_ignored() {
        let mut pixels = storage();
        let mut frame = FrameBuffer::new(&mut pixels).unwrap();
        assert!(!frame.set_pixel(800, 0, Color::Black));
        assert!(!frame.set_pixel(0, 480, Color::Black));
        frame
            .draw_iter([
                Pixel(Point::new(-1, 0), Color::Black),
                Pixel(Point::new(0, -1), Color::Black),
                Pixel(Point::new(10_000, 10_000), Color::Black),
            ])
            .unwrap();
        assert!(frame.pixels().iter().all(|&c| c == Color::White));
    }

    #[test]
    fn draw_target_renders_primitives() {
        let mut pixels = storage();
        let mut frame = FrameBuffer::new(&mut pixels).unwrap();
        Rectangle::new(Point::new(10, 20), Size::new(4, 2))
            .into_styled(PrimitiveStyle::with_fill(Color::Yellow))
            .draw(&mut frame)
            .unwrap();
        assert_eq!(frame.pixel(10, 20), Some(Color::Yellow));
        assert_eq!(frame.pixel(13, 21), Some(Color::Yellow));
        assert_eq!(frame.pixel(14, 21), Some(Color::White));
        assert_eq!(frame.pixel(10, 22), Some(Color::White));
        assert_eq!(frame.pixel(800, 0), None);
    }

    #[test]
    fn chunks_cover_frame_exactly_once() {
        let mut pixels = storage();
        let mut frame = FrameBuffer::new(&mut pixels).unwrap();
        frame.set_pixel(1, 0, Color::Black);
        let mut buf = [0u8; 1024];
        let mut sizes = Vec::new();
        let mut bytes = Vec::new();
        for run in frame.chunks(buf.len()) {
            let len = pack_into(run, &mut buf);
            sizes.push(len);
            bytes.extend_from_slice(&buf[..len]);
        }
        assert_eq!(sizes.len(), 188);
        assert!(sizes[..187].iter().all(|&n| n == 1024));
        assert_eq!(sizes[187], 512);
        assert_eq!(bytes, frame.packed().collect::<Vec<u8>>());
        assert_eq!(bytes[0], 0x10);
    }

    #[test]
    fn clear_fills_whole_frame() {
        let mut pixels = storage();
        let mut frame = FrameBuffer::new(&mut pixels).unwrap();
        frame.clear(Color::Blue).unwrap();
        assert!(frame.packed().all(|b| b == 0x55));
    }
}
