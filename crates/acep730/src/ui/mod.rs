//! Test Scenes
//!
//! Full-screen patterns for checking the panel's pigments on hardware.

// Panel dimensions are at most 800×480 and fit in i32; coordinate arithmetic
// on them cannot overflow.
#![allow(
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::arithmetic_side_effects
)]

use embedded_graphics::mono_font::{ascii::FONT_10X20, MonoTextStyle};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Text};

use crate::display::Color;

/// Six equal vertical bands, one per pigment.
pub struct SixStripes;

impl SixStripes {
    /// Band colors, left to right.
    pub const BANDS: [Color; 6] = [
        Color::Black,
        Color::Yellow,
        Color::Red,
        Color::Blue,
        Color::Green,
        Color::White,
    ];

    /// Render the stripes across the whole target.
    ///
    /// # Errors
    ///
    /// Returns `D::Error` if any drawing operation fails.
    pub fn render<D>(display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Color>,
    {
        let bounds = display.bounding_box();
        let width = bounds.size.width;
        let count = Self::BANDS.len() as u32;

        for (i, color) in (0u32..).zip(Self::BANDS) {
            // Column x belongs to band x*6/width.
            let left = (i * width).div_ceil(count);
            let right = ((i + 1) * width).div_ceil(count);
            Rectangle::new(
                bounds.top_left + Point::new(left as i32, 0),
                Size::new(right - left, bounds.size.height),
            )
            .into_styled(PrimitiveStyle::with_fill(color))
            .draw(display)?;
        }
        Ok(())
    }

    /// Band color at column `x` of a target `width` pixels wide.
    pub fn color_at(x: u32, width: u32) -> Color {
        let index = (x.saturating_mul(6) / width.max(1)) as usize;
        Self::BANDS
            .get(index)
            .copied()
            .unwrap_or(Color::White)
    }
}

/// Four centred lines of text on white, one per chromatic pigment.
pub struct ColorTextLines;

impl ColorTextLines {
    /// Text and color of each line, top to bottom.
    pub const LINES: [(&'static str, Color); 4] = [
        ("Red: the quick brown fox", Color::Red),
        ("Blue: jumps over", Color::Blue),
        ("Green: the lazy dog", Color::Green),
        ("Yellow: 800 x 480 ACeP", Color::Yellow),
    ];

    const LINE_PITCH: i32 = 40;

    /// Render the text block centred on the target.
    ///
    /// # Errors
    ///
    /// Returns `D::Error` if any drawing operation fails.
    pub fn render<D>(display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Color>,
    {
        display.clear(Color::White)?;

        let center = display.bounding_box().center();
        let block = Self::LINE_PITCH * (Self::LINES.len() as i32 - 1);
        let mut y = center.y - block / 2;

        for (text, color) in Self::LINES {
            let style = MonoTextStyle::new(&FONT_10X20, color);
            Text::with_alignment(text, Point::new(center.x, y), style, Alignment::Center)
                .draw(display)?;
            y += Self::LINE_PITCH;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::display::{FrameBuffer, DISPLAY_HEIGHT, DISPLAY_WIDTH, PIXEL_COUNT};

    fn frame_storage() -> Vec<Color> {
        vec![Color::White; PIXEL_COUNT]
    }

    #[test]
    fn stripes_follow_band_order() {
        let mut pixels = frame_storage();
        let mut frame = FrameBuffer::new(&mut pixels).unwrap();
        SixStripes::render(&mut frame).unwrap();

        let band = DISPLAY_WIDTH / 6;
        for (i, expected) in (0u32..).zip(SixStripes::BANDS) {
            let x = i * band + band / 2;
            assert_eq!(frame.pixel(x, 0), Some(expected), "band {i} top");
            assert_eq!(
                frame.pixel(x, DISPLAY_HEIGHT - 1),
                Some(expected),
                "band {i} bottom"
            );
        }
    }

    #[test]
    fn stripes_cover_every_column() {
        let mut pixels = vec![Color::Red; PIXEL_COUNT];
        let mut frame = FrameBuffer::new(&mut pixels).unwrap();
        SixStripes::render(&mut frame).unwrap();

        for x in 0..DISPLAY_WIDTH {
            assert_eq!(
                frame.pixel(x, 240),
                Some(SixStripes::color_at(x, DISPLAY_WIDTH)),
                "column {x}"
            );
        }
    }

    #[test]
    fn text_lines_use_each_chromatic_pigment() {
        let mut pixels = vec![Color::Black; PIXEL_COUNT];
        let mut frame = FrameBuffer::new(&mut pixels).unwrap();
        ColorTextLines::render(&mut frame).unwrap();

        let used = |c: Color| frame.pixels().iter().any(|&p| p == c);
        assert!(used(Color::White));
        assert!(used(Color::Red));
        assert!(used(Color::Blue));
        assert!(used(Color::Green));
        assert!(used(Color::Yellow));
        assert!(!used(Color::Black), "background must be fully cleared");
    }

    #[test]
    fn text_block_is_centred() {
        let mut pixels = frame_storage();
        let mut frame = FrameBuffer::new(&mut pixels).unwrap();
        ColorTextLines::render(&mut frame).unwrap();

        // Corners stay background.
        assert_eq!(frame.pixel(0, 0), Some(Color::White));
        assert_eq!(
            frame.pixel(DISPLAY_WIDTH - 1, DISPLAY_HEIGHT - 1),
            Some(Color::White)
        );
        // Nothing outside the four text rows.
        let blank_row = |y| (0..DISPLAY_WIDTH).all(|x| frame.pixel(x, y) == Some(Color::White));
        assert!((0..150).all(blank_row));
        assert!((320..DISPLAY_HEIGHT).all(blank_row));
    }
}
