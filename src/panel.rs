//! TFT panel backend.
//!
//! Newer shields replace the LED matrix with a small 128x160 colour panel, so
//! a "pixel" becomes a filled square drawn through embedded-graphics. Colours
//! go through a 4-entry lookup table that can be remapped once at
//! construction (useful for colour-vision-deficient palettes); after that the
//! table is fixed for the life of the process.

use embedded_graphics::{
    draw_target::DrawTarget,
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::Rgb565,
    prelude::{Point, Primitive, RgbColor, Size},
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
    Drawable,
};

use crate::display::Render;

// Cell geometry: 16-pixel pitch, 12x12 dot with a 2-pixel inset, leaving a
// thin grid gap like the LED matrix has.
const CELL_PITCH: i32 = 16;
const CELL_INSET: i32 = 2;
const CELL_SIZE: u32 = 12;

// The overlay band sits below the 128-pixel grid area.
const OVERLAY_TOP: i32 = 150;
const OVERLAY_WIDTH: u32 = 128;
const OVERLAY_HEIGHT: u32 = 16;

/// Rectangle-fill renderer over any `Rgb565` draw target.
pub struct Panel<D> {
    target: D,
    palette: [Rgb565; 4],
}

impl<D> Panel<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    /// Standard palette: black, green, red, yellow.
    pub fn new(target: D) -> Self {
        Self {
            target,
            palette: [Rgb565::BLACK, Rgb565::GREEN, Rgb565::RED, Rgb565::YELLOW],
        }
    }

    /// Remapped palette, one 8-bit RGB triplet per colour index. Components
    /// are chopped down to the panel's 5-6-5 encoding.
    pub fn with_palette(target: D, map: &[[u8; 3]; 4]) -> Self {
        let mut palette = [Rgb565::BLACK; 4];
        for (slot, rgb) in palette.iter_mut().zip(map) {
            *slot = Rgb565::new(rgb[0] >> 3, rgb[1] >> 2, rgb[2] >> 3);
        }
        Self { target, palette }
    }

    /// The active colour lookup table.
    pub fn palette(&self) -> &[Rgb565; 4] {
        &self.palette
    }
}

impl<D> Render for Panel<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    fn row(&mut self, y: usize, pixels: u16) {
        for x in 0..8 {
            let index = ((pixels >> (x * 2)) & 0b11) as usize;
            let _ = Rectangle::new(
                Point::new(
                    CELL_PITCH * x as i32 + CELL_INSET,
                    CELL_PITCH * y as i32 + CELL_INSET,
                ),
                Size::new(CELL_SIZE, CELL_SIZE),
            )
            .into_styled(PrimitiveStyle::with_fill(self.palette[index]))
            .draw(&mut self.target);
        }
    }

    fn overlay_text(&mut self, text: &str) {
        let _ = Rectangle::new(
            Point::new(0, OVERLAY_TOP),
            Size::new(OVERLAY_WIDTH, OVERLAY_HEIGHT),
        )
        .into_styled(PrimitiveStyle::with_fill(Rgb565::BLACK))
        .draw(&mut self.target);

        if !text.is_empty() {
            let style = MonoTextStyle::new(&FONT_6X10, Rgb565::WHITE);
            let _ = Text::with_baseline(text, Point::new(4, OVERLAY_TOP), style, Baseline::Top)
                .draw(&mut self.target);
        }
    }
}
