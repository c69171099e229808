//! Indexed-color block encoder and grayscale ramp fallback.
//!
//! Color mode maps each pixel onto the ANSI 256-color cube (indices
//! 16..231) or the 24-step grayscale ramp (232..255) and picks a shade
//! glyph by brightness. Grayscale mode reduces the pixel to luminance and
//! draws a plain ASCII ramp character, which works on any terminal.

use crate::encoder::{adjust_channel, luminance, RenderOptions};
use crate::source::Frame;
use crate::{Result, ASCII_RAMP};

pub struct IndexedEncoder {
    color: bool,
}

impl IndexedEncoder {
    pub fn color() -> Self {
        Self { color: true }
    }

    pub fn grayscale() -> Self {
        Self { color: false }
    }

    pub fn encode(&self, frame: &Frame, options: &RenderOptions) -> Result<Vec<u8>> {
        let width = frame.width as usize;
        let height = frame.height as usize;

        let mut out = String::with_capacity(width * height * if self.color { 16 } else { 1 });
        for y in 0..height {
            for x in 0..width {
                let (r, g, b) = frame.pixel(x as u32, y as u32);
                let r = adjust_channel(r, options.brightness, options.contrast);
                let g = adjust_channel(g, options.brightness, options.contrast);
                let b = adjust_channel(b, options.brightness, options.contrast);

                if self.color {
                    let index = cube_index(r, g, b);
                    let glyph = shade_glyph(luminance(r, g, b));
                    out.push_str(&format!("\x1b[38;5;{}m{}\x1b[0m", index, glyph));
                } else {
                    out.push(ramp_char(luminance(r, g, b)));
                }
            }
            out.push_str("\r\n");
        }
        Ok(out.into_bytes())
    }
}

/// Map an RGB triple onto the ANSI 256-color palette.
///
/// Pure grays use the dedicated 24-step ramp; everything else lands in
/// the 6x6x6 cube.
pub fn cube_index(r: u8, g: u8, b: u8) -> u8 {
    if r == g && g == b {
        if r < 8 {
            16
        } else if r > 248 {
            231
        } else {
            232 + (((r as u16 - 8) / 10).min(23)) as u8
        }
    } else {
        let level = |c: u8| ((c as u16 * 5 + 127) / 255).min(5) as u8;
        16 + 36 * level(r) + 6 * level(g) + level(b)
    }
}

/// Shade glyph by brightness, light shades for bright pixels
fn shade_glyph(brightness: u8) -> char {
    if brightness >= 192 {
        '░'
    } else if brightness >= 128 {
        '▒'
    } else if brightness >= 64 {
        '▓'
    } else {
        '█'
    }
}

/// Ramp character for a luminance value
pub fn ramp_char(luma: u8) -> char {
    let index = luma as usize * (ASCII_RAMP.len() - 1) / 255;
    ASCII_RAMP[index.min(ASCII_RAMP.len() - 1)]
}
