//! True-color half-block encoder.
//!
//! Each terminal cell shows the upper half-block glyph with its foreground
//! set to the top source pixel and its background to the bottom one, so a
//! cell carries two vertical pixels at full 24-bit color.

use crate::encoder::{adjust_channel, RenderOptions};
use crate::source::Frame;
use crate::Result;

/// Upper half block
pub const HALF_BLOCK: char = '▀';

pub struct HalfBlockEncoder;

impl HalfBlockEncoder {
    /// Encode a frame scaled to `(cell_width, 2 * cell_height)` pixels.
    /// An odd final row is backed with black.
    pub fn encode(&self, frame: &Frame, options: &RenderOptions) -> Result<Vec<u8>> {
        let width = frame.width as usize;
        let rows = (frame.height as usize + 1) / 2;

        let mut out = String::with_capacity(rows * width * 40);
        for row in 0..rows {
            for x in 0..width {
                let top = adjust(frame.pixel(x as u32, (row * 2) as u32), options);
                let bottom = if (row * 2 + 1) < frame.height as usize {
                    adjust(frame.pixel(x as u32, (row * 2 + 1) as u32), options)
                } else {
                    (0, 0, 0)
                };
                out.push_str(&format!("\x1b[38;2;{};{};{}m\x1b[48;2;{};{};{}m{}",
                    top.0, top.1, top.2, bottom.0, bottom.1, bottom.2, HALF_BLOCK
                ));
            }
            out.push_str("\x1b[0m\r\n");
        }
        Ok(out.into_bytes())
    }
}

fn adjust(px: (u8, u8, u8), options: &RenderOptions) -> (u8, u8, u8) {
    (
        adjust_channel(px.0, options.brightness, options.contrast),
        adjust_channel(px.1, options.brightness, options.contrast),
        adjust_channel(px.2, options.brightness, options.contrast),
    )
}
