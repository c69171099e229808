//! SIXEL bitmap encoder.
//!
//! Encodes an RGB frame into the DCS-introduced sixel protocol: a fixed
//! 256-entry palette built from an 8-8-4 RGB decomposition, followed by
//! one color band per palette index present in each six-row strip, with
//! run-length compression of repeated sixel characters.

use std::borrow::Cow;
use crate::encoder::RenderOptions;
use crate::source::Frame;
use crate::{scaler, PlayerError, Result};

/// Sixel sequence introducer: DCS with aspect 1:1, transparent background
pub const SIXEL_HEADER: &str = "\x1bP7;1;q";

/// Sixel sequence terminator (ST)
pub const SIXEL_FOOTER: &str = "\x1b\\";

/// Inputs larger than this are resized to the render target first
pub const MAX_INPUT_WIDTH: u32 = 1200;
pub const MAX_INPUT_HEIGHT: u32 = 800;

/// Runs of identical sixels at least this long are emitted as `!<n><c>`
const RLE_THRESHOLD: usize = 4;

/// Red and green quantize to 8 levels, blue to 4
const RED_LEVELS: u32 = 8;
const GREEN_LEVELS: u32 = 8;
const BLUE_LEVELS: u32 = 4;

pub struct SixelEncoder {
    /// Palette definition block, rendered once at construction
    palette: String,
}

impl SixelEncoder {
    pub fn new() -> Self {
        let mut palette = String::with_capacity(256 * 16);
        for index in 0..256u32 {
            let r = index / 32;
            let g = (index / 4) % 8;
            let b = index % 4;
            // Color definitions use integer percentages. Levels pass
            // through a squared-normalization (roughly gamma 2) before
            // truncation; the non-uniform low end is intentional and must
            // stay byte-stable across releases.
            palette.push_str(&format!("#{};2;{};{};{}",
                index,
                channel_percent(r, RED_LEVELS - 1),
                channel_percent(g, GREEN_LEVELS - 1),
                channel_percent(b, BLUE_LEVELS - 1)
            ));
        }
        Self { palette }
    }

    /// The pre-rendered palette definition block
    pub fn palette(&self) -> &str {
        &self.palette
    }

    pub fn encode(&self, frame: &Frame, options: &RenderOptions) -> Result<Vec<u8>> {
        let frame: Cow<'_, Frame> =
            if frame.width > MAX_INPUT_WIDTH || frame.height > MAX_INPUT_HEIGHT {
                Cow::Owned(
                    scaler::scale_frame(frame, options.pixel_width, options.pixel_height)
                        .map_err(|e| PlayerError::Render(e.to_string()))?,
                )
            } else {
                Cow::Borrowed(frame)
            };

        let width = frame.width as usize;
        let height = frame.height as usize;

        let mut indexed = quantize(&frame.data);
        // The protocol works in six-row strips; pad the tail strip with
        // palette index 0.
        let padded_height = (height + 5) / 6 * 6;
        indexed.resize(width * padded_height, 0);

        let mut out = String::with_capacity(self.palette.len() + width * padded_height / 2);
        out.push_str(SIXEL_HEADER);
        out.push_str(&self.palette);

        for strip_top in (0..padded_height).step_by(6) {
            let mut present = [false; 256];
            for y in strip_top..strip_top + 6 {
                for x in 0..width {
                    present[indexed[y * width + x] as usize] = true;
                }
            }

            for color in 0..256usize {
                if !present[color] {
                    continue;
                }
                out.push_str(&format!("#{}", color));

                let mut run_char = 0u8;
                let mut run_len = 0usize;
                for x in 0..width {
                    let mut bits = 0u8;
                    for k in 0..6 {
                        if indexed[(strip_top + k) * width + x] as usize == color {
                            bits |= 1 << k;
                        }
                    }
                    let ch = 63 + bits;
                    if ch == run_char {
                        run_len += 1;
                    } else {
                        push_run(&mut out, run_char, run_len);
                        run_char = ch;
                        run_len = 1;
                    }
                }
                push_run(&mut out, run_char, run_len);

                // Rewind to the strip start for the next color band
                out.push('$');
            }

            // Advance to the next six-row strip
            out.push('-');
        }

        out.push_str(SIXEL_FOOTER);
        Ok(out.into_bytes())
    }
}

impl Default for SixelEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentage for palette level `level` of `max`, truncated after the
/// squared-normalization.
fn channel_percent(level: u32, max: u32) -> u32 {
    let norm = level as f64 / max as f64;
    (norm * norm * 100.0) as u32
}

/// Map every RGB pixel onto the 8-8-4 palette.
///
/// The inverse of the palette's gamma: channels pass through a square
/// root before being scaled onto their level range and truncated.
pub fn quantize(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(3)
        .map(|px| quantize_pixel(px[0], px[1], px[2]))
        .collect()
}

/// Palette index for a single pixel
pub fn quantize_pixel(r: u8, g: u8, b: u8) -> u8 {
    let ri = ((r as f64 / 255.0).sqrt() * 7.99) as u32;
    let gi = ((g as f64 / 255.0).sqrt() * 7.99) as u32;
    let bi = ((b as f64 / 255.0).sqrt() * 3.99) as u32;
    (ri.min(7) * 32 + gi.min(7) * 4 + bi.min(3)) as u8
}

/// Emit a run of identical sixel characters, compressed when long enough
fn push_run(out: &mut String, ch: u8, len: usize) {
    if len == 0 {
        return;
    }
    if len >= RLE_THRESHOLD {
        out.push_str(&format!("!{}{}", len, ch as char));
    } else {
        for _ in 0..len {
            out.push(ch as char);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Transport;

    fn options() -> RenderOptions {
        RenderOptions {
            pixel_width: 60,
            pixel_height: 36,
            cell_width: 6,
            cell_height: 2,
            transport: Transport::Sixel,
            brightness: 0.0,
            contrast: 1.0,
        }
    }

    fn solid_frame(width: u32, height: u32, rgb: (u8, u8, u8)) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&[rgb.0, rgb.1, rgb.2]);
        }
        Frame::new(data, width, height, 0.0, 0.0).unwrap()
    }

    #[test]
    fn test_prologue_and_epilogue() {
        let encoder = SixelEncoder::new();
        let out = encoder.encode(&solid_frame(4, 6, (255, 0, 0)), &options()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(SIXEL_HEADER));
        assert!(text.ends_with(SIXEL_FOOTER));
        assert!(!text.as_bytes().contains(&0));
    }

    #[test]
    fn test_palette_has_256_entries_in_range() {
        let encoder = SixelEncoder::new();
        let entries: Vec<&str> = encoder
            .palette()
            .split('#')
            .filter(|s| !s.is_empty())
            .collect();
        assert_eq!(entries.len(), 256);
        for (i, entry) in entries.iter().enumerate() {
            let fields: Vec<&str> = entry.split(';').collect();
            assert_eq!(fields.len(), 5, "entry {} malformed: {}", i, entry);
            assert_eq!(fields[0].parse::<usize>().unwrap(), i);
            assert_eq!(fields[1], "2");
            for pct in &fields[2..] {
                assert!(pct.parse::<u32>().unwrap() <= 100);
            }
        }
    }

    #[test]
    fn test_body_color_references_in_range() {
        let encoder = SixelEncoder::new();
        let mut data = Vec::new();
        for i in 0..12 * 12 {
            let v = (i * 7 % 256) as u8;
            data.extend_from_slice(&[v, v.wrapping_add(40), v.wrapping_mul(3)]);
        }
        let frame = Frame::new(data, 12, 12, 0.0, 0.0).unwrap();
        let out = String::from_utf8(encoder.encode(&frame, &options()).unwrap()).unwrap();

        let body = &out[SIXEL_HEADER.len() + encoder.palette().len()..out.len() - SIXEL_FOOTER.len()];
        for part in body.split('#').skip(1) {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            let index: usize = digits.parse().unwrap();
            assert!(index < 256);
        }
    }

    #[test]
    fn test_quantize_corners() {
        // White lands on the top of every channel range
        assert_eq!(quantize_pixel(255, 255, 255), 255);
        assert_eq!(quantize_pixel(0, 0, 0), 0);
        // Mid-gray is deterministic
        assert_eq!(quantize_pixel(128, 128, 128), quantize_pixel(128, 128, 128));
    }

    #[test]
    fn test_quantize_monotonic_in_red() {
        let mut last = 0u8;
        for r in 0..=255u8 {
            let index = quantize_pixel(r, 77, 200);
            assert!(index >= last, "index regressed at r={}", r);
            last = index;
        }
    }

    #[test]
    fn test_height_padded_to_strip_multiple() {
        let encoder = SixelEncoder::new();
        // 4x7 input: two strips, second padded with palette index 0
        let out = String::from_utf8(
            encoder.encode(&solid_frame(4, 7, (0, 255, 0)), &options()).unwrap(),
        )
        .unwrap();
        assert_eq!(out.matches('-').count(), 2);
    }

    #[test]
    fn test_oversized_input_is_preresized() {
        let encoder = SixelEncoder::new();
        let frame = solid_frame(1201, 9, (10, 10, 10));
        let out = String::from_utf8(encoder.encode(&frame, &options()).unwrap()).unwrap();
        // 36 target rows after the pre-resize: six strips
        assert_eq!(out.matches('-').count(), 6);
    }

    fn decode_rle(body: &str) -> String {
        let mut out = String::new();
        let mut chars = body.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '!' {
                let mut digits = String::new();
                while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    digits.push(*d);
                    chars.next();
                }
                let count: usize = digits.parse().unwrap();
                let repeated = chars.next().unwrap();
                for _ in 0..count {
                    out.push(repeated);
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn test_rle_roundtrip() {
        for raw in [
            "??????",
            "@@@@@@@@@@AA",
            "@",
            "ABABAB",
            "~~~~~~~~~~~~~~~~~~~~~~~~",
            "AAAABBBBBBBCD",
        ] {
            let mut encoded = String::new();
            let mut run_char = '\0';
            let mut run_len = 0usize;
            for c in raw.chars() {
                if c == run_char {
                    run_len += 1;
                } else {
                    push_run(&mut encoded, run_char as u8, run_len);
                    run_char = c;
                    run_len = 1;
                }
            }
            push_run(&mut encoded, run_char as u8, run_len);
            assert_eq!(decode_rle(&encoded), raw, "roundtrip failed for {}", raw);
        }
    }

    #[test]
    fn test_long_runs_are_compressed() {
        let encoder = SixelEncoder::new();
        // A wide solid frame must compress each band into one RLE token
        let out = String::from_utf8(
            encoder.encode(&solid_frame(200, 6, (255, 255, 255)), &options()).unwrap(),
        )
        .unwrap();
        assert!(out.contains("!200"));
    }
}
