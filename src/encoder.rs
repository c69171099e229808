//! Encoder selection and shared pixel adjustments.
//!
//! The three pixel transports share one capability contract: turn an RGB
//! frame plus render options into a terminal escape byte sequence. They are
//! represented as a flat enum; the controller picks one at playback start
//! and never swaps mid-stream.

use std::fmt;

use crate::halfblock::HalfBlockEncoder;
use crate::indexed::IndexedEncoder;
use crate::sixel::SixelEncoder;
use crate::source::Frame;
use crate::{PlayerError, Result};

/// Pixel transport used to move frames onto the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// DCS-introduced bitmap escape protocol
    Sixel,
    /// True-color upper-half-block Unicode cells
    HalfBlock,
    /// 256-color-cube block characters
    IndexedColor,
    /// Plain ASCII ramp, works everywhere
    Grayscale,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Transport::Sixel => "sixel",
            Transport::HalfBlock => "half-block",
            Transport::IndexedColor => "256-color",
            Transport::Grayscale => "grayscale",
        };
        write!(f, "{}", name)
    }
}

/// Per-playback render configuration, revised on resize
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Target pixel width for the scaler
    pub pixel_width: u32,
    /// Target pixel height for the scaler
    pub pixel_height: u32,
    /// Target width in character cells
    pub cell_width: u16,
    /// Target height in character cells
    pub cell_height: u16,
    /// Chosen transport
    pub transport: Transport,
    /// Additive brightness, -1.0 to 1.0
    pub brightness: f64,
    /// Contrast multiplier around mid-gray
    pub contrast: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pixel_width: 0,
            pixel_height: 0,
            cell_width: 0,
            cell_height: 0,
            transport: Transport::Grayscale,
            brightness: 0.0,
            contrast: 1.0,
        }
    }
}

/// One of the three pixel encoders
pub enum Encoder {
    Sixel(SixelEncoder),
    HalfBlock(HalfBlockEncoder),
    Indexed(IndexedEncoder),
}

impl Encoder {
    /// Construct the encoder for a transport
    pub fn for_transport(transport: Transport) -> Encoder {
        match transport {
            Transport::Sixel => Encoder::Sixel(SixelEncoder::new()),
            Transport::HalfBlock => Encoder::HalfBlock(HalfBlockEncoder),
            Transport::IndexedColor => Encoder::Indexed(IndexedEncoder::color()),
            Transport::Grayscale => Encoder::Indexed(IndexedEncoder::grayscale()),
        }
    }

    /// Encode a frame into a terminal escape byte sequence
    pub fn encode(&self, frame: &Frame, options: &RenderOptions) -> Result<Vec<u8>> {
        if frame.width == 0 || frame.height == 0 {
            return Err(PlayerError::Render(format!(
                "refusing to encode {}x{} frame",
                frame.width, frame.height
            )));
        }
        match self {
            Encoder::Sixel(e) => e.encode(frame, options),
            Encoder::HalfBlock(e) => e.encode(frame, options),
            Encoder::Indexed(e) => e.encode(frame, options),
        }
    }
}

/// Apply contrast around mid-gray, then additive brightness, and clamp.
pub(crate) fn adjust_channel(value: u8, brightness: f64, contrast: f64) -> u8 {
    let adjusted = ((value as f64 / 255.0 - 0.5) * contrast + 0.5) * 255.0 + brightness * 255.0;
    adjusted.clamp(0.0, 255.0) as u8
}

/// ITU-R BT.709 luma
pub(crate) fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let luma = 0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64;
    luma.round().clamp(0.0, 255.0) as u8
}
