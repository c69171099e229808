//! TermTube - a cross-platform terminal media player
//!
//! This crate renders still images, animated GIFs and decoded video frames
//! onto a text terminal using the best pixel transport the terminal supports:
//! SIXEL bitmap graphics, true-color half-block Unicode, 256-color block
//! characters, or a plain grayscale ASCII ramp. Video and audio decoding are
//! delegated to external FFmpeg subprocesses.

pub mod audio;
pub mod capability;
pub mod cli;
pub mod encoder;
pub mod geometry;
pub mod halfblock;
pub mod indexed;
pub mod media;
pub mod player;
pub mod scaler;
pub mod sixel;
pub mod source;
pub mod terminal;

pub use capability::TerminalCapabilities;
pub use cli::Cli;
pub use encoder::{Encoder, RenderOptions, Transport};
pub use media::{MediaDescriptor, MediaKind};
pub use player::{PlaybackStats, Player, PlayerConfig};
pub use source::{Frame, FrameStream};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
pub const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");

/// Character ramp used by the grayscale fallback, darkest to brightest
pub const ASCII_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Error types used throughout the application
#[derive(thiserror::Error, Debug)]
pub enum PlayerError {
    #[error("Media probe failed: {0}")]
    Probe(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Utility functions
pub mod utils {
    /// Format duration in a human-readable way
    pub fn format_duration(seconds: f64) -> String {
        let total_seconds = seconds as u64;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let secs = total_seconds % 60;

        if hours > 0 {
            format!("{}:{:02}:{:02}", hours, minutes, secs)
        } else {
            format!("{}:{:02}", minutes, secs)
        }
    }

    /// Calculate aspect ratio from dimensions
    pub fn calculate_aspect_ratio(width: u32, height: u32) -> f64 {
        width as f64 / height as f64
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        audio::AudioPlayer,
        capability::TerminalCapabilities,
        encoder::{Encoder, RenderOptions, Transport},
        media::{MediaDescriptor, MediaKind},
        player::{PlaybackStats, Player, PlayerConfig},
        source::{Frame, FrameStream},
        utils::*,
        Cli, PlayerError, Result,
    };
}
