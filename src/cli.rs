use std::path::PathBuf;

use clap::Parser;

use crate::encoder::Transport;

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal media player with SIXEL, half-block and ANSI rendering", long_about = None)]
pub struct Cli {
    /// Path to the media file to play (image, GIF or video)
    #[arg(required = true)]
    pub file_path: PathBuf,

    /// Audio volume as a percentage (0-100)
    #[arg(long, default_value_t = 80)]
    pub volume: u8,

    /// Additive brightness adjustment (-1.0 to 1.0)
    #[arg(short, long, default_value_t = 0.0)]
    pub brightness: f64,

    /// Contrast multiplier around mid-gray (must be positive)
    #[arg(short, long, default_value_t = 1.0)]
    pub contrast: f64,

    /// Force a specific transport instead of auto-detection
    #[arg(short, long, value_enum)]
    pub transport: Option<TransportArg>,

    /// Override the frame rate used for pacing
    #[arg(long)]
    pub fps: Option<f64>,

    /// Disable audio playback even when the media has an audio track
    #[arg(long)]
    pub no_audio: bool,

    /// Show media and terminal information only (don't play)
    #[arg(long)]
    pub info_only: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Transport selection on the command line
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum TransportArg {
    /// SIXEL bitmap graphics
    Sixel,
    /// True-color half-block Unicode
    Halfblock,
    /// 256-color block characters
    Color,
    /// Grayscale ASCII ramp
    Gray,
}

impl From<TransportArg> for Transport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Sixel => Transport::Sixel,
            TransportArg::Halfblock => Transport::HalfBlock,
            TransportArg::Color => Transport::IndexedColor,
            TransportArg::Gray => Transport::Grayscale,
        }
    }
}

impl Cli {
    /// Validate command line arguments
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.file_path.exists() {
            return Err(format!(
                "Media file does not exist: {}",
                self.file_path.display()
            ));
        }

        if self.volume > 100 {
            return Err("Volume must be between 0 and 100".to_string());
        }

        if !(-1.0..=1.0).contains(&self.brightness) {
            return Err("Brightness must be between -1.0 and 1.0".to_string());
        }

        if self.contrast <= 0.0 {
            return Err("Contrast must be greater than 0".to_string());
        }

        if let Some(fps) = self.fps {
            if fps <= 0.0 {
                return Err("FPS must be greater than 0".to_string());
            }
        }

        Ok(())
    }

    /// Transport forced on the command line, if any
    pub fn forced_transport(&self) -> Option<Transport> {
        self.transport.map(Transport::from)
    }
}
