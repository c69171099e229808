//! Media identification and metadata discovery.
//!
//! Stills and GIFs are inspected in-process with the `image` and `gif`
//! crates; video metadata comes from an `ffprobe` subprocess emitting JSON.
//! ffprobe reports most numeric fields as strings and omits fields freely,
//! so everything is parsed defensively.

use std::fs::File;
use std::path::Path;
use std::process::Command;

use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::{PlayerError, Result};

/// Frame rate assumed when the probe reports none
pub const DEFAULT_FPS: f64 = 30.0;

/// Still image extensions handled by the `image` crate
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// Video extensions handed to the decoder subprocess
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "flv"];

/// Kind of media behind a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// A single still image
    Still,
    /// A delay-tagged image sequence (animated GIF)
    Sequence,
    /// A video file decoded by the external subprocess
    Video,
}

/// Immutable metadata about a media source
#[derive(Debug, Clone)]
pub struct MediaDescriptor {
    pub kind: MediaKind,
    /// Source width in pixels
    pub width: u32,
    /// Source height in pixels
    pub height: u32,
    /// Nominal frames per second, zero for stills
    pub fps: f64,
    /// Total duration in seconds, zero for stills
    pub duration: f64,
    /// Whether an audio track accompanies the source
    pub has_audio: bool,
    /// Total frame count, zero if unknown
    pub frame_count: u64,
    /// Video codec name reported by the probe, if any
    pub video_codec: Option<String>,
    /// Audio codec name reported by the probe, if any
    pub audio_codec: Option<String>,
}

/// Classify a path by its extension
pub fn detect_kind(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if ext == "gif" {
        Some(MediaKind::Sequence)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Still)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Build a descriptor for any supported path
pub fn describe(path: &Path) -> Result<MediaDescriptor> {
    match detect_kind(path) {
        Some(MediaKind::Still) => describe_still(path),
        Some(MediaKind::Sequence) => describe_sequence(path),
        Some(MediaKind::Video) => probe_video(path),
        None => Err(PlayerError::UnsupportedFormat(format!(
            "{} (supported: {}, gif, {})",
            path.display(),
            IMAGE_EXTENSIONS.join(", "),
            VIDEO_EXTENSIONS.join(", ")
        ))),
    }
}

fn describe_still(path: &Path) -> Result<MediaDescriptor> {
    let (width, height) = image::image_dimensions(path)
        .map_err(|e| PlayerError::Probe(format!("{}: {}", path.display(), e)))?;
    Ok(MediaDescriptor {
        kind: MediaKind::Still,
        width,
        height,
        fps: 0.0,
        duration: 0.0,
        has_audio: false,
        frame_count: 1,
        video_codec: None,
        audio_codec: None,
    })
}

fn describe_sequence(path: &Path) -> Result<MediaDescriptor> {
    let file = File::open(path)?;
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut reader = options
        .read_info(file)
        .map_err(|e| PlayerError::Probe(format!("{}: {}", path.display(), e)))?;

    let width = reader.width() as u32;
    let height = reader.height() as u32;

    let mut frame_count = 0u64;
    let mut total_delay = 0.0;
    while let Some(frame) = reader
        .read_next_frame()
        .map_err(|e| PlayerError::Decoder(e.to_string()))?
    {
        frame_count += 1;
        total_delay += if frame.delay == 0 {
            crate::source::DEFAULT_SEQUENCE_DELAY
        } else {
            frame.delay as f64 / 100.0
        };
    }

    let fps = if total_delay > 0.0 {
        frame_count as f64 / total_delay
    } else {
        0.0
    };

    Ok(MediaDescriptor {
        kind: MediaKind::Sequence,
        width,
        height,
        fps,
        duration: total_delay,
        has_audio: false,
        frame_count,
        video_codec: None,
        audio_codec: None,
    })
}

#[derive(Debug, Deserialize)]
struct ProbeDocument {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<Value>,
    height: Option<Value>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Probe a video file with ffprobe
pub fn probe_video(path: &Path) -> Result<MediaDescriptor> {
    let ffprobe = which::which("ffprobe").map_err(|_| {
        PlayerError::Probe("ffprobe not found. Install FFmpeg and ensure it is on PATH.".into())
    })?;

    let output = Command::new(ffprobe)
        .arg("-v")
        .arg("quiet")
        .arg("-print_format")
        .arg("json")
        .arg("-show_streams")
        .arg("-show_format")
        .arg(path)
        .output()?;

    if !output.status.success() {
        return Err(PlayerError::Probe(format!(
            "ffprobe failed on {}",
            path.display()
        )));
    }

    let document: ProbeDocument = serde_json::from_slice(&output.stdout)
        .map_err(|e| PlayerError::Probe(format!("unparseable ffprobe output: {}", e)))?;

    descriptor_from_probe(document, path)
}

fn descriptor_from_probe(document: ProbeDocument, path: &Path) -> Result<MediaDescriptor> {
    let video = document
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| PlayerError::Probe(format!("no video stream in {}", path.display())))?;

    let width = dimension(&video.width);
    let height = dimension(&video.height);
    if width == 0 || height == 0 {
        return Err(PlayerError::Probe(format!(
            "video stream in {} has no dimensions",
            path.display()
        )));
    }

    let mut fps = parse_rate(video.r_frame_rate.as_deref().unwrap_or(""));
    if fps <= 0.0 {
        fps = parse_rate(video.avg_frame_rate.as_deref().unwrap_or(""));
    }
    if fps <= 0.0 {
        warn!("Probe reported no frame rate, assuming {} FPS", DEFAULT_FPS);
        fps = DEFAULT_FPS;
    }

    let duration = video
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            document
                .format
                .as_ref()
                .and_then(|f| f.duration.as_deref())
                .and_then(|d| d.parse::<f64>().ok())
        })
        .unwrap_or(0.0);

    let frame_count = video
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or_else(|| (duration * fps) as u64);

    let audio = document
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    debug!(
        "Probed {}: {}x{} {:.2} FPS {:.1}s audio={}",
        path.display(),
        width,
        height,
        fps,
        duration,
        audio.is_some()
    );

    Ok(MediaDescriptor {
        kind: MediaKind::Video,
        width,
        height,
        fps,
        duration,
        has_audio: audio.is_some(),
        frame_count,
        video_codec: video.codec_name.clone(),
        audio_codec: audio.and_then(|s| s.codec_name.clone()),
    })
}

/// ffprobe emits dimensions as JSON numbers but other tools stringify them
fn dimension(value: &Option<Value>) -> u32 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as u32,
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Parse a rate of the form `num/den` or a plain decimal
pub fn parse_rate(rate: &str) -> f64 {
    let rate = rate.trim();
    if let Some((num, den)) = rate.split_once('/') {
        let num: f64 = num.trim().parse().unwrap_or(0.0);
        let den: f64 = den.trim().parse().unwrap_or(0.0);
        if den > 0.0 {
            num / den
        } else {
            0.0
        }
    } else {
        rate.parse().unwrap_or(0.0)
    }
}
