//! Audio playback through an external ffplay subprocess.
//!
//! The player is a black box: it decodes and plays the same file the video
//! pipeline reads, on its own clock, and exits by itself at end of stream.
//! Starting it at the same wall-clock moment as the frame stream gives
//! drift-bounded A/V sync without closed-loop correction. The transport
//! cannot pause or seek, so no such methods exist here.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Instant;

use log::{debug, info};

use crate::{PlayerError, Result};

pub struct AudioPlayer {
    child: Option<Child>,
    volume: u8,
}

impl AudioPlayer {
    /// Volume is an integer percent in 0..=100
    pub fn new(volume: u8) -> Self {
        Self {
            child: None,
            volume: volume.min(100),
        }
    }

    /// Whether an audio backend is present on this system
    pub fn is_available() -> bool {
        which::which("ffplay").is_ok()
    }

    /// Start playback and return the wall-clock reference time
    pub fn play(&mut self, path: &Path) -> Result<Instant> {
        let ffplay = which::which("ffplay").map_err(|_| {
            PlayerError::Audio("ffplay not found. Install FFmpeg and ensure it is on PATH.".into())
        })?;

        let child = Command::new(ffplay)
            .arg("-nodisp")
            .arg("-autoexit")
            .arg("-loglevel")
            .arg("quiet")
            .arg("-volume")
            .arg(self.volume.to_string())
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlayerError::Audio(format!("failed to start ffplay: {}", e)))?;

        info!("Audio started at volume {}%", self.volume);
        self.child = Some(child);
        Ok(Instant::now())
    }

    /// Kill and reap the subprocess. Idempotent.
    pub fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            debug!("Audio stopped");
        }
    }

    /// Whether a playback subprocess is currently alive
    pub fn is_playing(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_clamped() {
        let player = AudioPlayer::new(250);
        assert_eq!(player.volume, 100);
    }

    #[test]
    fn test_stop_without_play_is_noop() {
        let mut player = AudioPlayer::new(50);
        player.stop();
        player.stop();
        assert!(!player.is_playing());
    }

    #[test]
    fn test_play_missing_backend_reports_remediation() {
        if AudioPlayer::is_available() {
            return;
        }
        let mut player = AudioPlayer::new(50);
        let err = player.play(Path::new("x.mp4")).unwrap_err();
        assert!(err.to_string().contains("ffplay"));
    }
}
