//! Playback coordination.
//!
//! Drives the frame source, scaler, encoder and terminal: chooses a
//! transport from detected capabilities, computes render geometry, paces
//! output through the source's bounded channel, re-checks the terminal
//! size once per second, and guarantees teardown on every exit path.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use log::{debug, error, info, warn};

use crate::audio::AudioPlayer;
use crate::capability::{self, TerminalCapabilities};
use crate::encoder::{Encoder, RenderOptions, Transport};
use crate::geometry::{self, CellGeometry};
use crate::media::{MediaDescriptor, MediaKind};
use crate::scaler;
use crate::source::{self, FrameStream};
use crate::terminal::TerminalControl;
use crate::PlayerError;

/// Stats and status line refresh period, in rendered frames
pub const STATS_INTERVAL_FRAMES: u64 = 30;

/// How often the terminal size is re-checked
pub const RESIZE_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Per-playback configuration
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Audio volume percent, 0..=100
    pub volume: u8,
    /// Additive brightness, -1.0 to 1.0
    pub brightness: f64,
    /// Contrast multiplier around mid-gray
    pub contrast: f64,
    /// Transport forced by the user, validated against capabilities
    pub forced_transport: Option<Transport>,
    /// Pacing frame rate override
    pub fps_override: Option<f64>,
    /// Whether to start the audio subprocess for media with audio
    pub enable_audio: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: 80,
            brightness: 0.0,
            contrast: 1.0,
            forced_transport: None,
            fps_override: None,
            enable_audio: true,
        }
    }
}

/// Counters updated while playing
#[derive(Debug, Clone)]
pub struct PlaybackStats {
    pub frames_rendered: u64,
    pub frames_dropped: u64,
    /// Observed frames per second
    pub fps: f64,
    /// dropped / (rendered + dropped)
    pub drop_rate: f64,
    /// Wall-clock reference recorded at playback start
    pub start: Instant,
}

impl PlaybackStats {
    pub fn new() -> Self {
        Self {
            frames_rendered: 0,
            frames_dropped: 0,
            fps: 0.0,
            drop_rate: 0.0,
            start: Instant::now(),
        }
    }

    /// Recompute the derived fields from the counters
    pub fn refresh(&mut self, dropped: u64) {
        self.frames_dropped = dropped;
        let elapsed = self.start.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.fps = self.frames_rendered as f64 / elapsed;
        }
        let total = self.frames_rendered + self.frames_dropped;
        self.drop_rate = if total > 0 {
            self.frames_dropped as f64 / total as f64
        } else {
            0.0
        };
    }
}

impl Default for PlaybackStats {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Player {
    path: PathBuf,
    descriptor: MediaDescriptor,
    config: PlayerConfig,
    cancel: Arc<AtomicBool>,
}

impl Player {
    pub fn new(
        path: PathBuf,
        descriptor: MediaDescriptor,
        config: PlayerConfig,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            path,
            descriptor,
            config,
            cancel,
        }
    }

    /// Play the media to completion, cancellation or quit key.
    ///
    /// The terminal is restored on every exit path, including errors.
    pub async fn run(&mut self) -> Result<PlaybackStats> {
        let mut caps = capability::detect();
        let transport = match self.config.forced_transport {
            Some(t) => {
                if !caps.supports(t) {
                    return Err(PlayerError::InvalidConfig(format!(
                        "this terminal does not support the {} transport",
                        t
                    ))
                    .into());
                }
                t
            }
            None => caps.preferred_transport(),
        };
        info!(
            "Playing {} via {} on a {}x{} terminal",
            self.path.display(),
            transport,
            caps.width,
            caps.height
        );

        let mut options = self.compute_options(transport, &caps, 1.0);
        debug!(
            "Render target: {}x{} px in {}x{} cells",
            options.pixel_width, options.pixel_height, options.cell_width, options.cell_height
        );

        let mut stream = self.open_stream(&options)?;

        let mut audio = None;
        if self.descriptor.has_audio && self.config.enable_audio {
            let mut player = AudioPlayer::new(self.config.volume);
            match player.play(&self.path) {
                Ok(reference) => {
                    debug!("Audio reference clock at {:?}", reference);
                    audio = Some(player);
                }
                Err(e) => warn!("Continuing without audio: {}", e),
            }
        }

        let mut terminal = TerminalControl::new();
        terminal.enter_raw()?;
        terminal.enter_alternate_screen()?;
        if let Some(name) = self.path.file_name().and_then(|n| n.to_str()) {
            terminal.set_title(name)?;
        }
        terminal.hide_cursor()?;
        terminal.clear_screen()?;

        let mut stats = PlaybackStats::new();
        let outcome = self
            .play_loop(&mut stream, &mut terminal, &mut caps, &mut options, &mut stats)
            .await;

        // Teardown runs on every path, error or not
        stream.cancel();
        if let Some(player) = audio.as_mut() {
            player.stop();
        }
        terminal.reset();

        outcome?;
        stats.refresh(stream.dropped_frames());
        info!(
            "Playback finished: {} rendered, {} dropped ({:.1}%), {:.1} FPS average",
            stats.frames_rendered,
            stats.frames_dropped,
            stats.drop_rate * 100.0,
            stats.fps
        );
        Ok(stats)
    }

    async fn play_loop(
        &self,
        stream: &mut FrameStream,
        terminal: &mut TerminalControl,
        caps: &mut TerminalCapabilities,
        options: &mut RenderOptions,
        stats: &mut PlaybackStats,
    ) -> Result<()> {
        let encoder = Encoder::for_transport(options.transport);
        let mut last_resize_check = Instant::now();

        while let Some(frame) = stream.next().await {
            if self.cancel.load(Ordering::SeqCst) || quit_requested()? {
                break;
            }

            if last_resize_check.elapsed() >= RESIZE_CHECK_INTERVAL {
                let (width, height) = capability::current_size();
                if (width, height) != (caps.width, caps.height) {
                    caps.width = width;
                    caps.height = height;
                    let factor = geometry::performance_scale(self.descriptor.fps);
                    *options = self.compute_options(options.transport, caps, factor);
                    terminal.clear_screen()?;
                    info!(
                        "Terminal resized to {}x{}, rendering at {}x{} px",
                        width, height, options.pixel_width, options.pixel_height
                    );
                }
                last_resize_check = Instant::now();
            }

            // The video decoder keeps its startup dimensions; after a
            // resize (and for stills and sequences generally) frames are
            // brought to the current target here.
            let frame = if frame.width != options.pixel_width
                || frame.height != options.pixel_height
            {
                scaler::scale_frame(&frame, options.pixel_width, options.pixel_height)?
            } else {
                frame
            };

            terminal.cursor_home()?;
            let encoded = match encoder.encode(&frame, options) {
                Ok(bytes) => bytes,
                Err(e) => {
                    // A render failure ends playback but is not fatal to
                    // the process; teardown still restores the terminal.
                    error!("Render failed: {}", e);
                    break;
                }
            };
            terminal.write_bytes(&encoded)?;
            stats.frames_rendered += 1;

            if stats.frames_rendered % STATS_INTERVAL_FRAMES == 0 {
                stats.refresh(stream.dropped_frames());
                // SIXEL leaves the cursor in an unreliable spot, so the
                // status line is suppressed there
                if options.transport != Transport::Sixel {
                    let status = format!(
                        "FPS: {:.1} | Frames: {} | Dropped: {} ({:.1}%) | Size: {}x{}",
                        stats.fps,
                        stats.frames_rendered,
                        stats.frames_dropped,
                        stats.drop_rate * 100.0,
                        options.cell_width,
                        options.cell_height
                    );
                    terminal.save_position()?;
                    terminal.move_cursor(caps.height, 1)?;
                    terminal.write_bytes(status.as_bytes())?;
                    terminal.restore_position()?;
                }
            }

            if self.descriptor.kind == MediaKind::Still {
                self.hold().await?;
                break;
            }
        }
        Ok(())
    }

    /// Keep a still on screen until cancellation or a quit key
    async fn hold(&self) -> Result<()> {
        loop {
            if self.cancel.load(Ordering::SeqCst) || quit_requested()? {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    fn open_stream(&self, options: &RenderOptions) -> Result<FrameStream> {
        match self.descriptor.kind {
            MediaKind::Still => Ok(FrameStream::still(source::load_still(&self.path)?)),
            MediaKind::Sequence => {
                let frames = source::load_sequence(&self.path)?;
                Ok(FrameStream::sequence(frames))
            }
            MediaKind::Video => {
                let fps = self.config.fps_override.unwrap_or(self.descriptor.fps);
                FrameStream::video(&self.path, options.pixel_width, options.pixel_height, fps)
                    .context("failed to start the video decoder")
            }
        }
    }

    /// Render geometry for a transport at the current terminal size
    fn compute_options(
        &self,
        transport: Transport,
        caps: &TerminalCapabilities,
        factor: f64,
    ) -> RenderOptions {
        let (pixel, cells) = match transport {
            Transport::Sixel => {
                let pixel = geometry::sixel_pixel_target(caps.width, caps.height);
                let cells = CellGeometry {
                    cols: caps.width,
                    rows: caps.height,
                };
                (pixel, cells)
            }
            Transport::HalfBlock => {
                let cells = geometry::scaled_geometry(
                    geometry::cell_geometry(
                        self.descriptor.width,
                        self.descriptor.height,
                        caps.width,
                        caps.height,
                    ),
                    factor,
                );
                (geometry::halfblock_pixel_target(cells), cells)
            }
            Transport::IndexedColor | Transport::Grayscale => {
                let cells = geometry::scaled_geometry(
                    geometry::cell_geometry(
                        self.descriptor.width,
                        self.descriptor.height,
                        caps.width,
                        caps.height,
                    ),
                    factor,
                );
                ((cells.cols as u32, cells.rows as u32), cells)
            }
        };

        RenderOptions {
            pixel_width: pixel.0,
            pixel_height: pixel.1,
            cell_width: cells.cols,
            cell_height: cells.rows,
            transport,
            brightness: self.config.brightness,
            contrast: self.config.contrast,
        }
    }
}

/// Drain pending key events and report whether a quit key arrived
fn quit_requested() -> Result<bool> {
    while event::poll(Duration::from_millis(1))? {
        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(true)
                }
                _ => {}
            }
        }
    }
    Ok(false)
}
