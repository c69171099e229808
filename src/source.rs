//! Frame sources.
//!
//! A [`FrameStream`] is a lazy, cancelable sequence of RGB frames with one
//! consumer. Three variants share the type: a single still image, a looping
//! delay-tagged image sequence, and a video decoded by an external ffmpeg
//! subprocess writing raw RGB24 to a pipe. Producers run on dedicated
//! threads and deliver through a bounded channel; the video producer paces
//! frames against a wall clock and drops when the consumer lags.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};

/// Frames buffered ahead of the consumer for video
pub const VIDEO_BUFFER_FRAMES: usize = 5;

/// Frames buffered for image sequences
pub const SEQUENCE_BUFFER_FRAMES: usize = 1;

/// Delay assumed for sequence frames that carry none
pub const DEFAULT_SEQUENCE_DELAY: f64 = 0.1;

/// An immutable RGB24 raster with presentation timing
#[derive(Debug, Clone)]
pub struct Frame {
    /// Row-major packed RGB, three bytes per pixel
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Presentation time in seconds since stream start
    pub timestamp: f64,
    /// Nominal display duration in seconds
    pub duration: f64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp: f64, duration: f64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("frame dimensions must be positive"));
        }
        if data.len() != (width * height * 3) as usize {
            return Err(anyhow!(
                "pixel buffer is {} bytes, expected {} for {}x{}",
                data.len(),
                width * height * 3,
                width,
                height
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp,
            duration,
        })
    }

    /// RGB triple at a pixel position
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let offset = ((y * self.width + x) * 3) as usize;
        (self.data[offset], self.data[offset + 1], self.data[offset + 2])
    }
}

/// One frame of an image sequence together with its display delay
#[derive(Debug, Clone)]
pub struct SequenceFrame {
    pub frame: Frame,
    /// Seconds to hold this frame
    pub delay: f64,
}

/// Consumer handle over a running frame producer
pub struct FrameStream {
    rx: Receiver<Frame>,
    cancel: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    decoder: Option<Arc<Mutex<Child>>>,
}

impl FrameStream {
    /// Next frame, or `None` at end of stream.
    ///
    /// After [`cancel`](Self::cancel) this returns `None` promptly,
    /// draining anything still buffered.
    pub async fn next(&mut self) -> Option<Frame> {
        if self.cancel.load(Ordering::SeqCst) {
            self.rx.close();
            while self.rx.try_recv().is_ok() {}
            return None;
        }
        self.rx.recv().await
    }

    /// Stop the producer and tear down the decoder subprocess. Idempotent.
    pub fn cancel(&mut self) {
        if self.cancel.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Frame stream cancelled");
        if let Some(decoder) = &self.decoder {
            if let Ok(mut child) = decoder.lock() {
                // Killing the child closes its stdout and unblocks the
                // producer's pipe read; the producer reaps it.
                let _ = child.kill();
            }
        }
        self.rx.close();
    }

    /// Frames the producer discarded because the consumer lagged
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }

    /// A single still image: one frame, then end of stream
    pub fn still(frame: Frame) -> FrameStream {
        let (tx, rx) = mpsc::channel(1);
        // The channel holds the one frame; dropping the sender ends the
        // stream after it.
        let _ = tx.try_send(frame);
        FrameStream {
            rx,
            cancel: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
            decoder: None,
        }
    }

    /// A looping image sequence honoring per-frame delays
    pub fn sequence(frames: Vec<SequenceFrame>) -> FrameStream {
        let (tx, rx) = mpsc::channel(SEQUENCE_BUFFER_FRAMES);
        let cancel = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicU64::new(0));

        let producer_cancel = Arc::clone(&cancel);
        thread::spawn(move || {
            sequence_producer(frames, tx, producer_cancel);
        });

        FrameStream {
            rx,
            cancel,
            dropped,
            decoder: None,
        }
    }

    /// Video decoded by an ffmpeg subprocess scaling to the given pixel
    /// dimensions. `fps` drives the producer's pacing clock.
    pub fn video(path: &Path, pixel_width: u32, pixel_height: u32, fps: f64) -> Result<FrameStream> {
        let ffmpeg = which::which("ffmpeg")
            .map_err(|_| anyhow!("ffmpeg not found. Install FFmpeg and ensure it is on PATH."))?;

        let scale = format!("scale={}:{}:flags=lanczos", pixel_width, pixel_height);
        let mut child = Command::new(ffmpeg)
            .arg("-v")
            .arg("quiet")
            .arg("-nostdin")
            .arg("-i")
            .arg(path)
            .arg("-an")
            .arg("-vf")
            .arg(&scale)
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("pipe:1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to spawn ffmpeg decoder")?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("decoder stdout not captured"))?;

        info!(
            "Decoder started: {} at {}x{} ({:.2} FPS)",
            path.display(),
            pixel_width,
            pixel_height,
            fps
        );

        let (tx, rx) = mpsc::channel(VIDEO_BUFFER_FRAMES);
        let cancel = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicU64::new(0));
        let decoder = Arc::new(Mutex::new(child));

        let producer_cancel = Arc::clone(&cancel);
        let producer_dropped = Arc::clone(&dropped);
        let producer_decoder = Arc::clone(&decoder);
        thread::spawn(move || {
            video_producer(
                stdout,
                pixel_width,
                pixel_height,
                fps,
                tx,
                producer_cancel,
                producer_dropped,
            );
            // Reap the child whether we hit end of stream, an error or a
            // cancellation kill.
            if let Ok(mut child) = producer_decoder.lock() {
                let _ = child.kill();
                let _ = child.wait();
            }
        });

        Ok(FrameStream {
            rx,
            cancel,
            dropped,
            decoder: Some(decoder),
        })
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn sequence_producer(frames: Vec<SequenceFrame>, tx: Sender<Frame>, cancel: Arc<AtomicBool>) {
    if frames.is_empty() {
        return;
    }
    loop {
        for entry in &frames {
            if cancel.load(Ordering::SeqCst) {
                return;
            }
            // Capacity-one channel: this blocks until the consumer takes
            // the previous frame. Sequence frames are never dropped; a
            // late frame is simply shown late.
            if tx.blocking_send(entry.frame.clone()).is_err() {
                return;
            }
            sleep_cancelable(entry.delay, &cancel);
            if cancel.load(Ordering::SeqCst) {
                return;
            }
        }
    }
}

fn video_producer(
    stdout: std::process::ChildStdout,
    width: u32,
    height: u32,
    fps: f64,
    tx: Sender<Frame>,
    cancel: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
) {
    let frame_bytes = (width * height * 3) as usize;
    let interval = 1.0 / fps.max(1.0);
    let start = Instant::now();
    let mut reader = BufReader::new(stdout);
    let mut index: u64 = 0;

    loop {
        if cancel.load(Ordering::SeqCst) {
            return;
        }

        let mut buf = vec![0u8; frame_bytes];
        if let Err(e) = reader.read_exact(&mut buf) {
            // A short read is the decoder's end-of-stream signal
            debug!("Decoder pipe closed after {} frames: {}", index, e);
            return;
        }

        // Frame k is due at start + k / fps; wait out any early arrival
        let due = start + Duration::from_secs_f64(index as f64 * interval);
        let now = Instant::now();
        if now < due {
            thread::sleep(due - now);
        }

        if cancel.load(Ordering::SeqCst) {
            return;
        }

        let frame = Frame {
            data: buf,
            width,
            height,
            timestamp: index as f64 * interval,
            duration: interval,
        };

        match tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                // Consumer is behind: skip this frame, keep the timeline
                dropped.fetch_add(1, Ordering::SeqCst);
            }
            Err(TrySendError::Closed(_)) => return,
        }
        index += 1;
    }
}

/// Sleep in short slices so cancellation stays prompt
fn sleep_cancelable(seconds: f64, cancel: &AtomicBool) {
    let deadline = Instant::now() + Duration::from_secs_f64(seconds.max(0.0));
    while Instant::now() < deadline {
        if cancel.load(Ordering::SeqCst) {
            return;
        }
        let remaining = deadline - Instant::now();
        thread::sleep(remaining.min(Duration::from_millis(50)));
    }
}

/// Decode a still image into a single frame
pub fn load_still(path: &Path) -> Result<Frame> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode image {}", path.display()))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    Frame::new(image.into_raw(), width, height, 0.0, 0.0)
}

/// Decode an animated GIF into delay-tagged frames.
///
/// Frames composite onto a persistent canvas so partial-frame GIFs render
/// correctly. Delays arrive in hundredths of a second; zero delays get
/// [`DEFAULT_SEQUENCE_DELAY`]. Timestamps accumulate across the sequence.
pub fn load_sequence(path: &Path) -> Result<Vec<SequenceFrame>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut reader = options
        .read_info(file)
        .with_context(|| format!("failed to decode GIF {}", path.display()))?;

    let canvas_width = reader.width() as u32;
    let canvas_height = reader.height() as u32;
    let mut canvas = vec![0u8; (canvas_width * canvas_height * 3) as usize];

    let mut frames = Vec::new();
    let mut timestamp = 0.0;

    while let Some(gif_frame) = reader.read_next_frame()? {
        composite(
            &mut canvas,
            canvas_width,
            gif_frame.buffer.as_ref(),
            gif_frame.left as u32,
            gif_frame.top as u32,
            gif_frame.width as u32,
            gif_frame.height as u32,
        );

        let delay = if gif_frame.delay == 0 {
            DEFAULT_SEQUENCE_DELAY
        } else {
            gif_frame.delay as f64 / 100.0
        };

        frames.push(SequenceFrame {
            frame: Frame::new(canvas.clone(), canvas_width, canvas_height, timestamp, delay)?,
            delay,
        });
        timestamp += delay;
    }

    if frames.is_empty() {
        warn!("GIF {} contained no frames", path.display());
    }
    Ok(frames)
}

/// Blit an RGBA sub-frame onto the RGB canvas, skipping transparent pixels
fn composite(
    canvas: &mut [u8],
    canvas_width: u32,
    rgba: &[u8],
    left: u32,
    top: u32,
    width: u32,
    height: u32,
) {
    for y in 0..height {
        for x in 0..width {
            let src = ((y * width + x) * 4) as usize;
            if src + 3 >= rgba.len() {
                continue;
            }
            if rgba[src + 3] < 128 {
                continue;
            }
            let cx = left + x;
            let cy = top + y;
            let dst = ((cy * canvas_width + cx) * 3) as usize;
            if dst + 2 < canvas.len() {
                canvas[dst] = rgba[src];
                canvas[dst + 1] = rgba[src + 1];
                canvas[dst + 2] = rgba[src + 2];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![40u8; (width * height * 3) as usize], width, height, 0.0, 0.1).unwrap()
    }

    #[test]
    fn test_frame_integrity_enforced() {
        assert!(Frame::new(vec![0u8; 12], 2, 2, 0.0, 0.0).err().is_some());
        assert!(Frame::new(vec![0u8; 12], 2, 0, 0.0, 0.0).err().is_some());
        let frame = Frame::new(vec![0u8; 12], 2, 2, 0.0, 0.0).unwrap();
        assert_eq!(frame.data.len(), (frame.width * frame.height * 3) as usize);
    }

    #[test]
    fn test_pixel_accessor() {
        let frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 2, 1, 0.0, 0.0).unwrap();
        assert_eq!(frame.pixel(0, 0), (1, 2, 3));
        assert_eq!(frame.pixel(1, 0), (4, 5, 6));
    }

    #[tokio::test]
    async fn test_still_yields_once() {
        let mut stream = FrameStream::still(rgb_frame(2, 2));
        let first = stream.next().await;
        assert!(first.is_some());
        assert_eq!(first.unwrap().timestamp, 0.0);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_sequence_loops_and_keeps_timestamps() {
        let frames = vec![
            SequenceFrame {
                frame: Frame::new(vec![1u8; 3], 1, 1, 0.0, 0.01).unwrap(),
                delay: 0.01,
            },
            SequenceFrame {
                frame: Frame::new(vec![2u8; 3], 1, 1, 0.01, 0.01).unwrap(),
                delay: 0.01,
            },
        ];
        let mut stream = FrameStream::sequence(frames);

        // Pull more frames than the sequence holds to observe the loop
        let mut seen = Vec::new();
        for _ in 0..5 {
            let frame = stream.next().await.expect("sequence loops forever");
            seen.push((frame.data[0], frame.timestamp));
        }
        assert_eq!(seen[0], (1, 0.0));
        assert_eq!(seen[1], (2, 0.01));
        // Loop restarts with iteration-relative timestamps
        assert_eq!(seen[2], (1, 0.0));
        stream.cancel();
    }

    #[tokio::test]
    async fn test_cancel_ends_stream_promptly() {
        let frames = vec![SequenceFrame {
            frame: rgb_frame(1, 1),
            delay: 10.0,
        }];
        let mut stream = FrameStream::sequence(frames);
        let _ = stream.next().await;
        stream.cancel();
        stream.cancel(); // idempotent
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_sequence_is_end_of_stream() {
        let mut stream = FrameStream::sequence(Vec::new());
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_composite_respects_alpha() {
        let mut canvas = vec![9u8; 2 * 2 * 3];
        // One opaque red pixel at (1, 1), one transparent at (0, 0)
        let rgba = vec![255, 0, 0, 255];
        composite(&mut canvas, 2, &rgba, 1, 1, 1, 1);
        let transparent = vec![0, 255, 0, 0];
        composite(&mut canvas, 2, &transparent, 0, 0, 1, 1);

        assert_eq!(&canvas[9..12], &[255, 0, 0]);
        assert_eq!(&canvas[0..3], &[9, 9, 9]);
    }

    #[test]
    fn test_missing_video_file_fails_fast() {
        if which::which("ffmpeg").is_err() {
            return;
        }
        // Spawn succeeds but the decoder exits immediately; the stream
        // must resolve to end-of-stream rather than hang.
        let stream = FrameStream::video(Path::new("does-not-exist.mp4"), 16, 6, 30.0);
        if let Ok(mut stream) = stream {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let frame = runtime.block_on(async {
                tokio::time::timeout(Duration::from_secs(5), stream.next()).await
            });
            assert!(matches!(frame, Ok(None)));
        }
    }
}
