use std::fs::File;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

use termtube::capability;
use termtube::encoder::{Encoder, RenderOptions, Transport};
use termtube::media::{self, MediaKind};
use termtube::source::{self, Frame};

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("termtube").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Terminal media player"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("termtube").unwrap();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_missing_file() {
    let mut cmd = Command::cargo_bin("termtube").unwrap();
    cmd.arg("nonexistent.mp4");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_invalid_contrast() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("x.png");
    write_png(&path, 2, 2);

    let mut cmd = Command::cargo_bin("termtube").unwrap();
    cmd.arg(path.to_str().unwrap()).arg("--contrast").arg("0");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Contrast"));
}

#[test]
fn test_cli_unsupported_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"not media").unwrap();

    let mut cmd = Command::cargo_bin("termtube").unwrap();
    cmd.arg(path.to_str().unwrap());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported format"));
}

fn write_png(path: &PathBuf, width: u32, height: u32) {
    let mut image = image::RgbImage::new(width, height);
    for (x, _, px) in image.enumerate_pixels_mut() {
        *px = if x % 2 == 0 {
            image::Rgb([255, 0, 0])
        } else {
            image::Rgb([0, 255, 0])
        };
    }
    image.save(path).unwrap();
}

mod still_pipeline {
    use super::*;

    #[test]
    fn test_still_truecolor_halfblock_output() {
        // 2x1 red/green still on a truecolor terminal renders as one
        // half-block row with a black padded bottom
        let frame = Frame::new(vec![255, 0, 0, 0, 255, 0], 2, 1, 0.0, 0.0).unwrap();
        let encoder = Encoder::for_transport(Transport::HalfBlock);
        let options = RenderOptions {
            pixel_width: 2,
            pixel_height: 1,
            cell_width: 2,
            cell_height: 1,
            transport: Transport::HalfBlock,
            brightness: 0.0,
            contrast: 1.0,
        };
        let out = String::from_utf8(encoder.encode(&frame, &options).unwrap()).unwrap();
        assert!(out.starts_with("\x1b[38;2;255;0;0m\x1b[48;2;0;0;0m"));
        assert!(out.contains('▀'));
    }

    #[test]
    fn test_still_grayscale_ramp_output() {
        // Four luminance steps map onto the ramp in order
        let frame = Frame::new(
            vec![0, 0, 0, 85, 85, 85, 170, 170, 170, 255, 255, 255],
            4,
            1,
            0.0,
            0.0,
        )
        .unwrap();
        let encoder = Encoder::for_transport(Transport::Grayscale);
        let options = RenderOptions {
            pixel_width: 4,
            pixel_height: 1,
            cell_width: 4,
            cell_height: 1,
            transport: Transport::Grayscale,
            brightness: 0.0,
            contrast: 1.0,
        };
        let out = String::from_utf8(encoder.encode(&frame, &options).unwrap()).unwrap();
        assert!(out.starts_with(' '));
        assert!(out.trim_end().ends_with('@'));
    }

    #[test]
    fn test_load_still_from_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("still.png");
        write_png(&path, 4, 3);

        let frame = source::load_still(&path).unwrap();
        assert_eq!((frame.width, frame.height), (4, 3));
        assert_eq!(frame.data.len(), 4 * 3 * 3);
        assert_eq!(frame.timestamp, 0.0);
    }
}

mod sequence_pipeline {
    use super::*;

    fn write_gif(path: &PathBuf, delays: &[u16]) {
        let mut file = File::create(path).unwrap();
        let mut encoder = gif::Encoder::new(&mut file, 2, 2, &[]).unwrap();
        encoder.set_repeat(gif::Repeat::Infinite).unwrap();
        for (i, &delay) in delays.iter().enumerate() {
            let color = if i % 2 == 0 { [255, 0, 0] } else { [0, 255, 0] };
            let mut pixels = Vec::new();
            for _ in 0..4 {
                pixels.extend_from_slice(&color);
            }
            let mut frame = gif::Frame::from_rgb(2, 2, &pixels);
            frame.delay = delay;
            encoder.write_frame(&frame).unwrap();
        }
    }

    #[test]
    fn test_gif_delays_convert_to_seconds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        // GIF delays are hundredths of a second
        write_gif(&path, &[50, 100]);

        let frames = source::load_sequence(&path).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].delay, 0.5);
        assert_eq!(frames[1].delay, 1.0);
        // Timestamps accumulate across the sequence
        assert_eq!(frames[0].frame.timestamp, 0.0);
        assert_eq!(frames[1].frame.timestamp, 0.5);
    }

    #[test]
    fn test_gif_zero_delay_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fast.gif");
        write_gif(&path, &[0, 0]);

        let frames = source::load_sequence(&path).unwrap();
        for entry in &frames {
            assert_eq!(entry.delay, source::DEFAULT_SEQUENCE_DELAY);
        }
    }

    #[test]
    fn test_gif_frame_integrity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        write_gif(&path, &[10, 10, 10]);

        for entry in source::load_sequence(&path).unwrap() {
            let frame = &entry.frame;
            assert_eq!(
                frame.data.len(),
                (frame.width * frame.height * 3) as usize
            );
        }
    }

    #[test]
    fn test_gif_descriptor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        write_gif(&path, &[50, 50]);

        let descriptor = media::describe(&path).unwrap();
        assert_eq!(descriptor.kind, MediaKind::Sequence);
        assert_eq!(descriptor.frame_count, 2);
        assert!((descriptor.duration - 1.0).abs() < 1e-9);
        assert!((descriptor.fps - 2.0).abs() < 1e-9);
        assert!(!descriptor.has_audio);
    }
}

mod capability_probe {
    use super::*;
    use std::collections::HashMap;

    fn probe(pairs: &[(&str, &str)]) -> termtube::TerminalCapabilities {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        capability::detect_from(|name| map.get(name).cloned(), Some((80, 24)))
    }

    #[test]
    fn test_truecolor_terminal_prefers_sixel_when_advertised() {
        let caps = probe(&[("TERM", "xterm-256color"), ("COLORTERM", "truecolor"), ("LANG", "en_US.UTF-8")]);
        assert_eq!(caps.preferred_transport(), Transport::Sixel);
    }

    #[test]
    fn test_plain_terminal_degrades_to_grayscale() {
        let caps = probe(&[("TERM", "vt220")]);
        assert_eq!(caps.preferred_transport(), Transport::Grayscale);
    }

    #[test]
    fn test_tmux_without_unicode_uses_grayscale() {
        // 256 colors are there but block glyphs need a UTF-8 locale
        let caps = probe(&[("TERM", "tmux-256color")]);
        assert!(caps.color256);
        assert!(!caps.unicode);
        assert_eq!(caps.preferred_transport(), Transport::Grayscale);
    }
}
