//! Frame resampling.
//!
//! Lanczos3 by default; bilinear when the source is already much larger
//! than the target, where the cheaper kernel is indistinguishable.

use anyhow::{bail, Result};
use image::imageops::FilterType;
use image::RgbImage;

use crate::source::Frame;

/// Resample raw RGB24 pixels to the target dimensions
pub fn resize_rgb(
    data: &[u8],
    src_width: u32,
    src_height: u32,
    target_width: u32,
    target_height: u32,
) -> Result<Vec<u8>> {
    if target_width == 0 || target_height == 0 {
        bail!("cannot scale to {}x{}", target_width, target_height);
    }
    if src_width == target_width && src_height == target_height {
        return Ok(data.to_vec());
    }

    let image = RgbImage::from_raw(src_width, src_height, data.to_vec())
        .ok_or_else(|| anyhow::anyhow!("pixel buffer does not match {}x{}", src_width, src_height))?;

    let filter = if src_width >= target_width * 2 && src_height >= target_height * 2 {
        FilterType::Triangle
    } else {
        FilterType::Lanczos3
    };

    let resized = image::imageops::resize(&image, target_width, target_height, filter);
    Ok(resized.into_raw())
}

/// Resample a frame, carrying its timing fields over
pub fn scale_frame(frame: &Frame, target_width: u32, target_height: u32) -> Result<Frame> {
    let data = resize_rgb(
        &frame.data,
        frame.width,
        frame.height,
        target_width,
        target_height,
    )?;
    Frame::new(data, target_width, target_height, frame.timestamp, frame.duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_produces_exact_dimensions() {
        let data = vec![200u8; 8 * 8 * 3];
        let out = resize_rgb(&data, 8, 8, 3, 5).unwrap();
        assert_eq!(out.len(), 3 * 5 * 3);
    }

    #[test]
    fn test_identity_resize_is_copy() {
        let data: Vec<u8> = (0..4 * 2 * 3).map(|i| i as u8).collect();
        let out = resize_rgb(&data, 4, 2, 4, 2).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_zero_target_rejected() {
        let data = vec![0u8; 4 * 4 * 3];
        assert!(resize_rgb(&data, 4, 4, 0, 4).is_err());
    }

    #[test]
    fn test_mismatched_buffer_rejected() {
        let data = vec![0u8; 10];
        assert!(resize_rgb(&data, 4, 4, 2, 2).is_err());
    }

    #[test]
    fn test_scale_frame_keeps_timing() {
        let frame = Frame::new(vec![128u8; 4 * 4 * 3], 4, 4, 1.5, 0.04).unwrap();
        let scaled = scale_frame(&frame, 2, 2).unwrap();
        assert_eq!((scaled.width, scaled.height), (2, 2));
        assert_eq!(scaled.timestamp, 1.5);
        assert_eq!(scaled.duration, 0.04);
        assert_eq!(scaled.data.len(), 2 * 2 * 3);
    }

    #[test]
    fn test_solid_color_survives_scaling() {
        let data = vec![180u8; 16 * 16 * 3];
        let out = resize_rgb(&data, 16, 16, 4, 4).unwrap();
        for c in out {
            assert!((c as i16 - 180).abs() <= 2);
        }
    }
}
