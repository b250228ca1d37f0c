//! Off-screen render surface
//!
//! The image buffer video frames are copied into before re-emission as an
//! output track. Sized exactly once, to the source track's native
//! resolution.

use crate::error::{Error, Result};
use crate::media::{Timestamp, VideoFrame};
use bytes::Bytes;
use image::RgbaImage;

/// Luminance-preserving tint: each output channel is a fixed linear
/// combination of the original channels.
const TINT_MATRIX: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

pub struct RenderSurface {
    canvas: RgbaImage,
}

impl RenderSurface {
    /// Allocate a surface at the source track's native resolution
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::RenderSurface(format!(
                "invalid surface dimensions {width}x{height}"
            )));
        }
        Ok(Self {
            canvas: RgbaImage::new(width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Copy a decoded frame into the surface.
    ///
    /// Frames whose dimensions do not match are ignored; the source
    /// resolution is fixed once metadata arrived.
    pub fn copy_frame(&mut self, frame: &VideoFrame) {
        let expected = (self.canvas.width() * self.canvas.height() * 4) as usize;
        if frame.width != self.canvas.width()
            || frame.height != self.canvas.height()
            || frame.data.len() < expected
        {
            return;
        }
        self.canvas.copy_from_slice(&frame.data[..expected]);
    }

    /// Rewrite every pixel's color channels through the tint matrix,
    /// clamped per channel to the valid range. Alpha is untouched.
    pub fn apply_color_matrix(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            let (rf, gf, bf) = (r as f32, g as f32, b as f32);
            pixel.0 = [
                mix(&TINT_MATRIX[0], rf, gf, bf),
                mix(&TINT_MATRIX[1], rf, gf, bf),
                mix(&TINT_MATRIX[2], rf, gf, bf),
                a,
            ];
        }
    }

    /// Snapshot the surface contents as an output frame
    pub fn snapshot(&self, pts: Timestamp) -> VideoFrame {
        VideoFrame {
            data: Bytes::copy_from_slice(self.canvas.as_raw()),
            width: self.canvas.width(),
            height: self.canvas.height(),
            pts,
        }
    }
}

#[inline]
fn mix(row: &[f32; 3], r: f32, g: f32, b: f32) -> u8 {
    (row[0] * r + row[1] * g + row[2] * b).min(255.0) as u8
}
