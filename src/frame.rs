//! Frame container.
//!
//! A `Frame` is owned transiently by the pipeline: a source produces it, the
//! pipeline reads it once, and it is dropped before the next capture.

use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::region::RegionMask;

/// One captured RGB frame.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
    /// Capture sequence number assigned by the source (1-based).
    pub sequence: u64,
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self { image, sequence }
    }

    /// Builds a frame from a packed RGB24 buffer.
    pub fn from_rgb24(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))? as usize;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("RGB frame buffer rejected for {}x{}", width, height))?;
        Ok(Self { image, sequence })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Returns a copy with every pixel outside `mask` set to black.
    pub fn masked(&self, mask: &RegionMask) -> Result<Frame> {
        if mask.width() != self.width() || mask.height() != self.height() {
            return Err(anyhow!(
                "belt mask is {}x{} but frame {} is {}x{}",
                mask.width(),
                mask.height(),
                self.sequence,
                self.width(),
                self.height()
            ));
        }
        let mut image = self.image.clone();
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            if !mask.contains(x, y) {
                pixel.0 = [0, 0, 0];
            }
        }
        Ok(Frame {
            image,
            sequence: self.sequence,
        })
    }
}
