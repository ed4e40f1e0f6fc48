/// Decoded video frame handed to the pipeline
use std::time::Duration;

use image::{Rgb, RgbImage, RgbaImage};

use crate::error::SentinelError;

/// One time step of the video stream.
///
/// The pixel buffer is immutable once built. `timestamp` is measured from the
/// start of the stream and must increase from frame to frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
    timestamp: Duration,
}

impl Frame {
    /// Build a frame from interleaved 8-bit RGB samples.
    pub fn new(
        width: u32,
        height: u32,
        timestamp: Duration,
        rgb: Vec<u8>,
    ) -> Result<Self, SentinelError> {
        if width == 0 || height == 0 {
            return Err(SentinelError::invalid_input(format!(
                "frame dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize * 3;
        if rgb.len() != expected {
            return Err(SentinelError::invalid_input(format!(
                "frame buffer holds {} bytes, {}x{} RGB needs {}",
                rgb.len(),
                width,
                height,
                expected
            )));
        }
        let image = RgbImage::from_raw(width, height, rgb).ok_or_else(|| {
            SentinelError::invalid_input("frame buffer does not fit its dimensions")
        })?;
        Ok(Self { image, timestamp })
    }

    pub fn from_rgb_image(image: RgbImage, timestamp: Duration) -> Result<Self, SentinelError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SentinelError::invalid_input(format!(
                "frame dimensions must be non-zero, got {}x{}",
                image.width(),
                image.height()
            )));
        }
        Ok(Self { image, timestamp })
    }

    /// Build a frame from an RGBA buffer, dropping alpha.
    pub fn from_rgba_image(image: &RgbaImage, timestamp: Duration) -> Result<Self, SentinelError> {
        let (width, height) = image.dimensions();
        let rgb = image
            .pixels()
            .flat_map(|p| [p[0], p[1], p[2]])
            .collect::<Vec<u8>>();
        Self::new(width, height, timestamp, rgb)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Pixel at (x, y). Panics when out of bounds, like `image::ImageBuffer`.
    pub fn pixel(&self, x: u32, y: u32) -> &Rgb<u8> {
        self.image.get_pixel(x, y)
    }

    /// Row-major interleaved RGB samples of one row.
    pub(crate) fn row(&self, y: u32) -> &[u8] {
        let stride = self.width() as usize * 3;
        let start = y as usize * stride;
        &self.image.as_raw()[start..start + stride]
    }
}
