/// Frame segmentation
///
/// Turns a frame into a binary mask of pixels accepted by a `ColorModel`.
/// Rows are evaluated in parallel; every row writes only its own slice of the
/// mask, so the result is identical to a sequential scan.
use image::Rgb;
use rayon::prelude::*;

use super::region::BoundingBox;
use crate::color::ColorModel;
use crate::error::SentinelError;
use crate::frame::Frame;

/// Per-frame binary grid, row-major, same dimensions as its frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    /// All-false mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_bits(width: u32, height: u32, bits: Vec<bool>) -> Result<Self, SentinelError> {
        if width == 0 || height == 0 {
            return Err(SentinelError::invalid_input(format!(
                "mask dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        if bits.len() != width as usize * height as usize {
            return Err(SentinelError::invalid_input(format!(
                "mask holds {} cells, {}x{} needs {}",
                bits.len(),
                width,
                height,
                width as usize * height as usize
            )));
        }
        Ok(Self {
            width,
            height,
            bits,
        })
    }

    /// Build a mask from text rows, `#` marking set cells. Test helper.
    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.first().map(|r| r.len()).unwrap_or(0) as u32;
        let bits = rows
            .iter()
            .flat_map(|r| r.chars().map(|c| c == '#'))
            .collect();
        Self::from_bits(width, height, bits).unwrap()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.bits[self.offset(x, y)]
    }

    /// Writes outside the grid are ignored, mirroring `get`. Test helper.
    #[cfg(test)]
    pub(crate) fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            let offset = self.offset(x, y);
            self.bits[offset] = value;
        }
    }

    pub fn count_set(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    pub(crate) fn row(&self, y: u32) -> &[bool] {
        let start = y as usize * self.width as usize;
        &self.bits[start..start + self.width as usize]
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// True when any 4-neighbour of (x, y) is set.
    fn has_set_neighbor(&self, x: u32, y: u32) -> bool {
        (x > 0 && self.get(x - 1, y))
            || self.get(x + 1, y)
            || (y > 0 && self.get(x, y - 1))
            || self.get(x, y + 1)
    }
}

/// Applies a color model to whole frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSegmenter {
    denoise: bool,
    roi: Option<BoundingBox>,
}

impl FrameSegmenter {
    /// # Arguments
    /// * `denoise` - clear set pixels that have no set 4-neighbour
    /// * `roi` - only pixels inside this rectangle can be set
    pub fn new(denoise: bool, roi: Option<BoundingBox>) -> Result<Self, SentinelError> {
        if let Some(roi) = roi {
            if roi.is_empty() {
                return Err(SentinelError::configuration(format!(
                    "region of interest must be non-empty, got {}x{}",
                    roi.width, roi.height
                )));
            }
        }
        Ok(Self { denoise, roi })
    }

    pub fn denoise(&self) -> bool {
        self.denoise
    }

    pub fn roi(&self) -> Option<BoundingBox> {
        self.roi
    }

    /// Evaluate `model` for every pixel of `frame`.
    ///
    /// The returned mask always has the frame's dimensions.
    pub fn segment(&self, frame: &Frame, model: &ColorModel) -> Mask {
        let (width, height) = frame.dimensions();
        let mut mask = Mask::new(width, height);

        let full = BoundingBox::new(0, 0, width, height);
        let window = match self.roi {
            Some(roi) => roi.intersect(&full),
            None => Some(full),
        };

        if let Some(window) = window {
            mask.bits
                .par_chunks_mut(width as usize)
                .enumerate()
                .for_each(|(y, row)| {
                    let y = y as u32;
                    if y < window.y || y >= window.bottom() {
                        return;
                    }
                    let samples = frame.row(y);
                    for x in window.x..window.right() {
                        let i = x as usize * 3;
                        let pixel = Rgb([samples[i], samples[i + 1], samples[i + 2]]);
                        row[x as usize] = model.matches(&pixel);
                    }
                });
        }

        if self.denoise {
            mask = despeckle(&mask);
        }

        tracing::trace!(
            "Segmented {}x{} frame: {} matching pixels",
            width,
            height,
            mask.count_set()
        );

        mask
    }
}

/// Clear isolated set pixels (no set 4-neighbour).
///
/// Reads only from `mask` and writes a copy, so row order does not matter.
fn despeckle(mask: &Mask) -> Mask {
    let width = mask.width as usize;
    let mut out = mask.clone();
    out.bits
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as u32;
            for (x, cell) in row.iter_mut().enumerate() {
                if *cell && !mask.has_set_neighbor(x as u32, y) {
                    *cell = false;
                }
            }
        });
    out
}
