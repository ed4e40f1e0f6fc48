/// Geometry shared by the detection stages
use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle. `x + width` and `y + height` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_array(arr: [u32; 4]) -> Self {
        Self::new(arr[0], arr[1], arr[2], arr[3])
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// True when the box lies entirely inside a `width` x `height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        !self.is_empty()
            && (self.x as u64 + self.width as u64) <= width as u64
            && (self.y as u64 + self.height as u64) <= height as u64
    }

    /// Overlap of two boxes, `None` when they do not intersect.
    pub fn intersect(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x as u64 + self.width as u64).min(other.x as u64 + other.width as u64);
        let y1 = (self.y as u64 + self.height as u64).min(other.y as u64 + other.height as u64);
        if x1 <= x0 as u64 || y1 <= y0 as u64 {
            return None;
        }
        Some(BoundingBox::new(
            x0,
            y0,
            (x1 - x0 as u64) as u32,
            (y1 - y0 as u64) as u32,
        ))
    }
}

/// One connected component of a single frame's mask.
///
/// Created by the extractor and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub bbox: BoundingBox,
    pub pixel_count: usize,
    /// Mean pixel coordinate (x, y).
    pub centroid: (f64, f64),
}

impl Region {
    pub fn centroid_distance(&self, other: &Region) -> f64 {
        let dx = self.centroid.0 - other.centroid.0;
        let dy = self.centroid.1 - other.centroid.1;
        (dx * dx + dy * dy).sqrt()
    }

    /// `1 - smaller/larger` of the two pixel counts: 0 for equal sizes,
    /// approaching 1 as the sizes diverge.
    pub fn size_ratio_deviation(&self, other: &Region) -> f64 {
        let a = self.pixel_count as f64;
        let b = other.pixel_count as f64;
        let larger = a.max(b);
        if larger == 0.0 {
            return 0.0;
        }
        1.0 - a.min(b) / larger
    }
}
