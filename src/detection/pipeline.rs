/// Sentinel pipeline
///
/// Runs one frame through segmentation, extraction, tracking and evaluation.
use std::time::Instant;

use super::evaluator::{SentinelEvaluator, SentinelEvent};
use super::extractor::RegionExtractor;
use super::region::Region;
use super::segmenter::FrameSegmenter;
use super::tracker::{RegionTracker, Track};
use crate::config::SentinelConfig;
use crate::error::SentinelError;
use crate::frame::Frame;
use crate::utils::{elapsed_us, IterationTiming};

/// Sentinel pipeline
///
/// Orchestrates the per-frame flow:
/// 1. Segment the frame into a mask
/// 2. Extract regions from the mask
/// 3. Match regions to tracks
/// 4. Evaluate the trigger policy
///
/// Not internally synchronized. Callers feeding frames from several threads
/// must serialize calls to `process`.
#[derive(Debug)]
pub struct Pipeline {
    config: SentinelConfig,
    segmenter: FrameSegmenter,
    extractor: RegionExtractor,
    tracker: RegionTracker,
    evaluator: SentinelEvaluator,
    /// Latched by the first frame after construction or reset
    dimensions: Option<(u32, u32)>,
    frames_processed: u64,
    last_timing: Option<IterationTiming>,
}

impl Pipeline {
    /// Create a pipeline, failing fast on an invalid configuration.
    pub fn new(config: SentinelConfig) -> Result<Self, SentinelError> {
        config.validate()?;

        let segmenter = FrameSegmenter::new(config.denoise, config.roi)?;
        let extractor = RegionExtractor::new(config.min_region_pixels)?;
        let tracker = RegionTracker::new(config.tracker_config())?;
        let evaluator = SentinelEvaluator::new(config.evaluator_config())?;

        tracing::debug!(
            "Pipeline created: min_region_pixels={} max_misses={} min_persistence_frames={} debounce_frames={}",
            config.min_region_pixels,
            config.max_misses,
            config.min_persistence_frames,
            config.debounce_frames
        );

        Ok(Self {
            config,
            segmenter,
            extractor,
            tracker,
            evaluator,
            dimensions: None,
            frames_processed: 0,
            last_timing: None,
        })
    }

    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    /// Process one frame and return its events (possibly empty).
    ///
    /// On error the tracker and evaluator are left exactly as they were.
    pub fn process(&mut self, frame: &Frame) -> Result<Vec<SentinelEvent>, SentinelError> {
        let total_start = Instant::now();
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(SentinelError::invalid_input(format!(
                "frame dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        if let Some((w, h)) = self.dimensions {
            if (w, h) != (width, height) {
                return Err(SentinelError::configuration(format!(
                    "frame dimensions changed from {}x{} to {}x{}; reset the pipeline",
                    w, h, width, height
                )));
            }
        }

        let mut timing = IterationTiming::new();

        let start = Instant::now();
        let mask = self.segmenter.segment(frame, &self.config.color_model);
        timing.segment_us = elapsed_us(start);
        if mask.dimensions() != (width, height) {
            return Err(SentinelError::internal(format!(
                "mask is {}x{} for a {}x{} frame",
                mask.width(),
                mask.height(),
                width,
                height
            )));
        }

        let start = Instant::now();
        let regions = self.extractor.extract(&mask);
        timing.extract_us = elapsed_us(start);
        self.check_regions(&regions, width, height)?;

        // nothing below can fail; state changes start here
        let start = Instant::now();
        let tracks = self.tracker.update(regions, frame.timestamp());
        timing.track_us = elapsed_us(start);

        let start = Instant::now();
        let events = self.evaluator.evaluate(&tracks);
        timing.evaluate_us = elapsed_us(start);

        self.dimensions = Some((width, height));
        self.frames_processed += 1;
        timing.total_us = elapsed_us(total_start);
        self.last_timing = Some(timing);

        for event in &events {
            tracing::info!(
                "Sentinel event: track {} at ({:.1}, {:.1}), {} pixels, age {} ({:?})",
                event.track_id,
                event.region.centroid.0,
                event.region.centroid.1,
                event.region.pixel_count,
                event.age,
                event.reason
            );
        }
        tracing::trace!(
            "Frame {} processed: {} tracks, {} events in {:.0} µs",
            self.frames_processed,
            tracks.len(),
            events.len(),
            timing.total_us
        );

        Ok(events)
    }

    fn check_regions(
        &self,
        regions: &[Region],
        width: u32,
        height: u32,
    ) -> Result<(), SentinelError> {
        for region in regions {
            if !region.bbox.fits_within(width, height) {
                return Err(SentinelError::internal(format!(
                    "region {:?} exceeds {}x{} frame",
                    region.bbox, width, height
                )));
            }
            if region.pixel_count < self.config.min_region_pixels
                || region.pixel_count as u64 > region.bbox.area()
            {
                return Err(SentinelError::internal(format!(
                    "region {:?} reports {} pixels",
                    region.bbox, region.pixel_count
                )));
            }
        }
        Ok(())
    }

    /// Clear all tracks, firing history and latched dimensions.
    ///
    /// Track ids start over; a reset begins a new pipeline lifetime.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.evaluator.reset();
        self.dimensions = None;
        self.frames_processed = 0;
        self.last_timing = None;
        tracing::debug!("Pipeline reset");
    }

    /// Swap in a new configuration and reset. The old configuration stays in
    /// place if the new one is invalid.
    pub fn reconfigure(&mut self, config: SentinelConfig) -> Result<(), SentinelError> {
        *self = Pipeline::new(config)?;
        Ok(())
    }

    /// Live tracks, ascending id
    pub fn tracks(&self) -> &[Track] {
        self.tracker.tracks()
    }

    /// Frame dimensions latched by the first frame since the last reset
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Stage timings of the last successful frame
    pub fn last_timing(&self) -> Option<IterationTiming> {
        self.last_timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{ColorModel, ColorSpace};
    use image::{Rgb, RgbImage};
    use std::time::Duration;

    fn config() -> SentinelConfig {
        SentinelConfig {
            color_model: ColorModel::range(
                ColorSpace::Rgb,
                [200.0, 0.0, 0.0],
                [255.0, 60.0, 60.0],
            )
            .unwrap(),
            min_region_pixels: 4,
            max_track_distance: 10.0,
            max_size_ratio_deviation: 0.5,
            max_misses: 2,
            min_area: 4,
            min_persistence_frames: 2,
            debounce_frames: 3,
            denoise: false,
            roi: None,
        }
    }

    fn frame(width: u32, height: u32, block: Option<(u32, u32)>, index: u64) -> Frame {
        let mut img = RgbImage::from_pixel(width, height, Rgb([20, 20, 20]));
        if let Some((bx, by)) = block {
            for y in by..by + 3 {
                for x in bx..bx + 3 {
                    img.put_pixel(x, y, Rgb([240, 10, 10]));
                }
            }
        }
        Frame::from_rgb_image(img, Duration::from_millis(index * 40)).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut bad = config();
        bad.min_persistence_frames = 0;
        assert!(Pipeline::new(bad).unwrap_err().is_configuration());
    }

    #[test]
    fn test_events_after_persistence() {
        let mut pipeline = Pipeline::new(config()).unwrap();
        assert!(pipeline.process(&frame(16, 16, Some((2, 2)), 0)).unwrap().is_empty());
        let events = pipeline.process(&frame(16, 16, Some((3, 2)), 1)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].track_id.value(), 1);
        assert_eq!(events[0].timestamp, Duration::from_millis(40));
        assert_eq!(pipeline.tracks().len(), 1);
        assert_eq!(pipeline.frames_processed(), 2);
        assert!(pipeline.last_timing().is_some());
    }

    #[test]
    fn test_dimension_change_leaves_state() {
        let mut pipeline = Pipeline::new(config()).unwrap();
        pipeline.process(&frame(16, 16, Some((2, 2)), 0)).unwrap();
        let before = pipeline.tracks().to_vec();

        let err = pipeline.process(&frame(20, 16, Some((2, 2)), 1)).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(pipeline.tracks(), before.as_slice());
        assert_eq!(pipeline.dimensions(), Some((16, 16)));

        pipeline.reset();
        assert!(pipeline.tracks().is_empty());
        assert!(pipeline.process(&frame(20, 16, Some((2, 2)), 1)).is_ok());
        assert_eq!(pipeline.dimensions(), Some((20, 16)));
    }

    #[test]
    fn test_reconfigure_resets() {
        let mut pipeline = Pipeline::new(config()).unwrap();
        pipeline.process(&frame(16, 16, Some((2, 2)), 0)).unwrap();

        let mut next = config();
        next.min_area = 100;
        pipeline.reconfigure(next).unwrap();
        assert!(pipeline.tracks().is_empty());
        assert_eq!(pipeline.config().min_area, 100);

        let mut bad = config();
        bad.max_track_distance = f64::NAN;
        assert!(pipeline.reconfigure(bad).is_err());
        assert_eq!(pipeline.config().min_area, 100);
    }
}
