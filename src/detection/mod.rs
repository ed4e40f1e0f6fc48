/// Detection module
///
/// Per-frame stages of the colored-region sentinel.
///
/// ## Architecture
///
/// ```text
/// Pipeline
///   ├── FrameSegmenter   (frame + ColorModel -> Mask)
///   ├── RegionExtractor  (Mask -> Regions)
///   ├── RegionTracker    (Regions -> Tracks)
///   │   └── TrackMatcher
///   │       └── GreedyMatcher
///   └── SentinelEvaluator (Tracks -> SentinelEvents)
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// use color_sentinel::{Pipeline, SentinelConfig};
///
/// let mut pipeline = Pipeline::new(SentinelConfig::default())?;
///
/// for frame in frames {
///     for event in pipeline.process(&frame)? {
///         println!("Track {} fired at {:?}", event.track_id, event.timestamp);
///     }
/// }
/// ```
pub mod evaluator;
pub mod extractor;
pub mod matcher;
pub mod pipeline;
pub mod region;
pub mod segmenter;
pub mod tracker;

// Re-export commonly used types
pub use evaluator::{EvaluatorConfig, SentinelEvaluator, SentinelEvent, TriggerReason};
pub use extractor::RegionExtractor;
pub use matcher::{Assignment, GreedyMatcher, MatchGate, TrackMatcher};
pub use pipeline::Pipeline;
pub use region::{BoundingBox, Region};
pub use segmenter::{FrameSegmenter, Mask};
pub use tracker::{RegionTracker, Track, TrackId, TrackState, TrackerConfig};
