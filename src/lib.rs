//! Real-time colored-region sentinel.
//!
//! Frames are segmented by a [`ColorModel`], matching pixels are grouped into
//! regions, regions are tracked across frames, and a [`SentinelEvent`] fires
//! when a track is large and persistent enough.
//!
//! ```rust,ignore
//! use color_sentinel::{Frame, Pipeline, SentinelConfig};
//!
//! let mut pipeline = Pipeline::new(SentinelConfig::default())?;
//! let events = pipeline.process(&frame)?;
//! ```

pub mod color;
pub mod config;
pub mod detection;
pub mod error;
pub mod frame;
pub mod messaging;
pub mod runner;
pub mod source;
pub mod utils;

pub use color::{ColorModel, ColorSpace};
pub use config::SentinelConfig;
pub use detection::{
    BoundingBox, Mask, Pipeline, Region, SentinelEvent, Track, TrackId, TrackState, TriggerReason,
};
pub use error::{AppResult, ConfigError, SentinelError, SourceError};
pub use frame::Frame;
pub use messaging::{Event, EventBus};
pub use runner::{RunSummary, SentinelRunner};
pub use source::{FrameSource, ImageSequenceSource, MemorySource};
