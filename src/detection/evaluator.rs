/// Trigger policy
///
/// Decides which live tracks raise a sentinel event this frame. The only
/// state kept here is the age at which each track last fired, held in a
/// side-table keyed by track id; tracks themselves are never modified.
use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::region::Region;
use super::tracker::{Track, TrackId};
use crate::error::SentinelError;

/// Why an event fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerReason {
    /// First firing of this track
    FirstTrigger,
    /// The debounce window since the previous firing has elapsed
    DebounceElapsed { frames_since_last: u32 },
}

/// Emitted when a track meets the trigger policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentinelEvent {
    pub track_id: TrackId,
    /// Snapshot of the track's region at firing time
    pub region: Region,
    /// Timestamp of the frame that fired
    pub timestamp: Duration,
    /// Track age at firing time
    pub age: u32,
    pub reason: TriggerReason,
}

/// Evaluator thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Minimum region pixel count
    pub min_area: usize,
    /// Minimum track age in frames
    pub min_persistence_frames: u32,
    /// Minimum age gap between two firings of one track; 0 fires every frame
    pub debounce_frames: u32,
}

impl EvaluatorConfig {
    pub fn validate(&self) -> Result<(), SentinelError> {
        if self.min_persistence_frames < 1 {
            return Err(SentinelError::configuration(
                "min_persistence_frames must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Applies the trigger policy to the live track set.
#[derive(Debug, Clone)]
pub struct SentinelEvaluator {
    config: EvaluatorConfig,
    /// Age at which each track last fired
    last_fired: BTreeMap<TrackId, u32>,
}

impl SentinelEvaluator {
    pub fn new(config: EvaluatorConfig) -> Result<Self, SentinelError> {
        config.validate()?;
        Ok(Self {
            config,
            last_fired: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Age at which `id` last fired, if it ever did.
    pub fn last_fired_age(&self, id: TrackId) -> Option<u32> {
        self.last_fired.get(&id).copied()
    }

    /// Evaluate every live track and return this frame's events, ascending
    /// track id.
    ///
    /// Tracks that missed the current frame never fire.
    pub fn evaluate(&mut self, tracks: &[Track]) -> Vec<SentinelEvent> {
        // forget tracks that are gone
        self.last_fired
            .retain(|id, _| tracks.iter().any(|t| t.id == *id));

        let mut ordered: Vec<&Track> = tracks.iter().collect();
        ordered.sort_by_key(|t| t.id);

        let mut events = Vec::new();
        for track in ordered {
            if !track.is_current()
                || track.region.pixel_count < self.config.min_area
                || track.age < self.config.min_persistence_frames
            {
                continue;
            }

            let reason = match self.last_fired.get(&track.id) {
                None => TriggerReason::FirstTrigger,
                Some(&fired_at) => {
                    let frames_since_last = track.age.saturating_sub(fired_at);
                    if frames_since_last < self.config.debounce_frames {
                        continue;
                    }
                    TriggerReason::DebounceElapsed { frames_since_last }
                }
            };

            self.last_fired.insert(track.id, track.age);
            events.push(SentinelEvent {
                track_id: track.id,
                region: track.region.clone(),
                timestamp: track.updated_at,
                age: track.age,
                reason,
            });
        }
        events
    }

    /// Forget every firing.
    pub fn reset(&mut self) {
        self.last_fired.clear();
    }
}
