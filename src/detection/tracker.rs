/// Region tracking across frames
///
/// Keeps the live set of tracks, one per region lineage, and updates it once
/// per frame.
///
/// ## Track lifecycle
///
/// ```text
/// New ──match──> Tracked ──miss──> Lost ──miss > max_misses──> Pruned
///  │                ▲               │
///  └─────miss───────┼──────────> Lost
///                   └────match──────┘
/// ```
///
/// Pruned tracks leave the live set for good. A region that reappears later
/// starts a new track with a fresh id.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::matcher::{GreedyMatcher, MatchGate, TrackMatcher};
use super::region::Region;
use crate::error::SentinelError;

/// Track identifier. Issued in increasing order, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(u64);

impl TrackId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackState {
    /// Created this frame from an unmatched region
    New,
    /// Matched this frame
    Tracked,
    /// Missed this frame, still within the miss tolerance
    Lost,
    /// Exceeded the miss tolerance; never part of the live set
    Pruned,
}

impl TrackState {
    pub fn is_live(&self) -> bool {
        !matches!(self, TrackState::Pruned)
    }
}

/// A region lineage across frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    /// Last matched region
    pub region: Region,
    /// Number of frames in which the track was matched
    pub age: u32,
    /// Consecutive frames without a match
    pub miss_count: u32,
    pub state: TrackState,
    pub created_at: Duration,
    pub updated_at: Duration,
    /// Centroid displacement per frame between the last two matches
    pub velocity: (f64, f64),
}

impl Track {
    /// True when the track was matched (or created) in the latest frame.
    pub fn is_current(&self) -> bool {
        self.miss_count == 0
    }
}

/// Tracker thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    pub max_distance: f64,
    pub max_size_ratio_deviation: f64,
    pub max_misses: u32,
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), SentinelError> {
        if !self.max_distance.is_finite() || self.max_distance < 0.0 {
            return Err(SentinelError::configuration(format!(
                "max_track_distance must be a non-negative number, got {}",
                self.max_distance
            )));
        }
        if !self.max_size_ratio_deviation.is_finite() || self.max_size_ratio_deviation < 0.0 {
            return Err(SentinelError::configuration(format!(
                "max_size_ratio_deviation must be a non-negative number, got {}",
                self.max_size_ratio_deviation
            )));
        }
        Ok(())
    }

    fn gate(&self) -> MatchGate {
        MatchGate {
            max_distance: self.max_distance,
            max_size_ratio_deviation: self.max_size_ratio_deviation,
        }
    }
}

/// Owns the live track set.
#[derive(Debug, Clone)]
pub struct RegionTracker {
    config: TrackerConfig,
    matcher: Arc<dyn TrackMatcher>,
    /// Live tracks, ascending id
    tracks: Vec<Track>,
    /// Tracks pruned by the latest update
    pruned: Vec<Track>,
    next_id: u64,
}

impl RegionTracker {
    pub fn new(config: TrackerConfig) -> Result<Self, SentinelError> {
        Self::with_matcher(config, Arc::new(GreedyMatcher))
    }

    /// Use a different assignment strategy behind the same update contract.
    pub fn with_matcher(
        config: TrackerConfig,
        matcher: Arc<dyn TrackMatcher>,
    ) -> Result<Self, SentinelError> {
        config.validate()?;
        tracing::debug!(
            "Region tracker using {} (max distance {}, max misses {})",
            matcher.name(),
            config.max_distance,
            config.max_misses
        );
        Ok(Self {
            config,
            matcher,
            tracks: Vec::new(),
            pruned: Vec::new(),
            next_id: 1,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Live tracks, ascending id.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Tracks removed by the most recent `update`, in state `Pruned`.
    pub fn last_pruned(&self) -> &[Track] {
        &self.pruned
    }

    /// Match this frame's regions against the live tracks.
    ///
    /// Returns every live track after matching, ascending id. The new track
    /// set is built aside and swapped in at the end.
    pub fn update(&mut self, regions: Vec<Region>, timestamp: Duration) -> Vec<Track> {
        let assignments = self
            .matcher
            .assign(&self.tracks, &regions, &self.config.gate());

        let mut region_for_track: Vec<Option<usize>> = vec![None; self.tracks.len()];
        let mut region_taken = vec![false; regions.len()];
        for assignment in &assignments {
            region_for_track[assignment.track] = Some(assignment.region);
            region_taken[assignment.region] = true;
        }

        let mut next = Vec::with_capacity(self.tracks.len() + regions.len());
        let mut pruned = Vec::new();

        for (index, track) in self.tracks.iter().enumerate() {
            let mut track = track.clone();
            match region_for_track[index] {
                Some(r) => {
                    let region = regions[r].clone();
                    let frames = (track.miss_count + 1) as f64;
                    track.velocity = (
                        (region.centroid.0 - track.region.centroid.0) / frames,
                        (region.centroid.1 - track.region.centroid.1) / frames,
                    );
                    track.region = region;
                    track.age += 1;
                    track.miss_count = 0;
                    track.updated_at = timestamp;
                    track.state = TrackState::Tracked;
                    next.push(track);
                }
                None => {
                    track.miss_count += 1;
                    if track.miss_count > self.config.max_misses {
                        tracing::debug!(
                            "Track {} pruned after {} missed frames (age {})",
                            track.id,
                            track.miss_count,
                            track.age
                        );
                        track.state = TrackState::Pruned;
                        pruned.push(track);
                    } else {
                        if track.state != TrackState::Lost {
                            tracing::debug!("Track {} lost", track.id);
                        }
                        track.state = TrackState::Lost;
                        next.push(track);
                    }
                }
            }
        }

        for (index, region) in regions.into_iter().enumerate() {
            if region_taken[index] {
                continue;
            }
            let id = TrackId::new(self.next_id);
            self.next_id += 1;
            tracing::debug!(
                "Track {} created at ({:.1}, {:.1}) with {} pixels",
                id,
                region.centroid.0,
                region.centroid.1,
                region.pixel_count
            );
            next.push(Track {
                id,
                region,
                age: 1,
                miss_count: 0,
                state: TrackState::New,
                created_at: timestamp,
                updated_at: timestamp,
                velocity: (0.0, 0.0),
            });
        }

        self.tracks = next;
        self.pruned = pruned;
        self.tracks.clone()
    }

    /// Drop every track and restart id issuance.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.pruned.clear();
        self.next_id = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::region::BoundingBox;

    fn config(max_misses: u32) -> TrackerConfig {
        TrackerConfig {
            max_distance: 20.0,
            max_size_ratio_deviation: 0.5,
            max_misses,
        }
    }

    fn region_at(x: u32, y: u32) -> Region {
        Region {
            bbox: BoundingBox::new(x, y, 3, 3),
            pixel_count: 9,
            centroid: (x as f64 + 1.0, y as f64 + 1.0),
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_new_region_spawns_track() {
        let mut tracker = RegionTracker::new(config(2)).unwrap();
        let tracks = tracker.update(vec![region_at(5, 5)], ms(0));
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, TrackId::new(1));
        assert_eq!(tracks[0].age, 1);
        assert_eq!(tracks[0].miss_count, 0);
        assert_eq!(tracks[0].state, TrackState::New);
    }

    #[test]
    fn test_match_updates_track() {
        let mut tracker = RegionTracker::new(config(2)).unwrap();
        tracker.update(vec![region_at(5, 5)], ms(0));
        let tracks = tracker.update(vec![region_at(8, 9)], ms(40));
        assert_eq!(tracks.len(), 1);
        let track = &tracks[0];
        assert_eq!(track.id, TrackId::new(1));
        assert_eq!(track.age, 2);
        assert_eq!(track.state, TrackState::Tracked);
        assert_eq!(track.velocity, (3.0, 4.0));
        assert_eq!(track.created_at, ms(0));
        assert_eq!(track.updated_at, ms(40));
    }

    #[test]
    fn test_miss_count_grows_then_resets() {
        let mut tracker = RegionTracker::new(config(3)).unwrap();
        tracker.update(vec![region_at(5, 5)], ms(0));

        let tracks = tracker.update(Vec::new(), ms(40));
        assert_eq!(tracks[0].miss_count, 1);
        assert_eq!(tracks[0].state, TrackState::Lost);

        let tracks = tracker.update(Vec::new(), ms(80));
        assert_eq!(tracks[0].miss_count, 2);
        assert_eq!(tracks[0].age, 1);

        let tracks = tracker.update(vec![region_at(7, 5)], ms(120));
        assert_eq!(tracks[0].miss_count, 0);
        assert_eq!(tracks[0].age, 2);
        assert_eq!(tracks[0].state, TrackState::Tracked);
        // displacement of 2 spread over 3 frames
        assert!((tracks[0].velocity.0 - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_prune_after_max_misses() {
        let mut tracker = RegionTracker::new(config(2)).unwrap();
        tracker.update(vec![region_at(5, 5)], ms(0));
        assert_eq!(tracker.update(Vec::new(), ms(1)).len(), 1);
        assert_eq!(tracker.update(Vec::new(), ms(2)).len(), 1);
        assert!(tracker.update(Vec::new(), ms(3)).is_empty());
        assert_eq!(tracker.last_pruned().len(), 1);
        assert_eq!(tracker.last_pruned()[0].state, TrackState::Pruned);
        assert!(!tracker.last_pruned()[0].state.is_live());
    }

    #[test]
    fn test_ids_never_reused_after_prune() {
        let mut tracker = RegionTracker::new(config(0)).unwrap();
        tracker.update(vec![region_at(5, 5)], ms(0));
        assert!(tracker.update(Vec::new(), ms(1)).is_empty());
        let tracks = tracker.update(vec![region_at(5, 5)], ms(2));
        assert_eq!(tracks[0].id, TrackId::new(2));
    }

    #[test]
    fn test_far_region_starts_new_track() {
        let mut tracker = RegionTracker::new(config(1)).unwrap();
        tracker.update(vec![region_at(0, 0)], ms(0));
        let tracks = tracker.update(vec![region_at(100, 100)], ms(1));
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].state, TrackState::Lost);
        assert_eq!(tracks[1].id, TrackId::new(2));
        assert_eq!(tracks[1].state, TrackState::New);
    }

    #[test]
    fn test_new_ids_follow_region_order() {
        let mut tracker = RegionTracker::new(config(1)).unwrap();
        let tracks = tracker.update(
            vec![region_at(0, 0), region_at(50, 0), region_at(0, 50)],
            ms(0),
        );
        let ids: Vec<u64> = tracks.iter().map(|t| t.id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(tracks[1].region, region_at(50, 0));
    }

    #[test]
    fn test_reset_restarts_ids() {
        let mut tracker = RegionTracker::new(config(1)).unwrap();
        tracker.update(vec![region_at(0, 0)], ms(0));
        tracker.reset();
        assert!(tracker.tracks().is_empty());
        let tracks = tracker.update(vec![region_at(0, 0)], ms(0));
        assert_eq!(tracks[0].id, TrackId::new(1));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut bad = config(1);
        bad.max_distance = -1.0;
        assert!(RegionTracker::new(bad).unwrap_err().is_configuration());

        let mut bad = config(1);
        bad.max_size_ratio_deviation = f64::INFINITY;
        assert!(RegionTracker::new(bad).unwrap_err().is_configuration());
    }
}
