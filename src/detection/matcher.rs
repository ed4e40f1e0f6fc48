/// Track-to-region assignment
///
/// Defines the interface the tracker uses to pair live tracks with the
/// current frame's candidate regions.
use super::region::Region;
use super::tracker::Track;

/// Gates a candidate pair must pass before it can be assigned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchGate {
    /// Maximum centroid distance in pixels.
    pub max_distance: f64,
    /// Maximum `Region::size_ratio_deviation`.
    pub max_size_ratio_deviation: f64,
}

impl MatchGate {
    /// Score of a pair, `None` when it fails a gate. Lower is better.
    ///
    /// The size deviation is scaled by `max_distance` so both terms are in
    /// pixels.
    pub fn score(&self, previous: &Region, candidate: &Region) -> Option<f64> {
        let distance = previous.centroid_distance(candidate);
        if distance > self.max_distance {
            return None;
        }
        let deviation = previous.size_ratio_deviation(candidate);
        if deviation > self.max_size_ratio_deviation {
            return None;
        }
        Some(distance + deviation * self.max_distance)
    }
}

/// One accepted pairing: indices into the tracks and regions slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub track: usize,
    pub region: usize,
}

/// Assignment strategy.
///
/// Implementations must be deterministic: equal inputs give equal output.
/// `tracks` arrive sorted by ascending id.
pub trait TrackMatcher: Send + Sync + std::fmt::Debug {
    fn assign(&self, tracks: &[Track], regions: &[Region], gate: &MatchGate) -> Vec<Assignment>;

    /// Matcher name (for logging)
    fn name(&self) -> &'static str;
}

/// Greedy nearest-first assignment.
///
/// Every gated pair is scored, pairs are taken best-first and a pair is kept
/// when neither side is already used. Ties go to the lower track id, then to
/// the earlier region. Not globally optimal.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyMatcher;

impl TrackMatcher for GreedyMatcher {
    fn assign(&self, tracks: &[Track], regions: &[Region], gate: &MatchGate) -> Vec<Assignment> {
        let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
        for (t, track) in tracks.iter().enumerate() {
            for (r, region) in regions.iter().enumerate() {
                if let Some(score) = gate.score(&track.region, region) {
                    candidates.push((score, t, r));
                }
            }
        }

        candidates.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| tracks[a.1].id.cmp(&tracks[b.1].id))
                .then_with(|| a.2.cmp(&b.2))
        });

        let mut used_track = vec![false; tracks.len()];
        let mut used_region = vec![false; regions.len()];
        let mut assignments = Vec::new();
        for (_, t, r) in candidates {
            if !used_track[t] && !used_region[r] {
                used_track[t] = true;
                used_region[r] = true;
                assignments.push(Assignment {
                    track: t,
                    region: r,
                });
            }
        }
        assignments
    }

    fn name(&self) -> &'static str {
        "GreedyMatcher"
    }
}
