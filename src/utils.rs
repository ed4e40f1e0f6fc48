use std::collections::VecDeque;
use std::time::Instant;

/// Frames kept by `LatencyStats::new`
pub const DEFAULT_LATENCY_WINDOW: usize = 1024;

/// Timing measurements for a single frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationTiming {
    pub segment_us: f64,
    pub extract_us: f64,
    pub track_us: f64,
    pub evaluate_us: f64,
    pub total_us: f64,
}

impl IterationTiming {
    pub fn new() -> Self {
        Self {
            segment_us: 0.0,
            extract_us: 0.0,
            track_us: 0.0,
            evaluate_us: 0.0,
            total_us: 0.0,
        }
    }

    pub fn total_ms(&self) -> f64 {
        self.total_us / 1000.0
    }
}

impl Default for IterationTiming {
    fn default() -> Self {
        Self::new()
    }
}

/// Microseconds elapsed since `start`
pub(crate) fn elapsed_us(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1_000_000.0
}

/// Mean and percentiles of one stage, in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StageStats {
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Statistics collector for latency measurements
///
/// Keeps a sliding window of the most recent frames; older timings are
/// dropped once the window is full.
#[derive(Debug, Clone)]
pub struct LatencyStats {
    timings: VecDeque<IterationTiming>,
    window: usize,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LATENCY_WINDOW)
    }

    /// Keep at most `capacity` timings (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let window = capacity.max(1);
        Self {
            timings: VecDeque::with_capacity(window),
            window,
        }
    }

    pub fn add(&mut self, timing: IterationTiming) {
        if self.timings.len() == self.window {
            self.timings.pop_front();
        }
        self.timings.push_back(timing);
    }

    /// Maximum number of timings retained
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.timings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }

    /// Calculate percentile from sorted data
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
        sorted[idx]
    }

    /// Calculate statistics for a specific stage
    pub fn stage_stats(&self, extract: impl Fn(&IterationTiming) -> f64) -> StageStats {
        if self.timings.is_empty() {
            return StageStats::default();
        }

        let mut values: Vec<f64> = self.timings.iter().map(&extract).collect();
        values.sort_by(|a, b| a.total_cmp(b));

        StageStats {
            mean: values.iter().sum::<f64>() / values.len() as f64,
            p50: Self::percentile(&values, 50.0),
            p95: Self::percentile(&values, 95.0),
            p99: Self::percentile(&values, 99.0),
        }
    }

    /// Log a per-stage latency table
    pub fn log_report(&self) {
        if self.timings.is_empty() {
            tracing::info!("No timing data collected");
            return;
        }

        tracing::info!("Latency report over the last {} frames", self.timings.len());

        let segment = self.stage_stats(|t| t.segment_us);
        let extract = self.stage_stats(|t| t.extract_us);
        let track = self.stage_stats(|t| t.track_us);
        let evaluate = self.stage_stats(|t| t.evaluate_us);
        let total = self.stage_stats(|t| t.total_us);

        tracing::info!("┌─────────────────┬───────────┬───────────┬───────────┬───────────┐");
        tracing::info!("│ Stage           │   Mean    │   p50     │   p95     │   p99     │");
        tracing::info!("├─────────────────┼───────────┼───────────┼───────────┼───────────┤");
        Self::log_row("Segment", segment);
        Self::log_row("Extract", extract);
        Self::log_row("Track", track);
        Self::log_row("Evaluate", evaluate);
        tracing::info!("├─────────────────┼───────────┼───────────┼───────────┼───────────┤");
        Self::log_row("TOTAL", total);
        tracing::info!("└─────────────────┴───────────┴───────────┴───────────┴───────────┘");

        let stages = [
            ("Segment", segment.p95),
            ("Extract", extract.p95),
            ("Track", track.p95),
            ("Evaluate", evaluate.p95),
        ];
        if let Some(bottleneck) = stages.iter().max_by(|a, b| a.1.total_cmp(&b.1)) {
            tracing::info!("Bottleneck: {} ({:.0} µs p95)", bottleneck.0, bottleneck.1);
        }
    }

    fn log_row(name: &str, stats: StageStats) {
        tracing::info!(
            "│ {:<15} │ {:>6.0} µs │ {:>6.0} µs │ {:>6.0} µs │ {:>6.0} µs │",
            name,
            stats.mean,
            stats.p50,
            stats.p95,
            stats.p99
        );
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}
