/// Stream driver
///
/// Pulls frames from a `FrameSource`, runs them through the pipeline and
/// publishes the outcome on the event bus.
///
/// Policy per frame:
/// - `InvalidInput` from the pipeline, or a bad frame from the source: skip
///   it and publish `FrameRejected`
/// - `Configuration` from the pipeline (frame size changed): reset, publish
///   `PipelineReset` and process the frame once more
/// - anything else: abort the stream
use anyhow::Context;

use crate::detection::pipeline::Pipeline;
use crate::error::{AppResult, SentinelError};
use crate::messaging::{Event, EventBus};
use crate::source::FrameSource;
use crate::utils::{LatencyStats, DEFAULT_LATENCY_WINDOW};

/// Counters for one finished stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Frames pulled from the source, including rejected ones
    pub frames: u64,
    pub processed: u64,
    pub rejected: u64,
    pub resets: u64,
    pub events: u64,
}

pub struct SentinelRunner {
    pipeline: Pipeline,
    bus: EventBus,
    stats: LatencyStats,
}

impl SentinelRunner {
    pub fn new(pipeline: Pipeline, bus: EventBus) -> Self {
        Self::with_latency_window(pipeline, bus, DEFAULT_LATENCY_WINDOW)
    }

    /// Keep timings for at most the last `window` frames.
    pub fn with_latency_window(pipeline: Pipeline, bus: EventBus, window: usize) -> Self {
        Self {
            pipeline,
            bus,
            stats: LatencyStats::with_capacity(window),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn stats(&self) -> &LatencyStats {
        &self.stats
    }

    /// Drain `source`. `StreamFinished` is published even when the stream
    /// aborts.
    pub fn run(&mut self, source: &mut dyn FrameSource) -> AppResult<RunSummary> {
        tracing::info!("Streaming from {}", source.describe());
        let mut summary = RunSummary::default();
        let result = self.drain(source, &mut summary);

        self.bus.publish(Event::StreamFinished {
            frames: summary.frames,
            events: summary.events,
        });
        tracing::info!(
            "Stream finished: {} frames ({} processed, {} rejected, {} resets), {} events",
            summary.frames,
            summary.processed,
            summary.rejected,
            summary.resets,
            summary.events
        );

        result.map(|_| summary)
    }

    fn drain(&mut self, source: &mut dyn FrameSource, summary: &mut RunSummary) -> AppResult<()> {
        while let Some(next) = source.next_frame() {
            let index = summary.frames;
            summary.frames += 1;

            let frame = match next {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!("Skipping frame {}: {}", index, e);
                    summary.rejected += 1;
                    self.bus.publish(Event::FrameRejected {
                        index,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let outcome = match self.pipeline.process(&frame) {
                Err(SentinelError::Configuration(reason)) => {
                    tracing::warn!("Resetting pipeline at frame {}: {}", index, reason);
                    self.pipeline.reset();
                    summary.resets += 1;
                    self.bus.publish(Event::PipelineReset { reason });
                    self.pipeline.process(&frame)
                }
                other => other,
            };

            match outcome {
                Ok(events) => {
                    summary.processed += 1;
                    if let Some(timing) = self.pipeline.last_timing() {
                        self.stats.add(timing);
                    }
                    for event in events {
                        summary.events += 1;
                        self.bus.publish(Event::Sentinel(event));
                    }
                }
                Err(SentinelError::InvalidInput(reason)) => {
                    tracing::warn!("Skipping frame {}: {}", index, reason);
                    summary.rejected += 1;
                    self.bus.publish(Event::FrameRejected { index, reason });
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Aborting stream at frame {}", index));
                }
            }
        }
        Ok(())
    }
}
