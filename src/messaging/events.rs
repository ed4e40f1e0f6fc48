/// Event types for the application
///
/// Events represent things that have happened (past tense).
/// They are broadcast to all subscribers.
use crate::detection::evaluator::SentinelEvent;

/// Application events
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A track met the trigger policy
    Sentinel(SentinelEvent),

    /// A frame could not be processed and was skipped
    FrameRejected { index: u64, reason: String },

    /// The pipeline dropped all tracks
    PipelineReset { reason: String },

    /// The frame source is exhausted or the stream was aborted
    StreamFinished { frames: u64, events: u64 },
}

impl Event {
    /// Short name of the event kind (for logging)
    pub fn name(&self) -> &'static str {
        match self {
            Event::Sentinel(_) => "Sentinel",
            Event::FrameRejected { .. } => "FrameRejected",
            Event::PipelineReset { .. } => "PipelineReset",
            Event::StreamFinished { .. } => "StreamFinished",
        }
    }

    /// True for the last event of a stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::StreamFinished { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let event = Event::FrameRejected {
            index: 3,
            reason: "bad frame".to_string(),
        };
        assert_eq!(event.name(), "FrameRejected");
        assert!(!event.is_terminal());

        let event = Event::StreamFinished {
            frames: 10,
            events: 2,
        };
        assert_eq!(event.name(), "StreamFinished");
        assert!(event.is_terminal());
    }
}
