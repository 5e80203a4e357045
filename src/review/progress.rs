use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Progress notifications emitted while a review runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewEvent {
    Status(String),
    /// Overall completion, 0..=100.
    Progress(u8),
    /// A piece of feedback text received from the streaming transfer.
    Fragment(String),
    Throughput { chunks: u64, elapsed: Duration },
    /// The incremental transfer failed and a single blocking request follows.
    FallbackToBlocking(String),
}

/// Sending half of the event channel; a sink without a channel drops everything.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<UnboundedSender<ReviewEvent>>,
}

impl ProgressSink {
    pub fn new(tx: UnboundedSender<ReviewEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn send(&self, event: ReviewEvent) {
        if let Some(tx) = &self.tx {
            // The receiver may already be gone when the caller stopped listening
            let _ = tx.send(event);
        }
    }

    pub fn status(&self, text: impl Into<String>) {
        self.send(ReviewEvent::Status(text.into()));
    }

    pub fn progress(&self, percent: u8) {
        self.send(ReviewEvent::Progress(percent.min(100)));
    }
}

/// Percentage reported while streaming: starts at 50 and saturates at 85.
pub fn streaming_percent(chunks: u64) -> u8 {
    (50 + chunks.saturating_mul(2) / 10).min(85) as u8
}
