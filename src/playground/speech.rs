//! Fire-and-forget announcement of query results

use tracing::info;

pub trait SpeechSink: Send + Sync {
    /// Announce `text`; must not block and must not fail the run
    fn speak(&self, text: &str);
}

/// Writes announcements to the log instead of an audio device
#[derive(Debug, Clone, Copy)]
pub struct TracingSpeechSink {
    rate: f32,
}

impl TracingSpeechSink {
    pub fn new(rate: f32) -> Self {
        Self { rate }
    }
}

impl Default for TracingSpeechSink {
    fn default() -> Self {
        Self::new(1.5)
    }
}

impl SpeechSink for TracingSpeechSink {
    fn speak(&self, text: &str) {
        info!(rate = self.rate, "speak: {}", text);
    }
}
