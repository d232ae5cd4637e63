use serde::{Deserialize, Serialize};
use tracing::warn;

/// Recorder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Game ticks between two frames.
    pub interval_ticks: u64,

    /// Frames kept in memory. Once full, the oldest frame is dropped for
    /// every new one. The default holds 30 minutes at the default interval.
    pub max_frames: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            interval_ticks: 2,
            max_frames: 18_000,
        }
    }
}

impl RecorderConfig {
    pub fn validated(mut self) -> Self {
        if self.interval_ticks == 0 {
            warn!("recorder interval is 0, using 1");
            self.interval_ticks = 1;
        }
        if self.max_frames == 0 {
            warn!("recorder max_frames is 0, using 1");
            self.max_frames = 1;
        }
        self
    }
}
