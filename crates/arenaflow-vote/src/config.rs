//! Vote settings and ballot choices.

use arenaflow_tick::TICKS_PER_SECOND;
use serde::{Deserialize, Serialize};

/// A ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Choice {
    Yes,
    No,
}

/// Settings for one vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteConfig {
    /// Seconds without a ballot after which the vote fails.
    pub timeout_secs: u64,

    /// Reject a second ballot from the same voter. When `false`, a new
    /// ballot replaces the old one.
    pub one_vote_per_voter: bool,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            one_vote_per_voter: true,
        }
    }
}

impl VoteConfig {
    pub fn timeout_ticks(&self) -> u64 {
        self.timeout_secs.saturating_mul(TICKS_PER_SECOND)
    }
}
