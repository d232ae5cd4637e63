//! Arena configuration and lifecycle states.

use std::fmt;

use arenaflow_protocol::Location;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// ArenaConfig
// ---------------------------------------------------------------------------

/// Settings for one arena.
///
/// `#[serde(default)]` lets a config file name only the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Maximum participants (slots).
    pub capacity: usize,

    /// Participants required before the countdown starts.
    pub min_players: usize,

    /// Countdown length in seconds.
    pub countdown_secs: u32,

    /// Cancel a running countdown whenever someone leaves.
    pub countdown_can_cancel: bool,

    /// Accept joins after the game has started (capacity is not enforced
    /// for those late joins).
    pub join_after_start: bool,

    /// When `false`, a participant who respawns is removed from the arena.
    pub respawn_allowed: bool,

    /// Block inventory interaction for participants.
    pub inventory_disabled: bool,

    /// Teleport participants to the lobby on join and to the game spawn
    /// when the game starts.
    pub teleport_players: bool,

    /// Reset the arena automatically when the last participant leaves a
    /// running game.
    pub auto_reset: bool,

    /// Show the visual time indicator during the countdown.
    pub use_countdown_bar: bool,

    /// Countdown chat line. `%timeleft%` is replaced with the seconds left.
    pub countdown_format: String,

    pub lobby: Option<Location>,
    pub game_spawn: Option<Location>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            capacity: 8,
            min_players: 2,
            countdown_secs: 10,
            countdown_can_cancel: true,
            join_after_start: false,
            respawn_allowed: true,
            inventory_disabled: true,
            teleport_players: true,
            auto_reset: true,
            use_countdown_bar: true,
            countdown_format: "%timeleft% seconds to game start!".to_string(),
            lobby: None,
            game_spawn: None,
        }
    }
}

impl ArenaConfig {
    /// Fixes values that would make the arena unusable.
    ///
    /// - `capacity` is at least 1.
    /// - `min_players` is at most `capacity`.
    pub fn validated(mut self) -> Self {
        if self.capacity == 0 {
            warn!("arena capacity is 0, using 1");
            self.capacity = 1;
        }
        if self.min_players > self.capacity {
            warn!(
                min_players = self.min_players,
                capacity = self.capacity,
                "min_players exceeds capacity, clamping"
            );
            self.min_players = self.capacity;
        }
        self
    }

    /// Whether the arena has everything it needs to host a game: both
    /// locations and a non-zero minimum.
    pub fn is_prepared(&self) -> bool {
        self.lobby.is_some() && self.game_spawn.is_some() && self.min_players != 0
    }

    /// Renders the countdown chat line.
    pub fn format_countdown(&self, seconds_left: i64) -> String {
        self.countdown_format
            .replace("%timeleft%", &seconds_left.to_string())
    }
}

// ---------------------------------------------------------------------------
// ArenaState
// ---------------------------------------------------------------------------

/// Lifecycle state of an arena.
///
/// ```text
/// WaitingEmpty ⇄ WaitingPlayers → Playing → Resetting → WaitingEmpty
/// ```
///
/// The machine has no terminal state; an arena cycles for as long as the
/// host keeps it registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArenaState {
    /// Nobody is in the arena.
    WaitingEmpty,
    /// Participants are waiting in the lobby (countdown may be running).
    WaitingPlayers,
    /// The game is running.
    Playing,
    /// Transient, while `reset()` runs.
    Resetting,
}

impl ArenaState {
    pub fn is_waiting(&self) -> bool {
        matches!(self, Self::WaitingEmpty | Self::WaitingPlayers)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl fmt::Display for ArenaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingEmpty => write!(f, "WAITING_EMPTY"),
            Self::WaitingPlayers => write!(f, "WAITING_PLAYERS"),
            Self::Playing => write!(f, "PLAYING"),
            Self::Resetting => write!(f, "RESETTING"),
        }
    }
}
