//! Core data types shared by every Arenaflow crate.
//!
//! These are the values that cross the boundary between the host world and
//! the arena core: who a participant is, where they stand, and why they
//! left.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The stable identifier of a participant.
///
/// This is a "newtype wrapper" around `u64`: the host hands out one per
/// player and it never changes for the lifetime of that player. Wrapping it
/// keeps it from being confused with the compact session-local ids the
/// match recorder assigns.
///
/// `#[serde(transparent)]` serializes `PlayerId(42)` as plain `42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

/// `tracing::info!(%player_id, "joined")` prints "P-42".
impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A position in the host world, plus the direction the entity faces.
///
/// Coordinates are double precision like the host's world model; the two
/// angles are single precision. The field order (`x, y, z, yaw, pitch`) is
/// the order used everywhere a location is written out.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Horizontal rotation in degrees.
    #[serde(default)]
    pub yaw: f32,
    /// Vertical rotation in degrees.
    #[serde(default)]
    pub pitch: f32,
}

impl Location {
    /// A location facing yaw 0, pitch 0.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Returns the same position with the given facing.
    pub fn facing(self, yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch, ..self }
    }
}

// ---------------------------------------------------------------------------
// DisconnectReason
// ---------------------------------------------------------------------------

/// Why a participant left an arena.
///
/// Shown to the remaining participants in the leave notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisconnectReason {
    /// The participant asked to leave.
    PlayerLeave,
    /// The participant's connection to the host dropped.
    PlayerDisconnect,
    /// The game removed the participant (e.g. died with respawn disabled).
    LeaveByGame,
    /// An operator removed the participant.
    Kicked,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlayerLeave => write!(f, "PLAYER_LEAVE"),
            Self::PlayerDisconnect => write!(f, "PLAYER_DISCONNECT"),
            Self::LeaveByGame => write!(f, "LEAVE_BY_GAME"),
            Self::Kicked => write!(f, "KICKED"),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_location_facing_keeps_position() {
        let loc = Location::new(1.5, 64.0, -3.25).facing(90.0, -15.0);
        assert_eq!(loc.x, 1.5);
        assert_eq!(loc.y, 64.0);
        assert_eq!(loc.z, -3.25);
        assert_eq!(loc.yaw, 90.0);
        assert_eq!(loc.pitch, -15.0);
    }

    #[test]
    fn test_location_angles_default_when_missing() {
        // Config files usually only give coordinates for a spawn point.
        let loc: Location =
            serde_json::from_str(r#"{"x": 1.0, "y": 2.0, "z": 3.0}"#).unwrap();
        assert_eq!(loc, Location::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_disconnect_reason_display_matches_wire_name() {
        assert_eq!(DisconnectReason::LeaveByGame.to_string(), "LEAVE_BY_GAME");
        let json = serde_json::to_string(&DisconnectReason::PlayerDisconnect).unwrap();
        assert_eq!(json, "\"PLAYER_DISCONNECT\"");
    }
}
