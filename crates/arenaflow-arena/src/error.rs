//! Error types for the arena layer.

use arenaflow_protocol::PlayerId;

/// Errors returned by arena operations.
///
/// All of them are reported synchronously and leave the arena untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    /// The participant is already in this arena.
    #[error("player {0} is already playing in arena {1}")]
    AlreadyJoined(PlayerId, String),

    /// The participant is not in this arena.
    #[error("player {0} is not in arena {1}")]
    NotInArena(PlayerId, String),

    /// No free slot left.
    #[error("arena {0} is full")]
    ArenaFull(String),

    /// The arena is in a state that doesn't allow this operation, e.g.
    /// joining a running game without late joins.
    #[error("invalid arena state for this operation: {0}")]
    InvalidState(String),
}
