//! Unified error type for Arenaflow.

use arenaflow_arena::ArenaError;
use arenaflow_replay::RecordError;
use arenaflow_vote::VoteError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attributes let `?` convert sub-crate errors, so code that
/// talks to arena hosts and the registry deals with this one type.
#[derive(Debug, thiserror::Error)]
pub enum ArenaflowError {
    /// Admission, membership or lifecycle error from the arena itself.
    #[error(transparent)]
    Arena(#[from] ArenaError),

    #[error(transparent)]
    Vote(#[from] VoteError),

    #[error(transparent)]
    Record(#[from] RecordError),

    /// The arena's host task is gone (shut down or panicked).
    #[error("arena {0} is unavailable")]
    Unavailable(String),

    /// An arena with this minigame and name is already registered.
    #[error("arena {0} already exists")]
    DuplicateArena(String),

    #[error("arena {0} not found")]
    NotFound(String),

    #[error("no vote in progress in arena {0}")]
    NoActiveVote(String),

    #[error("a vote is already in progress in arena {0}")]
    VoteInProgress(String),
}

#[cfg(test)]
mod tests {
    use arenaflow_protocol::PlayerId;

    use super::*;

    #[test]
    fn test_from_arena_error() {
        let err = ArenaError::ArenaFull("alpha".into());
        let unified: ArenaflowError = err.into();
        assert!(matches!(unified, ArenaflowError::Arena(_)));
        assert_eq!(unified.to_string(), "arena alpha is full");
    }

    #[test]
    fn test_from_vote_error() {
        let unified: ArenaflowError = VoteError::AlreadyVoted(PlayerId(3)).into();
        assert!(matches!(unified, ArenaflowError::Vote(_)));
        assert!(unified.to_string().contains("P-3"));
    }

    #[test]
    fn test_from_record_error() {
        let io = std::io::Error::other("disk full");
        let unified: ArenaflowError = RecordError::from(io).into();
        assert!(matches!(unified, ArenaflowError::Record(RecordError::Io(_))));
        assert!(unified.to_string().contains("disk full"));
    }

    #[test]
    fn test_host_errors_name_the_arena() {
        assert_eq!(
            ArenaflowError::NotFound("spleef/alpha".into()).to_string(),
            "arena spleef/alpha not found"
        );
    }
}
