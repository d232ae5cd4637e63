use arenaflow_protocol::PlayerId;

/// Errors returned by [`Vote`](crate::Vote) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoteError {
    /// The voter was not in the arena when the vote was called.
    #[error("player {0} can't vote on this subject")]
    NotEligible(PlayerId),

    /// One ballot per voter and this voter already cast one.
    #[error("player {0} already voted")]
    AlreadyVoted(PlayerId),

    #[error("vote was already invoked")]
    AlreadyInvoked,

    /// The vote succeeded, timed out or was aborted.
    #[error("vote is over")]
    Concluded,
}
