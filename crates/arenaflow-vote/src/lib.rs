//! Quorum voting for Arenaflow.
//!
//! A [`Vote`] is called by one participant on behalf of everyone in the
//! arena at that moment. Ballots are tallied as they arrive and the vote
//! ends on a YES majority or after a period without ballots.
//!
//! The vote needs a [`Scheduler`](arenaflow_tick::Scheduler) for its
//! once-a-second timeout check, so the host must hand it the task ids it
//! gets back from the timer (see [`Vote::run_task`]).

mod config;
mod error;
mod vote;

pub use config::{Choice, VoteConfig};
pub use error::VoteError;
pub use vote::{FailCause, Vote, VoteEvent, VoteListener, VoteOutcome};
