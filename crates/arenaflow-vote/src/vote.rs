//! The voting engine.

use std::collections::HashMap;
use std::sync::Arc;

use arenaflow_protocol::{Notice, Notifier, Participant, PlayerId};
use arenaflow_tick::{Scheduler, TaskId, TICKS_PER_SECOND};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{Choice, VoteConfig, VoteError};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a vote failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailCause {
    /// A ballot left YES short of a majority.
    Rejected,
    /// Nobody voted for longer than the timeout.
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOutcome {
    Succeeded,
    Failed(FailCause),
}

/// An outcome together with the vote it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEvent {
    pub subject: String,
    pub outcome: VoteOutcome,
}

/// Receives vote outcomes.
///
/// `Succeeded` and `Failed(TimedOut)` arrive at most once and end the vote.
/// `Failed(Rejected)` is reported after every ballot that leaves YES short
/// of a majority, so it can arrive several times and may be followed by a
/// success.
pub trait VoteListener {
    fn on_outcome(&mut self, subject: &str, outcome: VoteOutcome);
}

/// Forwards outcomes into a channel. A closed receiver drops them.
impl VoteListener for mpsc::UnboundedSender<VoteEvent> {
    fn on_outcome(&mut self, subject: &str, outcome: VoteOutcome) {
        let _ = self.send(VoteEvent {
            subject: subject.to_owned(),
            outcome,
        });
    }
}

// ---------------------------------------------------------------------------
// Vote
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Open,
    Concluded,
}

/// One vote on one subject.
///
/// The electorate is fixed when the vote is invoked. Every ballot is
/// evaluated immediately: YES from everyone, or from more than half of the
/// voters (integer division), succeeds.
pub struct Vote<L> {
    subject: String,
    config: VoteConfig,
    voters: Vec<PlayerId>,
    ballots: HashMap<PlayerId, Choice>,
    last_interaction: u64,
    task: Option<TaskId>,
    phase: Phase,
    scheduler: Arc<dyn Scheduler>,
    notifier: Arc<dyn Notifier>,
    listener: L,
}

impl<L: VoteListener> Vote<L> {
    pub fn new(
        subject: impl Into<String>,
        config: VoteConfig,
        listener: L,
        scheduler: Arc<dyn Scheduler>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            subject: subject.into(),
            config,
            voters: Vec::new(),
            ballots: HashMap::new(),
            last_interaction: 0,
            task: None,
            phase: Phase::Created,
            scheduler,
            notifier,
            listener,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn voters(&self) -> &[PlayerId] {
        &self.voters
    }

    pub fn ballots(&self) -> usize {
        self.ballots.len()
    }

    pub fn yes_votes(&self) -> usize {
        self.ballots.values().filter(|c| **c == Choice::Yes).count()
    }

    /// `true` between `invoke` and the end of the vote.
    pub fn is_open(&self) -> bool {
        self.phase == Phase::Open
    }

    pub fn is_concluded(&self) -> bool {
        self.phase == Phase::Concluded
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// Opens the vote for `voters` and starts the timeout check.
    pub fn invoke<P: Participant>(
        &mut self,
        voters: impl IntoIterator<Item = PlayerId>,
        initiator: &P,
    ) -> Result<(), VoteError> {
        if self.phase != Phase::Created {
            return Err(VoteError::AlreadyInvoked);
        }
        self.voters = voters.into_iter().collect();
        self.voters.sort_unstable();
        self.voters.dedup();
        self.last_interaction = self.scheduler.now();
        self.task = Some(self.scheduler.schedule_repeating(0, TICKS_PER_SECOND));
        self.phase = Phase::Open;

        info!(
            subject = %self.subject,
            initiator = %initiator.id(),
            voters = self.voters.len(),
            "vote started"
        );
        self.notifier.broadcast(
            &self.voters,
            &Notice::VoteStarted {
                initiator: initiator.name().to_owned(),
                subject: self.subject.clone(),
            },
        );
        Ok(())
    }

    /// Records a ballot and evaluates the vote.
    pub fn vote(&mut self, voter: PlayerId, choice: Choice) -> Result<(), VoteError> {
        if self.phase == Phase::Concluded {
            return Err(VoteError::Concluded);
        }
        if !self.voters.contains(&voter) {
            return Err(VoteError::NotEligible(voter));
        }
        if self.config.one_vote_per_voter && self.ballots.contains_key(&voter) {
            return Err(VoteError::AlreadyVoted(voter));
        }

        self.ballots.insert(voter, choice);
        self.last_interaction = self.scheduler.now();
        let yes = self.yes_votes();
        let eligible = self.voters.len();
        debug!(subject = %self.subject, %voter, ?choice, yes, eligible, "ballot cast");
        self.notifier.broadcast(
            &self.voters,
            &Notice::VoteTally {
                yes,
                eligible,
                subject: self.subject.clone(),
            },
        );

        if yes == eligible || yes > eligible / 2 {
            info!(subject = %self.subject, yes, eligible, "vote succeeded");
            self.conclude();
            self.listener.on_outcome(&self.subject, VoteOutcome::Succeeded);
        } else {
            self.listener
                .on_outcome(&self.subject, VoteOutcome::Failed(FailCause::Rejected));
        }
        Ok(())
    }

    /// Runs the timeout check if `task` is this vote's. Returns whether the
    /// task belonged to the vote.
    pub fn run_task(&mut self, task: TaskId) -> bool {
        if self.task != Some(task) {
            return false;
        }
        let idle = self.scheduler.now().saturating_sub(self.last_interaction);
        if idle > self.config.timeout_ticks() {
            info!(subject = %self.subject, idle_ticks = idle, "vote timed out");
            self.conclude();
            self.listener
                .on_outcome(&self.subject, VoteOutcome::Failed(FailCause::TimedOut));
        }
        true
    }

    /// Ends the vote without an outcome.
    pub fn abort(&mut self) {
        if self.phase != Phase::Concluded {
            debug!(subject = %self.subject, "vote aborted");
            self.conclude();
        }
    }

    fn conclude(&mut self) {
        if let Some(task) = self.task.take() {
            self.scheduler.cancel(task);
        }
        self.phase = Phase::Concluded;
    }
}
