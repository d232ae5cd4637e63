//! Notices: everything the core asks the host to tell participants.
//!
//! The core never formats chat lines or touches a socket. It produces a
//! typed [`Notice`] and hands it to a [`Notifier`] together with the list of
//! recipients. The host decides how to render it (chat line, boss bar,
//! network message). `Display` gives the default chat rendering.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{DisconnectReason, PlayerId};

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

/// A message for one or more participants.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, e.g.
/// `{ "type": "VoteTally", "yes": 2, "eligible": 3, "subject": "..." }`,
/// which is what hosts forwarding notices over a network want.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notice {
    // -- Arena membership --
    /// Someone joined. Counts are after the join.
    PlayerJoined {
        name: String,
        players: usize,
        minimum: usize,
        capacity: usize,
    },

    /// Someone left.
    PlayerLeft {
        name: String,
        reason: DisconnectReason,
    },

    /// An action by the recipient was refused.
    Rejected { reason: String },

    /// The arena's lifecycle state changed (e.g. it started resetting).
    StateChanged { state: String },

    // -- Countdown --
    /// The pre-game countdown began.
    CountdownStarted { seconds: i64 },

    /// The pre-game countdown stopped (expired or cancelled).
    CountdownStopped,

    /// A chat line with the time remaining.
    Countdown { text: String, seconds_left: i64 },

    /// Visual time indicator (boss bar). `percent` is in `0.0..=100.0`.
    CountdownBar { text: String, percent: f32 },

    /// Remove the visual time indicator.
    CountdownBarCleared,

    // -- Voting --
    /// A vote was called.
    VoteStarted { initiator: String, subject: String },

    /// Current YES count after a ballot.
    VoteTally {
        yes: usize,
        eligible: usize,
        subject: String,
    },

    // -- Recording --
    /// Sent once when capture starts, before `RecordingStarted`.
    RecordingWarning,
    RecordingStarted,
    RecordingStopped,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlayerJoined {
                name,
                players,
                minimum,
                capacity,
            } => write!(
                f,
                "Player '{name}' joined arena! ({players}/{minimum} - {capacity})"
            ),
            Self::PlayerLeft { name, reason } => {
                write!(f, "Player '{name}' has left arena ({reason})!")
            }
            Self::Rejected { reason } => write!(f, "{reason}"),
            Self::StateChanged { state } => write!(f, "Arena is now {state}"),
            Self::CountdownStarted { seconds } => {
                write!(f, "Countdown started ({seconds}s)")
            }
            Self::CountdownStopped => write!(f, "Countdown stopped"),
            Self::Countdown { text, .. } | Self::CountdownBar { text, .. } => {
                write!(f, "{text}")
            }
            Self::CountdownBarCleared => Ok(()),
            Self::VoteStarted { initiator, subject } => write!(
                f,
                "[VOTE] Player {initiator} started the vote for {subject}."
            ),
            Self::VoteTally {
                yes,
                eligible,
                subject,
            } => write!(f, "[VOTE] {yes}/{eligible} players voted for {subject}!"),
            Self::RecordingWarning => {
                write!(f, "[Record] Warning, this match is recorded!")
            }
            Self::RecordingStarted => write!(f, "[Record] Recording started!"),
            Self::RecordingStopped => write!(f, "[Record] Recording stopped!"),
        }
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// The notification channel the host provides.
///
/// Components receive an `Arc<dyn Notifier>` at construction. Delivery is
/// fire-and-forget: a notifier must not block and has no way to report
/// failure back to the core.
pub trait Notifier: Send + Sync {
    /// Delivers `notice` to every id in `recipients`.
    fn broadcast(&self, recipients: &[PlayerId], notice: &Notice);

    /// Delivers `notice` to a single participant.
    fn notify(&self, recipient: PlayerId, notice: &Notice) {
        self.broadcast(std::slice::from_ref(&recipient), notice);
    }
}

/// One notice addressed to a set of participants.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub recipients: Vec<PlayerId>,
    pub notice: Notice,
}

/// Forwards every broadcast into a channel the host drains.
///
/// Empty recipient lists are dropped. A closed receiver silently drops
/// the delivery (the host is shutting down).
impl Notifier for mpsc::UnboundedSender<Delivery> {
    fn broadcast(&self, recipients: &[PlayerId], notice: &Notice) {
        if recipients.is_empty() {
            return;
        }
        let _ = self.send(Delivery {
            recipients: recipients.to_vec(),
            notice: notice.clone(),
        });
    }
}

// =========================================================================
// Tests
// =========================================================================
