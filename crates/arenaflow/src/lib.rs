//! # Arenaflow
//!
//! Arena lifecycle, voting and match recording for multiplayer minigame
//! servers.
//!
//! A minigame implements [`ArenaHooks`] for its lifecycle callbacks and
//! [`Participant`] over its player type. Arenaflow runs each arena on its
//! own Tokio task, handles admission and the pre-game countdown, and can
//! run votes and record matches in the same arena.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arenaflow::prelude::*;
//!
//! // Implement Participant for your player type, then:
//! // let mut registry = ArenaRegistry::new();
//! // let key = ArenaKey::new("spleef", "Alpha");
//! // registry.spawn(ArenaHostBuilder::new("spleef", "Alpha").notifier(notifier), ())?;
//! // registry.join(&key, player).await?;
//! ```

mod error;
mod host;
mod registry;

pub use error::ArenaflowError;
pub use host::{ArenaHandle, ArenaHostBuilder, ArenaKey, HostConfig};
pub use registry::ArenaRegistry;

pub use arenaflow_arena::{
    Arena, ArenaConfig, ArenaCore, ArenaError, ArenaHooks, ArenaInfo, ArenaState, Countdown,
};
pub use arenaflow_protocol::{
    Delivery, DisconnectReason, Location, Notice, Notifier, Participant, PlayerId,
};
pub use arenaflow_replay::{
    DirectorySink, Frame, MatchRecord, MatchRecorder, RecordError, RecordSink, RecorderConfig,
};
pub use arenaflow_tick::{Scheduler, TaskId, TaskTimer, TickScheduler, TICKS_PER_SECOND};
pub use arenaflow_vote::{
    Choice, FailCause, Vote, VoteConfig, VoteError, VoteEvent, VoteListener, VoteOutcome,
};

/// Everything a minigame usually needs, in one import.
pub mod prelude {
    pub use crate::{
        ArenaConfig, ArenaCore, ArenaHandle, ArenaHooks, ArenaHostBuilder, ArenaInfo, ArenaKey,
        ArenaRegistry, ArenaState, ArenaflowError, Choice, Delivery, DisconnectReason,
        HostConfig, Location, Notice, Notifier, Participant, PlayerId, VoteEvent, VoteOutcome,
    };
}
