//! Arena lifecycle for Arenaflow.
//!
//! An arena admits participants, runs a cancellable pre-game countdown,
//! switches to play when it expires, notices when the last participant
//! leaves and resets itself for the next round.
//!
//! # Key types
//!
//! - [`Arena`]: the state machine, generic over the host's participant
//!   type and the minigame's hooks
//! - [`ArenaHooks`]: lifecycle callbacks a minigame implements
//! - [`ArenaCore`]: the part of the arena hooks can see and change
//! - [`ArenaConfig`] / [`ArenaState`]: settings and lifecycle states
//! - [`Countdown`]: the countdown counter

mod arena;
mod config;
mod countdown;
mod error;
mod hooks;

pub use arena::{Arena, ArenaCore, ArenaInfo};
pub use config::{ArenaConfig, ArenaState};
pub use countdown::{Countdown, RUSH_START_SECS};
pub use error::ArenaError;
pub use hooks::ArenaHooks;
