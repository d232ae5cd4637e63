//! Shared vocabulary for Arenaflow.
//!
//! This crate defines the "language" the arena core and its host speak:
//!
//! - **Types** ([`PlayerId`], [`Location`], [`DisconnectReason`]): the
//!   plain data that flows between the host's world and the core.
//! - **Notices** ([`Notice`], [`Notifier`], [`Delivery`]): the messages
//!   the core asks the host to show to participants.
//! - **Participants** ([`Participant`]): the narrow accessor the core needs
//!   over a host-side player object.
//!
//! # Architecture
//!
//! The protocol layer sits between the host environment (game server,
//! world model, chat) and the arena core. It doesn't know about countdowns
//! or votes; it only knows what a participant looks like and what can be
//! said to one.
//!
//! ```text
//! Host world (players) → Protocol (Participant, Notice) → Arena core
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod notice;
mod participant;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

// Users write `use arenaflow_protocol::Notice` instead of reaching into
// the submodules.

pub use notice::{Delivery, Notice, Notifier};
pub use participant::Participant;
pub use types::{DisconnectReason, Location, PlayerId};
