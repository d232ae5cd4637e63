//! The `ArenaHooks` trait: the extension point for minigame developers.
//!
//! The arena calls these methods at lifecycle boundaries; a minigame only
//! overrides the ones it cares about.

use arenaflow_protocol::Participant;

use crate::{ArenaCore, ArenaState};

/// Callbacks invoked by [`Arena`](crate::Arena) at lifecycle boundaries.
///
/// Every method receives the arena core mutably, so a hook can broadcast,
/// teleport, change state or call [`ArenaCore::request_reset`]. A requested
/// reset runs as soon as the hook returns.
///
/// All methods default to no-ops, except [`on_reset`](Self::on_reset),
/// which puts the arena back in `WaitingEmpty`. A minigame that overrides
/// `on_reset` must leave the arena in that state (or call the default).
///
/// `()` implements the trait for arenas that need no custom behaviour.
pub trait ArenaHooks<P: Participant> {
    /// The pre-game countdown was started.
    fn on_countdown_start(&mut self, _arena: &mut ArenaCore<P>) {}

    /// A leave cancelled a running countdown.
    fn on_countdown_cancelled(&mut self, _arena: &mut ArenaCore<P>) {}

    /// Someone joined but the arena is still below its minimum.
    fn on_not_enough_players(&mut self, _arena: &mut ArenaCore<P>) {}

    /// The countdown expired and participants are at the game spawn.
    ///
    /// Runs before the arena is marked started: `is_started()` is still
    /// `false` here and the state switches to `Playing` once the hook
    /// returns.
    fn on_game_start(&mut self, _arena: &mut ArenaCore<P>) {}

    /// The last participant left a running game.
    fn on_game_end(&mut self, _arena: &mut ArenaCore<P>) {}

    /// The arena was reset. Participants are already cleared.
    fn on_reset(&mut self, arena: &mut ArenaCore<P>) {
        arena.set_state(ArenaState::WaitingEmpty);
    }
}

impl<P: Participant> ArenaHooks<P> for () {}
