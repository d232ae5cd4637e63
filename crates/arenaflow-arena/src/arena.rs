//! The arena state machine.
//!
//! An [`Arena`] is split in two halves: the [`ArenaCore`] (participants,
//! state, countdown, injected services) and the minigame's [`ArenaHooks`].
//! Hooks get `&mut ArenaCore` while the arena keeps `&mut H`, so both can be
//! borrowed at once.

use std::collections::HashMap;
use std::sync::Arc;

use arenaflow_protocol::{DisconnectReason, Location, Notice, Notifier, Participant, PlayerId};
use arenaflow_tick::{Scheduler, TICKS_PER_SECOND};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::countdown::{Countdown, RUSH_START_SECS};
use crate::{ArenaConfig, ArenaError, ArenaHooks, ArenaState};

// ---------------------------------------------------------------------------
// ArenaInfo
// ---------------------------------------------------------------------------

/// A snapshot of arena metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArenaInfo {
    pub minigame: String,
    pub name: String,
    pub state: ArenaState,
    pub player_count: usize,
    pub min_players: usize,
    pub capacity: usize,
    pub countdown_running: bool,
    pub time_left: i64,
}

// ---------------------------------------------------------------------------
// ArenaCore
// ---------------------------------------------------------------------------

/// Everything an arena owns except its hooks.
pub struct ArenaCore<P> {
    minigame: String,
    name: String,
    config: ArenaConfig,
    state: ArenaState,
    started: bool,
    participants: HashMap<PlayerId, P>,
    countdown: Countdown,
    reset_requested: bool,
    resets: u64,
    scheduler: Arc<dyn Scheduler>,
    notifier: Arc<dyn Notifier>,
}

impl<P: Participant> ArenaCore<P> {
    pub fn minigame(&self) -> &str {
        &self.minigame
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn state(&self) -> ArenaState {
        self.state
    }

    /// Overrides the lifecycle state. Meant for hooks (`on_reset` must end
    /// in `WaitingEmpty`).
    pub fn set_state(&mut self, state: ArenaState) {
        if self.state != state {
            debug!(arena = %self.name, from = %self.state, to = %state, "state changed");
        }
        self.state = state;
    }

    /// `true` between countdown expiry and the next reset.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn player_count(&self) -> usize {
        self.participants.len()
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.participants.contains_key(&id)
    }

    /// How many times the arena has been reset, whether by a caller, by a
    /// hook or after the last participant left. Owners of per-round state
    /// compare it between calls to notice a new round.
    pub fn reset_count(&self) -> u64 {
        self.resets
    }

    pub fn participant(&self, id: PlayerId) -> Option<&P> {
        self.participants.get(&id)
    }

    pub fn participant_mut(&mut self, id: PlayerId) -> Option<&mut P> {
        self.participants.get_mut(&id)
    }

    /// All participants, in no particular order.
    pub fn participants(&self) -> impl Iterator<Item = &P> {
        self.participants.values()
    }

    /// Participant ids in ascending order.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.participants.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// The scheduler this arena was built with, for components that live
    /// next to it (votes, recorders).
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Sends `notice` to every participant.
    pub fn broadcast(&self, notice: &Notice) {
        self.notifier.broadcast(&self.player_ids(), notice);
    }

    pub fn notify(&self, id: PlayerId, notice: &Notice) {
        self.notifier.notify(id, notice);
    }

    /// Resets a participant's inventory.
    pub fn clear_player(&mut self, id: PlayerId) -> Result<(), ArenaError> {
        let participant = self
            .participants
            .get_mut(&id)
            .ok_or_else(|| ArenaError::NotInArena(id, self.name.clone()))?;
        participant.clear_inventory();
        Ok(())
    }

    /// Moves every participant to `location`.
    pub fn teleport_all(&mut self, location: &Location) {
        for participant in self.participants.values_mut() {
            participant.teleport(location);
        }
    }

    /// Stops the countdown if it is running. Returns whether it was.
    pub fn stop_countdown(&mut self) -> bool {
        let Some(task) = self.countdown.stop() else {
            return false;
        };
        self.scheduler.cancel(task);
        debug!(arena = %self.name, %task, "countdown stopped");
        self.broadcast(&Notice::CountdownStopped);
        true
    }

    /// Asks the arena to reset once the current hook returns.
    pub fn request_reset(&mut self) {
        self.reset_requested = true;
    }

    fn update_state(&mut self) {
        if self.started {
            return;
        }
        let state = if self.participants.is_empty() {
            ArenaState::WaitingEmpty
        } else {
            ArenaState::WaitingPlayers
        };
        self.set_state(state);
    }

    fn info(&self) -> ArenaInfo {
        ArenaInfo {
            minigame: self.minigame.clone(),
            name: self.name.clone(),
            state: self.state,
            player_count: self.participants.len(),
            min_players: self.config.min_players,
            capacity: self.config.capacity,
            countdown_running: self.countdown.is_running(),
            time_left: self.countdown.time_left(),
        }
    }
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// One arena: admission, countdown, game start, end detection and reset.
///
/// The arena is not `Sync` on its own terms; the host gives each arena to a
/// single task and routes everything through it.
pub struct Arena<P, H = ()> {
    core: ArenaCore<P>,
    hooks: H,
}

impl<P: Participant, H: ArenaHooks<P>> Arena<P, H> {
    pub fn new(
        minigame: impl Into<String>,
        name: impl Into<String>,
        config: ArenaConfig,
        hooks: H,
        scheduler: Arc<dyn Scheduler>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let config = config.validated();
        Self {
            core: ArenaCore {
                minigame: minigame.into(),
                name: name.into(),
                countdown: Countdown::new(config.countdown_secs),
                config,
                state: ArenaState::WaitingEmpty,
                started: false,
                participants: HashMap::new(),
                reset_requested: false,
                resets: 0,
                scheduler,
                notifier,
            },
            hooks,
        }
    }

    pub fn core(&self) -> &ArenaCore<P> {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut ArenaCore<P> {
        &mut self.core
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn state(&self) -> ArenaState {
        self.core.state
    }

    pub fn player_count(&self) -> usize {
        self.core.participants.len()
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.core.contains(id)
    }

    pub fn info(&self) -> ArenaInfo {
        self.core.info()
    }

    /// Adds a participant.
    ///
    /// A rejected participant is dropped and receives a `Rejected` notice.
    pub fn join(&mut self, mut participant: P) -> Result<(), ArenaError> {
        let id = participant.id();
        if let Err(e) = self.check_join(id) {
            info!(arena = %self.core.name, %id, error = %e, "join rejected");
            self.core.notify(
                id,
                &Notice::Rejected {
                    reason: e.to_string(),
                },
            );
            return Err(e);
        }

        let late_join = self.core.state.is_playing();
        let name = participant.name().to_owned();
        participant.clear_inventory();
        self.core.participants.insert(id, participant);
        let players = self.core.participants.len();
        info!(arena = %self.core.name, %id, players, late_join, "player joined");

        if !self.core.started {
            self.try_start_countdown();
        }
        if players == self.core.config.capacity {
            self.core.countdown.clamp_to(RUSH_START_SECS);
        }
        self.core.update_state();

        self.core.broadcast(&Notice::PlayerJoined {
            name,
            players,
            minimum: self.core.config.min_players,
            capacity: self.core.config.capacity,
        });

        if self.core.config.teleport_players {
            let target = if late_join {
                self.core.config.game_spawn
            } else {
                self.core.config.lobby
            };
            if let (Some(target), Some(p)) = (target, self.core.participants.get_mut(&id)) {
                p.teleport(&target);
            }
        }
        Ok(())
    }

    fn check_join(&self, id: PlayerId) -> Result<(), ArenaError> {
        if self.core.participants.contains_key(&id) {
            return Err(ArenaError::AlreadyJoined(id, self.core.name.clone()));
        }
        let late_joins = self.core.config.join_after_start;
        match self.core.state {
            ArenaState::Resetting => {
                return Err(ArenaError::InvalidState(format!(
                    "arena {} is resetting",
                    self.core.name
                )));
            }
            ArenaState::Playing if late_joins => return Ok(()),
            ArenaState::Playing => {
                return Err(ArenaError::InvalidState(format!(
                    "arena {} is already playing",
                    self.core.name
                )));
            }
            ArenaState::WaitingEmpty | ArenaState::WaitingPlayers => {}
        }
        if self.core.participants.len() >= self.core.config.capacity {
            return Err(ArenaError::ArenaFull(self.core.name.clone()));
        }
        Ok(())
    }

    /// Removes a participant and returns it to the caller.
    pub fn leave(&mut self, id: PlayerId, reason: DisconnectReason) -> Result<P, ArenaError> {
        let participant = self
            .core
            .participants
            .remove(&id)
            .ok_or_else(|| ArenaError::NotInArena(id, self.core.name.clone()))?;
        info!(
            arena = %self.core.name,
            %id,
            %reason,
            players = self.core.participants.len(),
            "player left"
        );
        self.core.broadcast(&Notice::PlayerLeft {
            name: participant.name().to_owned(),
            reason,
        });
        if self.core.config.use_countdown_bar && self.core.countdown.is_running() {
            self.core.notify(id, &Notice::CountdownBarCleared);
        }

        if self.core.config.countdown_can_cancel && self.core.stop_countdown() {
            info!(arena = %self.core.name, "countdown cancelled");
            self.hooks.on_countdown_cancelled(&mut self.core);
            self.after_hook();
        }

        if self.core.participants.is_empty() && self.core.state.is_playing() {
            info!(arena = %self.core.name, "arena empty, game ended");
            self.hooks.on_game_end(&mut self.core);
            if self.core.config.auto_reset {
                self.core.request_reset();
            }
            self.after_hook();
        }

        self.core.update_state();
        Ok(participant)
    }

    /// Returns the arena to `WaitingEmpty`, dropping every participant.
    ///
    /// Safe to call at any time and any number of times.
    pub fn reset(&mut self) {
        info!(arena = %self.core.name, "resetting arena");
        self.core.set_state(ArenaState::Resetting);
        self.core.broadcast(&Notice::StateChanged {
            state: ArenaState::Resetting.to_string(),
        });
        self.core.started = false;
        if let Some(task) = self.core.countdown.stop() {
            self.core.scheduler.cancel(task);
        }
        self.core.countdown.rewind();
        self.core.participants.clear();
        self.core.reset_requested = false;
        self.core.resets += 1;

        self.hooks.on_reset(&mut self.core);
        if self.core.state != ArenaState::WaitingEmpty {
            warn!(
                arena = %self.core.name,
                state = %self.core.state,
                "reset hook left the arena outside WAITING_EMPTY"
            );
        }
    }

    /// Runs the callback owned by `task`, if it is this arena's. Returns
    /// whether the task belonged to the arena.
    pub fn run_task(&mut self, task: arenaflow_tick::TaskId) -> bool {
        if self.core.countdown.task() != Some(task) {
            return false;
        }
        self.countdown_tick();
        true
    }

    /// Resets a participant's inventory.
    pub fn clear_player(&mut self, id: PlayerId) -> Result<(), ArenaError> {
        self.core.clear_player(id)
    }

    /// Handles a participant respawn. Without respawning the participant is
    /// removed and returned.
    pub fn respawn(&mut self, id: PlayerId) -> Result<Option<P>, ArenaError> {
        if !self.core.contains(id) {
            return Err(ArenaError::NotInArena(id, self.core.name.clone()));
        }
        if self.core.config.respawn_allowed {
            return Ok(None);
        }
        self.leave(id, DisconnectReason::LeaveByGame).map(Some)
    }

    /// Whether `id` may interact with its inventory.
    pub fn inventory_click_allowed(&self, id: PlayerId) -> bool {
        !(self.core.contains(id) && self.core.config.inventory_disabled)
    }

    pub fn teleport_all(&mut self, location: &Location) {
        self.core.teleport_all(location);
    }

    fn try_start_countdown(&mut self) {
        if self.core.participants.len() >= self.core.config.min_players {
            self.start_countdown();
        } else {
            self.hooks.on_not_enough_players(&mut self.core);
            self.after_hook();
        }
    }

    fn start_countdown(&mut self) {
        if self.core.countdown.is_running() {
            return;
        }
        let task = self.core.scheduler.schedule_repeating(0, TICKS_PER_SECOND);
        self.core.countdown.start(task);
        let seconds = self.core.countdown.length();
        info!(arena = %self.core.name, seconds, %task, "countdown started");
        self.core.broadcast(&Notice::CountdownStarted { seconds });
        self.hooks.on_countdown_start(&mut self.core);
        self.after_hook();
    }

    fn countdown_tick(&mut self) {
        let seconds_left = self.core.countdown.time_left();
        debug!(arena = %self.core.name, seconds_left, "countdown tick");
        let text = self.core.config.format_countdown(seconds_left);
        if Countdown::should_announce(seconds_left) {
            self.core.broadcast(&Notice::Countdown {
                text: text.clone(),
                seconds_left,
            });
        }
        if self.core.config.use_countdown_bar {
            let percent = self.core.countdown.percent(seconds_left);
            self.core.broadcast(&Notice::CountdownBar { text, percent });
        }

        if self.core.countdown.is_expired() {
            self.start_game();
        }
        self.core.countdown.decrement();
    }

    fn start_game(&mut self) {
        self.core.stop_countdown();
        if self.core.config.use_countdown_bar {
            self.core.broadcast(&Notice::CountdownBarCleared);
        }
        if self.core.config.teleport_players {
            if let Some(spawn) = self.core.config.game_spawn {
                self.core.teleport_all(&spawn);
            }
        }
        self.hooks.on_game_start(&mut self.core);
        self.core.started = true;
        self.core.set_state(ArenaState::Playing);
        info!(
            arena = %self.core.name,
            players = self.core.participants.len(),
            "game started"
        );
        self.after_hook();
    }

    fn after_hook(&mut self) {
        if std::mem::take(&mut self.core.reset_requested) {
            self.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use arenaflow_protocol::Delivery;
    use arenaflow_tick::TaskTimer;
    use tokio::sync::mpsc;

    use super::*;

    struct Dummy(PlayerId);

    impl Participant for Dummy {
        fn id(&self) -> PlayerId {
            self.0
        }
        fn name(&self) -> &str {
            "dummy"
        }
        fn location(&self) -> Location {
            Location::default()
        }
        fn health(&self) -> f64 {
            20.0
        }
        fn clear_inventory(&mut self) {}
        fn teleport(&mut self, _location: &Location) {}
    }

    fn arena(config: ArenaConfig) -> (Arena<Dummy>, Arc<TaskTimer>) {
        let timer = Arc::new(TaskTimer::new());
        let (tx, _rx) = mpsc::unbounded_channel::<Delivery>();
        let arena = Arena::new("test", "alpha", config, (), timer.clone(), Arc::new(tx));
        (arena, timer)
    }

    #[test]
    fn test_new_arena_is_empty() {
        let (arena, timer) = arena(ArenaConfig::default());
        assert_eq!(arena.state(), ArenaState::WaitingEmpty);
        assert_eq!(arena.player_count(), 0);
        assert!(!arena.core().is_started());
        assert_eq!(timer.active_tasks(), 0);
    }

    #[test]
    fn test_foreign_task_is_ignored() {
        let (mut arena, timer) = arena(ArenaConfig::default());
        let other = timer.schedule_repeating(0, 1);
        assert!(!arena.run_task(other));
    }

    #[test]
    fn test_countdown_task_active_only_while_waiting_players() {
        let (mut arena, timer) = arena(ArenaConfig::default());
        arena.join(Dummy(PlayerId(1))).unwrap();
        assert!(!arena.core().countdown().is_running());
        arena.join(Dummy(PlayerId(2))).unwrap();
        assert!(arena.core().countdown().is_running());
        assert_eq!(arena.state(), ArenaState::WaitingPlayers);
        assert_eq!(timer.active_tasks(), 1);
    }

    #[test]
    fn test_info_snapshot() {
        let (mut arena, _timer) = arena(ArenaConfig::default());
        arena.join(Dummy(PlayerId(1))).unwrap();
        let info = arena.info();
        assert_eq!(info.minigame, "test");
        assert_eq!(info.name, "alpha");
        assert_eq!(info.player_count, 1);
        assert_eq!(info.capacity, 8);
        assert!(!info.countdown_running);
    }
}
