//! Arena host: an isolated Tokio task that owns one arena.
//!
//! The arena, its recorder and its current vote live inside one task and
//! are only reached through a command channel, so nothing in them needs a
//! lock. The same task paces the game tick and hands due task ids to
//! whichever component scheduled them.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use arenaflow_arena::{Arena, ArenaConfig, ArenaError, ArenaHooks, ArenaInfo};
use arenaflow_protocol::{Delivery, DisconnectReason, Notifier, Participant, PlayerId};
use arenaflow_replay::{DirectorySink, MatchRecorder, RecordError, RecorderConfig};
use arenaflow_tick::{TaskTimer, TickConfig, TickScheduler};
use arenaflow_vote::{Choice, Vote, VoteConfig, VoteEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace};

use crate::ArenaflowError;

// ---------------------------------------------------------------------------
// ArenaKey / HostConfig
// ---------------------------------------------------------------------------

/// Identity of an arena: its name is only unique within its minigame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArenaKey {
    pub minigame: String,
    pub name: String,
}

impl ArenaKey {
    pub fn new(minigame: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            minigame: minigame.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ArenaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.minigame, self.name)
    }
}

/// Everything a host needs to run one arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub arena: ArenaConfig,
    pub vote: VoteConfig,
    pub recorder: RecorderConfig,

    /// Game ticks per second the host runs at.
    pub tick_rate_hz: u32,

    /// Directory saved recordings go to.
    pub record_dir: PathBuf,

    /// Command channel capacity. Callers wait when it is full.
    pub channel_size: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            arena: ArenaConfig::default(),
            vote: VoteConfig::default(),
            recorder: RecorderConfig::default(),
            tick_rate_hz: 20,
            record_dir: PathBuf::from("records"),
            channel_size: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands and handle
// ---------------------------------------------------------------------------

/// Commands sent to a host through its channel. Most carry a `oneshot`
/// reply channel.
pub(crate) enum ArenaCommand<P> {
    Join {
        participant: P,
        reply: oneshot::Sender<Result<(), ArenaError>>,
    },
    Leave {
        player_id: PlayerId,
        reason: DisconnectReason,
        reply: oneshot::Sender<Result<P, ArenaError>>,
    },
    Respawn {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<Option<P>, ArenaError>>,
    },
    Contains {
        player_id: PlayerId,
        reply: oneshot::Sender<bool>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    GetInfo {
        reply: oneshot::Sender<ArenaInfo>,
    },
    StartRecording {
        reply: oneshot::Sender<Result<(), RecordError>>,
    },
    StopRecording {
        reply: oneshot::Sender<bool>,
    },
    SaveRecording {
        reply: oneshot::Sender<Result<PathBuf, RecordError>>,
    },
    CallVote {
        subject: String,
        initiator: PlayerId,
        reply: oneshot::Sender<Result<(), ArenaflowError>>,
    },
    CastVote {
        voter: PlayerId,
        choice: Choice,
        reply: oneshot::Sender<Result<(), ArenaflowError>>,
    },
    Shutdown,
}

/// Handle to a running arena host.
///
/// Cheap to clone: it is an `mpsc::Sender` plus the arena's key.
pub struct ArenaHandle<P> {
    key: ArenaKey,
    sender: mpsc::Sender<ArenaCommand<P>>,
}

impl<P> Clone for ArenaHandle<P> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<P> fmt::Debug for ArenaHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaHandle")
            .field("key", &self.key)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl<P: Send + 'static> ArenaHandle<P> {
    pub fn key(&self) -> &ArenaKey {
        &self.key
    }

    /// `true` once the host task has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn unavailable(&self) -> ArenaflowError {
        ArenaflowError::Unavailable(self.key.to_string())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> ArenaCommand<P>,
    ) -> Result<T, ArenaflowError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    pub async fn join(&self, participant: P) -> Result<(), ArenaflowError> {
        Ok(self
            .request(|reply| ArenaCommand::Join { participant, reply })
            .await??)
    }

    /// Removes a participant and hands it back.
    pub async fn leave(
        &self,
        player_id: PlayerId,
        reason: DisconnectReason,
    ) -> Result<P, ArenaflowError> {
        Ok(self
            .request(|reply| ArenaCommand::Leave {
                player_id,
                reason,
                reply,
            })
            .await??)
    }

    /// Reports a respawn. Returns the participant if the arena removed it.
    pub async fn respawn(&self, player_id: PlayerId) -> Result<Option<P>, ArenaflowError> {
        Ok(self
            .request(|reply| ArenaCommand::Respawn { player_id, reply })
            .await??)
    }

    pub async fn contains(&self, player_id: PlayerId) -> Result<bool, ArenaflowError> {
        self.request(|reply| ArenaCommand::Contains { player_id, reply })
            .await
    }

    /// Resets the arena, its recorder and any running vote.
    pub async fn reset(&self) -> Result<(), ArenaflowError> {
        self.request(|reply| ArenaCommand::Reset { reply }).await
    }

    pub async fn info(&self) -> Result<ArenaInfo, ArenaflowError> {
        self.request(|reply| ArenaCommand::GetInfo { reply }).await
    }

    pub async fn start_recording(&self) -> Result<(), ArenaflowError> {
        Ok(self
            .request(|reply| ArenaCommand::StartRecording { reply })
            .await??)
    }

    /// Stops recording. Returns whether a recording was running.
    pub async fn stop_recording(&self) -> Result<bool, ArenaflowError> {
        self.request(|reply| ArenaCommand::StopRecording { reply })
            .await
    }

    /// Saves the recording so far and returns the file written.
    pub async fn save_recording(&self) -> Result<PathBuf, ArenaflowError> {
        Ok(self
            .request(|reply| ArenaCommand::SaveRecording { reply })
            .await??)
    }

    /// Opens a vote among everyone currently in the arena.
    pub async fn call_vote(
        &self,
        subject: impl Into<String>,
        initiator: PlayerId,
    ) -> Result<(), ArenaflowError> {
        let subject = subject.into();
        self.request(|reply| ArenaCommand::CallVote {
            subject,
            initiator,
            reply,
        })
        .await?
    }

    pub async fn cast_vote(&self, voter: PlayerId, choice: Choice) -> Result<(), ArenaflowError> {
        self.request(|reply| ArenaCommand::CastVote {
            voter,
            choice,
            reply,
        })
        .await?
    }

    /// Tells the host to stop. Participants still inside are dropped.
    pub async fn shutdown(&self) -> Result<(), ArenaflowError> {
        self.sender
            .send(ArenaCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and spawns an arena host.
///
/// ```rust,ignore
/// let handle = ArenaHostBuilder::new("spleef", "Alpha")
///     .config(config)
///     .notifier(Arc::new(delivery_tx))
///     .spawn::<MyPlayer, _>(SpleefHooks::default());
/// ```
pub struct ArenaHostBuilder {
    key: ArenaKey,
    config: HostConfig,
    notifier: Option<Arc<dyn Notifier>>,
    vote_events: Option<mpsc::UnboundedSender<VoteEvent>>,
}

impl ArenaHostBuilder {
    pub fn new(minigame: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: ArenaKey::new(minigame, name),
            config: HostConfig::default(),
            notifier: None,
            vote_events: None,
        }
    }

    pub fn key(&self) -> &ArenaKey {
        &self.key
    }

    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    /// Where notices for participants go. Without one they are dropped.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Where vote outcomes go. Without one they are only logged.
    pub fn vote_events(mut self, events: mpsc::UnboundedSender<VoteEvent>) -> Self {
        self.vote_events = Some(events);
        self
    }

    /// Spawns the host task. Must be called inside a Tokio runtime.
    pub fn spawn<P, H>(self, hooks: H) -> ArenaHandle<P>
    where
        P: Participant + Send + 'static,
        H: ArenaHooks<P> + Send + 'static,
    {
        let Self {
            key,
            config,
            notifier,
            vote_events,
        } = self;
        let notifier: Arc<dyn Notifier> = match notifier {
            Some(n) => n,
            None => Arc::new(mpsc::unbounded_channel::<Delivery>().0),
        };
        let vote_events = vote_events.unwrap_or_else(|| mpsc::unbounded_channel().0);

        let timer = Arc::new(TaskTimer::new());
        let arena = Arena::new(
            key.minigame.clone(),
            key.name.clone(),
            config.arena,
            hooks,
            timer.clone(),
            notifier.clone(),
        );
        let recorder = MatchRecorder::new(
            key.minigame.clone(),
            key.name.clone(),
            config.recorder,
            timer.clone(),
            notifier.clone(),
        );
        let (tx, rx) = mpsc::channel(config.channel_size.max(1));

        let host = ArenaHost {
            key: key.clone(),
            arena,
            recorder,
            vote: None,
            round: 0,
            vote_config: config.vote,
            vote_events,
            timer,
            ticker: TickScheduler::new(TickConfig::with_rate(config.tick_rate_hz)),
            sink: DirectorySink::new(config.record_dir),
            notifier,
            receiver: rx,
        };
        tokio::spawn(host.run());

        ArenaHandle { key, sender: tx }
    }
}

// ---------------------------------------------------------------------------
// Host actor
// ---------------------------------------------------------------------------

struct ArenaHost<P, H> {
    key: ArenaKey,
    arena: Arena<P, H>,
    recorder: MatchRecorder,
    vote: Option<Vote<mpsc::UnboundedSender<VoteEvent>>>,
    /// Arena reset count the recorder and vote slot belong to.
    round: u64,
    vote_config: VoteConfig,
    vote_events: mpsc::UnboundedSender<VoteEvent>,
    timer: Arc<TaskTimer>,
    ticker: TickScheduler,
    sink: DirectorySink,
    notifier: Arc<dyn Notifier>,
    receiver: mpsc::Receiver<ArenaCommand<P>>,
}

impl<P: Participant, H: ArenaHooks<P>> ArenaHost<P, H> {
    /// Processes commands and ticks until shutdown or until every handle
    /// is dropped.
    async fn run(mut self) {
        info!(arena = %self.key, tick_rate = self.ticker.tick_rate_hz(), "arena host started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(ArenaCommand::Shutdown) | None => break,
                    Some(cmd) => {
                        self.handle(cmd);
                        self.follow_arena_resets();
                    }
                },
                _ = self.ticker.wait_for_tick() => {
                    self.run_tick();
                    self.follow_arena_resets();
                    self.ticker.record_tick_end();
                }
            }
        }

        self.recorder.stop_capturing(&self.arena.core().player_ids());
        if let Some(mut vote) = self.vote.take() {
            vote.abort();
        }
        self.arena.reset();
        info!(
            arena = %self.key,
            ticks = self.ticker.tick_count(),
            overruns = self.ticker.metrics().total_overruns,
            "arena host stopped"
        );
    }

    fn handle(&mut self, cmd: ArenaCommand<P>) {
        match cmd {
            ArenaCommand::Join { participant, reply } => {
                let _ = reply.send(self.arena.join(participant));
            }
            ArenaCommand::Leave {
                player_id,
                reason,
                reply,
            } => {
                let _ = reply.send(self.arena.leave(player_id, reason));
            }
            ArenaCommand::Respawn { player_id, reply } => {
                let _ = reply.send(self.arena.respawn(player_id));
            }
            ArenaCommand::Contains { player_id, reply } => {
                let _ = reply.send(self.arena.contains(player_id));
            }
            ArenaCommand::Reset { reply } => {
                self.arena.reset();
                self.follow_arena_resets();
                let _ = reply.send(());
            }
            ArenaCommand::GetInfo { reply } => {
                let _ = reply.send(self.arena.info());
            }
            ArenaCommand::StartRecording { reply } => {
                let result = self
                    .recorder
                    .start_capturing(self.arena.core().participants());
                let _ = reply.send(result);
            }
            ArenaCommand::StopRecording { reply } => {
                let stopped = self
                    .recorder
                    .stop_capturing(&self.arena.core().player_ids());
                let _ = reply.send(stopped);
            }
            ArenaCommand::SaveRecording { reply } => {
                let _ = reply.send(self.recorder.save(&self.sink));
            }
            ArenaCommand::CallVote {
                subject,
                initiator,
                reply,
            } => {
                let _ = reply.send(self.call_vote(subject, initiator));
            }
            ArenaCommand::CastVote {
                voter,
                choice,
                reply,
            } => {
                let _ = reply.send(self.cast_vote(voter, choice));
            }
            ArenaCommand::Shutdown => {}
        }
    }

    fn run_tick(&mut self) {
        for task in self.timer.advance() {
            if self.arena.run_task(task) {
                // A hook may have reset the arena; the rest of this batch
                // must not reach the old round's recorder or vote.
                self.follow_arena_resets();
                continue;
            }
            if self.recorder.run_task(task, self.arena.core().participants()) {
                continue;
            }
            if let Some(vote) = self.vote.as_mut() {
                if vote.run_task(task) {
                    continue;
                }
            }
            trace!(arena = %self.key, %task, "due task has no owner");
        }
        self.drop_finished_vote();
    }

    /// Drops the recording and the vote of a round the arena has left,
    /// however the arena got reset.
    fn follow_arena_resets(&mut self) {
        let resets = self.arena.core().reset_count();
        if resets == self.round {
            return;
        }
        self.round = resets;
        self.recorder.reset();
        if let Some(mut vote) = self.vote.take() {
            vote.abort();
        }
        debug!(arena = %self.key, round = resets, "new round, recorder and vote cleared");
    }

    fn call_vote(&mut self, subject: String, initiator: PlayerId) -> Result<(), ArenaflowError> {
        if self.vote.is_some() {
            return Err(ArenaflowError::VoteInProgress(self.key.to_string()));
        }
        let core = self.arena.core();
        let caller = core
            .participant(initiator)
            .ok_or_else(|| ArenaError::NotInArena(initiator, core.name().to_owned()))?;

        let mut vote = Vote::new(
            subject,
            self.vote_config.clone(),
            self.vote_events.clone(),
            self.timer.clone(),
            self.notifier.clone(),
        );
        vote.invoke(core.player_ids(), caller)?;
        self.vote = Some(vote);
        Ok(())
    }

    fn cast_vote(&mut self, voter: PlayerId, choice: Choice) -> Result<(), ArenaflowError> {
        let vote = self
            .vote
            .as_mut()
            .ok_or_else(|| ArenaflowError::NoActiveVote(self.key.to_string()))?;
        vote.vote(voter, choice)?;
        self.drop_finished_vote();
        Ok(())
    }

    fn drop_finished_vote(&mut self) {
        if self.vote.as_ref().is_some_and(|v| v.is_concluded()) {
            if let Some(vote) = self.vote.take() {
                debug!(arena = %self.key, subject = vote.subject(), "vote finished");
            }
        }
    }
}
