//! End-to-end tests for arena hosts and the registry.
//!
//! Every test runs on a paused Tokio clock, so sleeping for a few seconds
//! drives the host's 20 Hz tick loop without real waiting.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arenaflow::prelude::*;
use arenaflow::{ArenaError, FailCause, MatchRecord, RecordError, VoteError};
use tokio::sync::mpsc;

// =========================================================================
// Test participant and helpers
// =========================================================================

#[derive(Debug)]
struct Player {
    id: PlayerId,
    name: String,
    location: Location,
}

impl Player {
    fn new(id: u64) -> Self {
        Self {
            id: PlayerId(id),
            name: format!("player{id}"),
            location: Location::new(id as f64, 64.0, 0.0),
        }
    }
}

impl Participant for Player {
    fn id(&self) -> PlayerId {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn location(&self) -> Location {
        self.location
    }
    fn health(&self) -> f64 {
        20.0
    }
    fn clear_inventory(&mut self) {}
    fn teleport(&mut self, location: &Location) {
        self.location = *location;
    }
}

fn host_config() -> HostConfig {
    HostConfig {
        arena: ArenaConfig {
            capacity: 4,
            min_players: 2,
            countdown_secs: 3,
            ..ArenaConfig::default()
        },
        ..HostConfig::default()
    }
}

struct Setup {
    handle: ArenaHandle<Player>,
    deliveries: mpsc::UnboundedReceiver<Delivery>,
    votes: mpsc::UnboundedReceiver<VoteEvent>,
}

fn spawn_arena(name: &str, config: HostConfig) -> Setup {
    let (delivery_tx, deliveries) = mpsc::unbounded_channel();
    let (vote_tx, votes) = mpsc::unbounded_channel();
    let handle = ArenaHostBuilder::new("spleef", name)
        .config(config)
        .notifier(Arc::new(delivery_tx))
        .vote_events(vote_tx)
        .spawn::<Player, _>(());
    Setup {
        handle,
        deliveries,
        votes,
    }
}

fn drain<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(item) = rx.try_recv() {
        out.push(item);
    }
    out
}

fn record_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("arenaflow_host_test_{name}"));
    let _ = fs::remove_dir_all(&dir);
    dir
}

async fn sleep_secs(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

// =========================================================================
// Host lifecycle
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_countdown_runs_to_playing() {
    let mut s = spawn_arena("Alpha", host_config());
    s.handle.join(Player::new(1)).await.unwrap();
    s.handle.join(Player::new(2)).await.unwrap();

    let info = s.handle.info().await.unwrap();
    assert_eq!(info.state, ArenaState::WaitingPlayers);
    assert!(info.countdown_running);

    sleep_secs(4).await;

    let info = s.handle.info().await.unwrap();
    assert_eq!(info.state, ArenaState::Playing);
    assert!(!info.countdown_running);

    let notices: Vec<Notice> = drain(&mut s.deliveries).into_iter().map(|d| d.notice).collect();
    assert!(notices.contains(&Notice::CountdownStarted { seconds: 3 }));
    assert_eq!(
        notices
            .iter()
            .filter(|n| **n == Notice::CountdownStopped)
            .count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_single_player_waits() {
    let s = spawn_arena("Alpha", host_config());
    s.handle.join(Player::new(1)).await.unwrap();
    sleep_secs(10).await;

    let info = s.handle.info().await.unwrap();
    assert_eq!(info.state, ArenaState::WaitingPlayers);
    assert!(!info.countdown_running);
}

#[tokio::test(start_paused = true)]
async fn test_arena_errors_pass_through_handle() {
    let s = spawn_arena("Alpha", host_config());
    s.handle.join(Player::new(1)).await.unwrap();

    let err = s.handle.join(Player::new(1)).await.unwrap_err();
    assert!(matches!(
        err,
        ArenaflowError::Arena(ArenaError::AlreadyJoined(PlayerId(1), _))
    ));

    let err = s
        .handle
        .leave(PlayerId(9), DisconnectReason::PlayerLeave)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ArenaflowError::Arena(ArenaError::NotInArena(PlayerId(9), _))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_leave_hands_participant_back() {
    let s = spawn_arena("Alpha", host_config());
    s.handle.join(Player::new(1)).await.unwrap();

    let player = s
        .handle
        .leave(PlayerId(1), DisconnectReason::PlayerDisconnect)
        .await
        .unwrap();
    assert_eq!(player.id, PlayerId(1));
    assert!(!s.handle.contains(PlayerId(1)).await.unwrap());
    assert_eq!(s.handle.info().await.unwrap().state, ArenaState::WaitingEmpty);
}

#[tokio::test(start_paused = true)]
async fn test_reset_empties_arena() {
    let s = spawn_arena("Alpha", host_config());
    s.handle.join(Player::new(1)).await.unwrap();
    s.handle.join(Player::new(2)).await.unwrap();
    sleep_secs(4).await;

    s.handle.reset().await.unwrap();
    let info = s.handle.info().await.unwrap();
    assert_eq!(info.state, ArenaState::WaitingEmpty);
    assert_eq!(info.player_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_auto_reset_ends_recording_and_vote() {
    let config = HostConfig {
        arena: ArenaConfig {
            auto_reset: true,
            ..host_config().arena
        },
        ..host_config()
    };
    let s = spawn_arena("Alpha", config);
    s.handle.join(Player::new(1)).await.unwrap();
    s.handle.join(Player::new(2)).await.unwrap();
    sleep_secs(4).await;
    assert_eq!(s.handle.info().await.unwrap().state, ArenaState::Playing);

    s.handle.start_recording().await.unwrap();
    s.handle.call_vote("end round", PlayerId(1)).await.unwrap();

    // The last leave resets the arena without a Reset command.
    s.handle.leave(PlayerId(1), DisconnectReason::LeaveByGame).await.unwrap();
    s.handle.leave(PlayerId(2), DisconnectReason::LeaveByGame).await.unwrap();
    assert_eq!(s.handle.info().await.unwrap().state, ArenaState::WaitingEmpty);

    s.handle.join(Player::new(3)).await.unwrap();
    assert!(!s.handle.stop_recording().await.unwrap());
    s.handle.call_vote("new round", PlayerId(3)).await.unwrap();
    s.handle.start_recording().await.unwrap();
    assert!(s.handle.stop_recording().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_makes_handle_unavailable() {
    let s = spawn_arena("Alpha", host_config());
    s.handle.shutdown().await.unwrap();

    let err = s.handle.info().await.unwrap_err();
    assert!(matches!(err, ArenaflowError::Unavailable(ref key) if key == "spleef/Alpha"));
}

// =========================================================================
// Votes
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_vote_succeeds_on_majority() {
    let mut s = spawn_arena("Alpha", host_config());
    for id in 1..=3 {
        s.handle.join(Player::new(id)).await.unwrap();
    }

    s.handle.call_vote("skip map", PlayerId(1)).await.unwrap();
    s.handle.cast_vote(PlayerId(1), Choice::Yes).await.unwrap();
    s.handle.cast_vote(PlayerId(2), Choice::Yes).await.unwrap();

    let events = drain(&mut s.votes);
    assert_eq!(
        events.last().map(|e| e.outcome),
        Some(VoteOutcome::Succeeded)
    );
    assert!(events.iter().all(|e| e.subject == "skip map"));

    // The finished vote is gone.
    let err = s.handle.cast_vote(PlayerId(3), Choice::Yes).await.unwrap_err();
    assert!(matches!(err, ArenaflowError::NoActiveVote(_)));
}

#[tokio::test(start_paused = true)]
async fn test_vote_rules() {
    let s = spawn_arena("Alpha", host_config());
    s.handle.join(Player::new(1)).await.unwrap();
    s.handle.join(Player::new(2)).await.unwrap();

    let err = s.handle.cast_vote(PlayerId(1), Choice::No).await.unwrap_err();
    assert!(matches!(err, ArenaflowError::NoActiveVote(_)));

    let err = s.handle.call_vote("kick", PlayerId(7)).await.unwrap_err();
    assert!(matches!(
        err,
        ArenaflowError::Arena(ArenaError::NotInArena(PlayerId(7), _))
    ));

    s.handle.call_vote("kick", PlayerId(1)).await.unwrap();
    let err = s.handle.call_vote("again", PlayerId(2)).await.unwrap_err();
    assert!(matches!(err, ArenaflowError::VoteInProgress(_)));

    s.handle.cast_vote(PlayerId(2), Choice::No).await.unwrap();
    let err = s.handle.cast_vote(PlayerId(2), Choice::Yes).await.unwrap_err();
    assert!(matches!(err, ArenaflowError::Vote(VoteError::AlreadyVoted(PlayerId(2)))));
}

#[tokio::test(start_paused = true)]
async fn test_vote_times_out_once() {
    let mut s = spawn_arena("Alpha", host_config());
    s.handle.join(Player::new(1)).await.unwrap();
    s.handle.join(Player::new(2)).await.unwrap();
    s.handle.call_vote("draw", PlayerId(2)).await.unwrap();

    sleep_secs(10).await;

    let events = drain(&mut s.votes);
    assert_eq!(
        events,
        vec![VoteEvent {
            subject: "draw".into(),
            outcome: VoteOutcome::Failed(FailCause::TimedOut),
        }]
    );

    // A new vote can be called afterwards.
    s.handle.call_vote("rematch", PlayerId(1)).await.unwrap();
}

// =========================================================================
// Recording
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_record_and_save() {
    let dir = record_dir("save");
    let config = HostConfig {
        record_dir: dir.clone(),
        ..host_config()
    };
    let mut s = spawn_arena("Alpha", config);
    s.handle.join(Player::new(1)).await.unwrap();
    s.handle.join(Player::new(2)).await.unwrap();

    s.handle.start_recording().await.unwrap();
    let err = s.handle.start_recording().await.unwrap_err();
    assert!(matches!(err, ArenaflowError::Record(RecordError::AlreadyCapturing)));

    sleep_secs(1).await;
    assert!(s.handle.stop_recording().await.unwrap());
    assert!(!s.handle.stop_recording().await.unwrap());

    let path = s.handle.save_recording().await.unwrap();
    assert!(path.starts_with(&dir));
    let record = MatchRecord::parse(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(record.arena, "Alpha");
    assert_eq!(record.names.len(), 2);
    assert!(!record.frames.is_empty());
    assert!(record.frames.iter().all(|f| f.positions.len() == 2));

    let notices: Vec<Notice> = drain(&mut s.deliveries).into_iter().map(|d| d.notice).collect();
    assert!(notices.contains(&Notice::RecordingStarted));
    assert!(notices.contains(&Notice::RecordingStopped));

    let _ = fs::remove_dir_all(&dir);
}

// =========================================================================
// Registry
// =========================================================================

fn registry_arena(registry: &mut ArenaRegistry<Player>, name: &str) -> ArenaKey {
    let builder = ArenaHostBuilder::new("spleef", name).config(host_config());
    let key = builder.key().clone();
    registry.spawn(builder, ()).unwrap();
    key
}

#[tokio::test(start_paused = true)]
async fn test_registry_rejects_duplicate_keys() {
    let mut registry = ArenaRegistry::<Player>::new();
    registry_arena(&mut registry, "Alpha");

    let err = registry
        .spawn(ArenaHostBuilder::new("spleef", "Alpha"), ())
        .unwrap_err();
    assert!(matches!(err, ArenaflowError::DuplicateArena(ref key) if key == "spleef/Alpha"));

    // Same name under another minigame is a different arena.
    registry.spawn(ArenaHostBuilder::new("parkour", "Alpha"), ()).unwrap();
    assert_eq!(registry.len(), 2);
    registry.shutdown_all().await;
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_registry_one_arena_per_player() {
    let mut registry = ArenaRegistry::new();
    let alpha = registry_arena(&mut registry, "Alpha");
    let beta = registry_arena(&mut registry, "Beta");

    registry.join(&alpha, Player::new(1)).await.unwrap();
    assert_eq!(registry.arena_of(PlayerId(1)), Some(&alpha));

    let err = registry.join(&beta, Player::new(1)).await.unwrap_err();
    assert!(matches!(err, ArenaflowError::Arena(ArenaError::InvalidState(_))));
    let err = registry.join(&alpha, Player::new(1)).await.unwrap_err();
    assert!(matches!(
        err,
        ArenaflowError::Arena(ArenaError::AlreadyJoined(PlayerId(1), _))
    ));

    let player = registry
        .leave(PlayerId(1), DisconnectReason::PlayerLeave)
        .await
        .unwrap();
    assert_eq!(player.id, PlayerId(1));
    assert_eq!(registry.arena_of(PlayerId(1)), None);

    registry.join(&beta, Player::new(1)).await.unwrap();
    assert_eq!(registry.arena_of(PlayerId(1)), Some(&beta));
}

#[tokio::test(start_paused = true)]
async fn test_registry_drops_stale_entries() {
    let mut registry = ArenaRegistry::new();
    let alpha = registry_arena(&mut registry, "Alpha");
    let beta = registry_arena(&mut registry, "Beta");
    registry.join(&alpha, Player::new(1)).await.unwrap();

    // The arena forgets the player without going through the registry.
    registry.get(&alpha).unwrap().reset().await.unwrap();

    registry.join(&beta, Player::new(1)).await.unwrap();
    assert_eq!(registry.arena_of(PlayerId(1)), Some(&beta));
}

#[tokio::test(start_paused = true)]
async fn test_registry_reset_and_list() {
    let mut registry = ArenaRegistry::new();
    let beta = registry_arena(&mut registry, "Beta");
    let alpha = registry_arena(&mut registry, "Alpha");
    registry.join(&beta, Player::new(1)).await.unwrap();
    registry.join(&beta, Player::new(2)).await.unwrap();

    let names: Vec<String> = registry.list().await.into_iter().map(|i| i.name).collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);

    registry.reset(&beta).await.unwrap();
    assert_eq!(registry.arena_of(PlayerId(1)), None);
    assert_eq!(registry.arena_of(PlayerId(2)), None);

    registry.remove(&alpha).await.unwrap();
    assert!(registry.get(&alpha).is_none());
    assert!(matches!(
        registry.join(&alpha, Player::new(3)).await,
        Err(ArenaflowError::NotFound(_))
    ));
}
