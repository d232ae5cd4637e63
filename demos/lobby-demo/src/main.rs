use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arenaflow::prelude::*;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Players and hooks
// ---------------------------------------------------------------------------

struct DemoPlayer {
    id: PlayerId,
    name: String,
    location: Location,
    health: f64,
}

impl DemoPlayer {
    fn new(id: u64, name: &str) -> Self {
        Self {
            id: PlayerId(id),
            name: name.to_owned(),
            location: Location::default(),
            health: 20.0,
        }
    }
}

impl Participant for DemoPlayer {
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
        self.health
    }
    fn clear_inventory(&mut self) {}
    fn teleport(&mut self, location: &Location) {
        self.location = *location;
    }
}

struct Spleef;

impl ArenaHooks<DemoPlayer> for Spleef {
    fn on_countdown_start(&mut self, arena: &mut ArenaCore<DemoPlayer>) {
        info!(arena = arena.name(), players = arena.player_count(), "spleef: get ready");
    }

    fn on_game_start(&mut self, arena: &mut ArenaCore<DemoPlayer>) {
        for id in arena.player_ids() {
            if let Some(p) = arena.participant_mut(id) {
                p.health = 20.0;
            }
        }
        info!(arena = arena.name(), "spleef: go");
    }

    fn on_game_end(&mut self, arena: &mut ArenaCore<DemoPlayer>) {
        info!(arena = arena.name(), "spleef: round over");
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

fn demo_config(record_dir: PathBuf) -> HostConfig {
    HostConfig {
        arena: ArenaConfig {
            capacity: 4,
            min_players: 2,
            countdown_secs: 3,
            auto_reset: true,
            lobby: Some(Location::new(0.0, 64.0, 0.0)),
            game_spawn: Some(Location::new(50.0, 80.0, 50.0).facing(180.0, 0.0)),
            ..ArenaConfig::default()
        },
        record_dir,
        ..HostConfig::default()
    }
}

/// Runs one round: three players join, the countdown starts the game, the
/// match is recorded, a vote is held and everyone leaves. Returns the saved
/// recording.
async fn run_demo(record_dir: PathBuf) -> Result<PathBuf, ArenaflowError> {
    let (delivery_tx, mut deliveries) = mpsc::unbounded_channel::<Delivery>();
    let (vote_tx, mut votes) = mpsc::unbounded_channel::<VoteEvent>();

    tokio::spawn(async move {
        while let Some(d) = deliveries.recv().await {
            info!(to = ?d.recipients, "{}", d.notice);
        }
    });
    tokio::spawn(async move {
        while let Some(event) = votes.recv().await {
            info!(subject = %event.subject, outcome = ?event.outcome, "vote outcome");
        }
    });

    let mut registry = ArenaRegistry::new();
    let builder = ArenaHostBuilder::new("spleef", "Alpha")
        .config(demo_config(record_dir))
        .notifier(Arc::new(delivery_tx))
        .vote_events(vote_tx);
    let key = builder.key().clone();
    registry.spawn(builder, Spleef)?;

    for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
        registry.join(&key, DemoPlayer::new(id, name)).await?;
    }

    let handle = registry
        .get(&key)
        .cloned()
        .ok_or_else(|| ArenaflowError::NotFound(key.to_string()))?;
    handle.start_recording().await?;

    tokio::time::sleep(Duration::from_secs(4)).await;
    let info = handle.info().await?;
    info!(
        "arena info: {}",
        serde_json::to_string(&info).unwrap_or_default()
    );

    handle.call_vote("end round", PlayerId(1)).await?;
    handle.cast_vote(PlayerId(1), Choice::Yes).await?;
    handle.cast_vote(PlayerId(2), Choice::Yes).await?;

    handle.stop_recording().await?;
    let path = handle.save_recording().await?;

    for id in [1, 2, 3] {
        let player = registry.leave(PlayerId(id), DisconnectReason::LeaveByGame).await?;
        info!(player = player.name(), "left");
    }
    let info = handle.info().await?;
    info!(state = %info.state, players = info.player_count, "after last leave");

    registry.shutdown_all().await;
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let record_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("arenaflow-records"));

    let path = run_demo(record_dir).await?;
    info!(path = %path.display(), "recording saved");
    Ok(())
}
