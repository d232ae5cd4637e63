//! Arena registry: tracks running arenas and which participant is where.

use std::collections::HashMap;

use arenaflow_arena::{ArenaError, ArenaHooks, ArenaInfo};
use arenaflow_protocol::{DisconnectReason, Participant, PlayerId};
use tracing::{debug, info};

use crate::host::{ArenaHandle, ArenaHostBuilder, ArenaKey};
use crate::ArenaflowError;

/// Registry of running arenas, keyed by minigame and name.
///
/// Routes participants to arenas and keeps the "one arena per
/// participant" rule. Arenas can also empty themselves (auto reset after
/// the last leave), so an index entry is only trusted after the arena
/// confirms it.
pub struct ArenaRegistry<P> {
    arenas: HashMap<ArenaKey, ArenaHandle<P>>,

    /// Which arena each participant joined through this registry.
    player_arenas: HashMap<PlayerId, ArenaKey>,
}

impl<P: Participant + Send + 'static> ArenaRegistry<P> {
    pub fn new() -> Self {
        Self {
            arenas: HashMap::new(),
            player_arenas: HashMap::new(),
        }
    }

    /// Spawns a host from `builder` and registers it.
    ///
    /// Fails without spawning anything if the key is taken.
    pub fn spawn<H>(
        &mut self,
        builder: ArenaHostBuilder,
        hooks: H,
    ) -> Result<ArenaHandle<P>, ArenaflowError>
    where
        H: ArenaHooks<P> + Send + 'static,
    {
        if self.arenas.contains_key(builder.key()) {
            return Err(ArenaflowError::DuplicateArena(builder.key().to_string()));
        }
        let handle = builder.spawn(hooks);
        self.register(handle.clone())?;
        Ok(handle)
    }

    /// Registers a host that was spawned elsewhere.
    pub fn register(&mut self, handle: ArenaHandle<P>) -> Result<(), ArenaflowError> {
        let key = handle.key().clone();
        if self.arenas.contains_key(&key) {
            return Err(ArenaflowError::DuplicateArena(key.to_string()));
        }
        info!(arena = %key, "arena registered");
        self.arenas.insert(key, handle);
        Ok(())
    }

    pub fn get(&self, key: &ArenaKey) -> Option<&ArenaHandle<P>> {
        self.arenas.get(key)
    }

    /// The arena a participant last joined through the registry.
    pub fn arena_of(&self, player_id: PlayerId) -> Option<&ArenaKey> {
        self.player_arenas.get(&player_id)
    }

    pub fn len(&self) -> usize {
        self.arenas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arenas.is_empty()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<ArenaKey> {
        let mut keys: Vec<ArenaKey> = self.arenas.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Adds a participant to an arena.
    ///
    /// A participant can be in at most one arena at a time.
    pub async fn join(&mut self, key: &ArenaKey, participant: P) -> Result<(), ArenaflowError> {
        let player_id = participant.id();

        if let Some(current) = self.player_arenas.get(&player_id).cloned() {
            let still_there = match self.arenas.get(&current) {
                Some(handle) => handle.contains(player_id).await.unwrap_or(false),
                None => false,
            };
            if still_there {
                if current == *key {
                    return Err(ArenaError::AlreadyJoined(player_id, key.name.clone()).into());
                }
                return Err(ArenaError::InvalidState(format!(
                    "player {player_id} is already in arena {current}"
                ))
                .into());
            }
            debug!(%player_id, arena = %current, "dropping stale arena entry");
            self.player_arenas.remove(&player_id);
        }

        let handle = self
            .arenas
            .get(key)
            .ok_or_else(|| ArenaflowError::NotFound(key.to_string()))?;
        handle.join(participant).await?;
        self.player_arenas.insert(player_id, key.clone());
        Ok(())
    }

    /// Removes a participant from whichever arena it is in.
    ///
    /// The index entry is dropped even if the arena no longer had the
    /// participant.
    pub async fn leave(
        &mut self,
        player_id: PlayerId,
        reason: DisconnectReason,
    ) -> Result<P, ArenaflowError> {
        let key = self.player_arenas.remove(&player_id).ok_or_else(|| {
            ArenaError::InvalidState(format!("player {player_id} is not in any arena"))
        })?;
        let handle = self
            .arenas
            .get(&key)
            .ok_or_else(|| ArenaflowError::NotFound(key.to_string()))?;
        handle.leave(player_id, reason).await
    }

    /// Reports a respawn to the participant's arena.
    pub async fn respawn(&mut self, player_id: PlayerId) -> Result<Option<P>, ArenaflowError> {
        let key = self.player_arenas.get(&player_id).cloned().ok_or_else(|| {
            ArenaError::InvalidState(format!("player {player_id} is not in any arena"))
        })?;
        let handle = self
            .arenas
            .get(&key)
            .ok_or_else(|| ArenaflowError::NotFound(key.to_string()))?;
        let removed = handle.respawn(player_id).await?;
        if removed.is_some() {
            self.player_arenas.remove(&player_id);
        }
        Ok(removed)
    }

    /// Resets an arena and forgets everyone who was in it.
    pub async fn reset(&mut self, key: &ArenaKey) -> Result<(), ArenaflowError> {
        let handle = self
            .arenas
            .get(key)
            .ok_or_else(|| ArenaflowError::NotFound(key.to_string()))?;
        handle.reset().await?;
        self.player_arenas.retain(|_, k| k != key);
        Ok(())
    }

    /// Info for every arena, sorted by key. Arenas that do not answer
    /// (shutting down) are skipped.
    pub async fn list(&self) -> Vec<ArenaInfo> {
        let mut infos = Vec::with_capacity(self.arenas.len());
        for key in self.keys() {
            if let Some(handle) = self.arenas.get(&key) {
                if let Ok(info) = handle.info().await {
                    infos.push(info);
                }
            }
        }
        infos
    }

    /// Shuts an arena down and unregisters it.
    pub async fn remove(&mut self, key: &ArenaKey) -> Result<(), ArenaflowError> {
        let handle = self
            .arenas
            .remove(key)
            .ok_or_else(|| ArenaflowError::NotFound(key.to_string()))?;
        let _ = handle.shutdown().await;
        self.player_arenas.retain(|_, k| k != key);
        info!(arena = %key, "arena removed");
        Ok(())
    }

    pub async fn shutdown_all(&mut self) {
        for (key, handle) in self.arenas.drain() {
            let _ = handle.shutdown().await;
            debug!(arena = %key, "arena shut down");
        }
        self.player_arenas.clear();
        info!("all arenas shut down");
    }
}

impl<P: Participant + Send + 'static> Default for ArenaRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}
