//! The `Participant` trait: the core's view of a host-side player.

use crate::{Location, PlayerId};

/// What the arena core needs from a player object owned by the host.
///
/// The host's world model (entities, inventories, physics) stays outside
/// the core. A host implements this trait for whatever handle it uses to
/// reach a player, and the core only ever goes through these methods.
pub trait Participant {
    /// Stable identifier; never changes while the player is online.
    fn id(&self) -> PlayerId;

    /// Human-readable name used in notices and recordings.
    fn name(&self) -> &str;

    /// Current position and facing.
    fn location(&self) -> Location;

    /// Current health value.
    fn health(&self) -> f64;

    /// Empties the player's inventory and equipment.
    fn clear_inventory(&mut self);

    /// Moves the player to `location`.
    fn teleport(&mut self, location: &Location);
}
