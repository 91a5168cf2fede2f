//! Orders queued during a turn and resolved at its end.

use serde::{Deserialize, Serialize};

use crate::faction::FactionId;
use crate::path::Path;
use crate::ship::ShipId;

/// Unique identifier for missiles, allocated per battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MissileId(pub u64);

impl std::fmt::Display for MissileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// Names and ids of one party in an attack, captured when the order is queued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Combatant {
    /// Owning faction.
    pub faction_id: FactionId,
    /// Owning faction name.
    pub faction_name: String,
    /// Ship.
    pub ship_id: ShipId,
    /// Ship name.
    pub ship_name: String,
}

/// A laser shot waiting for end of turn. Resolves instantly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LaserShot {
    /// Firing ship.
    pub source: Combatant,
    /// Target faction.
    pub target_faction: FactionId,
    /// Target ship.
    pub target_ship: ShipId,
}

/// A missile in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Missile {
    /// Unique identifier.
    pub id: MissileId,
    /// Launching ship.
    pub source: Combatant,
    /// Target faction.
    pub target_faction: FactionId,
    /// Target ship.
    pub target_ship: ShipId,
    /// Homing path towards the target.
    pub path: Path,
    /// Accuracy fixed at launch, before point-defense mitigation.
    pub accuracy: i32,
    /// Turn the missile was launched.
    pub fired_turn: u32,
}

/// Special actions a ship may queue besides moving and firing.
///
/// No special action has rules yet; they are accepted and reported as
/// unimplemented when the turn resolves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtraAction {
    /// An action without resolution rules.
    Unimplemented {
        /// Name the caller gave the action.
        name: String,
    },
}

/// An extra action waiting for end of turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtraActionOrder {
    /// Acting ship.
    pub source: Combatant,
    /// The action.
    pub action: ExtraAction,
}
