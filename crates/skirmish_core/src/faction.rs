//! Factions: the player-controlled sides of a battle.

use serde::{Deserialize, Serialize};

use crate::ship::{Ship, ShipId, ShipStatus};

/// Unique identifier for factions, allocated per battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactionId(pub u64);

impl std::fmt::Display for FactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// Everything a caller supplies to create or rename a faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionSpec {
    /// Display name, unique within the battle.
    pub name: String,
    /// Name of the controlling player.
    pub player_name: String,
    /// Display color (e.g. `#ff8800`).
    pub color: String,
}

/// A side in a battle and its roster of ships.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Faction {
    /// Unique identifier.
    pub id: FactionId,
    /// Display name.
    pub name: String,
    /// Name of the controlling player.
    pub player_name: String,
    /// Display color.
    pub color: String,
    /// Secret handed to the controlling player by the API layer.
    token: String,
    /// Owned ships. Destroyed ships are removed, retreated ships stay.
    ships: Vec<Ship>,
    /// Whether the faction has submitted its orders this turn.
    pub ready: bool,
}

impl Faction {
    /// Create a faction with an empty roster.
    #[must_use]
    pub fn new(id: FactionId, spec: FactionSpec, token: String) -> Self {
        Self {
            id,
            name: spec.name,
            player_name: spec.player_name,
            color: spec.color,
            token,
            ships: Vec::new(),
            ready: false,
        }
    }

    /// Check a presented token against the faction secret.
    #[must_use]
    pub fn verify_token(&self, token: &str) -> bool {
        self.token == token
    }

    /// The faction secret.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// A faction is defeated once none of its ships is still active.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.ships
            .iter()
            .all(|s| matches!(s.status, ShipStatus::Destroyed | ShipStatus::Retreated))
    }

    /// Owned ships in roster order.
    #[must_use]
    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// Look up an owned ship.
    #[must_use]
    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.iter().find(|s| s.id == id)
    }

    /// Look up an owned ship mutably.
    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|s| s.id == id)
    }

    /// Check if a ship name is already taken in this faction.
    #[must_use]
    pub fn has_ship_named(&self, name: &str) -> bool {
        self.ships.iter().any(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn ships_mut(&mut self) -> impl Iterator<Item = &mut Ship> {
        self.ships.iter_mut()
    }

    pub(crate) fn push_ship(&mut self, ship: Ship) {
        self.ships.push(ship);
    }

    pub(crate) fn remove_ship(&mut self, id: ShipId) -> Option<Ship> {
        let index = self.ships.iter().position(|s| s.id == id)?;
        Some(self.ships.remove(index))
    }
}
