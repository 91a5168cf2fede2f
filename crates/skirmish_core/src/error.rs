//! Error types for the battle engine.

use thiserror::Error;

use crate::battle::{BattleId, BattleStatus};
use crate::faction::FactionId;
use crate::grid::Position;
use crate::ship::{ShipId, WeaponKind};

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// A reference to something that could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// A battle.
    Battle(BattleId),
    /// A faction inside a battle.
    Faction(FactionId),
    /// A ship inside a faction.
    Ship(ShipId),
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Battle(id) => write!(f, "battle {id}"),
            Self::Faction(id) => write!(f, "faction {id}"),
            Self::Ship(id) => write!(f, "ship {id}"),
        }
    }
}

/// Every way a command against a battle can be rejected.
///
/// None of these are fatal: the battle is left exactly as it was before
/// the rejected command and stays usable.
#[derive(Debug, Error)]
pub enum BattleError {
    /// The battle is not in the status the operation requires.
    #[error("Wrong battle status: expected {expected:?}, battle is {actual:?}")]
    InvalidState {
        /// Status the operation needs.
        expected: BattleStatus,
        /// Status the battle is in.
        actual: BattleStatus,
    },

    /// A referenced battle, faction, ship or missile does not exist.
    #[error("Not found: {0}")]
    NotFound(Missing),

    /// An entity with the same identity already exists.
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// A missile launch or re-target exceeds the maximum missile range.
    #[error("Out of range: distance {distance} exceeds maximum {max}")]
    OutOfRange {
        /// Path length in grid steps.
        distance: u32,
        /// Largest permitted path length.
        max: u32,
    },

    /// Battle grid dimensions must both be positive.
    #[error("Invalid grid size {width}x{height}")]
    InvalidGrid {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// A position lies outside the battle grid.
    #[error("Position ({}, {}) is outside the {width}x{height} grid", position.x, position.y)]
    OutOfBounds {
        /// Offending position.
        position: Position,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },

    /// The ship has no unfired weapon of this kind left this turn.
    #[error("Ship {ship} has no {weapon:?} available this turn")]
    WeaponUnavailable {
        /// Firing ship.
        ship: ShipId,
        /// Weapon that was requested.
        weapon: WeaponKind,
    },

    /// More modules than the ship class has slots for.
    #[error("Loadout of {modules} modules exceeds {slots} slots")]
    InvalidLoadout {
        /// Number of modules requested.
        modules: usize,
        /// Slots offered by the ship class.
        slots: usize,
    },

    /// The ship has retreated and can no longer act or be targeted.
    #[error("Ship {0} has retreated")]
    ShipInactive(ShipId),

    /// A ruleset value is out of its legal range.
    #[error("Invalid ruleset: {0}")]
    InvalidRuleset(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParse {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Snapshot encoding or decoding failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The battle store could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A replay file could not be used.
    #[error("Replay error: {0}")]
    Replay(String),
}
