//! # Skirmish Core
//!
//! Deterministic turn-based space battle engine.
//!
//! This crate contains **only** the simulation:
//! - No rendering
//! - No network or persistence technology
//! - No unseeded randomness (every hit roll goes through a [`dice::HitRoller`])
//!
//! Factions queue orders for their ships during a turn; [`battle::Battle::end_turn`]
//! resolves every queued order in a fixed order and appends to the turn log.
//!
//! ## Crate Structure
//!
//! - [`grid`] - Grid positions
//! - [`path`] - Orthogonal path planning for ships and missiles
//! - [`ship`] / [`faction`] - Combat units and their owners
//! - [`orders`] - Queued laser shots, missiles and extra actions
//! - [`combat`] - Accuracy rolls and the shield/armor/hull damage cascade
//! - [`turn_log`] - Per-turn event log with player and admin views
//! - [`battle`] - The battle aggregate and its state machine
//! - [`commands`] - Command surface applied to a battle
//! - [`service`] / [`repository`] - Per-battle serialized command service and storage port
//! - [`replay`] - Recording and playback of command streams

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battle;
pub mod combat;
pub mod commands;
pub mod dice;
pub mod error;
pub mod faction;
pub mod grid;
pub mod orders;
pub mod path;
pub mod replay;
pub mod repository;
pub mod rules;
pub mod service;
pub mod ship;
pub mod turn_log;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battle::{Battle, BattleId, BattleStatus};
    pub use crate::commands::{Command, CommandOutcome};
    pub use crate::dice::{HitRoller, ScriptedRoller, SeededRoller};
    pub use crate::error::{BattleError, Result};
    pub use crate::faction::{Faction, FactionId};
    pub use crate::grid::Position;
    pub use crate::path::Path;
    pub use crate::rules::Ruleset;
    pub use crate::service::{BattleService, ServiceConfig};
    pub use crate::ship::{Ship, ShipClass, ShipId, ShipModule, ShipStatus};
    pub use crate::turn_log::{LogEventKind, TurnLogEntry, Viewer};
}
