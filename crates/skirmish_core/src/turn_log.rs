//! Per-turn battle log.
//!
//! Entries are grouped by turn and only ever appended. Every entry is
//! filed under the faction it belongs to (the acting side). Players see
//! their own faction's entries plus shots aimed at them, always without
//! the admin diagnostics; admins see everything.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::faction::FactionId;
use crate::orders::Combatant;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogEventKind {
    /// A ship moved along its path.
    ShipMove,
    /// A laser shot connected.
    LaserHit,
    /// A laser shot missed.
    LaserMiss,
    /// A missile was launched.
    MissileFired,
    /// A missile connected.
    MissileHit,
    /// A missile missed.
    MissileMiss,
    /// A ship was destroyed.
    ShipDestroyed,
    /// Damage inflicted on an enemy.
    DamageDealt,
    /// Damage taken from an enemy.
    DamageReceived,
}

impl LogEventKind {
    /// Kinds logged once per side, so the other side never needs to see
    /// the attacker's copy.
    #[must_use]
    pub const fn is_mirrored(self) -> bool {
        matches!(
            self,
            Self::DamageDealt | Self::DamageReceived | Self::ShipDestroyed
        )
    }
}

/// Who is reading the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Viewer {
    /// Sees every entry including diagnostics.
    Admin,
    /// Sees this faction's entries and shots aimed at it, without
    /// diagnostics.
    Faction(FactionId),
}

/// One logged event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnLogEntry {
    /// Turn the event happened in.
    pub turn: u32,
    /// Event kind.
    pub kind: LogEventKind,
    /// The side this entry is filed under.
    pub actor: Combatant,
    /// The other side, if any.
    pub target: Option<Combatant>,
    /// Player-facing text.
    pub message: String,
    /// Rolls, distances and other admin-only diagnostics.
    pub admin_detail: Option<String>,
}

impl TurnLogEntry {
    /// Create an entry without a target or diagnostics.
    #[must_use]
    pub fn new(turn: u32, kind: LogEventKind, actor: Combatant, message: String) -> Self {
        Self {
            turn,
            kind,
            actor,
            target: None,
            message,
            admin_detail: None,
        }
    }

    /// Attach the other party.
    #[must_use]
    pub fn with_target(mut self, target: Combatant) -> Self {
        self.target = Some(target);
        self
    }

    /// Attach admin-only diagnostics.
    #[must_use]
    pub fn with_detail(mut self, detail: String) -> Self {
        self.admin_detail = Some(detail);
        self
    }

    fn visible_to(&self, viewer: Viewer) -> bool {
        match viewer {
            Viewer::Admin => true,
            Viewer::Faction(id) => {
                self.actor.faction_id == id
                    || (!self.kind.is_mirrored()
                        && self.target.as_ref().is_some_and(|t| t.faction_id == id))
            }
        }
    }
}

/// Append-only record of every turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnLog {
    turns: BTreeMap<u32, Vec<TurnLogEntry>>,
}

impl TurnLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry under its turn.
    pub fn push(&mut self, entry: TurnLogEntry) {
        self.turns.entry(entry.turn).or_default().push(entry);
    }

    /// All entries of a turn in the order they were logged.
    #[must_use]
    pub fn entries(&self, turn: u32) -> &[TurnLogEntry] {
        self.turns.get(&turn).map(Vec::as_slice).unwrap_or_default()
    }

    /// Entries of a turn as seen by `viewer`.
    ///
    /// Faction viewers get their own entries and the strikes against them,
    /// with diagnostics stripped.
    #[must_use]
    pub fn view(&self, turn: u32, viewer: Viewer) -> Vec<TurnLogEntry> {
        self.entries(turn)
            .iter()
            .filter(|e| e.visible_to(viewer))
            .map(|e| match viewer {
                Viewer::Admin => e.clone(),
                Viewer::Faction(_) => TurnLogEntry {
                    admin_detail: None,
                    ..e.clone()
                },
            })
            .collect()
    }

    /// Turns that have at least one entry, ascending.
    pub fn turns(&self) -> impl Iterator<Item = u32> + '_ {
        self.turns.keys().copied()
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.values().map(Vec::len).sum()
    }

    /// Check if nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
