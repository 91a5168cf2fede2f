//! Command surface for a battle.
//!
//! Every external intent is a [`Command`]. Commands are plain data so they
//! can be queued, recorded into replays and shipped across threads;
//! [`Battle::apply`] dispatches them onto the aggregate.

use serde::{Deserialize, Serialize};

use crate::battle::{Battle, TurnEvents};
use crate::dice::HitRoller;
use crate::error::Result;
use crate::faction::{FactionId, FactionSpec};
use crate::grid::Position;
use crate::orders::{ExtraAction, MissileId};
use crate::ship::{ShipId, ShipSpec};

/// An intent applied to one battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Add a faction (preparation only).
    AddFaction(FactionSpec),
    /// Rename or recolor a faction.
    UpdateFaction {
        /// Faction to change.
        faction: FactionId,
        /// New name, player and color.
        spec: FactionSpec,
    },
    /// Leave preparation and begin turn 1.
    StartBattle,
    /// Add a ship to a faction (preparation only).
    AddShip {
        /// Owning faction.
        faction: FactionId,
        /// Ship to build.
        spec: ShipSpec,
    },
    /// Rebuild a ship from a new spec (preparation only).
    UpdateShip {
        /// Owning faction.
        faction: FactionId,
        /// Ship to rebuild.
        ship: ShipId,
        /// Replacement spec.
        spec: ShipSpec,
    },
    /// Remove a ship (preparation only).
    RemoveShip {
        /// Owning faction.
        faction: FactionId,
        /// Ship to remove.
        ship: ShipId,
    },
    /// Teleport a ship (preparation only).
    SetShipPosition {
        /// Owning faction.
        faction: FactionId,
        /// Ship to place.
        ship: ShipId,
        /// New position.
        position: Position,
    },
    /// Queue a move, replacing any earlier one for the ship.
    QueueShipMove {
        /// Owning faction.
        faction: FactionId,
        /// Ship to move.
        ship: ShipId,
        /// Destination.
        target: Position,
    },
    /// Drop a ship's queued move.
    CancelShipMove {
        /// Owning faction.
        faction: FactionId,
        /// Ship whose move is dropped.
        ship: ShipId,
    },
    /// Queue a laser shot.
    QueueLaserShot {
        /// Shooter's faction.
        faction: FactionId,
        /// Shooter.
        ship: ShipId,
        /// Target's faction.
        target_faction: FactionId,
        /// Target.
        target_ship: ShipId,
    },
    /// Launch a homing missile.
    QueueMissileShot {
        /// Shooter's faction.
        faction: FactionId,
        /// Shooter.
        ship: ShipId,
        /// Target's faction.
        target_faction: FactionId,
        /// Target.
        target_ship: ShipId,
    },
    /// Queue a special action.
    QueueExtraAction {
        /// Acting faction.
        faction: FactionId,
        /// Acting ship.
        ship: ShipId,
        /// The action.
        action: ExtraAction,
    },
    /// Withdraw a ship from the fight.
    RetreatShip {
        /// Owning faction.
        faction: FactionId,
        /// Ship to withdraw.
        ship: ShipId,
    },
    /// Signal that a faction has finished giving orders.
    MarkFactionReady {
        /// Faction that is ready.
        faction: FactionId,
    },
    /// Resolve the current turn.
    EndTurn,
}

impl Command {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddFaction(_) => "AddFaction",
            Self::UpdateFaction { .. } => "UpdateFaction",
            Self::StartBattle => "StartBattle",
            Self::AddShip { .. } => "AddShip",
            Self::UpdateShip { .. } => "UpdateShip",
            Self::RemoveShip { .. } => "RemoveShip",
            Self::SetShipPosition { .. } => "SetShipPosition",
            Self::QueueShipMove { .. } => "QueueShipMove",
            Self::CancelShipMove { .. } => "CancelShipMove",
            Self::QueueLaserShot { .. } => "QueueLaserShot",
            Self::QueueMissileShot { .. } => "QueueMissileShot",
            Self::QueueExtraAction { .. } => "QueueExtraAction",
            Self::RetreatShip { .. } => "RetreatShip",
            Self::MarkFactionReady { .. } => "MarkFactionReady",
            Self::EndTurn => "EndTurn",
        }
    }
}

/// What a successful command produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOutcome {
    /// The command succeeded with nothing to report.
    Done,
    /// A faction joined. The token authorizes its player.
    FactionAdded {
        /// New faction id.
        id: FactionId,
        /// Secret token for the faction's player.
        token: String,
    },
    /// A ship was added.
    ShipAdded(ShipId),
    /// A missile was launched.
    MissileLaunched(MissileId),
    /// A faction marked itself ready.
    Ready {
        /// Whether every undefeated faction is now ready.
        all_ready: bool,
    },
    /// A turn was resolved.
    TurnResolved(TurnEvents),
}

impl Battle {
    /// Apply a command, drawing end-of-turn rolls from the battle's own roller.
    ///
    /// # Errors
    ///
    /// Returns the rejection of the underlying operation. A rejected
    /// command leaves the battle unchanged.
    pub fn apply(&mut self, command: Command) -> Result<CommandOutcome> {
        self.dispatch(command, None)
    }

    /// Apply a command, drawing end-of-turn rolls from `roller`.
    ///
    /// # Errors
    ///
    /// Same as [`apply`](Self::apply).
    pub fn apply_with(
        &mut self,
        command: Command,
        roller: &mut dyn HitRoller,
    ) -> Result<CommandOutcome> {
        self.dispatch(command, Some(roller))
    }

    fn dispatch(
        &mut self,
        command: Command,
        roller: Option<&mut dyn HitRoller>,
    ) -> Result<CommandOutcome> {
        let name = command.name();
        let outcome = match command {
            Command::AddFaction(spec) => self
                .add_faction(spec)
                .map(|(id, token)| CommandOutcome::FactionAdded { id, token }),
            Command::UpdateFaction { faction, spec } => self
                .update_faction(faction, spec)
                .map(|()| CommandOutcome::Done),
            Command::StartBattle => self.start().map(|()| CommandOutcome::Done),
            Command::AddShip { faction, spec } => {
                self.add_ship(faction, spec).map(CommandOutcome::ShipAdded)
            }
            Command::UpdateShip {
                faction,
                ship,
                spec,
            } => self
                .update_ship(faction, ship, spec)
                .map(|()| CommandOutcome::Done),
            Command::RemoveShip { faction, ship } => self
                .remove_ship(faction, ship)
                .map(|()| CommandOutcome::Done),
            Command::SetShipPosition {
                faction,
                ship,
                position,
            } => self
                .set_ship_position(faction, ship, position)
                .map(|()| CommandOutcome::Done),
            Command::QueueShipMove {
                faction,
                ship,
                target,
            } => self
                .queue_move(faction, ship, target)
                .map(|()| CommandOutcome::Done),
            Command::CancelShipMove { faction, ship } => self
                .cancel_move(faction, ship)
                .map(|()| CommandOutcome::Done),
            Command::QueueLaserShot {
                faction,
                ship,
                target_faction,
                target_ship,
            } => self
                .queue_laser(faction, ship, target_faction, target_ship)
                .map(|()| CommandOutcome::Done),
            Command::QueueMissileShot {
                faction,
                ship,
                target_faction,
                target_ship,
            } => self
                .queue_missile(faction, ship, target_faction, target_ship)
                .map(CommandOutcome::MissileLaunched),
            Command::QueueExtraAction {
                faction,
                ship,
                action,
            } => self
                .queue_extra_action(faction, ship, action)
                .map(|()| CommandOutcome::Done),
            Command::RetreatShip { faction, ship } => self
                .retreat_ship(faction, ship)
                .map(|()| CommandOutcome::Done),
            Command::MarkFactionReady { faction } => self
                .mark_ready(faction)
                .map(|all_ready| CommandOutcome::Ready { all_ready }),
            Command::EndTurn => {
                let events = match roller {
                    Some(roller) => self.end_turn_with(roller),
                    None => self.end_turn(),
                };
                events.map(CommandOutcome::TurnResolved)
            }
        };

        if let Err(e) = &outcome {
            tracing::warn!(battle = %self.id(), command = name, error = %e, "Command rejected");
        }
        outcome
    }
}
