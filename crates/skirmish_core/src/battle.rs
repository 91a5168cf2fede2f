//! The battle aggregate.
//!
//! A [`Battle`] owns every faction, ship, queued order and log entry of one
//! engagement and is the only way to change them. It is a small state
//! machine:
//!
//! ```text
//! Preparation --start()--> InProgress
//! ```
//!
//! Setup operations (factions, ships, teleporting) are only legal during
//! preparation; orders and turn resolution only while in progress. Every
//! operation validates completely before its first mutation, so a rejected
//! operation leaves the battle untouched.
//!
//! # Turn Resolution Order
//!
//! [`Battle::end_turn`] resolves all queued intents of one kind before the
//! next kind begins:
//! 1. **Lasers** - instant hit rolls, then the laser queue is cleared
//! 2. **Missiles** - advance; arrived missiles roll against their target
//! 3. **Ship movement** - advance queued paths, update positions
//! 4. **Missile re-targeting** - home in on the target's current position
//! 5. **Extra actions** and fire counter / ready flag reset
//! 6. Turn counter increment

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::combat::{effective_missile_accuracy, missile_launch_accuracy, CombatResolver, Strike};
use crate::dice::{HitRoller, SeededRoller};
use crate::error::{BattleError, Missing, Result};
use crate::faction::{Faction, FactionId, FactionSpec};
use crate::grid::Position;
use crate::orders::{Combatant, ExtraAction, ExtraActionOrder, LaserShot, Missile, MissileId};
use crate::path::Path;
use crate::rules::Ruleset;
use crate::ship::{Ship, ShipId, ShipSpec, ShipStatus, WeaponKind};
use crate::turn_log::{LogEventKind, TurnLog, TurnLogEntry, Viewer};

/// Unique identifier for battles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BattleId(pub Uuid);

impl BattleId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for BattleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle status of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BattleStatus {
    /// Factions and ships are being set up.
    #[default]
    Preparation,
    /// Turns are being played.
    InProgress,
}

/// A queued ship movement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipMove {
    /// Owner of the moving ship.
    pub faction_id: FactionId,
    /// Remaining route.
    pub path: Path,
}

/// What happened while resolving one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnEvents {
    /// The turn that was resolved.
    pub turn: u32,
    /// Laser shots rolled.
    pub lasers_resolved: usize,
    /// Missiles that arrived and rolled.
    pub missiles_resolved: usize,
    /// Missiles dropped because their target vanished or got out of range.
    pub missiles_discarded: usize,
    /// Ships that moved.
    pub ships_moved: usize,
    /// Ships destroyed this turn, in order.
    pub destroyed: Vec<ShipId>,
}

/// One battle and everything in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battle {
    id: BattleId,
    name: String,
    width: u32,
    height: u32,
    /// 0 during preparation, 1 on start, +1 per resolved turn.
    turn: u32,
    status: BattleStatus,
    /// Cleared by soft deletion.
    active: bool,
    rules: Ruleset,
    factions: Vec<Faction>,
    /// At most one queued move per ship.
    pending_moves: BTreeMap<ShipId, ShipMove>,
    missiles: Vec<Missile>,
    laser_shots: Vec<LaserShot>,
    extra_actions: Vec<ExtraActionOrder>,
    log: TurnLog,
    roller: SeededRoller,
    next_id: u64,
}

/// Build the log identity of an active ship.
fn combatant_of(factions: &[Faction], faction_id: FactionId, ship_id: ShipId) -> Option<Combatant> {
    let faction = factions.iter().find(|f| f.id == faction_id)?;
    let ship = faction.ship(ship_id).filter(|s| s.is_active())?;
    Some(Combatant {
        faction_id,
        faction_name: faction.name.clone(),
        ship_id,
        ship_name: ship.name.clone(),
    })
}

fn active_ship_mut(
    factions: &mut [Faction],
    faction_id: FactionId,
    ship_id: ShipId,
) -> Option<&mut Ship> {
    factions
        .iter_mut()
        .find(|f| f.id == faction_id)?
        .ship_mut(ship_id)
        .filter(|s| s.is_active())
}

fn remove_destroyed(factions: &mut [Faction], faction_id: FactionId, ship_id: ShipId) {
    if let Some(faction) = factions.iter_mut().find(|f| f.id == faction_id) {
        faction.remove_ship(ship_id);
    }
}

impl Battle {
    /// Create a battle in preparation at turn 0.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidGrid`] for a zero-sized grid and
    /// [`BattleError::InvalidRuleset`] if the rules do not validate.
    pub fn new(
        id: BattleId,
        name: impl Into<String>,
        width: u32,
        height: u32,
        rules: Ruleset,
        seed: u64,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BattleError::InvalidGrid { width, height });
        }
        rules.validate()?;

        let name = name.into();
        tracing::info!(battle = %id, %name, width, height, "Battle created");

        Ok(Self {
            id,
            name,
            width,
            height,
            turn: 0,
            status: BattleStatus::Preparation,
            active: true,
            rules,
            factions: Vec::new(),
            pending_moves: BTreeMap::new(),
            missiles: Vec::new(),
            laser_shots: Vec::new(),
            extra_actions: Vec::new(),
            log: TurnLog::new(),
            roller: SeededRoller::new(seed),
            next_id: 1,
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Battle identifier.
    #[must_use]
    pub const fn id(&self) -> BattleId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grid width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Current turn number.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> BattleStatus {
        self.status
    }

    /// Whether the battle has not been soft-deleted.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Rules in force for this battle.
    #[must_use]
    pub const fn rules(&self) -> &Ruleset {
        &self.rules
    }

    /// All factions in the order they joined.
    #[must_use]
    pub fn factions(&self) -> &[Faction] {
        &self.factions
    }

    /// Look up a faction.
    #[must_use]
    pub fn faction(&self, id: FactionId) -> Option<&Faction> {
        self.factions.iter().find(|f| f.id == id)
    }

    /// Look up a ship anywhere in the battle.
    #[must_use]
    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.factions.iter().find_map(|f| f.ship(id))
    }

    /// Queued moves keyed by ship.
    #[must_use]
    pub const fn pending_moves(&self) -> &BTreeMap<ShipId, ShipMove> {
        &self.pending_moves
    }

    /// Missiles in flight, in launch order.
    #[must_use]
    pub fn missiles(&self) -> &[Missile] {
        &self.missiles
    }

    /// Laser shots queued this turn.
    #[must_use]
    pub fn laser_shots(&self) -> &[LaserShot] {
        &self.laser_shots
    }

    /// Extra actions queued this turn.
    #[must_use]
    pub fn extra_actions(&self) -> &[ExtraActionOrder] {
        &self.extra_actions
    }

    /// The full turn log.
    #[must_use]
    pub const fn log(&self) -> &TurnLog {
        &self.log
    }

    /// One turn of the log as seen by `viewer`.
    #[must_use]
    pub fn turn_log(&self, turn: u32, viewer: Viewer) -> Vec<TurnLogEntry> {
        self.log.view(turn, viewer)
    }

    /// Check if every undefeated faction has marked itself ready.
    #[must_use]
    pub fn all_factions_ready(&self) -> bool {
        self.factions
            .iter()
            .filter(|f| !f.is_defeated())
            .all(|f| f.ready)
    }

    // ------------------------------------------------------------------
    // Validation helpers
    // ------------------------------------------------------------------

    fn require_status(&self, expected: BattleStatus) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(BattleError::InvalidState {
                expected,
                actual: self.status,
            })
        }
    }

    fn require_faction(&self, id: FactionId) -> Result<&Faction> {
        self.faction(id)
            .ok_or(BattleError::NotFound(Missing::Faction(id)))
    }

    fn require_faction_mut(&mut self, id: FactionId) -> Result<&mut Faction> {
        self.factions
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(BattleError::NotFound(Missing::Faction(id)))
    }

    fn require_ship(&self, faction_id: FactionId, ship_id: ShipId) -> Result<&Ship> {
        self.require_faction(faction_id)?
            .ship(ship_id)
            .ok_or(BattleError::NotFound(Missing::Ship(ship_id)))
    }

    fn require_active_ship(&self, faction_id: FactionId, ship_id: ShipId) -> Result<&Ship> {
        let ship = self.require_ship(faction_id, ship_id)?;
        if ship.is_active() {
            Ok(ship)
        } else {
            Err(BattleError::ShipInactive(ship_id))
        }
    }

    fn ship_mut(&mut self, faction_id: FactionId, ship_id: ShipId) -> Result<&mut Ship> {
        self.require_faction_mut(faction_id)?
            .ship_mut(ship_id)
            .ok_or(BattleError::NotFound(Missing::Ship(ship_id)))
    }

    fn require_in_bounds(&self, position: Position) -> Result<()> {
        if position.within(self.width, self.height) {
            Ok(())
        } else {
            Err(BattleError::OutOfBounds {
                position,
                width: self.width,
                height: self.height,
            })
        }
    }

    fn combatant(&self, faction_id: FactionId, ship_id: ShipId) -> Result<Combatant> {
        let faction = self.require_faction(faction_id)?;
        let ship = faction
            .ship(ship_id)
            .ok_or(BattleError::NotFound(Missing::Ship(ship_id)))?;
        Ok(Combatant {
            faction_id,
            faction_name: faction.name.clone(),
            ship_id,
            ship_name: ship.name.clone(),
        })
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ------------------------------------------------------------------
    // Preparation
    // ------------------------------------------------------------------

    /// Add a faction and return its id and secret token.
    ///
    /// # Errors
    ///
    /// Fails if the battle is not in preparation or a faction with the
    /// same name (ignoring case) already exists.
    pub fn add_faction(&mut self, spec: FactionSpec) -> Result<(FactionId, String)> {
        self.require_status(BattleStatus::Preparation)?;
        if self
            .factions
            .iter()
            .any(|f| f.name.eq_ignore_ascii_case(&spec.name))
        {
            return Err(BattleError::Duplicate(format!("faction '{}'", spec.name)));
        }

        let id = FactionId(self.allocate_id());
        let token = Uuid::new_v4().simple().to_string();
        tracing::info!(battle = %self.id, faction = %id, name = %spec.name, "Faction added");
        self.factions
            .push(Faction::new(id, spec, token.clone()));
        Ok((id, token))
    }

    /// Rename a faction or change its player or color. Legal in any status.
    ///
    /// # Errors
    ///
    /// Fails if the faction does not exist or another faction already
    /// uses the new name.
    pub fn update_faction(&mut self, id: FactionId, spec: FactionSpec) -> Result<()> {
        self.require_faction(id)?;
        if self
            .factions
            .iter()
            .any(|f| f.id != id && f.name.eq_ignore_ascii_case(&spec.name))
        {
            return Err(BattleError::Duplicate(format!("faction '{}'", spec.name)));
        }

        let faction = self.require_faction_mut(id)?;
        faction.name = spec.name;
        faction.player_name = spec.player_name;
        faction.color = spec.color;
        Ok(())
    }

    /// Add a ship to a faction's roster.
    ///
    /// # Errors
    ///
    /// Fails outside preparation, for unknown factions, out-of-grid
    /// positions, duplicate ship names or overfull loadouts.
    pub fn add_ship(&mut self, faction_id: FactionId, spec: ShipSpec) -> Result<ShipId> {
        self.require_status(BattleStatus::Preparation)?;
        let faction = self.require_faction(faction_id)?;
        if faction.has_ship_named(&spec.name) {
            return Err(BattleError::Duplicate(format!("ship '{}'", spec.name)));
        }
        self.require_in_bounds(spec.position)?;

        // Build against a placeholder id so a bad loadout allocates nothing.
        let mut ship = Ship::build(ShipId(0), spec, &self.rules)?;
        ship.id = ShipId(self.allocate_id());
        let id = ship.id;

        tracing::debug!(battle = %self.id, faction = %faction_id, ship = %id, "Ship added");
        self.require_faction_mut(faction_id)?.push_ship(ship);
        Ok(id)
    }

    /// Refit a ship: replace its name, class, position and modules.
    ///
    /// The ship is rebuilt at full strength under the same id.
    ///
    /// # Errors
    ///
    /// Same conditions as [`add_ship`](Self::add_ship), plus an unknown ship.
    pub fn update_ship(&mut self, faction_id: FactionId, ship_id: ShipId, spec: ShipSpec) -> Result<()> {
        self.require_status(BattleStatus::Preparation)?;
        let faction = self.require_faction(faction_id)?;
        faction
            .ship(ship_id)
            .ok_or(BattleError::NotFound(Missing::Ship(ship_id)))?;
        if faction
            .ships()
            .iter()
            .any(|s| s.id != ship_id && s.name.eq_ignore_ascii_case(&spec.name))
        {
            return Err(BattleError::Duplicate(format!("ship '{}'", spec.name)));
        }
        self.require_in_bounds(spec.position)?;

        let rebuilt = Ship::build(ship_id, spec, &self.rules)?;
        *self.ship_mut(faction_id, ship_id)? = rebuilt;
        Ok(())
    }

    /// Remove a ship from a faction during preparation.
    ///
    /// # Errors
    ///
    /// Fails outside preparation or for unknown factions and ships.
    pub fn remove_ship(&mut self, faction_id: FactionId, ship_id: ShipId) -> Result<()> {
        self.require_status(BattleStatus::Preparation)?;
        self.require_ship(faction_id, ship_id)?;
        self.require_faction_mut(faction_id)?.remove_ship(ship_id);
        Ok(())
    }

    /// Teleport a ship. No path, no log entry.
    ///
    /// # Errors
    ///
    /// Fails outside preparation, for unknown ships or off-grid positions.
    pub fn set_ship_position(
        &mut self,
        faction_id: FactionId,
        ship_id: ShipId,
        position: Position,
    ) -> Result<()> {
        self.require_status(BattleStatus::Preparation)?;
        self.require_ship(faction_id, ship_id)?;
        self.require_in_bounds(position)?;
        self.ship_mut(faction_id, ship_id)?.position = position;
        Ok(())
    }

    /// Start the battle: status becomes in progress and turn becomes 1.
    ///
    /// # Errors
    ///
    /// Fails if the battle has already started.
    pub fn start(&mut self) -> Result<()> {
        self.require_status(BattleStatus::Preparation)?;
        self.status = BattleStatus::InProgress;
        self.turn = 1;
        tracing::info!(battle = %self.id, factions = self.factions.len(), "Battle started");
        Ok(())
    }

    /// Mark the battle as deleted without erasing anything.
    pub fn soft_delete(&mut self) {
        self.active = false;
        tracing::info!(battle = %self.id, "Battle soft-deleted");
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Queue a move towards `target`, replacing any move already queued
    /// for this ship. Queuing onto the ship's own position cancels the move.
    ///
    /// # Errors
    ///
    /// Fails outside play, for unknown or retreated ships and off-grid targets.
    pub fn queue_move(&mut self, faction_id: FactionId, ship_id: ShipId, target: Position) -> Result<()> {
        self.require_status(BattleStatus::InProgress)?;
        let ship = self.require_active_ship(faction_id, ship_id)?;
        self.require_in_bounds(target)?;

        let path = Path::plan(ship.position, target, ship.speed);
        if path.is_completed() {
            self.pending_moves.remove(&ship_id);
        } else {
            tracing::debug!(battle = %self.id, ship = %ship_id, %target, steps = path.len(), "Move queued");
            self.pending_moves
                .insert(ship_id, ShipMove { faction_id, path });
        }
        Ok(())
    }

    /// Drop a ship's queued move. Succeeds even if nothing was queued.
    ///
    /// # Errors
    ///
    /// Fails outside play or for unknown ships.
    pub fn cancel_move(&mut self, faction_id: FactionId, ship_id: ShipId) -> Result<()> {
        self.require_status(BattleStatus::InProgress)?;
        self.require_ship(faction_id, ship_id)?;
        self.pending_moves.remove(&ship_id);
        Ok(())
    }

    /// Queue a laser shot for end of turn.
    ///
    /// # Errors
    ///
    /// Fails outside play, for unknown or retreated ships on either side,
    /// or when the ship has no unfired laser left this turn.
    pub fn queue_laser(
        &mut self,
        faction_id: FactionId,
        ship_id: ShipId,
        target_faction: FactionId,
        target_ship: ShipId,
    ) -> Result<()> {
        self.require_status(BattleStatus::InProgress)?;
        self.require_active_ship(faction_id, ship_id)?;
        self.require_active_ship(target_faction, target_ship)?;
        let source = self.combatant(faction_id, ship_id)?;

        self.ship_mut(faction_id, ship_id)?
            .record_fire(WeaponKind::Laser)?;
        tracing::debug!(battle = %self.id, ship = %ship_id, target = %target_ship, "Laser queued");
        self.laser_shots.push(LaserShot {
            source,
            target_faction,
            target_ship,
        });
        Ok(())
    }

    /// Launch a missile. Its accuracy is fixed now from the path length.
    ///
    /// # Errors
    ///
    /// Fails outside play, for unknown or retreated ships, when the path
    /// is longer than the maximum missile range, or when the ship has no
    /// unfired launcher left this turn.
    pub fn queue_missile(
        &mut self,
        faction_id: FactionId,
        ship_id: ShipId,
        target_faction: FactionId,
        target_ship: ShipId,
    ) -> Result<MissileId> {
        self.require_status(BattleStatus::InProgress)?;
        let shooter = self.require_active_ship(faction_id, ship_id)?;
        let target = self.require_active_ship(target_faction, target_ship)?;

        let path = Path::plan(shooter.position, target.position, self.rules.missile_speed);
        let distance = path.len();
        if distance > self.rules.missile_max_range {
            return Err(BattleError::OutOfRange {
                distance,
                max: self.rules.missile_max_range,
            });
        }
        if !shooter.can_fire(WeaponKind::Missile) {
            return Err(BattleError::WeaponUnavailable {
                ship: ship_id,
                weapon: WeaponKind::Missile,
            });
        }

        let accuracy = missile_launch_accuracy(&self.rules, distance);
        let source = self.combatant(faction_id, ship_id)?;
        let defender = self.combatant(target_faction, target_ship)?;

        self.ship_mut(faction_id, ship_id)?
            .record_fire(WeaponKind::Missile)?;
        let id = MissileId(self.allocate_id());

        self.log.push(
            TurnLogEntry::new(
                self.turn,
                LogEventKind::MissileFired,
                source.clone(),
                format!("{} launched a missile at {}", source.ship_name, defender.ship_name),
            )
            .with_target(defender)
            .with_detail(format!("distance {distance}, accuracy {accuracy}")),
        );
        tracing::debug!(battle = %self.id, missile = %id, distance, accuracy, "Missile launched");

        self.missiles.push(Missile {
            id,
            source,
            target_faction,
            target_ship,
            path,
            accuracy,
            fired_turn: self.turn,
        });
        Ok(id)
    }

    /// Queue a special action for end of turn.
    ///
    /// # Errors
    ///
    /// Fails outside play or for unknown or retreated ships.
    pub fn queue_extra_action(
        &mut self,
        faction_id: FactionId,
        ship_id: ShipId,
        action: ExtraAction,
    ) -> Result<()> {
        self.require_status(BattleStatus::InProgress)?;
        self.require_active_ship(faction_id, ship_id)?;
        let source = self.combatant(faction_id, ship_id)?;
        self.extra_actions.push(ExtraActionOrder { source, action });
        Ok(())
    }

    /// Withdraw a ship from the battle. Its queued move, laser shots and
    /// extra actions are dropped; missiles it already launched keep
    /// flying, and missiles tracking it lose lock on the next update.
    ///
    /// # Errors
    ///
    /// Fails outside play or for unknown or already retreated ships.
    pub fn retreat_ship(&mut self, faction_id: FactionId, ship_id: ShipId) -> Result<()> {
        self.require_status(BattleStatus::InProgress)?;
        self.require_active_ship(faction_id, ship_id)?;

        let ship = self.ship_mut(faction_id, ship_id)?;
        ship.status = ShipStatus::Retreated;
        ship.lasers_fired = 0;
        self.pending_moves.remove(&ship_id);
        self.laser_shots.retain(|s| s.source.ship_id != ship_id);
        self.extra_actions.retain(|a| a.source.ship_id != ship_id);
        tracing::info!(battle = %self.id, ship = %ship_id, "Ship retreated");
        Ok(())
    }

    /// Mark a faction as done giving orders this turn.
    ///
    /// Returns whether every undefeated faction is now ready.
    ///
    /// # Errors
    ///
    /// Fails outside play or for unknown factions.
    pub fn mark_ready(&mut self, faction_id: FactionId) -> Result<bool> {
        self.require_status(BattleStatus::InProgress)?;
        self.require_faction_mut(faction_id)?.ready = true;
        Ok(self.all_factions_ready())
    }

    // ------------------------------------------------------------------
    // Turn resolution
    // ------------------------------------------------------------------

    /// Resolve the current turn with the battle's own seeded roller.
    ///
    /// # Errors
    ///
    /// Fails if the battle is not in progress.
    pub fn end_turn(&mut self) -> Result<TurnEvents> {
        self.require_status(BattleStatus::InProgress)?;
        let mut roller = self.roller.clone();
        let events = self.resolve_turn(&mut roller);
        self.roller = roller;
        Ok(events)
    }

    /// Resolve the current turn drawing hit rolls from `roller`.
    ///
    /// # Errors
    ///
    /// Fails if the battle is not in progress.
    pub fn end_turn_with(&mut self, roller: &mut dyn HitRoller) -> Result<TurnEvents> {
        self.require_status(BattleStatus::InProgress)?;
        Ok(self.resolve_turn(roller))
    }

    fn resolve_turn(&mut self, roller: &mut dyn HitRoller) -> TurnEvents {
        let mut events = TurnEvents {
            turn: self.turn,
            ..TurnEvents::default()
        };

        self.resolve_lasers(roller, &mut events);
        self.resolve_missiles(roller, &mut events);
        self.move_ships(&mut events);
        self.retarget_missiles(&mut events);
        self.resolve_extra_actions();

        for faction in &mut self.factions {
            faction.ready = false;
            for ship in faction.ships_mut() {
                ship.reset_fired();
            }
        }

        self.turn += 1;
        tracing::info!(
            battle = %self.id,
            turn = events.turn,
            lasers = events.lasers_resolved,
            missiles = events.missiles_resolved,
            moved = events.ships_moved,
            destroyed = events.destroyed.len(),
            "Turn resolved"
        );

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(turn = self.turn, state_hash = hash, "Battle state hash");
        }

        events
    }

    fn resolve_lasers(&mut self, roller: &mut dyn HitRoller, events: &mut TurnEvents) {
        let Self {
            rules,
            factions,
            log,
            laser_shots,
            pending_moves,
            turn,
            ..
        } = self;
        let resolver = CombatResolver::new(rules, *turn);

        for shot in std::mem::take(laser_shots) {
            let Some(defender) = combatant_of(factions, shot.target_faction, shot.target_ship)
            else {
                tracing::debug!(ship = %shot.target_ship, "Laser target gone, shot dropped");
                continue;
            };
            let Some(target) = active_ship_mut(factions, shot.target_faction, shot.target_ship)
            else {
                continue;
            };

            let outcome = resolver.resolve_strike(
                roller,
                log,
                Strike {
                    weapon: WeaponKind::Laser,
                    attacker: &shot.source,
                    defender: &defender,
                    accuracy: rules.laser_accuracy,
                    damage: rules.laser_damage,
                },
                target,
            );
            events.lasers_resolved += 1;

            if outcome.destroyed() {
                remove_destroyed(factions, shot.target_faction, shot.target_ship);
                pending_moves.remove(&shot.target_ship);
                events.destroyed.push(shot.target_ship);
            }
        }
    }

    fn resolve_missiles(&mut self, roller: &mut dyn HitRoller, events: &mut TurnEvents) {
        let Self {
            rules,
            factions,
            log,
            missiles,
            pending_moves,
            turn,
            ..
        } = self;
        let resolver = CombatResolver::new(rules, *turn);

        for mut missile in std::mem::take(missiles) {
            missile.path.advance();
            if !missile.path.is_completed() {
                missiles.push(missile);
                continue;
            }

            let Some(defender) =
                combatant_of(factions, missile.target_faction, missile.target_ship)
            else {
                tracing::debug!(missile = %missile.id, "Missile target gone, missile discarded");
                events.missiles_discarded += 1;
                continue;
            };
            let Some(target) =
                active_ship_mut(factions, missile.target_faction, missile.target_ship)
            else {
                continue;
            };

            let accuracy = effective_missile_accuracy(rules, missile.accuracy, target);
            let outcome = resolver.resolve_strike(
                roller,
                log,
                Strike {
                    weapon: WeaponKind::Missile,
                    attacker: &missile.source,
                    defender: &defender,
                    accuracy,
                    damage: rules.missile_damage,
                },
                target,
            );
            events.missiles_resolved += 1;

            if outcome.destroyed() {
                remove_destroyed(factions, missile.target_faction, missile.target_ship);
                pending_moves.remove(&missile.target_ship);
                events.destroyed.push(missile.target_ship);
            }
        }
    }

    fn move_ships(&mut self, events: &mut TurnEvents) {
        let Self {
            rules,
            factions,
            log,
            pending_moves,
            turn,
            ..
        } = self;

        pending_moves.retain(|&ship_id, queued| {
            let Some(actor) = combatant_of(factions, queued.faction_id, ship_id) else {
                return false;
            };
            let Some(ship) = active_ship_mut(factions, queued.faction_id, ship_id) else {
                return false;
            };

            for _ in 0..rules.ship_advances_per_turn {
                queued.path.advance();
            }
            let from = ship.position;
            ship.position = queued.path.start();
            events.ships_moved += 1;

            log.push(
                TurnLogEntry::new(
                    *turn,
                    LogEventKind::ShipMove,
                    actor.clone(),
                    format!("{} moved from {from} to {}", actor.ship_name, ship.position),
                )
                .with_detail(format!(
                    "speed {}, {} steps remaining to {}",
                    queued.path.speed(),
                    queued.path.len(),
                    queued.path.target()
                )),
            );

            !queued.path.is_completed()
        });
    }

    fn retarget_missiles(&mut self, events: &mut TurnEvents) {
        let Self {
            rules,
            factions,
            missiles,
            ..
        } = self;

        missiles.retain_mut(|missile| {
            let target = factions
                .iter()
                .find(|f| f.id == missile.target_faction)
                .and_then(|f| f.ship(missile.target_ship))
                .filter(|s| s.is_active());
            let Some(target) = target else {
                tracing::debug!(missile = %missile.id, "Missile target gone, missile discarded");
                events.missiles_discarded += 1;
                return false;
            };

            match missile
                .path
                .retarget(target.position, rules.missile_max_range)
            {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(missile = %missile.id, error = %e, "Missile lost lock");
                    events.missiles_discarded += 1;
                    false
                }
            }
        });
    }

    fn resolve_extra_actions(&mut self) {
        for order in std::mem::take(&mut self.extra_actions) {
            match order.action {
                ExtraAction::Unimplemented { name } => {
                    tracing::warn!(
                        battle = %self.id,
                        ship = %order.source.ship_id,
                        action = %name,
                        "Extra action has no resolution rules, ignored"
                    );
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Compute a deterministic hash of the battle state.
    ///
    /// Faction tokens are excluded so that identically scripted battles
    /// hash equal. Used for determinism checks and replay verification.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.name.hash(&mut hasher);
        self.width.hash(&mut hasher);
        self.height.hash(&mut hasher);
        self.turn.hash(&mut hasher);
        self.status.hash(&mut hasher);
        self.active.hash(&mut hasher);
        self.rules.hash(&mut hasher);

        for faction in &self.factions {
            faction.id.hash(&mut hasher);
            faction.name.hash(&mut hasher);
            faction.player_name.hash(&mut hasher);
            faction.color.hash(&mut hasher);
            faction.ready.hash(&mut hasher);
            faction.ships().hash(&mut hasher);
        }

        self.pending_moves.hash(&mut hasher);
        self.missiles.hash(&mut hasher);
        self.laser_shots.hash(&mut hasher);
        self.extra_actions.hash(&mut hasher);
        self.log.hash(&mut hasher);
        self.roller.hash(&mut hasher);
        self.next_id.hash(&mut hasher);

        hasher.finish()
    }

    /// Serialize the battle for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| BattleError::Serialization(format!("Failed to serialize battle: {e}")))
    }

    /// Deserialize a battle from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| BattleError::Serialization(format!("Failed to deserialize battle: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedRoller;
    use crate::ship::{ShipClass, ShipModule};

    fn spec(name: &str, x: i32, y: i32, modules: Vec<ShipModule>) -> ShipSpec {
        ShipSpec {
            name: name.into(),
            class: ShipClass::Destroyer,
            position: Position::new(x, y),
            modules,
        }
    }

    fn faction(name: &str) -> FactionSpec {
        FactionSpec {
            name: name.into(),
            player_name: format!("{name} player"),
            color: "#ffffff".into(),
        }
    }

    fn new_battle() -> Battle {
        Battle::new(BattleId::generate(), "Test", 100, 100, Ruleset::default(), 7).unwrap()
    }

    /// Two factions, one armed destroyer each, battle started.
    fn duel() -> (Battle, FactionId, ShipId, FactionId, ShipId) {
        let mut battle = new_battle();
        let (red, _) = battle.add_faction(faction("Red")).unwrap();
        let (blue, _) = battle.add_faction(faction("Blue")).unwrap();
        let loadout = vec![ShipModule::Laser, ShipModule::MissileLauncher];
        let a = battle.add_ship(red, spec("Anvil", 0, 0, loadout.clone())).unwrap();
        let b = battle.add_ship(blue, spec("Bastion", 10, 0, loadout)).unwrap();
        battle.start().unwrap();
        (battle, red, a, blue, b)
    }

    #[test]
    fn test_new_battle() {
        let battle = new_battle();
        assert_eq!(battle.turn(), 0);
        assert_eq!(battle.status(), BattleStatus::Preparation);
        assert!(battle.is_active());
        assert!(battle.factions().is_empty());
    }

    #[test]
    fn test_zero_grid_rejected() {
        let err = Battle::new(BattleId::generate(), "x", 0, 5, Ruleset::default(), 1).unwrap_err();
        assert!(matches!(err, BattleError::InvalidGrid { .. }));
    }

    #[test]
    fn test_start_sets_turn_one() {
        let mut battle = new_battle();
        battle.start().unwrap();
        assert_eq!(battle.turn(), 1);
        assert_eq!(battle.status(), BattleStatus::InProgress);
        assert!(matches!(
            battle.start(),
            Err(BattleError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_duplicate_faction_rejected() {
        let mut battle = new_battle();
        battle.add_faction(faction("Red")).unwrap();
        let before = battle.state_hash();
        assert!(matches!(
            battle.add_faction(faction("red")),
            Err(BattleError::Duplicate(_))
        ));
        assert_eq!(battle.state_hash(), before);
    }

    #[test]
    fn test_preparation_only_operations_rejected_in_progress() {
        let (mut battle, red, a, _, _) = duel();
        let before = battle.state_hash();

        assert!(matches!(
            battle.add_faction(faction("Green")),
            Err(BattleError::InvalidState { .. })
        ));
        assert!(matches!(
            battle.add_ship(red, spec("Late", 1, 1, vec![])),
            Err(BattleError::InvalidState { .. })
        ));
        assert!(matches!(
            battle.set_ship_position(red, a, Position::new(5, 5)),
            Err(BattleError::InvalidState { .. })
        ));
        assert_eq!(battle.state_hash(), before);
    }

    #[test]
    fn test_in_progress_only_operations_rejected_in_preparation() {
        let mut battle = new_battle();
        let (red, _) = battle.add_faction(faction("Red")).unwrap();
        let (blue, _) = battle.add_faction(faction("Blue")).unwrap();
        let a = battle
            .add_ship(red, spec("A", 0, 0, vec![ShipModule::Laser]))
            .unwrap();
        let b = battle.add_ship(blue, spec("B", 3, 3, vec![])).unwrap();
        let before = battle.state_hash();

        assert!(matches!(
            battle.queue_laser(red, a, blue, b),
            Err(BattleError::InvalidState { .. })
        ));
        assert!(matches!(
            battle.queue_move(red, a, Position::new(1, 1)),
            Err(BattleError::InvalidState { .. })
        ));
        assert!(matches!(
            battle.end_turn(),
            Err(BattleError::InvalidState {
                expected: BattleStatus::InProgress,
                actual: BattleStatus::Preparation
            })
        ));
        assert_eq!(battle.turn(), 0);
        assert_eq!(battle.ship(a).unwrap().lasers_fired, 0);
        assert_eq!(battle.state_hash(), before);
    }

    #[test]
    fn test_unknown_references() {
        let (mut battle, red, a, blue, _) = duel();
        assert!(matches!(
            battle.queue_move(FactionId(999), a, Position::new(1, 1)),
            Err(BattleError::NotFound(Missing::Faction(FactionId(999))))
        ));
        assert!(matches!(
            battle.queue_laser(red, a, blue, ShipId(999)),
            Err(BattleError::NotFound(Missing::Ship(ShipId(999))))
        ));
        // Ship exists but belongs to the other faction.
        assert!(matches!(
            battle.queue_move(blue, a, Position::new(1, 1)),
            Err(BattleError::NotFound(Missing::Ship(_)))
        ));
        assert_eq!(battle.ship(a).unwrap().lasers_fired, 0);
    }

    #[test]
    fn test_add_ship_validation_is_atomic() {
        let mut battle = new_battle();
        let (red, _) = battle.add_faction(faction("Red")).unwrap();
        let before = battle.state_hash();

        assert!(matches!(
            battle.add_ship(red, spec("Far", 100, 0, vec![])),
            Err(BattleError::OutOfBounds { .. })
        ));
        assert!(matches!(
            battle.add_ship(red, spec("Heavy", 0, 0, vec![ShipModule::Laser; 5])),
            Err(BattleError::InvalidLoadout { .. })
        ));
        assert_eq!(battle.state_hash(), before);

        battle.add_ship(red, spec("One", 0, 0, vec![])).unwrap();
        assert!(matches!(
            battle.add_ship(red, spec("one", 1, 0, vec![])),
            Err(BattleError::Duplicate(_))
        ));
    }

    #[test]
    fn test_update_and_remove_ship() {
        let mut battle = new_battle();
        let (red, _) = battle.add_faction(faction("Red")).unwrap();
        let id = battle.add_ship(red, spec("Old", 0, 0, vec![])).unwrap();

        let mut refit = spec("New", 4, 4, vec![ShipModule::PointDefense]);
        refit.class = ShipClass::Cruiser;
        battle.update_ship(red, id, refit).unwrap();

        let ship = battle.ship(id).unwrap();
        assert_eq!(ship.name, "New");
        assert_eq!(ship.class, ShipClass::Cruiser);
        assert_eq!(ship.position, Position::new(4, 4));
        assert_eq!(ship.loadout.point_defense, 1);

        battle.remove_ship(red, id).unwrap();
        assert!(battle.ship(id).is_none());
    }

    #[test]
    fn test_update_faction_any_status() {
        let (mut battle, red, _, blue, _) = duel();
        battle
            .update_faction(red, faction("Crimson"))
            .unwrap();
        assert_eq!(battle.faction(red).unwrap().name, "Crimson");
        assert!(matches!(
            battle.update_faction(red, faction("Blue")),
            Err(BattleError::Duplicate(_))
        ));
        assert_eq!(battle.faction(blue).unwrap().name, "Blue");
    }

    #[test]
    fn test_second_move_replaces_first() {
        let (mut battle, red, a, _, _) = duel();
        battle.queue_move(red, a, Position::new(0, 9)).unwrap();
        battle.queue_move(red, a, Position::new(5, 5)).unwrap();

        assert_eq!(battle.pending_moves().len(), 1);
        assert_eq!(
            battle.pending_moves()[&a].path.target(),
            Position::new(5, 5)
        );
    }

    #[test]
    fn test_move_onto_self_cancels() {
        let (mut battle, red, a, _, _) = duel();
        battle.queue_move(red, a, Position::new(0, 9)).unwrap();
        battle.queue_move(red, a, Position::new(0, 0)).unwrap();
        assert!(battle.pending_moves().is_empty());
    }

    #[test]
    fn test_ship_moves_one_advance_per_turn() {
        let (mut battle, red, a, _, _) = duel();
        let speed = battle.ship(a).unwrap().speed;
        battle.queue_move(red, a, Position::new(0, 20)).unwrap();

        battle
            .end_turn_with(&mut ScriptedRoller::always(100))
            .unwrap();

        let ship = battle.ship(a).unwrap();
        assert_eq!(ship.position, Position::new(0, speed as i32));
        assert_eq!(battle.pending_moves().len(), 1);
        let moves: Vec<_> = battle
            .log()
            .entries(1)
            .iter()
            .filter(|e| e.kind == LogEventKind::ShipMove)
            .collect();
        assert_eq!(moves.len(), 1);
    }

    #[test]
    fn test_move_completes_and_is_removed() {
        let (mut battle, red, a, _, _) = duel();
        battle.queue_move(red, a, Position::new(1, 1)).unwrap();
        battle
            .end_turn_with(&mut ScriptedRoller::always(100))
            .unwrap();
        assert_eq!(battle.ship(a).unwrap().position, Position::new(1, 1));
        assert!(battle.pending_moves().is_empty());
    }

    #[test]
    fn test_laser_fire_limit_and_reset() {
        let (mut battle, red, a, blue, b) = duel();
        battle.queue_laser(red, a, blue, b).unwrap();
        assert!(matches!(
            battle.queue_laser(red, a, blue, b),
            Err(BattleError::WeaponUnavailable {
                weapon: WeaponKind::Laser,
                ..
            })
        ));
        assert_eq!(battle.laser_shots().len(), 1);

        battle
            .end_turn_with(&mut ScriptedRoller::always(100))
            .unwrap();
        assert!(battle.laser_shots().is_empty());
        assert_eq!(battle.ship(a).unwrap().lasers_fired, 0);
        battle.queue_laser(red, a, blue, b).unwrap();
    }

    #[test]
    fn test_laser_resolution_logs_and_damages() {
        let (mut battle, red, a, blue, b) = duel();
        let before = battle.ship(b).unwrap().hit_capacity();
        battle.queue_laser(red, a, blue, b).unwrap();

        let events = battle
            .end_turn_with(&mut ScriptedRoller::always(1))
            .unwrap();

        assert_eq!(events.turn, 1);
        assert_eq!(events.lasers_resolved, 1);
        assert_eq!(battle.turn(), 2);
        assert_eq!(
            battle.ship(b).unwrap().hit_capacity(),
            before - battle.rules().laser_damage
        );
        assert!(battle
            .log()
            .entries(1)
            .iter()
            .any(|e| e.kind == LogEventKind::LaserHit));
    }

    #[test]
    fn test_missile_launch_out_of_range() {
        let mut battle = new_battle();
        let (red, _) = battle.add_faction(faction("Red")).unwrap();
        let (blue, _) = battle.add_faction(faction("Blue")).unwrap();
        let a = battle
            .add_ship(red, spec("A", 0, 0, vec![ShipModule::MissileLauncher]))
            .unwrap();
        let b = battle.add_ship(blue, spec("B", 99, 99, vec![])).unwrap();
        battle.start().unwrap();
        let before = battle.state_hash();

        assert!(matches!(
            battle.queue_missile(red, a, blue, b),
            Err(BattleError::OutOfRange {
                distance: 198,
                max: 100
            })
        ));
        assert!(battle.missiles().is_empty());
        assert_eq!(battle.ship(a).unwrap().missiles_fired, 0);
        assert_eq!(battle.state_hash(), before);
    }

    #[test]
    fn test_missile_at_effective_range_has_base_accuracy() {
        let mut battle = new_battle();
        let (red, _) = battle.add_faction(faction("Red")).unwrap();
        let (blue, _) = battle.add_faction(faction("Blue")).unwrap();
        let a = battle
            .add_ship(red, spec("A", 0, 0, vec![ShipModule::MissileLauncher]))
            .unwrap();
        let b = battle.add_ship(blue, spec("B", 20, 15, vec![])).unwrap();
        battle.start().unwrap();

        battle.queue_missile(red, a, blue, b).unwrap();
        let missile = &battle.missiles()[0];
        assert_eq!(missile.path.len(), 35);
        assert_eq!(missile.accuracy, 60);
        assert_eq!(missile.fired_turn, 1);
        assert_eq!(
            battle.log().entries(1)[0].kind,
            LogEventKind::MissileFired
        );
    }

    #[test]
    fn test_missile_homes_and_hits() {
        let (mut battle, red, a, blue, b) = duel();
        battle.queue_missile(red, a, blue, b).unwrap();

        let events = battle
            .end_turn_with(&mut ScriptedRoller::always(1))
            .unwrap();
        assert_eq!(events.missiles_resolved, 1);
        assert!(battle.missiles().is_empty());
        assert!(battle
            .log()
            .entries(1)
            .iter()
            .any(|e| e.kind == LogEventKind::MissileHit));
    }

    #[test]
    fn test_missile_follows_moving_target() {
        let mut battle = new_battle();
        let (red, _) = battle.add_faction(faction("Red")).unwrap();
        let (blue, _) = battle.add_faction(faction("Blue")).unwrap();
        let a = battle
            .add_ship(red, spec("A", 0, 0, vec![ShipModule::MissileLauncher]))
            .unwrap();
        let b = battle.add_ship(blue, spec("B", 30, 0, vec![])).unwrap();
        battle.start().unwrap();

        battle.queue_missile(red, a, blue, b).unwrap();
        battle.queue_move(blue, b, Position::new(30, 10)).unwrap();
        battle
            .end_turn_with(&mut ScriptedRoller::always(100))
            .unwrap();

        let missile = &battle.missiles()[0];
        let target_pos = battle.ship(b).unwrap().position;
        assert_eq!(missile.path.target(), target_pos);
        assert_eq!(missile.path.start(), Position::new(10, 0));
    }

    #[test]
    fn test_missile_discarded_when_target_destroyed_by_laser() {
        let mut battle = new_battle();
        let (red, _) = battle.add_faction(faction("Red")).unwrap();
        let (blue, _) = battle.add_faction(faction("Blue")).unwrap();
        let a = battle
            .add_ship(
                red,
                spec("A", 0, 0, vec![ShipModule::Laser, ShipModule::MissileLauncher]),
            )
            .unwrap();
        let b = battle.add_ship(blue, spec("B", 40, 0, vec![])).unwrap();
        battle.start().unwrap();

        {
            // Leave the target one laser hit from destruction.
            let rules = battle.rules().clone();
            let ship = battle.ship_mut(blue, b).unwrap();
            ship.shields = 0;
            ship.armor = 0;
            ship.hitpoints = rules.laser_damage;
        }

        battle.queue_missile(red, a, blue, b).unwrap();
        battle.queue_laser(red, a, blue, b).unwrap();
        let events = battle
            .end_turn_with(&mut ScriptedRoller::always(1))
            .unwrap();

        assert_eq!(events.destroyed, vec![b]);
        assert!(battle.ship(b).is_none());
        assert!(battle.missiles().is_empty());
        assert_eq!(events.missiles_discarded, 1);
        assert_eq!(events.missiles_resolved, 0);
        assert!(!battle
            .log()
            .entries(1)
            .iter()
            .any(|e| matches!(e.kind, LogEventKind::MissileHit | LogEventKind::MissileMiss)));
        assert!(battle.faction(blue).unwrap().is_defeated());
    }

    #[test]
    fn test_missile_loses_lock_when_target_flees() {
        let rules = Ruleset {
            missile_speed: 1,
            missile_max_range: 12,
            missile_effective_range: 10,
            ..Ruleset::default()
        };
        let mut battle = Battle::new(BattleId::generate(), "Chase", 50, 50, rules, 3).unwrap();
        let (red, _) = battle.add_faction(faction("Red")).unwrap();
        let (blue, _) = battle.add_faction(faction("Blue")).unwrap();
        let a = battle
            .add_ship(red, spec("A", 0, 0, vec![ShipModule::MissileLauncher]))
            .unwrap();
        let mut runner = spec("Runner", 12, 0, vec![]);
        runner.class = ShipClass::Corvette;
        let b = battle.add_ship(blue, runner).unwrap();
        battle.start().unwrap();

        battle.queue_missile(red, a, blue, b).unwrap();
        battle.queue_move(blue, b, Position::new(40, 0)).unwrap();
        let events = battle
            .end_turn_with(&mut ScriptedRoller::always(1))
            .unwrap();

        assert_eq!(events.missiles_discarded, 1);
        assert!(battle.missiles().is_empty());
        assert_eq!(battle.ship(b).unwrap().hit_capacity(), {
            let hull = battle.rules().hull(ShipClass::Corvette);
            hull.shields + hull.armor + hull.hitpoints
        });
    }

    #[test]
    fn test_retreat() {
        let (mut battle, red, a, blue, b) = duel();
        battle.queue_move(blue, b, Position::new(10, 10)).unwrap();
        battle.retreat_ship(blue, b).unwrap();

        assert_eq!(battle.ship(b).unwrap().status, ShipStatus::Retreated);
        assert!(battle.pending_moves().is_empty());
        assert!(matches!(
            battle.queue_laser(red, a, blue, b),
            Err(BattleError::ShipInactive(_))
        ));
        assert!(battle.faction(blue).unwrap().is_defeated());
    }

    #[test]
    fn test_retreated_ship_orders_are_withdrawn() {
        let (mut battle, red, a, blue, b) = duel();
        let before = battle.ship(b).unwrap().hit_capacity();
        battle.queue_laser(red, a, blue, b).unwrap();
        battle
            .queue_extra_action(
                red,
                a,
                ExtraAction::Unimplemented {
                    name: "scan".into(),
                },
            )
            .unwrap();

        battle.retreat_ship(red, a).unwrap();
        assert!(battle.laser_shots().is_empty());
        assert!(battle.extra_actions().is_empty());
        assert_eq!(battle.ship(a).unwrap().lasers_fired, 0);

        let events = battle
            .end_turn_with(&mut ScriptedRoller::always(1))
            .unwrap();
        assert_eq!(events.lasers_resolved, 0);
        assert_eq!(battle.ship(b).unwrap().hit_capacity(), before);
    }

    #[test]
    fn test_ready_flags() {
        let (mut battle, red, _, blue, _) = duel();
        assert!(!battle.mark_ready(red).unwrap());
        assert!(battle.mark_ready(blue).unwrap());

        battle.end_turn().unwrap();
        assert!(!battle.all_factions_ready());
    }

    #[test]
    fn test_extra_action_is_consumed() {
        let (mut battle, red, a, _, _) = duel();
        battle
            .queue_extra_action(
                red,
                a,
                ExtraAction::Unimplemented {
                    name: "scan".into(),
                },
            )
            .unwrap();
        assert_eq!(battle.extra_actions().len(), 1);
        battle.end_turn().unwrap();
        assert!(battle.extra_actions().is_empty());
    }

    #[test]
    fn test_seeded_end_turn_is_deterministic() {
        let run = || {
            let (mut battle, red, a, blue, b) = duel();
            for _ in 0..5 {
                let _ = battle.queue_laser(red, a, blue, b);
                let _ = battle.queue_laser(blue, b, red, a);
                battle.end_turn().unwrap();
            }
            battle
        };
        let first = run();
        let second = run();
        assert_eq!(first.turn(), 6);
        assert_eq!(first.log(), second.log());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let (mut battle, red, a, blue, b) = duel();
        battle.queue_missile(red, a, blue, b).unwrap();
        battle.queue_move(red, a, Position::new(3, 3)).unwrap();

        let bytes = battle.serialize().unwrap();
        let restored = Battle::deserialize(&bytes).unwrap();
        assert_eq!(restored, battle);
        assert_eq!(restored.state_hash(), battle.state_hash());
    }
}
