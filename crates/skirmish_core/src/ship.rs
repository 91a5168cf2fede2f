//! Ships: the combat units of a battle.
//!
//! A ship's hull class fixes how many modules it can carry and its base
//! defensive layers. Damage always drains shields first, then armor, then
//! hitpoints (see [`crate::combat::apply_damage`]).

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::grid::Position;
use crate::rules::Ruleset;

/// Unique identifier for ships, allocated per battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShipId(pub u64);

impl std::fmt::Display for ShipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Hull class of a ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipClass {
    /// Small and fast.
    Corvette,
    /// Light escort.
    Frigate,
    /// Line combatant.
    Destroyer,
    /// Heavy combatant.
    Cruiser,
    /// Capital ship.
    Battleship,
}

impl ShipClass {
    /// Every ship class.
    pub const ALL: [Self; 5] = [
        Self::Corvette,
        Self::Frigate,
        Self::Destroyer,
        Self::Cruiser,
        Self::Battleship,
    ];
}

/// Equipment fitted into a module slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipModule {
    /// One laser shot per turn.
    Laser,
    /// One missile launch per turn.
    MissileLauncher,
    /// Reduces the accuracy of incoming missiles.
    PointDefense,
    /// Extra shields.
    ShieldBooster,
    /// Extra armor.
    ArmorPlating,
}

/// Weapon kinds that count against per-turn fire limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    /// Instant-hit laser.
    Laser,
    /// Homing missile.
    Missile,
}

/// Slot counts derived from a ship's modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Loadout {
    /// Laser slots.
    pub lasers: u32,
    /// Missile launcher slots.
    pub missile_launchers: u32,
    /// Point-defense slots.
    pub point_defense: u32,
    /// Shield booster slots.
    pub shield_boosters: u32,
    /// Armor plating slots.
    pub armor_plating: u32,
}

impl Loadout {
    /// Count modules by kind.
    #[must_use]
    pub fn from_modules(modules: &[ShipModule]) -> Self {
        modules.iter().fold(Self::default(), |mut loadout, module| {
            match module {
                ShipModule::Laser => loadout.lasers += 1,
                ShipModule::MissileLauncher => loadout.missile_launchers += 1,
                ShipModule::PointDefense => loadout.point_defense += 1,
                ShipModule::ShieldBooster => loadout.shield_boosters += 1,
                ShipModule::ArmorPlating => loadout.armor_plating += 1,
            }
            loadout
        })
    }

    /// Slots available for a weapon kind.
    #[must_use]
    pub const fn slots_for(&self, weapon: WeaponKind) -> u32 {
        match weapon {
            WeaponKind::Laser => self.lasers,
            WeaponKind::Missile => self.missile_launchers,
        }
    }
}

/// Lifecycle status of a ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShipStatus {
    /// Can move, fire and be targeted.
    #[default]
    Active,
    /// Hitpoints exhausted.
    Destroyed,
    /// Left the battle.
    Retreated,
}

/// Everything a caller supplies to create or refit a ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipSpec {
    /// Display name, unique within the faction.
    pub name: String,
    /// Hull class.
    pub class: ShipClass,
    /// Starting position.
    pub position: Position,
    /// Fitted modules, one per slot.
    #[serde(default)]
    pub modules: Vec<ShipModule>,
}

/// A combat unit owned by a faction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ship {
    /// Unique identifier.
    pub id: ShipId,
    /// Display name.
    pub name: String,
    /// Hull class.
    pub class: ShipClass,
    /// Fitted modules.
    pub modules: Vec<ShipModule>,
    /// Current grid position.
    pub position: Position,
    /// Grid steps per movement advance.
    pub speed: u32,
    /// Outer defensive layer.
    pub shields: u32,
    /// Middle defensive layer.
    pub armor: u32,
    /// Inner layer; the ship is destroyed when this reaches zero.
    pub hitpoints: u32,
    /// Slot counts derived from `modules`.
    pub loadout: Loadout,
    /// Lasers fired this turn.
    pub lasers_fired: u32,
    /// Missiles fired this turn.
    pub missiles_fired: u32,
    /// Lifecycle status.
    pub status: ShipStatus,
}

impl Ship {
    /// Build a fresh ship at full strength.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidLoadout`] if the spec carries more
    /// modules than the hull class has slots.
    pub fn build(id: ShipId, spec: ShipSpec, rules: &Ruleset) -> Result<Self> {
        let hull = rules.hull(spec.class);
        let slots = hull.slots as usize;
        if spec.modules.len() > slots {
            return Err(BattleError::InvalidLoadout {
                modules: spec.modules.len(),
                slots,
            });
        }

        let loadout = Loadout::from_modules(&spec.modules);
        Ok(Self {
            id,
            name: spec.name,
            class: spec.class,
            position: spec.position,
            speed: hull.speed,
            shields: hull.shields + loadout.shield_boosters * rules.shield_booster_bonus,
            armor: hull.armor + loadout.armor_plating * rules.armor_plating_bonus,
            hitpoints: hull.hitpoints,
            modules: spec.modules,
            loadout,
            lasers_fired: 0,
            missiles_fired: 0,
            status: ShipStatus::Active,
        })
    }

    /// Check if the ship can still act and be targeted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ShipStatus::Active
    }

    /// Sum of shields, armor and hitpoints.
    #[must_use]
    pub fn hit_capacity(&self) -> u32 {
        self.shields + self.armor + self.hitpoints
    }

    /// Accuracy removed from missiles aimed at this ship.
    #[must_use]
    pub fn point_defense_bonus(&self, rules: &Ruleset) -> i32 {
        i32::try_from(self.loadout.point_defense)
            .unwrap_or(i32::MAX)
            .saturating_mul(rules.point_defense_per_slot)
    }

    /// Shots of this kind already fired this turn.
    #[must_use]
    pub const fn fired(&self, weapon: WeaponKind) -> u32 {
        match weapon {
            WeaponKind::Laser => self.lasers_fired,
            WeaponKind::Missile => self.missiles_fired,
        }
    }

    /// Check if a weapon of this kind is still unfired this turn.
    #[must_use]
    pub fn can_fire(&self, weapon: WeaponKind) -> bool {
        self.is_active() && self.fired(weapon) < self.loadout.slots_for(weapon)
    }

    /// Count a shot against this turn's fire limit.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::WeaponUnavailable`] if every slot of this
    /// kind has already fired.
    pub fn record_fire(&mut self, weapon: WeaponKind) -> Result<()> {
        if !self.can_fire(weapon) {
            return Err(BattleError::WeaponUnavailable {
                ship: self.id,
                weapon,
            });
        }
        match weapon {
            WeaponKind::Laser => self.lasers_fired += 1,
            WeaponKind::Missile => self.missiles_fired += 1,
        }
        Ok(())
    }

    /// Clear per-turn fire counters.
    pub fn reset_fired(&mut self) {
        self.lasers_fired = 0;
        self.missiles_fired = 0;
    }
}
