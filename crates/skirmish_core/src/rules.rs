//! Battle rules.
//!
//! All numeric constants of the simulation live in a [`Ruleset`] that is
//! stamped onto each battle when it is created. Rulesets are plain data and
//! can be written as RON:
//!
//! ```ron
//! Ruleset(
//!     laser_damage: 20,
//!     missile_max_range: 80,
//!     hulls: (
//!         corvette: (slots: 2, shields: 10, armor: 10, hitpoints: 15, speed: 5),
//!     ),
//! )
//! ```
//!
//! Fields left out keep their stock value.

use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::ship::ShipClass;

/// Hull characteristics of one ship class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HullStats {
    /// Module slots.
    pub slots: u32,
    /// Starting shields.
    pub shields: u32,
    /// Starting armor.
    pub armor: u32,
    /// Starting hitpoints.
    pub hitpoints: u32,
    /// Grid steps per movement advance.
    pub speed: u32,
}

impl HullStats {
    const fn new(slots: u32, shields: u32, armor: u32, hitpoints: u32, speed: u32) -> Self {
        Self {
            slots,
            shields,
            armor,
            hitpoints,
            speed,
        }
    }
}

/// Hull stats for every ship class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct HullTable {
    /// Corvette hull.
    pub corvette: HullStats,
    /// Frigate hull.
    pub frigate: HullStats,
    /// Destroyer hull.
    pub destroyer: HullStats,
    /// Cruiser hull.
    pub cruiser: HullStats,
    /// Battleship hull.
    pub battleship: HullStats,
}

impl Default for HullTable {
    fn default() -> Self {
        Self {
            corvette: HullStats::new(2, 20, 10, 20, 4),
            frigate: HullStats::new(3, 30, 20, 30, 3),
            destroyer: HullStats::new(4, 40, 30, 40, 3),
            cruiser: HullStats::new(6, 60, 50, 60, 2),
            battleship: HullStats::new(8, 90, 80, 100, 1),
        }
    }
}

impl HullTable {
    /// Stats for a ship class.
    #[must_use]
    pub const fn get(&self, class: ShipClass) -> &HullStats {
        match class {
            ShipClass::Corvette => &self.corvette,
            ShipClass::Frigate => &self.frigate,
            ShipClass::Destroyer => &self.destroyer,
            ShipClass::Cruiser => &self.cruiser,
            ShipClass::Battleship => &self.battleship,
        }
    }
}

/// Every tunable number used by combat resolution and movement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Ruleset {
    /// Damage dealt by a laser hit.
    pub laser_damage: u32,
    /// Hit chance of a laser shot (percent).
    pub laser_accuracy: i32,
    /// Damage dealt by a missile hit.
    pub missile_damage: u32,
    /// Grid steps a missile travels per turn.
    pub missile_speed: u32,
    /// Longest path a missile may be launched on or re-targeted to.
    pub missile_max_range: u32,
    /// Path length at which a missile has exactly its base accuracy.
    pub missile_effective_range: u32,
    /// Missile accuracy at the effective range (percent).
    pub missile_base_accuracy: i32,
    /// Floor for missile accuracy after point-defense mitigation.
    pub min_accuracy: i32,
    /// Accuracy removed from incoming missiles per point-defense slot.
    pub point_defense_per_slot: i32,
    /// Extra shields granted by each shield booster module.
    pub shield_booster_bonus: u32,
    /// Extra armor granted by each armor plating module.
    pub armor_plating_bonus: u32,
    /// Path advances applied to each queued ship move per turn.
    pub ship_advances_per_turn: u32,
    /// Per-class hull stats.
    pub hulls: HullTable,
}

impl Default for Ruleset {
    fn default() -> Self {
        Self {
            laser_damage: 15,
            laser_accuracy: 75,
            missile_damage: 30,
            missile_speed: 10,
            missile_max_range: 100,
            missile_effective_range: 35,
            missile_base_accuracy: 60,
            min_accuracy: 5,
            point_defense_per_slot: 10,
            shield_booster_bonus: 20,
            armor_plating_bonus: 20,
            ship_advances_per_turn: 1,
            hulls: HullTable::default(),
        }
    }
}

impl Ruleset {
    /// Parse a ruleset from RON text and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParse`] for malformed RON and
    /// [`BattleError::InvalidRuleset`] for out-of-range values.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let rules: Self = ron::from_str(source).map_err(|e| BattleError::DataParse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Load and validate a ruleset from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<FsPath>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| BattleError::DataParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let rules: Self = ron::from_str(&source).map_err(|e| BattleError::DataParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidRuleset`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| -> Result<()> { Err(BattleError::InvalidRuleset(msg.to_string())) };

        if self.missile_speed == 0 {
            return fail("missile_speed must be positive");
        }
        if self.missile_max_range == 0 {
            return fail("missile_max_range must be positive");
        }
        if self.missile_effective_range > self.missile_max_range {
            return fail("missile_effective_range must not exceed missile_max_range");
        }
        if !(0..=100).contains(&self.min_accuracy) {
            return fail("min_accuracy must be within 0..=100");
        }
        if self.missile_base_accuracy < self.min_accuracy {
            return fail("missile_base_accuracy must not be below min_accuracy");
        }
        if !(0..=100).contains(&self.laser_accuracy) {
            return fail("laser_accuracy must be within 0..=100");
        }
        if self.point_defense_per_slot < 0 {
            return fail("point_defense_per_slot must not be negative");
        }
        if self.ship_advances_per_turn == 0 {
            return fail("ship_advances_per_turn must be positive");
        }

        for class in ShipClass::ALL {
            let hull = self.hulls.get(class);
            if hull.hitpoints == 0 {
                return Err(BattleError::InvalidRuleset(format!(
                    "{class:?} hull needs hitpoints"
                )));
            }
            if hull.speed == 0 {
                return Err(BattleError::InvalidRuleset(format!(
                    "{class:?} hull needs a positive speed"
                )));
            }
        }

        Ok(())
    }

    /// Hull stats for a ship class.
    #[must_use]
    pub const fn hull(&self, class: ShipClass) -> &HullStats {
        self.hulls.get(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Ruleset::default().validate().is_ok());
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let rules = Ruleset::from_ron_str(
            "(laser_damage: 40, hulls: (frigate: (slots: 5, shields: 1, armor: 2, hitpoints: 3, speed: 6)))",
        )
        .unwrap();

        assert_eq!(rules.laser_damage, 40);
        assert_eq!(rules.missile_damage, Ruleset::default().missile_damage);
        assert_eq!(rules.hull(ShipClass::Frigate).slots, 5);
        assert_eq!(
            rules.hull(ShipClass::Corvette),
            Ruleset::default().hull(ShipClass::Corvette)
        );
    }

    #[test]
    fn test_malformed_ron() {
        let err = Ruleset::from_ron_str("(laser_damage: \"lots\")").unwrap_err();
        assert!(matches!(err, BattleError::DataParse { .. }));
    }

    #[test]
    fn test_rejects_bad_values() {
        let rules = Ruleset {
            missile_speed: 0,
            ..Ruleset::default()
        };
        assert!(matches!(
            rules.validate(),
            Err(BattleError::InvalidRuleset(_))
        ));

        let rules = Ruleset {
            min_accuracy: 70,
            missile_base_accuracy: 60,
            ..Ruleset::default()
        };
        assert!(rules.validate().is_err());

        let mut rules = Ruleset::default();
        rules.hulls.cruiser.speed = 0;
        assert!(rules.validate().is_err());
    }
}
