//! Combat resolution: accuracy, hit rolls and the damage cascade.
//!
//! This module implements:
//! - Missile accuracy from launch distance relative to the effective range
//! - Point-defense mitigation of missile accuracy (lasers ignore it)
//! - Percentile hit rolls through an injected [`HitRoller`]
//! - Shields → armor → hitpoints damage cascade
//!
//! Every strike goes through [`CombatResolver::resolve_strike`], which
//! always writes the outcome to the turn log.

use serde::{Deserialize, Serialize};

use crate::dice::{resolve_hit, HitRoll, HitRoller};
use crate::orders::Combatant;
use crate::rules::Ruleset;
use crate::ship::{Ship, ShipStatus, WeaponKind};
use crate::turn_log::{LogEventKind, TurnLog, TurnLogEntry};

/// How a single damage application was absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DamageReport {
    /// Damage requested.
    pub amount: u32,
    /// Taken by shields.
    pub shields: u32,
    /// Taken by armor.
    pub armor: u32,
    /// Taken by hitpoints.
    pub hitpoints: u32,
    /// Whether this application destroyed the ship.
    pub destroyed: bool,
}

impl DamageReport {
    /// Damage actually absorbed by the ship.
    #[must_use]
    pub const fn absorbed(&self) -> u32 {
        self.shields + self.armor + self.hitpoints
    }
}

/// Drain `amount` from shields, then armor, then hitpoints.
///
/// Each layer is emptied before the remainder spills into the next. When
/// hitpoints reach zero the ship is marked [`ShipStatus::Destroyed`].
pub fn apply_damage(ship: &mut Ship, amount: u32) -> DamageReport {
    let mut remaining = amount;
    let mut drain = |layer: &mut u32| {
        let taken = remaining.min(*layer);
        *layer -= taken;
        remaining -= taken;
        taken
    };

    let shields = drain(&mut ship.shields);
    let armor = drain(&mut ship.armor);
    let hitpoints = drain(&mut ship.hitpoints);

    let destroyed = ship.hitpoints == 0 && ship.status != ShipStatus::Destroyed;
    if ship.hitpoints == 0 {
        ship.status = ShipStatus::Destroyed;
    }

    DamageReport {
        amount,
        shields,
        armor,
        hitpoints,
        destroyed,
    }
}

/// Accuracy of a missile launched along a path of `path_len` steps.
///
/// Exactly the base accuracy at the effective range, one point better per
/// step closer and one point worse per step further.
#[must_use]
pub fn missile_launch_accuracy(rules: &Ruleset, path_len: u32) -> i32 {
    let len = i64::from(path_len);
    let effective = i64::from(rules.missile_effective_range);
    let base = i64::from(rules.missile_base_accuracy);

    let accuracy = if len > effective {
        base - (len - effective)
    } else {
        base + (effective - len)
    };
    i32::try_from(accuracy).unwrap_or(i32::MIN)
}

/// Missile accuracy after the target's point defense, floored at the minimum.
#[must_use]
pub fn effective_missile_accuracy(rules: &Ruleset, accuracy: i32, target: &Ship) -> i32 {
    accuracy
        .saturating_sub(target.point_defense_bonus(rules))
        .max(rules.min_accuracy)
}

/// One attack about to be resolved.
#[derive(Debug, Clone, Copy)]
pub struct Strike<'a> {
    /// Weapon used.
    pub weapon: WeaponKind,
    /// Attacking side.
    pub attacker: &'a Combatant,
    /// Defending side.
    pub defender: &'a Combatant,
    /// Final accuracy to roll against.
    pub accuracy: i32,
    /// Damage on a hit.
    pub damage: u32,
}

/// Result of a resolved strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrikeOutcome {
    /// The accuracy roll.
    pub roll: HitRoll,
    /// Damage breakdown, present on a hit.
    pub damage: Option<DamageReport>,
}

impl StrikeOutcome {
    /// Whether the target was destroyed by this strike.
    #[must_use]
    pub fn destroyed(&self) -> bool {
        self.damage.is_some_and(|d| d.destroyed)
    }
}

/// Resolves strikes for one turn and records them in the log.
#[derive(Debug, Clone, Copy)]
pub struct CombatResolver<'r> {
    rules: &'r Ruleset,
    turn: u32,
}

impl<'r> CombatResolver<'r> {
    /// Create a resolver for `turn`.
    #[must_use]
    pub const fn new(rules: &'r Ruleset, turn: u32) -> Self {
        Self { rules, turn }
    }

    /// Roll a strike against `target`, apply damage on a hit, and log it.
    pub fn resolve_strike(
        &self,
        roller: &mut dyn HitRoller,
        log: &mut TurnLog,
        strike: Strike<'_>,
        target: &mut Ship,
    ) -> StrikeOutcome {
        let roll = resolve_hit(roller, strike.accuracy);
        let (kind, verb) = match (strike.weapon, roll.hit) {
            (WeaponKind::Laser, true) => (LogEventKind::LaserHit, "laser hit"),
            (WeaponKind::Laser, false) => (LogEventKind::LaserMiss, "laser missed"),
            (WeaponKind::Missile, true) => (LogEventKind::MissileHit, "missile hit"),
            (WeaponKind::Missile, false) => (LogEventKind::MissileMiss, "missile missed"),
        };

        tracing::debug!(
            turn = self.turn,
            attacker = %strike.attacker.ship_id,
            defender = %strike.defender.ship_id,
            roll = roll.roll,
            accuracy = roll.accuracy,
            hit = roll.hit,
            "Strike resolved"
        );

        log.push(
            TurnLogEntry::new(
                self.turn,
                kind,
                strike.attacker.clone(),
                format!(
                    "{}'s {verb} {}",
                    strike.attacker.ship_name, strike.defender.ship_name
                ),
            )
            .with_target(strike.defender.clone())
            .with_detail(format!("rolled {} vs accuracy {}", roll.roll, roll.accuracy)),
        );

        let damage = roll
            .hit
            .then(|| self.damage(log, strike.attacker, strike.defender, target, strike.damage));

        StrikeOutcome { roll, damage }
    }

    /// Apply `amount` damage to `target` and log both sides of it.
    ///
    /// Destruction is logged for the attacker and, when the factions
    /// differ, once more for the defender.
    pub fn damage(
        &self,
        log: &mut TurnLog,
        attacker: &Combatant,
        defender: &Combatant,
        target: &mut Ship,
        amount: u32,
    ) -> DamageReport {
        let report = apply_damage(target, amount);
        let detail = format!(
            "shields -{} armor -{} hitpoints -{} (left {}/{}/{})",
            report.shields,
            report.armor,
            report.hitpoints,
            target.shields,
            target.armor,
            target.hitpoints
        );

        log.push(
            TurnLogEntry::new(
                self.turn,
                LogEventKind::DamageDealt,
                attacker.clone(),
                format!(
                    "{} dealt {} damage to {}",
                    attacker.ship_name,
                    report.absorbed(),
                    defender.ship_name
                ),
            )
            .with_target(defender.clone())
            .with_detail(detail.clone()),
        );
        log.push(
            TurnLogEntry::new(
                self.turn,
                LogEventKind::DamageReceived,
                defender.clone(),
                format!(
                    "{} took {} damage from {}",
                    defender.ship_name,
                    report.absorbed(),
                    attacker.ship_name
                ),
            )
            .with_target(attacker.clone())
            .with_detail(detail),
        );

        if report.destroyed {
            tracing::info!(
                turn = self.turn,
                ship = %defender.ship_id,
                by = %attacker.ship_id,
                "Ship destroyed"
            );
            let message = format!(
                "{} ({}) was destroyed by {}",
                defender.ship_name, defender.faction_name, attacker.ship_name
            );
            log.push(
                TurnLogEntry::new(
                    self.turn,
                    LogEventKind::ShipDestroyed,
                    attacker.clone(),
                    message.clone(),
                )
                .with_target(defender.clone()),
            );
            if defender.faction_id != attacker.faction_id {
                log.push(
                    TurnLogEntry::new(
                        self.turn,
                        LogEventKind::ShipDestroyed,
                        defender.clone(),
                        message,
                    )
                    .with_target(attacker.clone()),
                );
            }
        }

        report
    }

    /// The rules this resolver applies.
    #[must_use]
    pub const fn rules(&self) -> &'r Ruleset {
        self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedRoller;
    use crate::faction::FactionId;
    use crate::grid::Position;
    use crate::ship::{ShipClass, ShipId, ShipModule, ShipSpec};
    use proptest::prelude::*;

    fn ship_with(shields: u32, armor: u32, hitpoints: u32) -> Ship {
        let mut ship = Ship::build(
            ShipId(1),
            ShipSpec {
                name: "Target".into(),
                class: ShipClass::Frigate,
                position: Position::ORIGIN,
                modules: vec![],
            },
            &Ruleset::default(),
        )
        .unwrap();
        ship.shields = shields;
        ship.armor = armor;
        ship.hitpoints = hitpoints;
        ship
    }

    fn combatant(faction: u64, ship: u64, name: &str) -> Combatant {
        Combatant {
            faction_id: FactionId(faction),
            faction_name: format!("F{faction}"),
            ship_id: ShipId(ship),
            ship_name: name.into(),
        }
    }

    #[test]
    fn test_damage_cascade_order() {
        let mut ship = ship_with(10, 10, 10);

        let report = apply_damage(&mut ship, 15);
        assert_eq!((report.shields, report.armor, report.hitpoints), (10, 5, 0));
        assert_eq!((ship.shields, ship.armor, ship.hitpoints), (0, 5, 10));
        assert!(!report.destroyed);
        assert_eq!(ship.status, ShipStatus::Active);

        let report = apply_damage(&mut ship, 100);
        assert_eq!(report.absorbed(), 15);
        assert!(report.destroyed);
        assert_eq!(ship.status, ShipStatus::Destroyed);
    }

    #[test]
    fn test_missile_accuracy_at_effective_range() {
        let rules = Ruleset::default();
        assert_eq!(rules.missile_effective_range, 35);
        assert_eq!(missile_launch_accuracy(&rules, 35), 60);
        assert_eq!(missile_launch_accuracy(&rules, 30), 65);
        assert_eq!(missile_launch_accuracy(&rules, 50), 45);
    }

    #[test]
    fn test_point_defense_mitigation_floors_at_minimum() {
        let rules = Ruleset::default();
        let mut ship = ship_with(1, 1, 1);
        assert_eq!(effective_missile_accuracy(&rules, 60, &ship), 60);

        ship.loadout.point_defense = 2;
        assert_eq!(effective_missile_accuracy(&rules, 60, &ship), 40);

        ship.loadout.point_defense = 20;
        assert_eq!(
            effective_missile_accuracy(&rules, 60, &ship),
            rules.min_accuracy
        );
    }

    #[test]
    fn test_resolve_strike_hit_logs_damage_and_destruction() {
        let rules = Ruleset::default();
        let resolver = CombatResolver::new(&rules, 3);
        let mut log = TurnLog::new();
        let mut roller = ScriptedRoller::always(10);
        let mut target = ship_with(0, 0, 5);
        let attacker = combatant(1, 1, "Lance");
        let defender = combatant(2, 9, "Target");

        let outcome = resolver.resolve_strike(
            &mut roller,
            &mut log,
            Strike {
                weapon: WeaponKind::Laser,
                attacker: &attacker,
                defender: &defender,
                accuracy: 75,
                damage: 15,
            },
            &mut target,
        );

        assert!(outcome.roll.hit);
        assert!(outcome.destroyed());
        let kinds: Vec<_> = log.entries(3).iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LogEventKind::LaserHit,
                LogEventKind::DamageDealt,
                LogEventKind::DamageReceived,
                LogEventKind::ShipDestroyed,
                LogEventKind::ShipDestroyed,
            ]
        );
        assert_eq!(log.entries(3)[4].actor.faction_id, FactionId(2));
    }

    #[test]
    fn test_friendly_destruction_logged_once() {
        let rules = Ruleset::default();
        let resolver = CombatResolver::new(&rules, 1);
        let mut log = TurnLog::new();
        let mut target = ship_with(0, 0, 1);
        let attacker = combatant(1, 1, "Oops");
        let defender = combatant(1, 2, "Friend");

        resolver.damage(&mut log, &attacker, &defender, &mut target, 5);
        let destroyed = log
            .entries(1)
            .iter()
            .filter(|e| e.kind == LogEventKind::ShipDestroyed)
            .count();
        assert_eq!(destroyed, 1);
    }

    #[test]
    fn test_resolve_strike_miss_leaves_target() {
        let rules = Ruleset::default();
        let resolver = CombatResolver::new(&rules, 1);
        let mut log = TurnLog::new();
        let mut roller = ScriptedRoller::always(99);
        let mut target = ship_with(10, 10, 10);
        let attacker = combatant(1, 1, "A");
        let defender = combatant(2, 2, "B");

        let outcome = resolver.resolve_strike(
            &mut roller,
            &mut log,
            Strike {
                weapon: WeaponKind::Missile,
                attacker: &attacker,
                defender: &defender,
                accuracy: 50,
                damage: 30,
            },
            &mut target,
        );

        assert!(!outcome.roll.hit);
        assert!(outcome.damage.is_none());
        assert_eq!(target.hit_capacity(), 30);
        assert_eq!(log.entries(1).len(), 1);
        assert_eq!(log.entries(1)[0].kind, LogEventKind::MissileMiss);
    }

    #[test]
    fn test_lasers_ignore_point_defense() {
        let rules = Ruleset::default();
        let mut target = Ship::build(
            ShipId(4),
            ShipSpec {
                name: "Hedgehog".into(),
                class: ShipClass::Destroyer,
                position: Position::ORIGIN,
                modules: vec![ShipModule::PointDefense; 4],
            },
            &rules,
        )
        .unwrap();
        let resolver = CombatResolver::new(&rules, 1);
        let mut log = TurnLog::new();
        // Roll equal to laser accuracy still hits despite heavy point defense.
        let mut roller = ScriptedRoller::always(rules.laser_accuracy as u32);
        let attacker = combatant(1, 1, "A");
        let defender = combatant(2, 4, "Hedgehog");

        let outcome = resolver.resolve_strike(
            &mut roller,
            &mut log,
            Strike {
                weapon: WeaponKind::Laser,
                attacker: &attacker,
                defender: &defender,
                accuracy: rules.laser_accuracy,
                damage: rules.laser_damage,
            },
            &mut target,
        );
        assert!(outcome.roll.hit);
    }

    proptest! {
        #[test]
        fn prop_damage_is_conserved(
            shields in 0u32..200, armor in 0u32..200, hitpoints in 1u32..200, amount in 0u32..700,
        ) {
            let mut ship = ship_with(shields, armor, hitpoints);
            let before = ship.hit_capacity();
            let report = apply_damage(&mut ship, amount);

            prop_assert_eq!(ship.hit_capacity(), before.saturating_sub(amount));
            prop_assert_eq!(report.absorbed(), before - ship.hit_capacity());
            prop_assert_eq!(ship.status == ShipStatus::Destroyed, ship.hitpoints == 0);
            prop_assert_eq!(report.destroyed, ship.hitpoints == 0);
        }

        #[test]
        fn prop_missile_accuracy_monotonic(len in 0u32..200) {
            let rules = Ruleset::default();
            prop_assert!(
                missile_launch_accuracy(&rules, len) > missile_launch_accuracy(&rules, len + 1)
            );
        }
    }
}
