//! Test fixtures and helpers.
//!
//! Pre-built battles and a simple order script for consistent testing.

use skirmish_core::battle::{Battle, BattleId, TurnEvents};
use skirmish_core::faction::{FactionId, FactionSpec};
use skirmish_core::grid::Position;
use skirmish_core::rules::Ruleset;
use skirmish_core::ship::{ShipClass, ShipId, ShipModule, ShipSpec};

/// Faction spec with a derived player name and a fixed color.
#[must_use]
pub fn faction_spec(name: &str) -> FactionSpec {
    FactionSpec {
        name: name.to_string(),
        player_name: format!("{name} commander"),
        color: "#808080".to_string(),
    }
}

/// Ship spec at `(x, y)`.
#[must_use]
pub fn ship_spec(name: &str, class: ShipClass, x: i32, y: i32, modules: Vec<ShipModule>) -> ShipSpec {
    ShipSpec {
        name: name.to_string(),
        class,
        position: Position::new(x, y),
        modules,
    }
}

/// One laser and one missile launcher.
#[must_use]
pub fn armed() -> Vec<ShipModule> {
    vec![ShipModule::Laser, ShipModule::MissileLauncher]
}

/// A started battle between two factions with one destroyer each.
#[derive(Debug, Clone)]
pub struct Duel {
    /// The battle, already in progress at turn 1.
    pub battle: Battle,
    /// First faction.
    pub red: FactionId,
    /// First faction's ship, at the origin.
    pub red_ship: ShipId,
    /// Second faction.
    pub blue: FactionId,
    /// Second faction's ship.
    pub blue_ship: ShipId,
}

/// A duel with the ships `distance` cells apart on the x axis.
///
/// # Panics
///
/// Panics if the fixture cannot be built, which means the engine broke.
#[must_use]
pub fn duel_at(seed: u64, distance: i32) -> Duel {
    let mut battle = Battle::new(BattleId::generate(), "Duel", 100, 100, Ruleset::default(), seed)
        .expect("duel battle");
    let (red, _) = battle.add_faction(faction_spec("Red")).expect("red faction");
    let (blue, _) = battle.add_faction(faction_spec("Blue")).expect("blue faction");
    let red_ship = battle
        .add_ship(red, ship_spec("Anvil", ShipClass::Destroyer, 0, 0, armed()))
        .expect("red ship");
    let blue_ship = battle
        .add_ship(blue, ship_spec("Bastion", ShipClass::Destroyer, distance, 0, armed()))
        .expect("blue ship");
    battle.start().expect("start");

    Duel {
        battle,
        red,
        red_ship,
        blue,
        blue_ship,
    }
}

/// A duel at distance 10.
#[must_use]
pub fn duel(seed: u64) -> Duel {
    duel_at(seed, 10)
}

/// A started battle with `factions` sides of `ships_per_faction` ships.
///
/// Sides are lined up in columns ten cells apart; every ship carries a
/// laser, a missile launcher and a point-defense slot.
///
/// # Panics
///
/// Panics if the fixture cannot be built.
#[must_use]
pub fn fleet_battle(seed: u64, factions: usize, ships_per_faction: usize) -> Battle {
    let mut battle = Battle::new(BattleId::generate(), "Fleet", 100, 100, Ruleset::default(), seed)
        .expect("fleet battle");
    let classes = [ShipClass::Frigate, ShipClass::Destroyer, ShipClass::Cruiser];

    for f in 0..factions {
        let (faction, _) = battle
            .add_faction(faction_spec(&format!("Fleet {f}")))
            .expect("faction");
        let x = i32::try_from(f * 10).expect("column");
        for s in 0..ships_per_faction {
            let y = i32::try_from(s * 3).expect("row");
            let modules = vec![
                ShipModule::Laser,
                ShipModule::MissileLauncher,
                ShipModule::PointDefense,
            ];
            battle
                .add_ship(
                    faction,
                    ship_spec(&format!("F{f}S{s}"), classes[s % classes.len()], x, y, modules),
                )
                .expect("ship");
        }
    }

    battle.start().expect("start");
    battle
}

/// Queue orders for every active ship: fire everything at the nearest
/// enemy and close in on it. Rejected orders are ignored.
pub fn exchange_fire(battle: &mut Battle) {
    let ships: Vec<(FactionId, ShipId, Position)> = battle
        .factions()
        .iter()
        .flat_map(|f| {
            f.ships()
                .iter()
                .filter(|s| s.is_active())
                .map(move |s| (f.id, s.id, s.position))
        })
        .collect();

    for &(faction, ship, position) in &ships {
        let nearest = ships
            .iter()
            .filter(|(other, ..)| *other != faction)
            .min_by_key(|(_, id, pos)| (position.manhattan_distance(*pos), *id));
        let Some(&(target_faction, target_ship, target_pos)) = nearest else {
            continue;
        };

        let _ = battle.queue_laser(faction, ship, target_faction, target_ship);
        let _ = battle.queue_missile(faction, ship, target_faction, target_ship);
        if position.manhattan_distance(target_pos) > 2 {
            let _ = battle.queue_move(faction, ship, target_pos);
        }
    }
}

/// Issue [`exchange_fire`] orders and resolve the turn.
///
/// # Panics
///
/// Panics if the battle is not in progress.
pub fn play_turn(battle: &mut Battle) -> TurnEvents {
    exchange_fire(battle);
    battle.end_turn().expect("end turn")
}
