//! Scenario files.
//!
//! A scenario describes a battle in RON: the grid, the rules, every
//! faction with its ships, and orders scheduled for specific turns.
//! Orders refer to factions and ships by name.
//!
//! ```ron
//! Scenario(
//!     name: "Picket Line",
//!     width: 40,
//!     height: 20,
//!     seed: 7,
//!     factions: [
//!         (name: "Red", ships: [
//!             (name: "Anvil", class: Destroyer, position: (x: 0, y: 5), modules: [Laser, MissileLauncher]),
//!         ]),
//!         (name: "Blue", ships: [
//!             (name: "Bastion", class: Cruiser, position: (x: 30, y: 5), modules: [Laser, PointDefense]),
//!         ]),
//!     ],
//!     orders: [
//!         (turn: 1, faction: "Red", ship: "Anvil", action: Missile(faction: "Blue", ship: "Bastion")),
//!     ],
//! )
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use skirmish_core::battle::{Battle, BattleId};
use skirmish_core::commands::{Command, CommandOutcome};
use skirmish_core::error::BattleError;
use skirmish_core::faction::{FactionId, FactionSpec};
use skirmish_core::grid::Position;
use skirmish_core::replay::ReplayRecorder;
use skirmish_core::rules::Ruleset;
use skirmish_core::ship::{ShipId, ShipSpec};

use crate::error::{Result, ToolError};

fn default_color() -> String {
    "#ffffff".to_string()
}

/// A complete battle setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Battle name.
    pub name: String,
    /// Grid width.
    pub width: u32,
    /// Grid height.
    pub height: u32,
    /// Seed for the battle's hit rolls.
    #[serde(default)]
    pub seed: u64,
    /// Rules; omitted fields keep their stock values.
    #[serde(default)]
    pub rules: Ruleset,
    /// Participating factions in joining order.
    pub factions: Vec<ScenarioFaction>,
    /// Orders scheduled for specific turns.
    #[serde(default)]
    pub orders: Vec<ScenarioOrder>,
    /// Let every ship fire at and close on its nearest enemy each turn.
    #[serde(default)]
    pub auto_engage: bool,
}

/// A faction and its starting ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioFaction {
    /// Faction name.
    pub name: String,
    /// Player name, defaults to empty.
    #[serde(default)]
    pub player_name: String,
    /// Display color.
    #[serde(default = "default_color")]
    pub color: String,
    /// Starting ships.
    #[serde(default)]
    pub ships: Vec<ShipSpec>,
}

/// An order issued at the start of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOrder {
    /// Turn the order is issued in.
    pub turn: u32,
    /// Acting faction name.
    pub faction: String,
    /// Acting ship name.
    pub ship: String,
    /// What to do.
    pub action: OrderAction,
}

/// Scenario order kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderAction {
    /// Move towards a position.
    Move(Position),
    /// Drop the queued move.
    Cancel,
    /// Fire a laser at a ship.
    Laser {
        /// Target faction name.
        faction: String,
        /// Target ship name.
        ship: String,
    },
    /// Launch a missile at a ship.
    Missile {
        /// Target faction name.
        faction: String,
        /// Target ship name.
        ship: String,
    },
    /// Withdraw from the battle.
    Retreat,
}

/// Name lookup for the ids handed out during setup.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    factions: BTreeMap<String, FactionId>,
    ships: BTreeMap<(FactionId, String), ShipId>,
}

impl Roster {
    /// Faction id for a name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Scenario`] for unknown names.
    pub fn faction(&self, name: &str) -> Result<FactionId> {
        self.factions
            .get(name)
            .copied()
            .ok_or_else(|| ToolError::Scenario(format!("unknown faction '{name}'")))
    }

    /// Faction and ship ids for a pair of names.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Scenario`] for unknown names.
    pub fn ship(&self, faction: &str, ship: &str) -> Result<(FactionId, ShipId)> {
        let faction_id = self.faction(faction)?;
        let ship_id = self
            .ships
            .get(&(faction_id, ship.to_string()))
            .copied()
            .ok_or_else(|| ToolError::Scenario(format!("unknown ship '{ship}' in '{faction}'")))?;
        Ok((faction_id, ship_id))
    }
}

impl Scenario {
    /// Parse a scenario from RON text.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed RON or an invalid ruleset.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        Self::parse(source, "<inline>")
    }

    /// Load a scenario from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| ToolError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&source, &path.display().to_string())
    }

    fn parse(source: &str, origin: &str) -> Result<Self> {
        let scenario: Self = ron::from_str(source).map_err(|e| BattleError::DataParse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        scenario.rules.validate()?;
        Ok(scenario)
    }

    /// Create the battle, add every faction and ship, and start it.
    ///
    /// Setup goes through a [`ReplayRecorder`] so the whole run can be
    /// saved as a replay.
    ///
    /// # Errors
    ///
    /// Returns the first rejected setup command.
    pub fn setup(&self) -> Result<(ReplayRecorder, Roster)> {
        let battle = Battle::new(
            BattleId::generate(),
            self.name.clone(),
            self.width,
            self.height,
            self.rules.clone(),
            self.seed,
        )?;
        let mut recorder = ReplayRecorder::new(battle)?;
        let mut roster = Roster::default();

        for faction in &self.factions {
            let outcome = recorder.apply(Command::AddFaction(FactionSpec {
                name: faction.name.clone(),
                player_name: faction.player_name.clone(),
                color: faction.color.clone(),
            }))?;
            let CommandOutcome::FactionAdded { id: faction_id, .. } = outcome else {
                return Err(ToolError::Scenario(format!(
                    "adding faction '{}' returned {outcome:?}",
                    faction.name
                )));
            };
            roster.factions.insert(faction.name.clone(), faction_id);

            for ship in &faction.ships {
                let outcome = recorder.apply(Command::AddShip {
                    faction: faction_id,
                    spec: ship.clone(),
                })?;
                let CommandOutcome::ShipAdded(ship_id) = outcome else {
                    return Err(ToolError::Scenario(format!(
                        "adding ship '{}' returned {outcome:?}",
                        ship.name
                    )));
                };
                roster.ships.insert((faction_id, ship.name.clone()), ship_id);
            }
        }

        recorder.apply(Command::StartBattle)?;
        tracing::info!(
            scenario = %self.name,
            factions = self.factions.len(),
            orders = self.orders.len(),
            "Scenario set up"
        );
        Ok((recorder, roster))
    }

    /// Orders scheduled for `turn`, in file order.
    pub fn orders_for(&self, turn: u32) -> impl Iterator<Item = &ScenarioOrder> {
        self.orders.iter().filter(move |o| o.turn == turn)
    }
}

impl ScenarioOrder {
    /// Translate into an engine command.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Scenario`] if a name does not resolve.
    pub fn to_command(&self, roster: &Roster) -> Result<Command> {
        let (faction, ship) = roster.ship(&self.faction, &self.ship)?;
        Ok(match &self.action {
            OrderAction::Move(target) => Command::QueueShipMove {
                faction,
                ship,
                target: *target,
            },
            OrderAction::Cancel => Command::CancelShipMove { faction, ship },
            OrderAction::Laser {
                faction: tf,
                ship: ts,
            } => {
                let (target_faction, target_ship) = roster.ship(tf, ts)?;
                Command::QueueLaserShot {
                    faction,
                    ship,
                    target_faction,
                    target_ship,
                }
            }
            OrderAction::Missile {
                faction: tf,
                ship: ts,
            } => {
                let (target_faction, target_ship) = roster.ship(tf, ts)?;
                Command::QueueMissileShot {
                    faction,
                    ship,
                    target_faction,
                    target_ship,
                }
            }
            OrderAction::Retreat => Command::RetreatShip { faction, ship },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::battle::BattleStatus;

    const PICKET: &str = r##"
Scenario(
    name: "Picket Line",
    width: 40,
    height: 20,
    seed: 7,
    factions: [
        (name: "Red", ships: [
            (name: "Anvil", class: Destroyer, position: (x: 0, y: 5), modules: [Laser, MissileLauncher]),
        ]),
        (name: "Blue", color: "#0000ff", ships: [
            (name: "Bastion", class: Cruiser, position: (x: 30, y: 5), modules: [Laser, PointDefense]),
        ]),
    ],
    orders: [
        (turn: 1, faction: "Red", ship: "Anvil", action: Missile(faction: "Blue", ship: "Bastion")),
        (turn: 2, faction: "Blue", ship: "Bastion", action: Move((x: 20, y: 5))),
    ],
)
"##;

    #[test]
    fn test_parse_and_setup() {
        let scenario = Scenario::from_ron_str(PICKET).unwrap();
        assert_eq!(scenario.factions.len(), 2);
        assert_eq!(scenario.factions[0].color, "#ffffff");
        assert_eq!(scenario.rules, Ruleset::default());

        let (recorder, roster) = scenario.setup().unwrap();
        let battle = recorder.battle();
        assert_eq!(battle.status(), BattleStatus::InProgress);
        let (_, bastion) = roster.ship("Blue", "Bastion").unwrap();
        assert_eq!(battle.ship(bastion).unwrap().position, Position::new(30, 5));
    }

    #[test]
    fn test_orders_resolve_names() {
        let scenario = Scenario::from_ron_str(PICKET).unwrap();
        let (_, roster) = scenario.setup().unwrap();

        let commands: Vec<_> = scenario
            .orders_for(1)
            .map(|o| o.to_command(&roster).unwrap())
            .collect();
        assert!(matches!(commands[0], Command::QueueMissileShot { .. }));
        assert_eq!(scenario.orders_for(3).count(), 0);
    }

    #[test]
    fn test_unknown_names_rejected() {
        let scenario = Scenario::from_ron_str(PICKET).unwrap();
        let (_, roster) = scenario.setup().unwrap();
        let order = ScenarioOrder {
            turn: 1,
            faction: "Green".into(),
            ship: "Ghost".into(),
            action: OrderAction::Retreat,
        };
        assert!(matches!(
            order.to_command(&roster),
            Err(ToolError::Scenario(_))
        ));
    }

    #[test]
    fn test_bad_ron_reports_data_parse() {
        assert!(matches!(
            Scenario::from_ron_str("Scenario(name: 3)"),
            Err(ToolError::Battle(BattleError::DataParse { .. }))
        ));
    }
}
