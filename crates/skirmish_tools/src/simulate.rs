//! Headless battle runner.
//!
//! Plays a [`Scenario`] for a number of turns, issuing its scheduled
//! orders (and auto-engage orders when enabled), and collects the turn
//! log for printing.

use serde::Serialize;

use skirmish_core::battle::{Battle, TurnEvents};
use skirmish_core::commands::{Command, CommandOutcome};
use skirmish_core::faction::FactionId;
use skirmish_core::grid::Position;
use skirmish_core::replay::{Replay, ReplayRecorder};
use skirmish_core::ship::ShipId;
use skirmish_core::turn_log::{TurnLogEntry, Viewer};

use crate::error::{Result, ToolError};
use crate::scenario::Scenario;

/// One resolved turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    /// Summary counters.
    pub events: TurnEvents,
    /// Admin view of the turn's log.
    pub entries: Vec<TurnLogEntry>,
}

/// Result of a headless run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Scenario name.
    pub scenario: String,
    /// Turns that were resolved.
    pub turns: Vec<TurnReport>,
    /// Names of factions still in the fight.
    pub survivors: Vec<String>,
    /// Orders the engine rejected, with the reason.
    pub rejected: Vec<String>,
    /// Final battle state hash.
    pub final_hash: u64,
    /// The recorded run.
    #[serde(skip)]
    pub replay: Option<Replay>,
}

impl SimulationReport {
    /// Human-readable rendering of the run.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = format!("== {} ==\n", self.scenario);
        for turn in &self.turns {
            out.push_str(&format!(
                "-- Turn {} ({} lasers, {} missiles, {} moves, {} destroyed) --\n",
                turn.events.turn,
                turn.events.lasers_resolved,
                turn.events.missiles_resolved,
                turn.events.ships_moved,
                turn.events.destroyed.len()
            ));
            for entry in &turn.entries {
                match &entry.admin_detail {
                    Some(detail) => {
                        out.push_str(&format!("  [{:?}] {} ({detail})\n", entry.kind, entry.message));
                    }
                    None => out.push_str(&format!("  [{:?}] {}\n", entry.kind, entry.message)),
                }
            }
        }
        for line in &self.rejected {
            out.push_str(&format!("rejected: {line}\n"));
        }
        out.push_str(&format!(
            "survivors: {}\nfinal hash: {:#018x}\n",
            if self.survivors.is_empty() {
                "none".to_string()
            } else {
                self.survivors.join(", ")
            },
            self.final_hash
        ));
        out
    }

    /// JSON rendering of the run.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Commands that make every active ship fire at its nearest enemy and
/// close on it.
#[must_use]
pub fn engage_orders(battle: &Battle) -> Vec<Command> {
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

    let mut commands = Vec::new();
    for &(faction, ship, position) in &ships {
        let nearest = ships
            .iter()
            .filter(|(other, ..)| *other != faction)
            .min_by_key(|(_, id, pos)| (position.manhattan_distance(*pos), *id));
        let Some(&(target_faction, target_ship, target_pos)) = nearest else {
            continue;
        };
        let Some(shooter) = battle.ship(ship) else {
            continue;
        };

        for _ in 0..shooter.loadout.lasers {
            commands.push(Command::QueueLaserShot {
                faction,
                ship,
                target_faction,
                target_ship,
            });
        }
        if position.manhattan_distance(target_pos) <= battle.rules().missile_max_range {
            for _ in 0..shooter.loadout.missile_launchers {
                commands.push(Command::QueueMissileShot {
                    faction,
                    ship,
                    target_faction,
                    target_ship,
                });
            }
        }
        if position.manhattan_distance(target_pos) > 1 {
            commands.push(Command::QueueShipMove {
                faction,
                ship,
                target: target_pos,
            });
        }
    }
    commands
}

fn apply_logged(recorder: &mut ReplayRecorder, command: Command, rejected: &mut Vec<String>) {
    let name = command.name();
    if let Err(e) = recorder.apply(command) {
        rejected.push(format!("turn {}: {name}: {e}", recorder.battle().turn()));
    }
}

fn standing_factions(battle: &Battle) -> Vec<String> {
    battle
        .factions()
        .iter()
        .filter(|f| !f.is_defeated())
        .map(|f| f.name.clone())
        .collect()
}

/// Play `scenario` for up to `max_turns` turns.
///
/// The run stops early once at most one faction is left standing.
///
/// # Errors
///
/// Returns an error if setup fails, an order names an unknown ship, or
/// the battle refuses to resolve a turn.
pub fn run_scenario(scenario: &Scenario, max_turns: u32) -> Result<SimulationReport> {
    let (mut recorder, roster) = scenario.setup()?;
    let mut turns = Vec::new();
    let mut rejected = Vec::new();

    for _ in 0..max_turns {
        if standing_factions(recorder.battle()).len() <= 1 {
            tracing::info!(turn = recorder.battle().turn(), "Battle decided");
            break;
        }

        let turn = recorder.battle().turn();
        for order in scenario.orders_for(turn) {
            let command = order.to_command(&roster)?;
            apply_logged(&mut recorder, command, &mut rejected);
        }
        if scenario.auto_engage {
            for command in engage_orders(recorder.battle()) {
                apply_logged(&mut recorder, command, &mut rejected);
            }
        }

        let outcome = recorder.apply(Command::EndTurn)?;
        let CommandOutcome::TurnResolved(events) = outcome else {
            return Err(ToolError::Scenario(format!(
                "end of turn returned {outcome:?}"
            )));
        };
        let entries = recorder.battle().turn_log(events.turn, Viewer::Admin);
        turns.push(TurnReport { events, entries });
    }

    let (battle, replay) = recorder.finish();
    Ok(SimulationReport {
        scenario: scenario.name.clone(),
        turns,
        survivors: standing_factions(&battle),
        rejected,
        final_hash: battle.state_hash(),
        replay: Some(replay),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{OrderAction, ScenarioFaction, ScenarioOrder};
    use skirmish_core::replay::ReplayPlayer;
    use skirmish_core::ship::{ShipClass, ShipModule};
    use skirmish_core::turn_log::LogEventKind;
    use skirmish_test_utils::fixtures::{armed, ship_spec};

    fn brawl(auto_engage: bool) -> Scenario {
        Scenario {
            name: "Brawl".into(),
            width: 30,
            height: 30,
            seed: 21,
            rules: skirmish_core::rules::Ruleset::default(),
            factions: vec![
                ScenarioFaction {
                    name: "Red".into(),
                    player_name: String::new(),
                    color: "#ff0000".into(),
                    ships: vec![ship_spec("Anvil", ShipClass::Destroyer, 0, 0, armed())],
                },
                ScenarioFaction {
                    name: "Blue".into(),
                    player_name: String::new(),
                    color: "#0000ff".into(),
                    ships: vec![ship_spec(
                        "Bastion",
                        ShipClass::Corvette,
                        12,
                        0,
                        vec![ShipModule::Laser],
                    )],
                },
            ],
            orders: vec![ScenarioOrder {
                turn: 1,
                faction: "Blue".into(),
                ship: "Bastion".into(),
                action: OrderAction::Move(Position::new(12, 8)),
            }],
            auto_engage,
        }
    }

    #[test]
    fn test_scripted_run() {
        let report = run_scenario(&brawl(false), 3).unwrap();
        assert_eq!(report.turns.len(), 3);
        assert!(report.turns[0]
            .entries
            .iter()
            .any(|e| e.kind == LogEventKind::ShipMove));
        assert_eq!(report.survivors, vec!["Red", "Blue"]);
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn test_auto_engage_fights_to_a_finish() {
        let report = run_scenario(&brawl(true), 50).unwrap();
        assert!(report.turns.len() < 50);
        assert!(report.survivors.len() <= 1);
        assert!(report
            .turns
            .iter()
            .flat_map(|t| &t.entries)
            .any(|e| e.kind == LogEventKind::ShipDestroyed));
    }

    #[test]
    fn test_run_replays_to_same_hash() {
        let report = run_scenario(&brawl(true), 10).unwrap();
        let replay = report.replay.clone().unwrap();
        assert_eq!(replay.final_hash, report.final_hash);

        let mut player = ReplayPlayer::new(replay).unwrap();
        player.verify().unwrap();
    }

    #[test]
    fn test_renderings() {
        let report = run_scenario(&brawl(false), 1).unwrap();
        let text = report.to_text();
        assert!(text.starts_with("== Brawl =="));
        assert!(text.contains("-- Turn 1"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["scenario"], "Brawl");
        assert_eq!(json["turns"][0]["events"]["turn"], 1);
    }
}
