//! Command service.
//!
//! [`BattleService`] is the in-process entry point used by outer layers.
//! It loads a copy of the battle from the repository, applies one command,
//! and saves the copy back only if the command succeeded. Commands against
//! the same battle are serialized by a per-battle lock; different battles
//! proceed in parallel.

use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::{Arc, Mutex, MutexGuard};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::battle::{Battle, BattleId};
use crate::commands::{Command, CommandOutcome};
use crate::dice::HitRoller;
use crate::error::{BattleError, Missing, Result};
use crate::repository::{BattleRepository, BattleSummary, InMemoryBattleRepository};
use crate::rules::Ruleset;
use crate::ship::{Ship, ShipId};
use crate::turn_log::{TurnLogEntry, Viewer};

/// Settings for a [`BattleService`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Rules stamped onto every new battle.
    pub rules: Ruleset,
    /// Master seed. Battle seeds are drawn from it in creation order;
    /// without one they come from OS entropy.
    pub seed: Option<u64>,
}

impl ServiceConfig {
    /// Parse a config from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParse`] for malformed RON and
    /// [`BattleError::InvalidRuleset`] for unusable rules.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source).map_err(|e| BattleError::DataParse {
            path: "<inline>".into(),
            message: e.to_string(),
        })?;
        config.rules.validate()?;
        Ok(config)
    }

    /// Load a config from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParse`] if the file cannot be read or parsed.
    pub fn load<P: AsRef<FsPath>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| BattleError::DataParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_ron_str(&source).map_err(|e| match e {
            BattleError::DataParse { message, .. } => BattleError::DataParse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }
}

/// Applies commands to stored battles.
#[derive(Debug)]
pub struct BattleService<R = InMemoryBattleRepository> {
    config: ServiceConfig,
    repository: R,
    seeds: Mutex<ChaCha8Rng>,
    locks: Mutex<HashMap<BattleId, Arc<Mutex<()>>>>,
}

fn poisoned<T>(_: T) -> BattleError {
    BattleError::Storage("service lock poisoned".into())
}

impl BattleService<InMemoryBattleRepository> {
    /// Create a service backed by an in-memory repository.
    #[must_use]
    pub fn in_memory(config: ServiceConfig) -> Self {
        Self::new(config, InMemoryBattleRepository::new())
    }
}

impl<R: BattleRepository> BattleService<R> {
    /// Create a service over `repository`.
    #[must_use]
    pub fn new(config: ServiceConfig, repository: R) -> Self {
        let seeds = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            config,
            repository,
            seeds: Mutex::new(seeds),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The service configuration.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The underlying repository.
    #[must_use]
    pub const fn repository(&self) -> &R {
        &self.repository
    }

    /// Lock for a live battle. Unknown and deleted ids never get an entry.
    fn lock_for(&self, id: BattleId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(poisoned)?;
        if let Some(lock) = locks.get(&id) {
            return Ok(Arc::clone(lock));
        }
        self.load_active(id)?;
        Ok(Arc::clone(locks.entry(id).or_default()))
    }

    fn load_active(&self, id: BattleId) -> Result<Battle> {
        let battle = self.repository.load(id)?;
        if battle.is_active() {
            Ok(battle)
        } else {
            Err(BattleError::NotFound(Missing::Battle(id)))
        }
    }

    /// Create and store a new battle in preparation.
    ///
    /// # Errors
    ///
    /// Fails for a zero-sized grid or if the battle cannot be stored.
    pub fn create_battle(&self, name: impl Into<String>, width: u32, height: u32) -> Result<BattleId> {
        let seed = self.seeds.lock().map_err(poisoned)?.gen::<u64>();
        let battle = Battle::new(
            BattleId::generate(),
            name,
            width,
            height,
            self.config.rules.clone(),
            seed,
        )?;
        self.repository.save(&battle)?;
        Ok(battle.id())
    }

    /// Apply a command to a stored battle.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::NotFound`] for unknown or deleted battles and
    /// the command's own rejection otherwise. Nothing is saved on failure.
    pub fn apply(&self, id: BattleId, command: Command) -> Result<CommandOutcome> {
        self.run(id, |battle| battle.apply(command))
    }

    /// Apply a command, drawing end-of-turn rolls from `roller`.
    ///
    /// # Errors
    ///
    /// Same as [`apply`](Self::apply).
    pub fn apply_with(
        &self,
        id: BattleId,
        command: Command,
        roller: &mut dyn HitRoller,
    ) -> Result<CommandOutcome> {
        self.run(id, |battle| battle.apply_with(command, roller))
    }

    fn run<F>(&self, id: BattleId, f: F) -> Result<CommandOutcome>
    where
        F: FnOnce(&mut Battle) -> Result<CommandOutcome>,
    {
        let lock = self.lock_for(id)?;
        let _guard: MutexGuard<'_, ()> = lock.lock().map_err(poisoned)?;

        let mut battle = self.load_active(id)?;
        let outcome = f(&mut battle)?;
        self.repository.save(&battle)?;
        Ok(outcome)
    }

    /// Soft-delete a battle. Its history stays in the repository.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::NotFound`] for unknown or already deleted battles.
    pub fn delete_battle(&self, id: BattleId) -> Result<()> {
        let lock = self.lock_for(id)?;
        let _guard = lock.lock().map_err(poisoned)?;
        self.load_active(id)?;
        self.repository.soft_delete(id)?;
        self.locks.lock().map_err(poisoned)?.remove(&id);
        Ok(())
    }

    /// Snapshot of a whole battle.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::NotFound`] for unknown or deleted battles.
    pub fn battle_state(&self, id: BattleId) -> Result<Battle> {
        self.load_active(id)
    }

    /// Snapshot of one ship.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::NotFound`] for unknown battles or ships.
    pub fn ship(&self, id: BattleId, ship: ShipId) -> Result<Ship> {
        self.load_active(id)?
            .ship(ship)
            .cloned()
            .ok_or(BattleError::NotFound(Missing::Ship(ship)))
    }

    /// One turn of a battle's log as seen by `viewer`.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::NotFound`] for unknown battles or viewing factions.
    pub fn turn_log(&self, id: BattleId, turn: u32, viewer: Viewer) -> Result<Vec<TurnLogEntry>> {
        let battle = self.load_active(id)?;
        if let Viewer::Faction(faction) = viewer {
            if battle.faction(faction).is_none() {
                return Err(BattleError::NotFound(Missing::Faction(faction)));
            }
        }
        Ok(battle.turn_log(turn, viewer))
    }

    /// Summaries of all stored battles, deleted ones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be read.
    pub fn list_battles(&self) -> Result<Vec<BattleSummary>> {
        self.repository.list_summaries()
    }
}
