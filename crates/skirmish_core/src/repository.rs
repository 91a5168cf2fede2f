//! Storage port for battles.
//!
//! The engine never decides how battles are persisted. It talks to a
//! [`BattleRepository`] that stores whole aggregates, and ships one
//! in-memory adapter that keeps bincode snapshots.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::battle::{Battle, BattleId, BattleStatus};
use crate::error::{BattleError, Missing, Result};

/// Listing entry for a stored battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSummary {
    /// Battle identifier.
    pub id: BattleId,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: BattleStatus,
    /// Current turn.
    pub turn: u32,
    /// Number of factions taking part.
    pub factions: usize,
    /// False once soft-deleted.
    pub active: bool,
}

impl From<&Battle> for BattleSummary {
    fn from(battle: &Battle) -> Self {
        Self {
            id: battle.id(),
            name: battle.name().to_string(),
            status: battle.status(),
            turn: battle.turn(),
            factions: battle.factions().len(),
            active: battle.is_active(),
        }
    }
}

/// Port for battle storage.
///
/// Implementations store and return whole aggregates; a loaded battle is
/// an independent copy that the caller may mutate freely.
pub trait BattleRepository: Send + Sync {
    /// Load a copy of a battle.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::NotFound`] for unknown ids.
    fn load(&self, id: BattleId) -> Result<Battle>;

    /// Insert or replace a battle.
    ///
    /// # Errors
    ///
    /// Returns an error if the battle cannot be stored.
    fn save(&self, battle: &Battle) -> Result<()>;

    /// Mark a battle inactive, keeping its history.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::NotFound`] for unknown ids.
    fn soft_delete(&self, id: BattleId) -> Result<()> {
        let mut battle = self.load(id)?;
        battle.soft_delete();
        self.save(&battle)
    }

    /// Summaries of every stored battle, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_summaries(&self) -> Result<Vec<BattleSummary>>;
}

/// Repository keeping bincode snapshots in memory.
#[derive(Debug, Default)]
pub struct InMemoryBattleRepository {
    snapshots: Mutex<HashMap<BattleId, Vec<u8>>>,
}

impl InMemoryBattleRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshots(&self) -> Result<std::sync::MutexGuard<'_, HashMap<BattleId, Vec<u8>>>> {
        self.snapshots
            .lock()
            .map_err(|_| BattleError::Storage("battle store lock poisoned".into()))
    }
}

impl BattleRepository for InMemoryBattleRepository {
    fn load(&self, id: BattleId) -> Result<Battle> {
        let snapshots = self.snapshots()?;
        let bytes = snapshots
            .get(&id)
            .ok_or(BattleError::NotFound(Missing::Battle(id)))?;
        Battle::deserialize(bytes)
    }

    fn save(&self, battle: &Battle) -> Result<()> {
        let bytes = battle.serialize()?;
        self.snapshots()?.insert(battle.id(), bytes);
        Ok(())
    }

    fn list_summaries(&self) -> Result<Vec<BattleSummary>> {
        let snapshots = self.snapshots()?;
        let mut summaries = snapshots
            .values()
            .map(|bytes| Battle::deserialize(bytes).map(|b| BattleSummary::from(&b)))
            .collect::<Result<Vec<_>>>()?;
        summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Ruleset;

    fn battle(name: &str) -> Battle {
        Battle::new(BattleId::generate(), name, 10, 10, Ruleset::default(), 1).unwrap()
    }

    #[test]
    fn test_save_and_load_copy() {
        let repo = InMemoryBattleRepository::new();
        let original = battle("Alpha");
        repo.save(&original).unwrap();

        let mut loaded = repo.load(original.id()).unwrap();
        assert_eq!(loaded, original);

        // Mutating the copy does not touch the store.
        loaded.start().unwrap();
        assert_eq!(repo.load(original.id()).unwrap().turn(), 0);
    }

    #[test]
    fn test_load_unknown() {
        let repo = InMemoryBattleRepository::new();
        let id = BattleId::generate();
        assert!(matches!(
            repo.load(id),
            Err(BattleError::NotFound(Missing::Battle(missing))) if missing == id
        ));
    }

    #[test]
    fn test_soft_delete_keeps_history() {
        let repo = InMemoryBattleRepository::new();
        let b = battle("Gone");
        repo.save(&b).unwrap();
        repo.soft_delete(b.id()).unwrap();

        let loaded = repo.load(b.id()).unwrap();
        assert!(!loaded.is_active());
        assert_eq!(loaded.name(), "Gone");
    }

    #[test]
    fn test_list_summaries_sorted() {
        let repo = InMemoryBattleRepository::new();
        repo.save(&battle("Zeta")).unwrap();
        repo.save(&battle("Alpha")).unwrap();

        let names: Vec<_> = repo
            .list_summaries()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }
}
