//! Recording and playback of battles.
//!
//! A replay stores the battle as it was when recording began plus every
//! command that succeeded afterwards. Because the battle carries its own
//! seeded roller, re-applying the commands reproduces the battle exactly.

use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};

use crate::battle::Battle;
use crate::commands::{Command, CommandOutcome};
use crate::error::{BattleError, Result};

/// A single recorded command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCommand {
    /// Battle turn when the command was applied.
    pub turn: u32,
    /// The command that was applied.
    pub command: Command,
}

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Name of the recorded battle.
    pub battle_name: String,
    /// Serialized battle at the start of recording.
    pub initial_state: Vec<u8>,
    /// Successful commands in application order.
    pub commands: Vec<ReplayCommand>,
    /// Battle turn when recording stopped.
    pub final_turn: u32,
    /// Final state hash for verification.
    pub final_hash: u64,
}

impl Replay {
    /// Start a replay from a battle's current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the battle cannot be serialized.
    pub fn new(initial_state: &Battle) -> Result<Self> {
        Ok(Self {
            version: REPLAY_VERSION,
            battle_name: initial_state.name().to_string(),
            initial_state: initial_state.serialize()?,
            commands: Vec::new(),
            final_turn: initial_state.turn(),
            final_hash: initial_state.state_hash(),
        })
    }

    /// Record a command for replay.
    pub fn record_command(&mut self, turn: u32, command: Command) {
        self.commands.push(ReplayCommand { turn, command });
    }

    /// Stamp the end state the replay must reproduce.
    pub fn finalize(&mut self, battle: &Battle) {
        self.final_turn = battle.turn();
        self.final_hash = battle.state_hash();
    }

    /// Encode the replay.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| BattleError::Serialization(format!("Failed to serialize replay: {e}")))
    }

    /// Decode a replay and check its format version.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails or the version is unsupported.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| BattleError::Serialization(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(BattleError::Replay(format!(
                "version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }

        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<FsPath>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| BattleError::Replay(format!("Failed to write replay file: {e}")))
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if file reading, decoding or the version check fails.
    pub fn load<P: AsRef<FsPath>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| BattleError::Replay(format!("Failed to read replay file: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Rebuild the battle as it was when recording began.
    ///
    /// # Errors
    ///
    /// Returns an error if state deserialization fails.
    pub fn restore_initial_state(&self) -> Result<Battle> {
        Battle::deserialize(&self.initial_state)
    }

    /// Commands applied during `turn`.
    #[must_use]
    pub fn commands_at_turn(&self, turn: u32) -> Vec<&ReplayCommand> {
        self.commands.iter().filter(|cmd| cmd.turn == turn).collect()
    }

    /// Total number of recorded commands.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

/// A battle that records every successful command into a replay.
#[derive(Debug, Clone)]
pub struct ReplayRecorder {
    battle: Battle,
    replay: Replay,
}

impl ReplayRecorder {
    /// Begin recording from `battle`'s current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the battle cannot be serialized.
    pub fn new(battle: Battle) -> Result<Self> {
        let replay = Replay::new(&battle)?;
        Ok(Self { battle, replay })
    }

    /// Apply a command and record it if it succeeded.
    ///
    /// # Errors
    ///
    /// Returns the command's rejection; rejected commands are not recorded.
    pub fn apply(&mut self, command: Command) -> Result<CommandOutcome> {
        let turn = self.battle.turn();
        let outcome = self.battle.apply(command.clone())?;
        self.replay.record_command(turn, command);
        Ok(outcome)
    }

    /// The battle being recorded.
    #[must_use]
    pub const fn battle(&self) -> &Battle {
        &self.battle
    }

    /// Stop recording and return the battle and its finalized replay.
    #[must_use]
    pub fn finish(mut self) -> (Battle, Replay) {
        self.replay.finalize(&self.battle);
        (self.battle, self.replay)
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    battle: Battle,
    command_index: usize,
}

impl ReplayPlayer {
    /// Create a player positioned before the first command.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial state cannot be restored.
    pub fn new(replay: Replay) -> Result<Self> {
        let battle = replay.restore_initial_state()?;
        Ok(Self {
            replay,
            battle,
            command_index: 0,
        })
    }

    /// Apply the next recorded command.
    ///
    /// Returns `None` once every command has been applied.
    pub fn step(&mut self) -> Option<Result<CommandOutcome>> {
        let recorded = self.replay.commands.get(self.command_index)?;
        self.command_index += 1;
        Some(self.battle.apply(recorded.command.clone()))
    }

    /// Restart and play every command up to the start of `turn`.
    ///
    /// # Errors
    ///
    /// Returns an error if state restoration fails or a recorded command
    /// is rejected on playback.
    pub fn seek(&mut self, turn: u32) -> Result<()> {
        self.battle = self.replay.restore_initial_state()?;
        self.command_index = 0;

        while self
            .replay
            .commands
            .get(self.command_index)
            .is_some_and(|cmd| cmd.turn < turn)
        {
            if let Some(result) = self.step() {
                result?;
            }
        }
        Ok(())
    }

    /// Play every remaining command.
    ///
    /// # Errors
    ///
    /// Returns the first rejection of a recorded command.
    pub fn play_to_end(&mut self) -> Result<()> {
        while let Some(result) = self.step() {
            result?;
        }
        Ok(())
    }

    /// Play the whole replay from the start and compare the final hash.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::Replay`] if the resulting battle diverges
    /// from the recorded one.
    pub fn verify(&mut self) -> Result<()> {
        self.seek(0)?;
        self.play_to_end()?;

        let actual = self.battle.state_hash();
        if actual != self.replay.final_hash {
            return Err(BattleError::Replay(format!(
                "final hash mismatch: expected {:#018x}, got {actual:#018x}",
                self.replay.final_hash
            )));
        }
        if self.battle.turn() != self.replay.final_turn {
            return Err(BattleError::Replay(format!(
                "final turn mismatch: expected {}, got {}",
                self.replay.final_turn,
                self.battle.turn()
            )));
        }
        Ok(())
    }

    /// The battle in its current playback state.
    #[must_use]
    pub const fn battle(&self) -> &Battle {
        &self.battle
    }

    /// The replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Check if every command has been applied.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.command_index >= self.replay.commands.len()
    }
}
