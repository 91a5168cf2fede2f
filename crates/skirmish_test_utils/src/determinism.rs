//! Determinism testing utilities.
//!
//! Provides a harness for verifying that battles produce identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Turn resolution must be 100% reproducible so that replays verify and
//! tests can pin exact outcomes. Sources of non-determinism include:
//!
//! - **Unseeded randomness**: every hit roll goes through a
//!   [`HitRoller`](skirmish_core::dice::HitRoller); battles carry a seeded
//!   ChaCha8 stream.
//!
//! - **HashMap iteration order**: the battle keeps pending moves in a
//!   `BTreeMap` and everything else in insertion-ordered `Vec`s.
//!
//! - **Secrets**: faction tokens are random and excluded from the state hash.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use skirmish_core::battle::Battle;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of turns played.
    pub turns: u32,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Turns: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.turns,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `turns` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one turn
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    turns: u32,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..turns {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        turns,
    }
}

/// Play a battle twice with `step` and compare final state hashes.
pub fn verify_battle_determinism<F, Step>(setup_fn: F, step: Step, turns: u32) -> bool
where
    F: Fn() -> Battle,
    Step: Fn(&mut Battle),
{
    verify_determinism(2, turns, &setup_fn, step, Battle::state_hash).is_deterministic
}

/// Play `num_battles` copies of a battle on scoped threads and collect
/// the final hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_battles_scoped<F, Step>(
    setup_fn: F,
    step: Step,
    num_battles: usize,
    turns: u32,
) -> DeterminismResult
where
    F: Fn() -> Battle + Sync,
    Step: Fn(&mut Battle) + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut battle = setup_fn();
                    for _ in 0..turns {
                        step(&mut battle);
                    }
                    battle.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    });

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
        turns,
    }
}

/// Compare two runs turn-by-turn, finding the first divergence.
///
/// Returns `None` if the runs agree, `Some(turn)` for the first turn
/// whose resulting states differ (0 for the setup itself).
pub fn find_first_divergence<F, Step>(setup_fn: F, step: Step, turns: u32) -> Option<u32>
where
    F: Fn() -> Battle,
    Step: Fn(&mut Battle),
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for turn in 1..=turns {
        step(&mut first);
        step(&mut second);

        if first.state_hash() != second.state_hash() {
            tracing::debug!(turn, "Battles diverged");
            return Some(turn);
        }
    }

    None
}

/// Verify that a snapshot round-trip preserves the battle exactly and
/// that the restored battle keeps playing identically.
pub fn verify_serialization_determinism<F, Step>(setup_fn: F, step: Step, turns: u32) -> bool
where
    F: Fn() -> Battle,
    Step: Fn(&mut Battle),
{
    let mut battle = setup_fn();
    for _ in 0..turns {
        step(&mut battle);
    }

    let Ok(bytes) = battle.serialize() else {
        return false;
    };
    let Ok(mut restored) = Battle::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != battle.state_hash() {
        return false;
    }

    step(&mut battle);
    step(&mut restored);
    restored.state_hash() == battle.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle inputs.
pub mod strategies {
    use proptest::prelude::*;
    use skirmish_core::grid::Position;
    use skirmish_core::ship::{ShipClass, ShipModule, ShipSpec};

    /// Generate a position on a `width` by `height` grid.
    pub fn arb_position(width: i32, height: i32) -> impl Strategy<Value = Position> {
        (0..width, 0..height).prop_map(|(x, y)| Position::new(x, y))
    }

    /// Generate a ship class.
    pub fn arb_ship_class() -> impl Strategy<Value = ShipClass> {
        prop_oneof![
            Just(ShipClass::Corvette),
            Just(ShipClass::Frigate),
            Just(ShipClass::Destroyer),
            Just(ShipClass::Cruiser),
            Just(ShipClass::Battleship),
        ]
    }

    /// Generate a single module.
    pub fn arb_module() -> impl Strategy<Value = ShipModule> {
        prop_oneof![
            Just(ShipModule::Laser),
            Just(ShipModule::MissileLauncher),
            Just(ShipModule::PointDefense),
            Just(ShipModule::ShieldBooster),
            Just(ShipModule::ArmorPlating),
        ]
    }

    /// Generate a ship that fits its class slots under the stock rules
    /// (every class has at least two slots).
    pub fn arb_ship_spec(width: i32, height: i32) -> impl Strategy<Value = ShipSpec> {
        (
            arb_ship_class(),
            arb_position(width, height),
            proptest::collection::vec(arb_module(), 0..=2),
        )
            .prop_map(|(class, position, modules)| ShipSpec {
                name: format!("{class:?} at {position}"),
                class,
                position,
                modules,
            })
    }

    /// Generate damage values (1-200).
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        1u32..200u32
    }

    /// Generate a battle seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }
}
