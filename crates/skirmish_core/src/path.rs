//! Orthogonal path planning.
//!
//! Ships and missiles both travel along a [`Path`]: a deterministic
//! "staircase" of single orthogonal steps that alternates between the
//! horizontal and vertical axis until both match the target. The path
//! length is always the Manhattan distance between start and target.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::grid::Position;

/// A planned route consumed a few steps per turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    /// Last consumed position (the traveller's current location).
    start: Position,
    /// Where the path ends.
    target: Position,
    /// Steps consumed per [`advance`](Self::advance).
    speed: u32,
    /// Remaining steps, nearest first. Ends at `target` unless empty.
    steps: VecDeque<Position>,
}

/// Build the alternating-axis step sequence from `from` to `to`.
///
/// Each round tries one horizontal then one vertical step, skipping an
/// axis once it already matches the target.
fn staircase(from: Position, to: Position) -> VecDeque<Position> {
    let mut steps = VecDeque::with_capacity(from.manhattan_distance(to) as usize);
    let mut current = from;

    while current != to {
        if current.x != to.x {
            current.x += (to.x - current.x).signum();
            steps.push_back(current);
        }
        if current.y != to.y {
            current.y += (to.y - current.y).signum();
            steps.push_back(current);
        }
    }

    steps
}

impl Path {
    /// Plan a path from `start` to `target` travelling `speed` steps per advance.
    ///
    /// Planning onto the start position yields an already completed path.
    ///
    /// # Example
    ///
    /// ```
    /// use skirmish_core::grid::Position;
    /// use skirmish_core::path::Path;
    ///
    /// let path = Path::plan(Position::new(0, 0), Position::new(2, 2), 1);
    /// let steps: Vec<_> = path.remaining_steps().copied().collect();
    /// assert_eq!(
    ///     steps,
    ///     vec![
    ///         Position::new(1, 0),
    ///         Position::new(1, 1),
    ///         Position::new(2, 1),
    ///         Position::new(2, 2),
    ///     ]
    /// );
    /// ```
    #[must_use]
    pub fn plan(start: Position, target: Position, speed: u32) -> Self {
        Self {
            start,
            target,
            speed,
            steps: staircase(start, target),
        }
    }

    /// Current location of whoever follows this path.
    #[must_use]
    pub const fn start(&self) -> Position {
        self.start
    }

    /// Final position of the path.
    #[must_use]
    pub const fn target(&self) -> Position {
        self.target
    }

    /// Steps consumed per advance.
    #[must_use]
    pub const fn speed(&self) -> u32 {
        self.speed
    }

    /// Number of steps still to travel.
    #[must_use]
    pub fn len(&self) -> u32 {
        u32::try_from(self.steps.len()).unwrap_or(u32::MAX)
    }

    /// Check if no steps remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check if the traveller has arrived.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterate over the steps still to travel, nearest first.
    pub fn remaining_steps(&self) -> impl Iterator<Item = &Position> {
        self.steps.iter()
    }

    /// Consume up to `speed` steps and return how many were consumed.
    ///
    /// The path's start moves to the last consumed position. A completed
    /// path consumes nothing.
    pub fn advance(&mut self) -> u32 {
        let take = self.speed.min(self.len());
        for _ in 0..take {
            if let Some(step) = self.steps.pop_front() {
                self.start = step;
            }
        }
        take
    }

    /// Re-plan the remaining path from the current start to `new_target`.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::OutOfRange`] if the new path would be longer
    /// than `max_len` steps. The path is left untouched in that case.
    pub fn retarget(&mut self, new_target: Position, max_len: u32) -> Result<()> {
        let distance = self.start.manhattan_distance(new_target);
        if distance > max_len {
            return Err(BattleError::OutOfRange {
                distance,
                max: max_len,
            });
        }

        self.steps = staircase(self.start, new_target);
        self.target = new_target;
        Ok(())
    }
}
