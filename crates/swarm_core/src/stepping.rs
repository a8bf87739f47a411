//! Single-step movement toward a long-range target.
//!
//! No graph search: the planner compares the four cardinal neighbours with a
//! local cost function and takes the cheapest. Hostile biomass on the next
//! tile costs, nutrients reward, and remaining Manhattan distance pulls
//! toward the target. Stepping straight back onto the tile the unit left
//! last tick is vetoed unless it is the only way out.
//!
//! Ties resolve to the earliest direction in [`Direction::ALL`] so the
//! result is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use crate::components::{Direction, Position, Unit, UnitId};
use crate::config::StepWeights;
use crate::world_view::WorldView;

/// Each unit's position one tick ago.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastPositionTable {
    entries: BTreeMap<UnitId, Position>,
}

impl LastPositionTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Where `unit` was last tick.
    #[must_use]
    pub fn get(&self, unit: &UnitId) -> Option<Position> {
        self.entries.get(unit).copied()
    }

    /// Remember where `unit` is now, for use next tick.
    pub fn record(&mut self, unit: &UnitId, position: Position) {
        self.entries.insert(unit.clone(), position);
    }

    /// Forget a unit.
    pub fn remove(&mut self, unit: &UnitId) {
        self.entries.remove(unit);
    }

    /// Drop entries for units that no longer exist.
    pub fn retain_live(&mut self, live: &BTreeSet<UnitId>) {
        self.entries.retain(|id, _| live.contains(id));
    }

    /// Number of tracked units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no unit is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Chooses one cardinal step per unit.
#[derive(Debug, Clone, Copy)]
pub struct LocalStepPlanner<'c> {
    weights: &'c StepWeights,
}

impl<'c> LocalStepPlanner<'c> {
    /// Create a planner with the given cost weights.
    #[must_use]
    pub const fn new(weights: &'c StepWeights) -> Self {
        Self { weights }
    }

    /// Pick the cheapest legal step from `unit` toward `target`.
    ///
    /// Returns `None` when the unit already stands on its target or has no
    /// in-bounds neighbour.
    #[must_use]
    pub fn step(
        &self,
        world: &WorldView<'_>,
        unit: &Unit,
        target: Position,
        last_position: Option<Position>,
    ) -> Option<Direction> {
        if unit.position == target {
            return None;
        }

        let legal: Vec<(Direction, Position)> = world.neighbours(unit.position).collect();
        let forward: Vec<(Direction, Position)> = legal
            .iter()
            .copied()
            .filter(|(_, next)| Some(*next) != last_position)
            .collect();
        let candidates = if forward.is_empty() { legal } else { forward };

        let mut best: Option<(Direction, i64)> = None;
        for (direction, next) in candidates {
            let cost = self.cost(world, unit, next, target);
            if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                best = Some((direction, cost));
            }
        }
        best.map(|(direction, _)| direction)
    }

    /// `hostile biomass penalty - nutrient bonus + distance to target`.
    fn cost(&self, world: &WorldView<'_>, unit: &Unit, next: Position, target: Position) -> i64 {
        let Some(cell) = world.cell(next) else {
            return i64::MAX;
        };
        let hostile = if cell.is_own() { 0 } else { i64::from(cell.biomass) };
        let blocking = if hostile > 0 && hostile >= i64::from(unit.biomass) {
            self.weights.blocking_penalty
        } else {
            0
        };

        let w = self.weights;
        hostile
            .saturating_mul(w.hostile_weight)
            .saturating_sub(i64::from(cell.nutrients).saturating_mul(w.nutrient_weight))
            .saturating_add(i64::from(next.manhattan(target)).saturating_mul(w.distance_weight))
            .saturating_add(blocking)
    }
}
