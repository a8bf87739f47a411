//! Long-range target allocation.
//!
//! Each free unit keeps a target across ticks in the [`TargetTable`] and
//! only recomputes it when it arrives, when another unit already claimed
//! the cell this tick, or when the target went stale. Recomputation is an
//! exhaustive scan of the grid in row-major order scored with [`Score`]
//! fixed-point arithmetic; the first cell reaching the maximum wins.
//!
//! Roles spread the team out:
//!
//! - [`Role::Resource`], [`Role::Combat`], [`Role::Spread`] are dealt
//!   round-robin by roster index.
//! - [`Role::Rally`] replaces them during CONVERGE, assembling units
//!   around one shared rally point.
//! - [`Role::Strike`] goes to the heaviest units during ATTACK.
//!
//! [`Claims`] records every cell taken this tick so no two units share a
//! long-range target.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::components::{Position, Unit, UnitId};
use crate::config::{RallyConfig, TargetingWeights};
use crate::math::{percent_of, ratio, score, Score};
use crate::phase::Phase;
use crate::world_view::{Cell, WorldView};

// ============================================================================
// Tables
// ============================================================================

/// Persistent long-range target per unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetTable {
    entries: BTreeMap<UnitId, Position>,
}

impl TargetTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored target of `unit`.
    #[must_use]
    pub fn get(&self, unit: &UnitId) -> Option<Position> {
        self.entries.get(unit).copied()
    }

    /// Store a target.
    pub fn assign(&mut self, unit: &UnitId, target: Position) {
        self.entries.insert(unit.clone(), target);
    }

    /// Forget a unit's target.
    pub fn remove(&mut self, unit: &UnitId) {
        self.entries.remove(unit);
    }

    /// Drop entries for units that no longer exist.
    pub fn retain_live(&mut self, live: &BTreeSet<UnitId>) {
        self.entries.retain(|id, _| live.contains(id));
    }

    /// Iterate over `(unit, target)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&UnitId, &Position)> {
        self.entries.iter()
    }

    /// Number of stored targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Cells reserved this tick, and by whom.
#[derive(Debug, Clone, Default)]
pub struct Claims {
    cells: BTreeMap<Position, UnitId>,
}

impl Claims {
    /// Create an empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `cell` for `unit`. Returns `false` if another unit holds it.
    pub fn claim(&mut self, cell: Position, unit: &UnitId) -> bool {
        match self.cells.get(&cell) {
            Some(owner) => owner == unit,
            None => {
                self.cells.insert(cell, unit.clone());
                true
            }
        }
    }

    /// Whether anyone claimed `cell`.
    #[must_use]
    pub fn is_claimed(&self, cell: Position) -> bool {
        self.cells.contains_key(&cell)
    }

    /// Whether a unit other than `unit` claimed `cell`.
    #[must_use]
    pub fn claimed_by_other(&self, cell: Position, unit: &UnitId) -> bool {
        self.cells.get(&cell).is_some_and(|owner| owner != unit)
    }

    /// Number of claimed cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether nothing is claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ============================================================================
// Roles
// ============================================================================

/// Weighting profile used to score candidate cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Nutrient-rich tiles, nutrients per tile of travel.
    Resource,
    /// Cheap hostile tiles.
    Combat,
    /// Cheap neutral tiles.
    Spread,
    /// Assembly around the CONVERGE rally point.
    Rally,
    /// Heavy hitters during ATTACK.
    Strike,
}

impl Role {
    /// Role dealt to the unit at roster `index`.
    #[must_use]
    pub const fn round_robin(index: usize) -> Self {
        match index % 3 {
            0 => Self::Resource,
            1 => Self::Combat,
            _ => Self::Spread,
        }
    }
}

/// Outcome of target resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Move toward this cell.
    Target(Position),
    /// Stay put this tick.
    Hold,
}

// ============================================================================
// Walls
// ============================================================================

/// Per-cell count of walled cardinal sides.
///
/// A side is walled when the neighbour is not ours and holds at least
/// `wall_biomass`. Built once per tick.
#[derive(Debug, Clone)]
pub struct WallMap {
    counts: Vec<u8>,
    width: i32,
}

impl WallMap {
    /// Count walls for every cell of `world`.
    #[must_use]
    pub fn build(world: &WorldView<'_>, wall_biomass: u32) -> Self {
        let counts = world
            .cells()
            .map(|cell| {
                let walled = world
                    .neighbours(cell.position)
                    .filter_map(|(_, next)| world.cell(next))
                    .filter(|n| !n.is_own() && n.biomass >= wall_biomass)
                    .count();
                u8::try_from(walled).unwrap_or(u8::MAX)
            })
            .collect();
        Self {
            counts,
            width: world.width(),
        }
    }

    /// Walled sides of `pos`; zero off the grid.
    #[must_use]
    pub fn count(&self, pos: Position) -> usize {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width {
            return 0;
        }
        usize::try_from(pos.y * self.width + pos.x)
            .ok()
            .and_then(|i| self.counts.get(i))
            .map_or(0, |&c| usize::from(c))
    }
}

// ============================================================================
// Team-wide selections
// ============================================================================

/// The `size` heaviest units, ties broken by roster order.
#[must_use]
pub fn strike_group(units: &[&Unit], size: usize) -> BTreeSet<UnitId> {
    let mut ranked: Vec<&Unit> = units.to_vec();
    ranked.sort_by_key(|u| Reverse(u.biomass));
    ranked.into_iter().take(size).map(|u| u.id.clone()).collect()
}

/// One shared assembly point for the whole team.
///
/// Scores every cell for the free `units` as a group: nutrients per
/// capture cost, divided by the group's mean travel distance, scaled by
/// nutrient band and proximity, minus a penalty for walls on the approach
/// from the group's centroid.
#[must_use]
pub fn find_rally_point(
    world: &WorldView<'_>,
    units: &[&Unit],
    config: &RallyConfig,
) -> Option<Position> {
    if units.is_empty() {
        return None;
    }
    let n = i64::try_from(units.len()).unwrap_or(i64::MAX);
    let total_biomass: i64 = units.iter().map(|u| i64::from(u.biomass)).sum();
    let sum_x: i64 = units.iter().map(|u| i64::from(u.position.x)).sum();
    let sum_y: i64 = units.iter().map(|u| i64::from(u.position.y)).sum();

    let mut best: Option<(Position, Score)> = None;
    for cell in world.cells() {
        let pos = cell.position;
        if cell.is_own() && cell.nutrients == 0 {
            continue;
        }
        if cell.nutrients < config.min_nutrients {
            continue;
        }
        let crowd = units
            .iter()
            .filter(|u| u.position.chebyshev(pos) <= config.crowd_radius)
            .count();
        if crowd >= config.crowd_limit {
            continue;
        }
        if cell.is_hostile()
            && score(i64::from(cell.biomass)) >= percent_of(total_biomass, config.combined_strength_percent)
        {
            continue;
        }
        let sum_distance: i64 = units
            .iter()
            .map(|u| i64::from(u.position.manhattan(pos)))
            .sum();
        if sum_distance > i64::from(config.max_distance) * n {
            continue;
        }

        let walls = approach_walls(world, (sum_x, sum_y), n, pos, config);
        let capture_cost = if cell.is_hostile() {
            i64::from(cell.biomass)
        } else {
            1
        };
        let mean_distance = ratio(sum_distance, n);
        let mut value = ratio(i64::from(cell.nutrients) * 100, capture_cost)
            .saturating_div(mean_distance.saturating_add(score(1)));
        if let Some(band) = config.bands.iter().find(|b| cell.nutrients >= b.min_nutrients) {
            value = value.saturating_mul(score(band.factor_percent)) / score(100);
        }
        if sum_distance <= i64::from(config.near_distance) * n {
            value = value.saturating_mul(score(config.near_factor_percent)) / score(100);
        }
        value = value.saturating_sub(score(walls * config.wall_penalty));

        if best.map_or(true, |(_, b)| value > b) {
            best = Some((pos, value));
        }
    }

    if let Some((pos, value)) = best {
        tracing::debug!(rally = %pos, score = %value, units = units.len(), "Rally point chosen");
    }
    best.map(|(pos, _)| pos)
}

/// Walls sampled at evenly spaced points between the centroid and `target`.
fn approach_walls(
    world: &WorldView<'_>,
    (sum_x, sum_y): (i64, i64),
    n: i64,
    target: Position,
    config: &RallyConfig,
) -> i64 {
    let parts = config.wall_samples + 1;
    let sample = |sum: i64, to: i32, i: i64| {
        let num = sum * parts + (i64::from(to) * n - sum) * i;
        i32::try_from(num.div_euclid(n * parts)).unwrap_or(i32::MIN)
    };

    let mut walls = 0;
    for i in 1..=config.wall_samples {
        let pos = Position::new(sample(sum_x, target.x, i), sample(sum_y, target.y, i));
        if let Some(cell) = world.cell(pos) {
            if !cell.is_own() && cell.biomass >= config.wall_biomass {
                walls += 1;
            }
        }
    }
    walls
}

// ============================================================================
// Allocator
// ============================================================================

/// Resolves one long-range target per free unit for one tick.
#[derive(Debug)]
pub struct TargetAllocator<'w> {
    world: &'w WorldView<'w>,
    weights: &'w TargetingWeights,
    phase: Phase,
    walls: WallMap,
    rally: Option<Position>,
}

impl<'w> TargetAllocator<'w> {
    /// Prepare an allocator for this tick's world and phase.
    #[must_use]
    pub fn new(world: &'w WorldView<'w>, weights: &'w TargetingWeights, phase: Phase) -> Self {
        Self {
            world,
            weights,
            phase,
            walls: WallMap::build(world, weights.wall_biomass),
            rally: None,
        }
    }

    /// Use `rally` as the CONVERGE rally point.
    #[must_use]
    pub fn with_rally(mut self, rally: Option<Position>) -> Self {
        self.rally = rally;
        self
    }

    /// Current rally point.
    #[must_use]
    pub const fn rally(&self) -> Option<Position> {
        self.rally
    }

    /// Keep or replace `unit`'s stored target and claim it.
    ///
    /// `index` is the unit's roster index, used for the round-robin role
    /// when a rally or strike search comes up empty.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        unit: &Unit,
        role: Role,
        index: usize,
        table: &mut TargetTable,
        claims: &mut Claims,
        rng: &mut R,
    ) -> Resolution {
        if role == Role::Rally {
            if let Some(rally) = self.rally {
                if unit.position.chebyshev(rally) <= self.weights.rally.hold_radius {
                    table.remove(&unit.id);
                    tracing::debug!(unit = %unit.id, %rally, "Holding at rally point");
                    return Resolution::Hold;
                }
            }
        }

        if let Some(stored) = table.get(&unit.id) {
            if !self.is_stale(unit, role, stored, claims) {
                claims.claim(stored, &unit.id);
                return Resolution::Target(stored);
            }
        }

        let choice = self
            .best_for(unit, role, claims)
            .or_else(|| match role {
                Role::Rally | Role::Strike => self.best_for(unit, Role::round_robin(index), claims),
                _ => None,
            })
            .or_else(|| self.fallback(unit, claims, rng));

        match choice {
            Some(target) => {
                table.assign(&unit.id, target);
                claims.claim(target, &unit.id);
                tracing::debug!(unit = %unit.id, ?role, %target, "Retargeted");
                Resolution::Target(target)
            }
            None => {
                table.remove(&unit.id);
                tracing::trace!(unit = %unit.id, ?role, "No target found, holding");
                Resolution::Hold
            }
        }
    }

    fn is_stale(&self, unit: &Unit, role: Role, stored: Position, claims: &Claims) -> bool {
        !self.world.in_bounds(stored)
            || unit.position.chebyshev(stored) <= self.weights.retarget_radius
            || claims.claimed_by_other(stored, &unit.id)
            || self.world.is_own_facility(stored)
            || (role == Role::Rally
                && self
                    .rally
                    .is_some_and(|rally| stored.chebyshev(rally) > self.weights.rally.spread))
    }

    /// Best unclaimed cell for `role`, first maximum in scan order.
    fn best_for(&self, unit: &Unit, role: Role, claims: &Claims) -> Option<Position> {
        if role == Role::Rally {
            return self.best_rally_cell(unit, claims);
        }

        let mut best: Option<(Position, Score)> = None;
        for cell in self.world.cells() {
            if !self.is_candidate(unit, &cell, claims) {
                continue;
            }
            let Some(value) = self.score(unit, role, &cell) else {
                continue;
            };
            if best.map_or(true, |(_, b)| value > b) {
                best = Some((cell.position, value));
            }
        }
        best.map(|(pos, _)| pos)
    }

    /// Closest free cell around the rally point: nearer the rally first,
    /// then nearer the unit, then richer.
    fn best_rally_cell(&self, unit: &Unit, claims: &Claims) -> Option<Position> {
        let rally = self.rally?;
        let spread = self.weights.rally.spread;

        let mut best: Option<(Position, (i32, i32, Reverse<u32>))> = None;
        for y in rally.y - spread..=rally.y + spread {
            for x in rally.x - spread..=rally.x + spread {
                let Some(cell) = self.world.cell(Position::new(x, y)) else {
                    continue;
                };
                let distance = unit.position.manhattan(cell.position);
                if !self.is_candidate(unit, &cell, claims) || !self.winnable(unit, &cell, distance) {
                    continue;
                }
                let key = (
                    cell.position.manhattan(rally),
                    distance,
                    Reverse(cell.nutrients),
                );
                if best.map_or(true, |(_, k)| key < k) {
                    best = Some((cell.position, key));
                }
            }
        }
        best.map(|(pos, _)| pos)
    }

    /// Filters shared by every role.
    fn is_candidate(&self, unit: &Unit, cell: &Cell, claims: &Claims) -> bool {
        cell.position != unit.position
            && !claims.is_claimed(cell.position)
            && !self.world.is_own_facility(cell.position)
            && self.walls.count(cell.position) < self.weights.wall_exclusion_count
    }

    /// Whether `unit` can plausibly take `cell`.
    ///
    /// Tiles holding at least the unit's biomass are out of reach unless
    /// they are close and valuable.
    fn winnable(&self, unit: &Unit, cell: &Cell, distance: i32) -> bool {
        cell.is_own()
            || cell.biomass < unit.biomass
            || (distance <= self.weights.close_radius
                && cell.nutrients >= self.weights.valuable_nutrients)
    }

    fn score(&self, unit: &Unit, role: Role, cell: &Cell) -> Option<Score> {
        let distance = unit.position.manhattan(cell.position);
        let cost = if cell.is_own() {
            0
        } else {
            i64::from(cell.biomass) + 1
        };

        let base = match role {
            Role::Resource => {
                if cell.nutrients == 0 || !self.winnable(unit, cell, distance) {
                    return None;
                }
                self.resource_score(cell, cost, distance)
            }
            Role::Combat => {
                if !cell.is_hostile() || !self.winnable(unit, cell, distance) {
                    return None;
                }
                let mut value = self.combat_score(cell, cost, distance);
                if self.phase == Phase::Attack {
                    value = value.saturating_add(score(self.weights.combat.attack_phase_bonus));
                }
                value
            }
            Role::Spread => {
                if !cell.is_neutral() || !self.winnable(unit, cell, distance) {
                    return None;
                }
                let w = &self.weights.spread;
                score(
                    w.base
                        .saturating_sub(cost.saturating_mul(w.cost_weight))
                        .saturating_sub(i64::from(distance).saturating_mul(w.distance_weight)),
                )
            }
            Role::Strike => {
                let strike = &self.weights.strike;
                let defended = u64::from(cell.biomass) * 100;
                let reach = u64::from(unit.biomass) * u64::from(strike.ratio_percent);
                if !cell.is_hostile() || defended >= reach {
                    return None;
                }
                self.combat_score(cell, cost, distance)
            }
            Role::Rally => return None,
        };

        let walls = i64::try_from(self.walls.count(cell.position)).unwrap_or(i64::MAX);
        let mut value = base.saturating_sub(score(walls.saturating_mul(self.weights.wall_penalty)));
        if self.phase != Phase::Attack
            && self
                .world
                .near_own_facility(cell.position, self.weights.own_facility_radius)
        {
            value = value.saturating_sub(score(self.weights.own_facility_penalty));
        }
        Some(value)
    }

    fn resource_score(&self, cell: &Cell, cost: i64, distance: i32) -> Score {
        let w = &self.weights.resource;
        let band = if distance <= w.near_radius {
            0
        } else if distance <= w.mid_radius {
            1
        } else {
            2
        };
        let mut value = ratio(
            i64::from(cell.nutrients).saturating_mul(w.nutrient_weight[band]),
            i64::from(distance) + 1,
        )
        .saturating_sub(score(cost.saturating_mul(w.cost_weight[band])));
        if !cell.is_own() {
            value = value.saturating_add(score(w.unowned_bonus));
        }
        value
    }

    fn combat_score(&self, cell: &Cell, cost: i64, distance: i32) -> Score {
        let w = &self.weights.combat;
        let mut value = ratio(
            i64::from(cell.nutrients).saturating_mul(w.nutrient_weight),
            cost + 1,
        )
        .saturating_sub(score(i64::from(distance).saturating_mul(w.distance_weight)));
        if cell.biomass <= w.weak_tile_biomass {
            value = value.saturating_add(score(w.weak_bonus));
        }
        if self.world.has_hostile_facility(cell.position) {
            value = value.saturating_add(score(w.facility_bonus));
        }
        value
    }

    /// Random unclaimed cell, drawn from the engine's seeded source.
    fn fallback<R: Rng + ?Sized>(&self, unit: &Unit, claims: &Claims, rng: &mut R) -> Option<Position> {
        for _ in 0..self.weights.fallback_attempts {
            let pos = Position::new(
                rng.gen_range(0..self.world.width()),
                rng.gen_range(0..self.world.height()),
            );
            if pos != unit.position && !claims.is_claimed(pos) && !self.world.is_own_facility(pos) {
                tracing::trace!(unit = %unit.id, %pos, "Fallback target");
                return Some(pos);
            }
        }
        None
    }
}
