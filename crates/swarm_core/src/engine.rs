//! The per-tick decision loop.
//!
//! [`DecisionEngine`] owns everything that persists between ticks: the
//! target and last-position tables, the phase latch and the random source.
//! [`DecisionEngine::decide`] turns one snapshot into one action batch in a
//! fixed order:
//!
//! 1. facility-zero bootstrap
//! 2. production
//! 3. one pass over the units: conversion, split, then target and movement
//!
//! Every action goes through an [`ActionBatch`], which refuses a second
//! action for any unit or facility.

use std::collections::BTreeSet;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::actions::{Action, ActionBatch};
use crate::components::{Position, Unit, UnitId};
use crate::config::{EngineConfig, MovementMode};
use crate::error::Result;
use crate::growth::{self, GrowthPlanner};
use crate::phase::{strike_ready, Phase, PhaseLatch};
use crate::production::ProductionPlanner;
use crate::snapshot::WorldSnapshot;
use crate::stepping::{LastPositionTable, LocalStepPlanner};
use crate::targeting::{
    find_rally_point, strike_group, Claims, Resolution, Role, TargetAllocator, TargetTable,
};
use crate::world_view::WorldView;

/// Decision engine for one team.
#[derive(Debug, Clone)]
pub struct DecisionEngine<R = SmallRng> {
    config: EngineConfig,
    targets: TargetTable,
    last_positions: LastPositionTable,
    latch: PhaseLatch,
    rng: R,
}

impl DecisionEngine<SmallRng> {
    /// Validate `config` and create an engine seeded from `config.seed`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let rng = SmallRng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> DecisionEngine<R> {
    /// Validate `config` and create an engine drawing from `rng`.
    pub fn with_rng(mut config: EngineConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            targets: TargetTable::new(),
            last_positions: LastPositionTable::new(),
            latch: PhaseLatch::new(),
            rng,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stored long-range targets.
    #[must_use]
    pub const fn targets(&self) -> &TargetTable {
        &self.targets
    }

    /// Positions recorded at the end of the last tick.
    #[must_use]
    pub const fn last_positions(&self) -> &LastPositionTable {
        &self.last_positions
    }

    /// Phase decided on the last tick, if any.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        self.latch.current()
    }

    /// Forget all per-unit memory and phase history.
    pub fn reset(&mut self) {
        self.targets.clear();
        self.last_positions.clear();
        self.latch.reset();
    }

    /// Decide this tick's actions.
    ///
    /// Never fails: a snapshot that cannot be read yields an empty batch,
    /// and units without a usable move are simply left out.
    pub fn decide(&mut self, snapshot: &WorldSnapshot) -> Vec<Action> {
        let world = match WorldView::new(snapshot) {
            Ok(world) => world,
            Err(err) => {
                tracing::warn!(tick = snapshot.tick, error = %err, "Rejected snapshot");
                return Vec::new();
            }
        };

        let live: BTreeSet<UnitId> = world.units().iter().map(|u| u.id.clone()).collect();
        self.targets.retain_live(&live);
        self.last_positions.retain_live(&live);

        let phase = self
            .latch
            .update(world.tick(), world.units().len(), &self.config.phase);
        let mut batch = ActionBatch::new();
        let mut converted: BTreeSet<Position> = BTreeSet::new();

        if let Some(action) = growth::bootstrap(&world) {
            if let Action::CreateFacility { unit_id } = &action {
                tracing::info!(tick = world.tick(), unit = %unit_id, "Bootstrapping first facility");
                self.forget(unit_id);
                if let Some(unit) = world.units().iter().find(|u| &u.id == unit_id) {
                    converted.insert(unit.position);
                }
            }
            batch.push(action);
        }

        for action in ProductionPlanner::new(&self.config.production).plan(&world) {
            batch.push(action);
        }

        self.decide_units(&world, phase, &mut batch, &mut converted);

        for unit in world.units() {
            self.last_positions.record(&unit.id, unit.position);
        }

        tracing::debug!(
            tick = world.tick(),
            %phase,
            units = world.units().len(),
            actions = batch.len(),
            "Tick decided"
        );
        batch.into_actions()
    }

    /// Single pass over the roster: conversion, split, then movement.
    ///
    /// `converted` holds the tiles already turned into facilities this tick.
    fn decide_units(
        &mut self,
        world: &WorldView<'_>,
        phase: Phase,
        batch: &mut ActionBatch,
        converted: &mut BTreeSet<Position>,
    ) {
        let config = &self.config;
        let growth = GrowthPlanner::new(&config.growth);
        let stepper = LocalStepPlanner::new(&config.stepping);

        let free: Vec<&Unit> = world
            .units()
            .iter()
            .filter(|u| !batch.unit_consumed(&u.id))
            .collect();
        let rally = match phase {
            Phase::Converge => find_rally_point(world, &free, &config.targeting.rally),
            _ => None,
        };
        // A strike group also leaves while the rest of a large team converges.
        let striking = phase == Phase::Attack
            || (phase == Phase::Converge
                && strike_ready(world.tick(), world.units().len(), &config.phase));
        let strikers = if striking {
            strike_group(&free, config.targeting.strike.group_size)
        } else {
            BTreeSet::new()
        };
        let allocator = TargetAllocator::new(world, &config.targeting, phase).with_rally(rally);

        let mut claims = Claims::new();
        let conversions_before = converted.len();

        for (index, unit) in world.units().iter().enumerate() {
            if batch.unit_consumed(&unit.id) {
                continue;
            }

            if converted.len() - conversions_before < growth.max_conversions()
                && !converted.contains(&unit.position)
                && growth.should_convert(world, unit)
            {
                tracing::info!(
                    unit = %unit.id,
                    position = %unit.position,
                    biomass = unit.biomass,
                    "Converting unit into facility"
                );
                batch.push(Action::CreateFacility {
                    unit_id: unit.id.clone(),
                });
                converted.insert(unit.position);
                self.targets.remove(&unit.id);
                self.last_positions.remove(&unit.id);
                continue;
            }

            if let Some(split) = growth.split(world, unit, &mut self.rng) {
                tracing::debug!(unit = %unit.id, biomass = unit.biomass, "Splitting");
                batch.push(split);
                self.targets.remove(&unit.id);
                continue;
            }

            let role = if strikers.contains(&unit.id) {
                Role::Strike
            } else if rally.is_some() {
                Role::Rally
            } else {
                Role::round_robin(index)
            };

            let resolution = allocator.resolve(
                unit,
                role,
                index,
                &mut self.targets,
                &mut claims,
                &mut self.rng,
            );
            let target = match resolution {
                Resolution::Target(target) => target,
                Resolution::Hold => {
                    batch.hold(&unit.id);
                    continue;
                }
            };

            match config.movement {
                MovementMode::LongRange => {
                    batch.push(Action::MoveTo {
                        unit_id: unit.id.clone(),
                        position: target,
                    });
                }
                MovementMode::SingleStep => {
                    let last = self.last_positions.get(&unit.id);
                    match stepper.step(world, unit, target, last) {
                        Some(direction) => {
                            batch.push(Action::Step {
                                unit_id: unit.id.clone(),
                                direction,
                            });
                        }
                        None => {
                            tracing::debug!(unit = %unit.id, "No legal step");
                            batch.hold(&unit.id);
                        }
                    }
                }
            }
        }
    }

    fn forget(&mut self, unit: &UnitId) {
        self.targets.remove(unit);
        self.last_positions.remove(unit);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use super::*;
    use crate::components::{Direction, Facility, FacilityId, Team, TeamId};
    use crate::snapshot::{GameConstants, WorldGrid};

    fn unit(id: &str, x: i32, y: i32, biomass: u32) -> Unit {
        Unit {
            id: UnitId::new(id),
            position: Position::new(x, y),
            biomass,
            team_id: TeamId::new("me"),
        }
    }

    fn snapshot(tick: u64, pool: u32, units: Vec<Unit>, facilities: &[(i32, i32)]) -> WorldSnapshot {
        let neutral = TeamId::new("neutral");
        let me = TeamId::new("me");
        let facilities = facilities
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Facility {
                id: FacilityId::new(format!("f{i}")),
                position: Position::new(x, y),
                team_id: me.clone(),
            })
            .collect();
        let mut teams = BTreeMap::new();
        teams.insert(
            me.clone(),
            Team {
                id: me.clone(),
                resource_pool: pool,
                units,
                facilities,
                next_facility_cost: 1_000,
            },
        );
        WorldSnapshot {
            tick,
            your_team_id: me,
            grid: WorldGrid::empty(10, 10, &neutral),
            teams,
            constants: GameConstants {
                neutral_team_id: neutral,
                max_ticks: None,
            },
        }
    }

    fn single_step() -> EngineConfig {
        EngineConfig {
            movement: MovementMode::SingleStep,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_lone_unit_heads_for_nutrients() {
        let mut snap = snapshot(1, 5, vec![unit("u", 0, 0, 5)], &[(9, 0)]);
        snap.grid.nutrient_grid[7][7] = 5;

        let mut engine = DecisionEngine::new(EngineConfig::default()).unwrap();
        let actions = engine.decide(&snap);
        assert_eq!(
            actions,
            vec![Action::MoveTo {
                unit_id: UnitId::new("u"),
                position: Position::new(7, 7)
            }]
        );

        let mut engine = DecisionEngine::new(single_step()).unwrap();
        let actions = engine.decide(&snap);
        match actions.as_slice() {
            [Action::Step { direction, .. }] => {
                let next = Position::new(0, 0).step(*direction);
                assert!(next.manhattan(Position::new(7, 7)) < 14);
            }
            other => panic!("expected one step, got {other:?}"),
        }
        assert_eq!(engine.targets().get(&UnitId::new("u")), Some(Position::new(7, 7)));
    }

    #[test]
    fn test_split_takes_priority_over_movement() {
        let mut config = EngineConfig::default();
        config.growth.split_threshold = 20;
        config.growth.split_percent = 40;
        let mut snap = snapshot(1, 0, vec![unit("u", 5, 5, 120)], &[(0, 0)]);
        snap.grid.nutrient_grid[7][7] = 5;

        let mut engine = DecisionEngine::new(config).unwrap();
        let actions = engine.decide(&snap);
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            Action::Split {
                unit_id,
                child_biomass,
                ..
            } => {
                assert_eq!(unit_id.as_str(), "u");
                assert_eq!(*child_biomass, 48);
                assert_eq!(120 - child_biomass, 72);
            }
            other => panic!("expected split, got {other:?}"),
        }
    }

    #[test]
    fn test_bootstrap_comes_first_and_consumes_unit() {
        let snap = snapshot(1, 100, vec![unit("a", 1, 1, 5), unit("b", 2, 2, 5)], &[]);
        let mut engine = DecisionEngine::new(EngineConfig::default()).unwrap();
        let actions = engine.decide(&snap);
        assert_eq!(
            actions[0],
            Action::CreateFacility {
                unit_id: UnitId::new("a")
            }
        );
        assert!(actions[1..]
            .iter()
            .all(|a| !matches!(a, Action::CreateFacility { .. })));
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_production_before_units() {
        let snap = snapshot(1, 60, vec![unit("u", 4, 4, 5)], &[(0, 0)]);
        let mut engine = DecisionEngine::new(EngineConfig::default()).unwrap();
        let actions = engine.decide(&snap);
        assert_eq!(
            actions[0],
            Action::ProduceUnit {
                facility_id: FacilityId::new("f0"),
                biomass: 50
            }
        );
    }

    #[test]
    fn test_conversion_limited_per_tick() {
        let mut snap = snapshot(
            1,
            0,
            vec![unit("a", 3, 3, 29), unit("b", 5, 5, 29)],
            &[(0, 0)],
        );
        if let Some(team) = snap.teams.get_mut(&TeamId::new("me")) {
            team.next_facility_cost = 20;
        }
        let mut config = EngineConfig::default();
        config.growth.conversion_min_biomass = 25;

        let mut engine = DecisionEngine::new(config).unwrap();
        let actions = engine.decide(&snap);
        let conversions = actions
            .iter()
            .filter(|a| matches!(a, Action::CreateFacility { .. }))
            .count();
        assert_eq!(conversions, 1);
        assert_eq!(
            actions[0],
            Action::CreateFacility {
                unit_id: UnitId::new("a")
            }
        );
    }

    fn facilities_created(actions: &[Action]) -> Vec<&str> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::CreateFacility { unit_id } => Some(unit_id.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_bootstrap_tile_not_converted_twice() {
        let mut snap = snapshot(1, 0, vec![unit("a", 3, 3, 5), unit("b", 3, 3, 200)], &[]);
        if let Some(team) = snap.teams.get_mut(&TeamId::new("me")) {
            team.next_facility_cost = 50;
        }

        let mut engine = DecisionEngine::new(EngineConfig::default()).unwrap();
        let actions = engine.decide(&snap);
        assert_eq!(facilities_created(&actions), vec!["a"]);
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Split { unit_id, .. } if unit_id.as_str() == "b")));
    }

    #[test]
    fn test_bootstrap_and_conversion_same_tick() {
        let mut snap = snapshot(1, 0, vec![unit("a", 1, 1, 5), unit("b", 5, 5, 200)], &[]);
        if let Some(team) = snap.teams.get_mut(&TeamId::new("me")) {
            team.next_facility_cost = 50;
        }

        let mut engine = DecisionEngine::new(EngineConfig::default()).unwrap();
        let actions = engine.decide(&snap);
        assert_eq!(facilities_created(&actions), vec!["a", "b"]);
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_large_late_team_converges_and_strikes() {
        let mut units: Vec<Unit> = (0..4)
            .map(|i| unit(&format!("s{i}"), i, 0, 25))
            .collect();
        units.extend((0..10).map(|i| unit(&format!("r{i}"), i, 1, 10)));
        let mut snap = snapshot(250, 0, units, &[(0, 5)]);
        snap.grid.nutrient_grid[5][5] = 10;
        snap.grid.ownership_grid[9][9] = TeamId::new("them");
        snap.grid.biomass_grid[9][9] = 30;

        let mut engine = DecisionEngine::new(EngineConfig::default()).unwrap();
        let actions = engine.decide(&snap);
        assert_eq!(engine.phase(), Some(Phase::Converge));

        // The heaviest unit first in roster order takes the defended tile.
        assert!(actions.contains(&Action::MoveTo {
            unit_id: UnitId::new("s0"),
            position: Position::new(9, 9)
        }));
        let rally = Position::new(5, 5);
        let spread = EngineConfig::default().targeting.rally.spread;
        for action in &actions {
            if let Action::MoveTo { unit_id, position } = action {
                if unit_id.as_str().starts_with('r') {
                    assert!(position.chebyshev(rally) <= spread, "{unit_id} left for {position}");
                }
            }
        }
    }

    #[test]
    fn test_malformed_snapshot_yields_empty_batch() {
        let mut snap = snapshot(1, 500, vec![unit("u", 0, 0, 5)], &[(0, 0)]);
        snap.grid.nutrient_grid.pop();
        let mut engine = DecisionEngine::new(EngineConfig::default()).unwrap();
        assert!(engine.decide(&snap).is_empty());
    }

    #[test]
    fn test_tables_pruned_for_dead_units() {
        let mut snap = snapshot(1, 0, vec![unit("a", 0, 0, 5), unit("b", 9, 9, 5)], &[(5, 0)]);
        snap.grid.nutrient_grid[4][4] = 5;
        snap.grid.nutrient_grid[6][6] = 5;
        let mut engine = DecisionEngine::new(EngineConfig::default()).unwrap();
        engine.decide(&snap);
        assert_eq!(engine.last_positions().len(), 2);

        if let Some(team) = snap.teams.get_mut(&TeamId::new("me")) {
            team.units.retain(|u| u.id.as_str() == "b");
        }
        snap.tick = 2;
        engine.decide(&snap);
        assert_eq!(engine.last_positions().len(), 1);
        assert!(engine.targets().get(&UnitId::new("a")).is_none());
    }

    #[test]
    fn test_no_duplicate_entities_or_destinations() {
        let units = (0..9)
            .map(|i| unit(&format!("u{i}"), i, i % 3, 5))
            .collect();
        let mut snap = snapshot(1, 500, units, &[(9, 9), (8, 9)]);
        snap.grid.nutrient_grid[5][5] = 30;
        snap.grid.nutrient_grid[6][6] = 20;

        let mut engine = DecisionEngine::new(EngineConfig::default()).unwrap();
        let actions = engine.decide(&snap);

        let mut actors = HashSet::new();
        let mut destinations = HashSet::new();
        for action in &actions {
            assert!(actors.insert(format!("{:?}", action.actor())));
            if let Action::MoveTo { position, .. } = action {
                assert!(destinations.insert(*position));
            }
        }
    }

    #[test]
    fn test_same_seed_same_actions() {
        let units = (0..6)
            .map(|i| unit(&format!("u{i}"), i, 0, 5))
            .collect();
        let snap = snapshot(1, 40, units, &[(9, 9)]);

        let run = || {
            let mut engine = DecisionEngine::new(EngineConfig::default()).unwrap();
            engine.decide(&snap)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_step_does_not_reverse() {
        let mut snap = snapshot(1, 0, vec![unit("u", 5, 5, 5)], &[(9, 9)]);
        snap.grid.nutrient_grid[5][0] = 9;
        let mut engine = DecisionEngine::new(single_step()).unwrap();
        let first = engine.decide(&snap);
        assert_eq!(
            first,
            vec![Action::Step {
                unit_id: UnitId::new("u"),
                direction: Direction::Left
            }]
        );

        // Pretend the unit came from the left and the target sits behind it.
        let mut snap = snapshot(2, 0, vec![unit("u", 5, 5, 5)], &[(9, 9)]);
        snap.grid.nutrient_grid[5][0] = 9;
        let mut engine = DecisionEngine::new(single_step()).unwrap();
        engine.decide(&snapshot(1, 0, vec![unit("u", 4, 5, 5)], &[(9, 9)]));
        let second = engine.decide(&snap);
        assert!(!second.contains(&Action::Step {
            unit_id: UnitId::new("u"),
            direction: Direction::Left
        }));
    }

    #[test]
    fn test_reset_clears_memory() {
        let mut snap = snapshot(1, 0, vec![unit("u", 0, 0, 5)], &[(9, 0)]);
        snap.grid.nutrient_grid[7][7] = 5;
        let mut engine = DecisionEngine::new(EngineConfig::default()).unwrap();
        engine.decide(&snap);
        assert!(!engine.targets().is_empty());
        assert_eq!(engine.phase(), Some(Phase::Expand));

        engine.reset();
        assert!(engine.targets().is_empty());
        assert!(engine.last_positions().is_empty());
        assert_eq!(engine.phase(), None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.production.tiers.clear();
        assert!(DecisionEngine::new(config).is_err());
    }
}
