//! Facility production budget.
//!
//! Each tick the planner walks our facilities and decides how much of the
//! team's pool each one turns into a new unit. Spending is deducted from a
//! running budget, so several facilities can never jointly overspend the
//! pool the tick started with.
//!
//! All calculations use integer math.

use crate::actions::Action;
use crate::components::Facility;
use crate::config::{ProductionConfig, ProductionTier};
use crate::world_view::WorldView;

/// Running budget for one tick of production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    remaining: u32,
}

impl Budget {
    /// Start a budget from the team's pool.
    #[must_use]
    pub const fn new(pool: u32) -> Self {
        Self { remaining: pool }
    }

    /// Pool left to spend.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Check if the budget covers a cost.
    #[must_use]
    pub const fn can_afford(&self, cost: u32) -> bool {
        self.remaining >= cost
    }

    /// Spend if available.
    ///
    /// Returns true if the transaction succeeded.
    pub fn spend(&mut self, cost: u32) -> bool {
        if self.can_afford(cost) {
            self.remaining -= cost;
            true
        } else {
            false
        }
    }
}

/// Decides `ProduceUnit` actions for our facilities.
#[derive(Debug, Clone, Copy)]
pub struct ProductionPlanner<'c> {
    config: &'c ProductionConfig,
}

impl<'c> ProductionPlanner<'c> {
    /// Create a planner over a tier ladder.
    #[must_use]
    pub const fn new(config: &'c ProductionConfig) -> Self {
        Self { config }
    }

    /// The largest tier the budget allows, if any.
    #[must_use]
    pub fn tier_for(&self, budget: &Budget) -> Option<ProductionTier> {
        self.config
            .tiers
            .iter()
            .filter(|t| t.min_pool <= budget.remaining() && budget.can_afford(t.biomass))
            .max_by_key(|t| (t.min_pool, t.biomass))
            .copied()
    }

    /// At most one `ProduceUnit` per facility, never exceeding the pool.
    ///
    /// Facilities are visited most-defended first (highest biomass on their
    /// tile, ties in roster order).
    #[must_use]
    pub fn plan(&self, world: &WorldView<'_>) -> Vec<Action> {
        let team = world.team();
        let mut budget = Budget::new(team.resource_pool);
        let mut population = team.units.len();
        let mut actions = Vec::new();

        let mut facilities: Vec<(&Facility, u32)> = world
            .facilities()
            .iter()
            .map(|f| (f, world.biomass(f.position).unwrap_or(0)))
            .collect();
        facilities.sort_by(|a, b| b.1.cmp(&a.1));

        for (facility, tile_biomass) in facilities {
            if self.config.max_units.is_some_and(|cap| population >= cap) {
                tracing::debug!(population, "Population cap reached, production stops");
                break;
            }
            let Some(tier) = self.tier_for(&budget) else {
                break;
            };
            if self
                .config
                .crowded_tile_biomass
                .is_some_and(|limit| tile_biomass >= limit)
            {
                tracing::debug!(facility = %facility.id, tile_biomass, "Facility tile crowded, skipped");
                continue;
            }
            if !budget.spend(tier.biomass) {
                break;
            }

            population += 1;
            actions.push(Action::ProduceUnit {
                facility_id: facility.id.clone(),
                biomass: tier.biomass,
            });
        }

        tracing::debug!(
            pool = team.resource_pool,
            remaining = budget.remaining(),
            orders = actions.len(),
            "Production planned"
        );
        actions
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::components::{FacilityId, Position, Team, TeamId};
    use crate::snapshot::{GameConstants, WorldGrid, WorldSnapshot};

    fn snapshot(pool: u32, facilities: &[(i32, i32)]) -> WorldSnapshot {
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
                units: Vec::new(),
                facilities,
                next_facility_cost: 50,
            },
        );
        WorldSnapshot {
            tick: 1,
            your_team_id: me,
            grid: WorldGrid::empty(10, 10, &neutral),
            teams,
            constants: GameConstants {
                neutral_team_id: neutral,
                max_ticks: None,
            },
        }
    }

    fn total(actions: &[Action]) -> u32 {
        actions
            .iter()
            .map(|a| match a {
                Action::ProduceUnit { biomass, .. } => *biomass,
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn test_budget_spend() {
        let mut budget = Budget::new(30);
        assert!(budget.spend(20));
        assert!(!budget.spend(20));
        assert_eq!(budget.remaining(), 10);
    }

    #[test]
    fn test_nothing_below_cheapest_tier() {
        let config = ProductionConfig::default();
        let snap = snapshot(9, &[(0, 0)]);
        let view = WorldView::new(&snap).unwrap();
        assert!(ProductionPlanner::new(&config).plan(&view).is_empty());
    }

    #[test]
    fn test_largest_affordable_tier_chosen() {
        let config = ProductionConfig::default();
        let snap = snapshot(120, &[(0, 0)]);
        let view = WorldView::new(&snap).unwrap();
        let actions = ProductionPlanner::new(&config).plan(&view);
        assert_eq!(
            actions,
            vec![Action::ProduceUnit {
                facility_id: FacilityId::new("f0"),
                biomass: 100
            }]
        );
    }

    #[test]
    fn test_facilities_never_jointly_overspend() {
        let config = ProductionConfig::default();
        let snap = snapshot(75, &[(0, 0), (2, 0), (4, 0), (6, 0)]);
        let view = WorldView::new(&snap).unwrap();
        let actions = ProductionPlanner::new(&config).plan(&view);
        // 50 then 10 then 10; the last facility finds only 5 left.
        assert_eq!(actions.len(), 3);
        assert_eq!(total(&actions), 70);
    }

    #[test]
    fn test_crowded_facility_skipped_and_order_by_tile_biomass() {
        let config = ProductionConfig::default();
        let mut snap = snapshot(20, &[(0, 0), (1, 0), (2, 0)]);
        snap.grid.biomass_grid[0][0] = 150;
        snap.grid.biomass_grid[0][2] = 40;
        let view = WorldView::new(&snap).unwrap();
        let actions = ProductionPlanner::new(&config).plan(&view);
        let ids: Vec<&str> = actions
            .iter()
            .filter_map(|a| match a {
                Action::ProduceUnit { facility_id, .. } => Some(facility_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["f2", "f1"]);
    }

    #[test]
    fn test_population_cap() {
        let config = ProductionConfig {
            max_units: Some(1),
            ..ProductionConfig::default()
        };
        let snap = snapshot(500, &[(0, 0), (1, 0)]);
        let view = WorldView::new(&snap).unwrap();
        assert_eq!(ProductionPlanner::new(&config).plan(&view).len(), 1);
    }
}
