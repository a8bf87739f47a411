//! Test fixtures and helpers.
//!
//! [`SnapshotBuilder`] assembles consistent snapshots without spelling out
//! three grids and a roster by hand. Our team is always `"me"`, the neutral
//! sentinel is `"neutral"`.

use std::collections::BTreeMap;

use swarm_core::components::{Facility, FacilityId, Position, Team, TeamId, Unit, UnitId};
use swarm_core::snapshot::{GameConstants, WorldGrid, WorldSnapshot};

/// Id of the team the engine plays for in fixtures.
pub const OWN_TEAM: &str = "me";

/// Id of the default opposing team in fixtures.
pub const ENEMY_TEAM: &str = "them";

/// Neutral ownership sentinel used by fixtures.
pub const NEUTRAL: &str = "neutral";

/// Fluent builder for [`WorldSnapshot`]s.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    tick: u64,
    grid: WorldGrid,
    teams: BTreeMap<TeamId, Team>,
}

impl SnapshotBuilder {
    /// An empty `width` x `height` world with our team and nothing else.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let neutral = TeamId::new(NEUTRAL);
        let mut builder = Self {
            tick: 0,
            grid: WorldGrid::empty(width, height, &neutral),
            teams: BTreeMap::new(),
        };
        builder.team_mut(OWN_TEAM);
        builder
    }

    /// Set the tick number.
    #[must_use]
    pub fn tick(mut self, tick: u64) -> Self {
        self.tick = tick;
        self
    }

    /// Set our team's resource pool.
    #[must_use]
    pub fn pool(mut self, pool: u32) -> Self {
        self.team_mut(OWN_TEAM).resource_pool = pool;
        self
    }

    /// Set our team's next facility cost.
    #[must_use]
    pub fn facility_cost(mut self, cost: u32) -> Self {
        self.team_mut(OWN_TEAM).next_facility_cost = cost;
        self
    }

    /// Set the nutrients of one tile.
    #[must_use]
    pub fn nutrients(mut self, x: usize, y: usize, value: u32) -> Self {
        self.grid.nutrient_grid[y][x] = value;
        self
    }

    /// Give one tile to `team` with `biomass` on it.
    #[must_use]
    pub fn owned(mut self, x: usize, y: usize, team: &str, biomass: u32) -> Self {
        self.grid.ownership_grid[y][x] = TeamId::new(team);
        self.grid.biomass_grid[y][x] = biomass;
        self
    }

    /// Add a unit to our team. Its tile becomes ours and carries its biomass.
    #[must_use]
    pub fn unit(self, id: &str, x: i32, y: i32, biomass: u32) -> Self {
        self.team_unit(OWN_TEAM, id, x, y, biomass)
    }

    /// Add a facility to our team.
    #[must_use]
    pub fn facility(self, id: &str, x: i32, y: i32) -> Self {
        self.team_facility(OWN_TEAM, id, x, y)
    }

    /// Add a unit to any team.
    #[must_use]
    pub fn team_unit(mut self, team: &str, id: &str, x: i32, y: i32, biomass: u32) -> Self {
        if let (Ok(col), Ok(row)) = (usize::try_from(x), usize::try_from(y)) {
            if row < self.grid.biomass_grid.len() && col < self.grid.biomass_grid[row].len() {
                self.grid.ownership_grid[row][col] = TeamId::new(team);
                self.grid.biomass_grid[row][col] += biomass;
            }
        }
        let team_id = TeamId::new(team);
        self.team_mut(team).units.push(Unit {
            id: UnitId::new(id),
            position: Position::new(x, y),
            biomass,
            team_id,
        });
        self
    }

    /// Add a facility to any team.
    #[must_use]
    pub fn team_facility(mut self, team: &str, id: &str, x: i32, y: i32) -> Self {
        let team_id = TeamId::new(team);
        self.team_mut(team).facilities.push(Facility {
            id: FacilityId::new(id),
            position: Position::new(x, y),
            team_id,
        });
        self
    }

    /// Finish the snapshot.
    #[must_use]
    pub fn build(self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            your_team_id: TeamId::new(OWN_TEAM),
            grid: self.grid,
            teams: self.teams,
            constants: GameConstants {
                neutral_team_id: TeamId::new(NEUTRAL),
                max_ticks: None,
            },
        }
    }

    fn team_mut(&mut self, team: &str) -> &mut Team {
        let id = TeamId::new(team);
        self.teams.entry(id.clone()).or_insert_with(|| Team {
            id,
            resource_pool: 0,
            units: Vec::new(),
            facilities: Vec::new(),
            next_facility_cost: 50,
        })
    }
}

/// The 10x10 reference world: one unit at (0, 0), one facility, a single
/// nutrient tile at (7, 7).
#[must_use]
pub fn lone_unit_world() -> WorldSnapshot {
    SnapshotBuilder::new(10, 10)
        .tick(1)
        .pool(5)
        .nutrients(7, 7, 5)
        .unit("u1", 0, 0, 5)
        .facility("f1", 9, 0)
        .build()
}

/// A busier world: two teams, scattered nutrients and a roster large
/// enough to reach CONVERGE and ATTACK at late ticks.
#[must_use]
pub fn skirmish_world(tick: u64) -> WorldSnapshot {
    let mut builder = SnapshotBuilder::new(24, 24).tick(tick).pool(180);
    for i in 0..24 {
        builder = builder.nutrients((i * 7) % 24, (i * 5) % 24, 3 + (i as u32 % 9) * 3);
    }
    for i in 0..14_i32 {
        builder = builder.unit(&format!("u{i}"), (i * 3) % 12, (i * 2) % 12, 5 + (i as u32 % 4) * 6);
    }
    for i in 0..6_i32 {
        builder = builder.team_unit(ENEMY_TEAM, &format!("e{i}"), 20 - i, 18 + i % 3, 8 + i as u32);
    }
    builder
        .facility("f1", 2, 2)
        .facility("f2", 10, 4)
        .team_facility(ENEMY_TEAM, "ef1", 21, 21)
        .owned(21, 21, ENEMY_TEAM, 40)
        .build()
}
