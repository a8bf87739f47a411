//! World snapshot delivered once per tick.
//!
//! The snapshot is produced by the transport layer. The engine treats it as
//! immutable input and never writes back into it. Field names follow the
//! game's camelCase wire format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{Facility, Team, TeamId};

/// Three co-indexed dense grids, indexed `[y][x]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldGrid {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Static per-tile resource value.
    pub nutrient_grid: Vec<Vec<u32>>,
    /// Biomass currently occupying each tile.
    pub biomass_grid: Vec<Vec<u32>>,
    /// Controlling team of each tile, or the neutral sentinel.
    pub ownership_grid: Vec<Vec<TeamId>>,
}

impl WorldGrid {
    /// Create a grid of the given size, all tiles empty and owned by `neutral`.
    #[must_use]
    pub fn empty(width: u32, height: u32, neutral: &TeamId) -> Self {
        let w = width as usize;
        let h = height as usize;
        Self {
            width,
            height,
            nutrient_grid: vec![vec![0; w]; h],
            biomass_grid: vec![vec![0; w]; h],
            ownership_grid: vec![vec![neutral.clone(); w]; h],
        }
    }
}

/// Global game constants carried with every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConstants {
    /// Ownership value of tiles nobody controls.
    pub neutral_team_id: TeamId,
    /// Length of the game, if the server announces it.
    #[serde(default)]
    pub max_ticks: Option<u64>,
}

/// Full world state for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    /// Current tick number.
    pub tick: u64,
    /// The team this engine plays for.
    pub your_team_id: TeamId,
    /// Tile contents.
    pub grid: WorldGrid,
    /// Every team's roster, keyed by id.
    pub teams: BTreeMap<TeamId, Team>,
    /// Global constants.
    pub constants: GameConstants,
}

impl WorldSnapshot {
    /// Our own team, if present.
    #[must_use]
    pub fn own_team(&self) -> Option<&Team> {
        self.teams.get(&self.your_team_id)
    }

    /// All facilities of every team, in team-id then roster order.
    pub fn all_facilities(&self) -> impl Iterator<Item = &Facility> + '_ {
        self.teams.values().flat_map(|team| team.facilities.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Position;

    const WIRE: &str = r#"{
        "tick": 12,
        "yourTeamId": "blue",
        "grid": {
            "width": 2,
            "height": 1,
            "nutrientGrid": [[3, 0]],
            "biomassGrid": [[0, 7]],
            "ownershipGrid": [["blue", "NEUTRAL"]]
        },
        "teams": {
            "blue": {
                "id": "blue",
                "resourcePool": 40,
                "units": [{"id": "s1", "position": {"x": 0, "y": 0}, "biomass": 6, "teamId": "blue"}],
                "facilities": [],
                "nextFacilityCost": 30
            },
            "red": {
                "id": "red",
                "resourcePool": 0,
                "units": [],
                "facilities": [{"id": "f9", "position": {"x": 1, "y": 0}, "teamId": "red"}],
                "nextFacilityCost": 30
            }
        },
        "constants": {"neutralTeamId": "NEUTRAL"}
    }"#;

    #[test]
    fn test_wire_snapshot_parses() {
        let snap: WorldSnapshot = serde_json::from_str(WIRE).unwrap();
        assert_eq!(snap.tick, 12);
        assert_eq!(snap.grid.nutrient_grid[0][0], 3);
        assert_eq!(snap.constants.max_ticks, None);

        let own = snap.own_team().unwrap();
        assert_eq!(own.resource_pool, 40);
        assert_eq!(own.units[0].position, Position::new(0, 0));
    }

    #[test]
    fn test_all_facilities_spans_teams() {
        let snap: WorldSnapshot = serde_json::from_str(WIRE).unwrap();
        let ids: Vec<&str> = snap.all_facilities().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["f9"]);
    }
}
