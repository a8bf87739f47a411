//! Read-only, bounds-checked access to one tick's world state.
//!
//! [`WorldView`] validates the snapshot's grids once on construction so
//! every lookup after that is a cheap bounds check plus an index. Lookups
//! outside the grid return `None`; nothing in the engine indexes a grid
//! without going through here.

use std::collections::BTreeSet;

use crate::components::{Direction, Facility, Position, Team, TeamId, Unit};
use crate::error::{EngineError, Result};
use crate::snapshot::WorldSnapshot;

/// Ownership of a tile relative to our team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Nobody controls the tile.
    Neutral,
    /// Our team controls the tile.
    Own,
    /// Another team controls the tile.
    Hostile,
}

/// Snapshot of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Tile coordinate.
    pub position: Position,
    /// Static resource value.
    pub nutrients: u32,
    /// Occupying biomass.
    pub biomass: u32,
    /// Controller relative to us.
    pub owner: Owner,
}

impl Cell {
    /// Whether another team controls the tile.
    #[must_use]
    pub const fn is_hostile(&self) -> bool {
        matches!(self.owner, Owner::Hostile)
    }

    /// Whether nobody controls the tile.
    #[must_use]
    pub const fn is_neutral(&self) -> bool {
        matches!(self.owner, Owner::Neutral)
    }

    /// Whether our team controls the tile.
    #[must_use]
    pub const fn is_own(&self) -> bool {
        matches!(self.owner, Owner::Own)
    }
}

/// Validated read-only view over a [`WorldSnapshot`].
#[derive(Debug, Clone)]
pub struct WorldView<'a> {
    snapshot: &'a WorldSnapshot,
    team: &'a Team,
    width: i32,
    height: i32,
    facility_tiles: BTreeSet<Position>,
    hostile_facility_tiles: BTreeSet<Position>,
}

impl<'a> WorldView<'a> {
    /// Validate `snapshot` and build a view for its own team.
    ///
    /// Fails when the grid is empty, any grid's shape disagrees with the
    /// declared dimensions, or our team has no roster entry.
    pub fn new(snapshot: &'a WorldSnapshot) -> Result<Self> {
        let grid = &snapshot.grid;
        if grid.width == 0 || grid.height == 0 {
            return Err(EngineError::EmptyGrid {
                width: grid.width,
                height: grid.height,
            });
        }

        let width = grid.width as usize;
        let height = grid.height as usize;
        check_shape("nutrient", &grid.nutrient_grid, width, height)?;
        check_shape("biomass", &grid.biomass_grid, width, height)?;
        check_shape("ownership", &grid.ownership_grid, width, height)?;

        let team = snapshot
            .own_team()
            .ok_or_else(|| EngineError::UnknownTeam(snapshot.your_team_id.clone()))?;

        let facility_tiles = snapshot.all_facilities().map(|f| f.position).collect();
        let hostile_facility_tiles = snapshot
            .all_facilities()
            .filter(|f| f.team_id != team.id)
            .map(|f| f.position)
            .collect();

        Ok(Self {
            snapshot,
            team,
            width: i32::try_from(grid.width).unwrap_or(i32::MAX),
            height: i32::try_from(grid.height).unwrap_or(i32::MAX),
            facility_tiles,
            hostile_facility_tiles,
        })
    }

    /// Current tick.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.snapshot.tick
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Our team.
    #[must_use]
    pub const fn team(&self) -> &'a Team {
        self.team
    }

    /// Our team id.
    #[must_use]
    pub fn team_id(&self) -> &'a TeamId {
        &self.team.id
    }

    /// Our units in roster order.
    #[must_use]
    pub fn units(&self) -> &'a [Unit] {
        &self.team.units
    }

    /// Our facilities in roster order.
    #[must_use]
    pub fn facilities(&self) -> &'a [Facility] {
        &self.team.facilities
    }

    /// Check if a position lies on the grid.
    #[must_use]
    pub const fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    /// Nutrient value at `pos`, `None` if out of bounds.
    #[must_use]
    pub fn nutrients(&self, pos: Position) -> Option<u32> {
        self.index(pos).map(|(x, y)| self.snapshot.grid.nutrient_grid[y][x])
    }

    /// Biomass at `pos`, `None` if out of bounds.
    #[must_use]
    pub fn biomass(&self, pos: Position) -> Option<u32> {
        self.index(pos).map(|(x, y)| self.snapshot.grid.biomass_grid[y][x])
    }

    /// Ownership of `pos` relative to us, `None` if out of bounds.
    #[must_use]
    pub fn owner(&self, pos: Position) -> Option<Owner> {
        self.index(pos).map(|(x, y)| {
            let raw = &self.snapshot.grid.ownership_grid[y][x];
            if *raw == self.team.id {
                Owner::Own
            } else if *raw == self.snapshot.constants.neutral_team_id {
                Owner::Neutral
            } else {
                Owner::Hostile
            }
        })
    }

    /// Everything known about one tile, `None` if out of bounds.
    #[must_use]
    pub fn cell(&self, pos: Position) -> Option<Cell> {
        let (x, y) = self.index(pos)?;
        let grid = &self.snapshot.grid;
        Some(Cell {
            position: pos,
            nutrients: grid.nutrient_grid[y][x],
            biomass: grid.biomass_grid[y][x],
            owner: self.owner(pos)?,
        })
    }

    /// Every tile in scan order: rows top to bottom, columns left to right.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| Position::new(x, y)))
            .filter_map(move |pos| self.cell(pos))
    }

    /// In-bounds cardinal neighbours of `pos`, in [`Direction::ALL`] order.
    pub fn neighbours(&self, pos: Position) -> impl Iterator<Item = (Direction, Position)> + '_ {
        Direction::ALL
            .into_iter()
            .map(move |d| (d, pos.step(d)))
            .filter(move |(_, next)| self.in_bounds(*next))
    }

    /// Whether any team's facility occupies `pos`.
    #[must_use]
    pub fn has_facility(&self, pos: Position) -> bool {
        self.facility_tiles.contains(&pos)
    }

    /// Whether another team's facility occupies `pos`.
    #[must_use]
    pub fn has_hostile_facility(&self, pos: Position) -> bool {
        self.hostile_facility_tiles.contains(&pos)
    }

    /// Whether one of our facilities lies within Chebyshev `radius` of `pos`.
    #[must_use]
    pub fn near_own_facility(&self, pos: Position, radius: i32) -> bool {
        self.team
            .facilities
            .iter()
            .any(|f| f.position.chebyshev(pos) <= radius)
    }

    /// Whether one of our facilities sits exactly on `pos`.
    #[must_use]
    pub fn is_own_facility(&self, pos: Position) -> bool {
        self.team.facilities.iter().any(|f| f.position == pos)
    }

    fn index(&self, pos: Position) -> Option<(usize, usize)> {
        if self.in_bounds(pos) {
            // Both coordinates are non-negative after the bounds check.
            Some((pos.x as usize, pos.y as usize))
        } else {
            None
        }
    }
}

fn check_shape<T>(name: &'static str, rows: &[Vec<T>], width: usize, height: usize) -> Result<()> {
    if rows.len() != height {
        return Err(EngineError::MalformedGrid {
            grid: name,
            expected: height,
            found: rows.len(),
        });
    }
    if let Some(row) = rows.iter().find(|row| row.len() != width) {
        return Err(EngineError::MalformedGrid {
            grid: name,
            expected: width,
            found: row.len(),
        });
    }
    Ok(())
}
