//! Entity and grid coordinate definitions.
//!
//! Components are pure data with no behavior beyond small geometric
//! helpers. Identifiers are the game's string ids wrapped in newtypes so a
//! unit id can never be handed to something expecting a facility id.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw id.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Unique identifier for mobile units.
    UnitId
);
string_id!(
    /// Unique identifier for facilities (spawners).
    FacilityId
);
string_id!(
    /// Unique identifier for teams. The neutral sentinel is also a `TeamId`.
    TeamId
);

// ============================================================================
// Grid geometry
// ============================================================================

/// Grid coordinate. Valid cells satisfy `0 <= x < width` and `0 <= y < height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance, the movement metric of the grid.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Chebyshev distance, used for "close enough" radii.
    #[must_use]
    pub fn chebyshev(self, other: Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// The neighbouring position one step in `direction`.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four cardinal moves.
///
/// On the wire a direction is a unit vector `{x, y}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Position", try_from = "Position")]
pub enum Direction {
    /// `y - 1`.
    Up,
    /// `y + 1`.
    Down,
    /// `x - 1`.
    Left,
    /// `x + 1`.
    Right,
}

impl Direction {
    /// All directions in evaluation order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Offset applied to a position.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// The direction that undoes this one.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl From<Direction> for Position {
    fn from(direction: Direction) -> Self {
        let (x, y) = direction.delta();
        Self { x, y }
    }
}

impl TryFrom<Position> for Direction {
    type Error = String;

    fn try_from(vector: Position) -> Result<Self, Self::Error> {
        match (vector.x, vector.y) {
            (0, -1) => Ok(Self::Up),
            (0, 1) => Ok(Self::Down),
            (-1, 0) => Ok(Self::Left),
            (1, 0) => Ok(Self::Right),
            (x, y) => Err(format!("({x}, {y}) is not a cardinal unit vector")),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A mobile, biomass-carrying entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// Unit identifier.
    pub id: UnitId,
    /// Current cell.
    pub position: Position,
    /// Combat and resource weight.
    pub biomass: u32,
    /// Owning team.
    pub team_id: TeamId,
}

/// A stationary production structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    /// Facility identifier.
    pub id: FacilityId,
    /// Occupied cell.
    pub position: Position,
    /// Owning team.
    pub team_id: TeamId,
}

/// A team's roster and resource counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Team identifier.
    pub id: TeamId,
    /// Spendable resources.
    pub resource_pool: u32,
    /// Mobile units in roster order.
    #[serde(default)]
    pub units: Vec<Unit>,
    /// Facilities in roster order.
    #[serde(default)]
    pub facilities: Vec<Facility>,
    /// Biomass a unit must strictly exceed to convert into a facility.
    pub next_facility_cost: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distances() {
        let a = Position::new(1, 2);
        let b = Position::new(4, -2);
        assert_eq!(a.manhattan(b), 7);
        assert_eq!(a.chebyshev(b), 4);
    }

    #[test]
    fn test_step_and_opposite() {
        let origin = Position::new(5, 5);
        for direction in Direction::ALL {
            assert_eq!(origin.step(direction).step(direction.opposite()), origin);
        }
    }

    #[test]
    fn test_direction_vector_conversion() {
        assert_eq!(Direction::try_from(Position::new(1, 0)), Ok(Direction::Right));
        assert!(Direction::try_from(Position::new(1, 1)).is_err());
        assert_eq!(Position::from(Direction::Up), Position::new(0, -1));
    }
}
