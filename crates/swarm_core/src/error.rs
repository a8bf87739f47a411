//! Error types for the decision engine.
//!
//! Errors only surface at construction boundaries (building a [`WorldView`]
//! or validating an [`EngineConfig`]). Once a tick is being decided every
//! failure is absorbed locally and the engine returns a smaller action batch.
//!
//! [`WorldView`]: crate::world_view::WorldView
//! [`EngineConfig`]: crate::config::EngineConfig

use thiserror::Error;

use crate::components::TeamId;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for the decision engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The snapshot declares a zero-sized grid.
    #[error("Grid has no cells ({width}x{height})")]
    EmptyGrid {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },

    /// One of the co-indexed grids does not match the declared dimensions.
    #[error("Malformed {grid} grid: expected {expected}, found {found}")]
    MalformedGrid {
        /// Which grid is malformed (`nutrient`, `biomass` or `ownership`).
        grid: &'static str,
        /// Expected row count or row length.
        expected: usize,
        /// Actual row count or row length.
        found: usize,
    },

    /// The snapshot's own team id has no roster entry.
    #[error("Unknown team: {0}")]
    UnknownTeam(TeamId),

    /// Configuration values are inconsistent.
    #[error("Invalid engine config: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be parsed.
    #[error("Failed to parse engine config: {0}")]
    ConfigParse(String),
}
