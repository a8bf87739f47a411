//! # Swarm Core
//!
//! Deterministic per-tick decision engine for a grid territory game.
//!
//! Every tick the game hands us a [`WorldSnapshot`](snapshot::WorldSnapshot)
//! and expects back a list of [`Action`](actions::Action)s, at most one per
//! unit and one per facility. This crate contains **only** that decision
//! logic:
//! - No IO
//! - No system randomness (one seeded source, owned by the engine)
//! - No floating-point scoring (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`engine`] - The tick loop and its persistent state
//! - [`world_view`] - Bounds-checked access to the snapshot
//! - [`phase`] - EXPAND / CONVERGE / ATTACK classification
//! - [`production`] - Facility production budget
//! - [`targeting`] - Long-range target allocation
//! - [`stepping`] - Single-step movement
//! - [`growth`] - Division and facility conversion
//! - [`actions`] - Actions and the one-per-entity batch
//! - [`config`] - Tunable thresholds and weights

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod actions;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod growth;
pub mod math;
pub mod phase;
pub mod production;
pub mod snapshot;
pub mod stepping;
pub mod targeting;
pub mod world_view;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actions::{Action, ActionBatch};
    pub use crate::components::*;
    pub use crate::config::{EngineConfig, MovementMode};
    pub use crate::engine::DecisionEngine;
    pub use crate::error::{EngineError, Result};
    pub use crate::phase::Phase;
    pub use crate::snapshot::{GameConstants, WorldGrid, WorldSnapshot};
    pub use crate::world_view::WorldView;
}
