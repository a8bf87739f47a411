//! Actions and the batch that enforces one action per entity.
//!
//! [`ActionBatch`] is the only way actions leave the engine. It records
//! every unit and facility id that already acted this tick, and every
//! `MoveTo` destination, and refuses a second entry for any of them. The
//! one-action-per-entity rule therefore holds no matter what order the
//! planners run in.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::{Direction, FacilityId, Position, UnitId};

/// A command for one unit or facility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Action {
    /// Convert a unit into a facility on its tile.
    CreateFacility {
        /// Converted unit.
        unit_id: UnitId,
    },
    /// Spend pool to produce a unit carrying `biomass`.
    ProduceUnit {
        /// Producing facility.
        facility_id: FacilityId,
        /// Biomass of the new unit, equal to the pool spent.
        biomass: u32,
    },
    /// Long-range move handled by the game's own mover.
    MoveTo {
        /// Moving unit.
        unit_id: UnitId,
        /// Destination cell.
        position: Position,
    },
    /// Single cardinal step.
    Step {
        /// Moving unit.
        unit_id: UnitId,
        /// Step direction.
        direction: Direction,
    },
    /// Divide, ejecting a child one tile away.
    Split {
        /// Dividing unit.
        unit_id: UnitId,
        /// Biomass carried by the child.
        child_biomass: u32,
        /// Where the child goes.
        direction: Direction,
    },
}

impl Action {
    /// The acting entity.
    #[must_use]
    pub fn actor(&self) -> Actor<'_> {
        match self {
            Self::CreateFacility { unit_id }
            | Self::MoveTo { unit_id, .. }
            | Self::Step { unit_id, .. }
            | Self::Split { unit_id, .. } => Actor::Unit(unit_id),
            Self::ProduceUnit { facility_id, .. } => Actor::Facility(facility_id),
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateFacility { .. } => "create_facility",
            Self::ProduceUnit { .. } => "produce_unit",
            Self::MoveTo { .. } => "move_to",
            Self::Step { .. } => "step",
            Self::Split { .. } => "split",
        }
    }
}

/// Entity that performs an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor<'a> {
    /// A mobile unit.
    Unit(&'a UnitId),
    /// A facility.
    Facility(&'a FacilityId),
}

/// Ordered, duplicate-free action list for one tick.
#[derive(Debug, Clone, Default)]
pub struct ActionBatch {
    actions: Vec<Action>,
    units: BTreeSet<UnitId>,
    facilities: BTreeSet<FacilityId>,
    destinations: BTreeSet<Position>,
}

impl ActionBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `unit` already acted this tick.
    #[must_use]
    pub fn unit_consumed(&self, unit: &UnitId) -> bool {
        self.units.contains(unit)
    }

    /// Whether `facility` already acted this tick.
    #[must_use]
    pub fn facility_consumed(&self, facility: &FacilityId) -> bool {
        self.facilities.contains(facility)
    }

    /// Append `action` unless its actor already acted, or it is a `MoveTo`
    /// onto a destination another unit already moves to.
    ///
    /// Returns whether the action was accepted.
    pub fn push(&mut self, action: Action) -> bool {
        if let Action::MoveTo { position, .. } = &action {
            if self.destinations.contains(position) {
                tracing::warn!(%position, "Rejected duplicate move destination");
                return false;
            }
        }

        let fresh = match action.actor() {
            Actor::Unit(id) => !self.units.contains(id),
            Actor::Facility(id) => !self.facilities.contains(id),
        };
        if !fresh {
            tracing::warn!(action = action.name(), "Rejected second action for entity");
            return false;
        }

        match action.actor() {
            Actor::Unit(id) => {
                self.units.insert(id.clone());
            }
            Actor::Facility(id) => {
                self.facilities.insert(id.clone());
            }
        }
        if let Action::MoveTo { position, .. } = &action {
            self.destinations.insert(*position);
        }
        self.actions.push(action);
        true
    }

    /// Mark a unit as handled without emitting anything (it holds position).
    ///
    /// Returns `false` if the unit had already acted.
    pub fn hold(&mut self, unit: &UnitId) -> bool {
        self.units.insert(unit.clone())
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no action was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Accepted actions in emission order.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Consume the batch.
    #[must_use]
    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }
}
