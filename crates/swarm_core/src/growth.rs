//! Division and facility conversion.
//!
//! Both are overrides: a unit that splits or converts spends its action
//! slot on that and does not move this tick.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::actions::Action;
use crate::components::{Direction, Unit};
use crate::config::GrowthConfig;
use crate::world_view::WorldView;

/// Biomass carried by the child of a split.
///
/// `biomass * percent / 100`, clamped so both halves keep at least one.
/// Returns `None` for units too small to divide.
#[must_use]
pub fn child_biomass(biomass: u32, percent: u32) -> Option<u32> {
    if biomass < 2 {
        return None;
    }
    let share = u64::from(biomass) * u64::from(percent) / 100;
    let share = u32::try_from(share).unwrap_or(u32::MAX);
    Some(share.clamp(1, biomass - 1))
}

/// The facility-zero bootstrap: a team without facilities converts its
/// first unit unconditionally.
#[must_use]
pub fn bootstrap(world: &WorldView<'_>) -> Option<Action> {
    if !world.facilities().is_empty() {
        return None;
    }
    world.units().first().map(|unit| Action::CreateFacility {
        unit_id: unit.id.clone(),
    })
}

/// Split and conversion eligibility.
#[derive(Debug, Clone, Copy)]
pub struct GrowthPlanner<'c> {
    config: &'c GrowthConfig,
}

impl<'c> GrowthPlanner<'c> {
    /// Create a planner.
    #[must_use]
    pub const fn new(config: &'c GrowthConfig) -> Self {
        Self { config }
    }

    /// Whether `unit` should become a facility on its tile.
    ///
    /// Requires the configured minimum biomass, biomass strictly above the
    /// team's next facility cost, and a tile free of facilities of any team.
    #[must_use]
    pub fn should_convert(&self, world: &WorldView<'_>, unit: &Unit) -> bool {
        unit.biomass >= self.config.conversion_min_biomass
            && unit.biomass > world.team().next_facility_cost
            && !world.has_facility(unit.position)
    }

    /// Maximum conversions per tick.
    #[must_use]
    pub const fn max_conversions(&self) -> usize {
        self.config.max_conversions_per_tick
    }

    /// A `Split` for `unit` if it is over the threshold and has room to
    /// eject a child. The direction is drawn from the legal ones.
    pub fn split<R: Rng + ?Sized>(
        &self,
        world: &WorldView<'_>,
        unit: &Unit,
        rng: &mut R,
    ) -> Option<Action> {
        if unit.biomass <= self.config.split_threshold {
            return None;
        }
        let child = child_biomass(unit.biomass, self.config.split_percent)?;

        let legal: Vec<Direction> = world.neighbours(unit.position).map(|(d, _)| d).collect();
        let Some(direction) = legal.choose(rng).copied() else {
            tracing::debug!(unit = %unit.id, "No room to split");
            return None;
        };

        Some(Action::Split {
            unit_id: unit.id.clone(),
            child_biomass: child,
            direction,
        })
    }
}
