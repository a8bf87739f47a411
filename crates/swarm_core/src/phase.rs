//! Macro-strategy classification.
//!
//! [`classify`] is a pure function of the tick and population, re-evaluated
//! every tick. [`PhaseLatch`] optionally adds hysteresis on top of it so a
//! population dipping under the attack threshold does not immediately drop
//! the team out of ATTACK.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PhaseThresholds;

/// The team's macro-strategy for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Scatter and claim territory.
    #[default]
    Expand,
    /// Assemble around a shared rally point.
    Converge,
    /// Go after hostile tiles and facilities.
    Attack,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Expand => "EXPAND",
            Self::Converge => "CONVERGE",
            Self::Attack => "ATTACK",
        })
    }
}

/// Classify the phase from scratch.
///
/// CONVERGE is checked before ATTACK: a large team keeps assembling even
/// late in the game, while its strike group still goes out (see
/// [`strike_ready`]).
#[must_use]
pub fn classify(tick: u64, unit_count: usize, thresholds: &PhaseThresholds) -> Phase {
    if tick < thresholds.early_tick {
        return Phase::Expand;
    }
    if tick >= thresholds.mid_tick && unit_count > thresholds.converge_units {
        return Phase::Converge;
    }
    if strike_ready(tick, unit_count, thresholds) {
        return Phase::Attack;
    }
    Phase::Expand
}

/// Whether the ATTACK condition holds, whichever phase won.
#[must_use]
pub fn strike_ready(tick: u64, unit_count: usize, thresholds: &PhaseThresholds) -> bool {
    tick >= thresholds.early_tick
        && tick >= thresholds.late_tick
        && unit_count > thresholds.attack_units
}

/// Remembers the previous phase to hold ATTACK for a minimum duration.
#[derive(Debug, Clone, Default)]
pub struct PhaseLatch {
    current: Option<Phase>,
    attack_since: Option<u64>,
}

impl PhaseLatch {
    /// Create a latch with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase decided on the last call to [`update`](Self::update).
    #[must_use]
    pub fn current(&self) -> Option<Phase> {
        self.current
    }

    /// Classify `tick` and apply the ATTACK hold.
    pub fn update(&mut self, tick: u64, unit_count: usize, thresholds: &PhaseThresholds) -> Phase {
        let fresh = classify(tick, unit_count, thresholds);

        let held = match self.attack_since {
            Some(since) if fresh != Phase::Attack => {
                tick.saturating_sub(since) < thresholds.attack_hold_ticks
            }
            _ => false,
        };
        let phase = if held { Phase::Attack } else { fresh };

        match phase {
            Phase::Attack => {
                self.attack_since.get_or_insert(tick);
            }
            _ => self.attack_since = None,
        }

        if self.current != Some(phase) {
            tracing::info!(
                tick,
                unit_count,
                from = ?self.current,
                to = %phase,
                held,
                "Phase transition"
            );
        }
        self.current = Some(phase);
        phase
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> PhaseThresholds {
        PhaseThresholds {
            early_tick: 50,
            mid_tick: 100,
            converge_units: 12,
            late_tick: 200,
            attack_units: 10,
            attack_hold_ticks: 0,
        }
    }

    #[test]
    fn test_early_ticks_always_expand() {
        let t = thresholds();
        assert_eq!(classify(0, 100, &t), Phase::Expand);
        assert_eq!(classify(49, 100, &t), Phase::Expand);
    }

    #[test]
    fn test_converge_requires_tick_and_population() {
        let t = thresholds();
        assert_eq!(classify(100, 13, &t), Phase::Converge);
        assert_eq!(classify(100, 12, &t), Phase::Expand);
        assert_eq!(classify(99, 13, &t), Phase::Expand);
    }

    #[test]
    fn test_converge_wins_over_attack() {
        let t = thresholds();
        assert_eq!(classify(200, 11, &t), Phase::Attack);
        assert_eq!(classify(250, 13, &t), Phase::Converge);
        assert_eq!(classify(250, 30, &t), Phase::Converge);
        assert_eq!(classify(250, 10, &t), Phase::Expand);
    }

    #[test]
    fn test_default_late_large_team_converges() {
        let t = PhaseThresholds::default();
        assert_eq!(classify(250, 13, &t), Phase::Converge);
        assert!(strike_ready(250, 13, &t));
    }

    #[test]
    fn test_strike_ready_follows_attack_condition() {
        let t = thresholds();
        assert!(strike_ready(200, 11, &t));
        assert!(strike_ready(300, 40, &t));
        assert!(!strike_ready(199, 40, &t));
        assert!(!strike_ready(300, 10, &t));
    }

    #[test]
    fn test_latch_without_hold_follows_classifier() {
        let t = thresholds();
        let mut latch = PhaseLatch::new();
        assert_eq!(latch.update(200, 11, &t), Phase::Attack);
        assert_eq!(latch.update(201, 9, &t), Phase::Expand);
        assert_eq!(latch.current(), Some(Phase::Expand));
    }

    #[test]
    fn test_latch_holds_attack() {
        let mut t = thresholds();
        t.attack_hold_ticks = 5;
        let mut latch = PhaseLatch::new();
        assert_eq!(latch.update(200, 11, &t), Phase::Attack);
        assert_eq!(latch.update(203, 5, &t), Phase::Attack);
        assert_eq!(latch.update(204, 5, &t), Phase::Attack);
        assert_eq!(latch.update(205, 5, &t), Phase::Expand);
        // Re-entering restarts the hold.
        assert_eq!(latch.update(206, 11, &t), Phase::Attack);
        assert_eq!(latch.update(207, 0, &t), Phase::Attack);
    }

    #[test]
    fn test_reset_forgets_hold() {
        let mut t = thresholds();
        t.attack_hold_ticks = 100;
        let mut latch = PhaseLatch::new();
        latch.update(200, 11, &t);
        latch.reset();
        assert_eq!(latch.update(201, 0, &t), Phase::Expand);
    }
}
