//! Engine configuration.
//!
//! Every threshold and weight the engine uses lives here so behaviour can
//! be tuned from a RON file without touching the algorithms. All structs
//! are `#[serde(default)]`, so a config file only needs the fields it
//! changes.
//!
//! ```ron
//! (
//!     phase: (late_tick: 300, attack_units: 20),
//!     growth: (split_threshold: 40),
//!     movement: SingleStep,
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Macro-strategy thresholds.
    pub phase: PhaseThresholds,
    /// Facility production budget.
    pub production: ProductionConfig,
    /// Division and facility conversion.
    pub growth: GrowthConfig,
    /// Target scoring weights.
    pub targeting: TargetingWeights,
    /// Single-step cost function weights.
    pub stepping: StepWeights,
    /// How a resolved target becomes an action.
    pub movement: MovementMode,
    /// Seed for the engine's random source.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            phase: PhaseThresholds::default(),
            production: ProductionConfig::default(),
            growth: GrowthConfig::default(),
            targeting: TargetingWeights::default(),
            stepping: StepWeights::default(),
            movement: MovementMode::default(),
            seed: 0x5EED_C0DE,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a RON document.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let mut config: Self =
            ron::from_str(ron).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| EngineError::ConfigParse(e.to_string()))
    }

    /// Check internal consistency and normalise tier order.
    pub fn validate(&mut self) -> Result<()> {
        let tiers = &mut self.production.tiers;
        if tiers.is_empty() {
            return Err(EngineError::InvalidConfig(
                "production.tiers must not be empty".to_string(),
            ));
        }
        if let Some(tier) = tiers.iter().find(|t| t.biomass == 0 || t.biomass > t.min_pool) {
            return Err(EngineError::InvalidConfig(format!(
                "production tier {{min_pool: {}, biomass: {}}} must grant between 1 and min_pool biomass",
                tier.min_pool, tier.biomass
            )));
        }
        tiers.sort_by_key(|t| t.min_pool);

        if !(1..=99).contains(&self.growth.split_percent) {
            return Err(EngineError::InvalidConfig(format!(
                "growth.split_percent must be within 1..=99, got {}",
                self.growth.split_percent
            )));
        }
        if self.targeting.wall_exclusion_count == 0 {
            return Err(EngineError::InvalidConfig(
                "targeting.wall_exclusion_count must be at least 1".to_string(),
            ));
        }
        let rally = &mut self.targeting.rally;
        if rally.spread < rally.hold_radius {
            return Err(EngineError::InvalidConfig(format!(
                "targeting.rally.spread ({}) must be at least hold_radius ({})",
                rally.spread, rally.hold_radius
            )));
        }
        rally
            .bands
            .sort_by(|a, b| b.min_nutrients.cmp(&a.min_nutrients));
        Ok(())
    }
}

// ============================================================================
// Phase
// ============================================================================

/// Thresholds for phase classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseThresholds {
    /// Before this tick the team always expands.
    pub early_tick: u64,
    /// From this tick a large enough population converges.
    pub mid_tick: u64,
    /// Population that must be exceeded to converge.
    pub converge_units: usize,
    /// From this tick a large enough population attacks.
    pub late_tick: u64,
    /// Population that must be exceeded to attack.
    pub attack_units: usize,
    /// Minimum ticks to stay in ATTACK once entered. Zero disables hysteresis.
    pub attack_hold_ticks: u64,
}

impl Default for PhaseThresholds {
    fn default() -> Self {
        Self {
            early_tick: 50,
            mid_tick: 100,
            converge_units: 12,
            late_tick: 200,
            attack_units: 10,
            attack_hold_ticks: 0,
        }
    }
}

// ============================================================================
// Production
// ============================================================================

/// One step of the production ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionTier {
    /// Pool the team must hold before this tier is used.
    pub min_pool: u32,
    /// Biomass granted to the new unit. Costs the same amount of pool.
    pub biomass: u32,
}

impl ProductionTier {
    /// Create a new tier.
    #[must_use]
    pub const fn new(min_pool: u32, biomass: u32) -> Self {
        Self { min_pool, biomass }
    }
}

/// Production budget settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionConfig {
    /// Tiers sorted ascending by `min_pool` after validation.
    pub tiers: Vec<ProductionTier>,
    /// Skip facilities whose tile already holds this much biomass.
    pub crowded_tile_biomass: Option<u32>,
    /// Stop producing once the roster reaches this size.
    pub max_units: Option<usize>,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                ProductionTier::new(10, 10),
                ProductionTier::new(50, 50),
                ProductionTier::new(100, 100),
                ProductionTier::new(200, 200),
            ],
            crowded_tile_biomass: Some(100),
            max_units: None,
        }
    }
}

// ============================================================================
// Growth
// ============================================================================

/// Division and facility conversion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Units with biomass strictly above this split.
    pub split_threshold: u32,
    /// Share of biomass carried by the ejected child, in percent.
    pub split_percent: u32,
    /// Minimum biomass before a unit considers converting into a facility.
    pub conversion_min_biomass: u32,
    /// Conversions allowed per tick, not counting the bootstrap.
    pub max_conversions_per_tick: usize,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            split_threshold: 30,
            split_percent: 50,
            conversion_min_biomass: 100,
            max_conversions_per_tick: 1,
        }
    }
}

// ============================================================================
// Targeting
// ============================================================================

/// Target scoring weights shared by every role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingWeights {
    /// A unit this close (Chebyshev) to its target gets a new one.
    pub retarget_radius: i32,
    /// Non-own neighbour biomass that counts as a wall.
    pub wall_biomass: u32,
    /// Walled cardinal sides at which a cell is unreachable.
    pub wall_exclusion_count: usize,
    /// Penalty per walled side below the exclusion count.
    pub wall_penalty: i64,
    /// Radius inside which an unwinnable but valuable cell is still allowed.
    pub close_radius: i32,
    /// Nutrients that make an unwinnable close cell worth the attempt.
    pub valuable_nutrients: u32,
    /// Radius (Chebyshev) around own facilities that is discouraged.
    pub own_facility_radius: i32,
    /// Penalty for cells near own facilities outside ATTACK.
    pub own_facility_penalty: i64,
    /// Random cells drawn when no candidate scores.
    pub fallback_attempts: u32,
    /// Resource-seeking role.
    pub resource: ResourceWeights,
    /// Combat-seeking role.
    pub combat: CombatWeights,
    /// Territory-spreading role.
    pub spread: SpreadWeights,
    /// CONVERGE rally point.
    pub rally: RallyConfig,
    /// ATTACK strike group.
    pub strike: StrikeConfig,
}

impl Default for TargetingWeights {
    fn default() -> Self {
        Self {
            retarget_radius: 1,
            wall_biomass: 60,
            wall_exclusion_count: 3,
            wall_penalty: 30,
            close_radius: 5,
            valuable_nutrients: 10,
            own_facility_radius: 3,
            own_facility_penalty: 500,
            fallback_attempts: 16,
            resource: ResourceWeights::default(),
            combat: CombatWeights::default(),
            spread: SpreadWeights::default(),
            rally: RallyConfig::default(),
            strike: StrikeConfig::default(),
        }
    }
}

/// Resource role: nutrients per tile of travel, in three distance bands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceWeights {
    /// Upper bound (inclusive) of the near band.
    pub near_radius: i32,
    /// Upper bound (inclusive) of the middle band.
    pub mid_radius: i32,
    /// Nutrient weights for near, middle and far bands.
    pub nutrient_weight: [i64; 3],
    /// Capture cost weights for near, middle and far bands.
    pub cost_weight: [i64; 3],
    /// Bonus for tiles we do not own yet.
    pub unowned_bonus: i64,
}

impl Default for ResourceWeights {
    fn default() -> Self {
        Self {
            near_radius: 10,
            mid_radius: 20,
            nutrient_weight: [15_000, 8_000, 3_000],
            cost_weight: [3, 5, 15],
            unowned_bonus: 5,
        }
    }
}

/// Combat role: cheap hostile tiles worth taking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatWeights {
    /// Weight of nutrients over capture cost.
    pub nutrient_weight: i64,
    /// Penalty per tile of travel.
    pub distance_weight: i64,
    /// Hostile tiles at or below this biomass are nearly free.
    pub weak_tile_biomass: u32,
    /// Bonus for nearly free hostile tiles.
    pub weak_bonus: i64,
    /// Bonus for a hostile facility tile.
    pub facility_bonus: i64,
    /// Extra bonus for every hostile tile during ATTACK.
    pub attack_phase_bonus: i64,
}

impl Default for CombatWeights {
    fn default() -> Self {
        Self {
            nutrient_weight: 5_000,
            distance_weight: 2,
            weak_tile_biomass: 2,
            weak_bonus: 2_000,
            facility_bonus: 3_000,
            attack_phase_bonus: 1_000,
        }
    }
}

/// Spread role: cheap neutral territory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadWeights {
    /// Base score of a neutral tile.
    pub base: i64,
    /// Penalty per unit of capture cost.
    pub cost_weight: i64,
    /// Penalty per tile of travel.
    pub distance_weight: i64,
}

impl Default for SpreadWeights {
    fn default() -> Self {
        Self {
            base: 2_000,
            cost_weight: 50,
            distance_weight: 10,
        }
    }
}

/// Rally point selection and assembly during CONVERGE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RallyConfig {
    /// Tiles poorer than this are never rally points.
    pub min_nutrients: u32,
    /// A tile with this many units within two tiles is already taken.
    pub crowd_limit: usize,
    /// Hostile tiles must hold less than this share of combined biomass.
    pub combined_strength_percent: i64,
    /// Mean Manhattan distance beyond which a tile is too far.
    pub max_distance: i32,
    /// Biomass of a non-own sample that blocks the approach.
    pub wall_biomass: u32,
    /// Penalty per blocked approach sample.
    pub wall_penalty: i64,
    /// Units this close (Chebyshev) to the rally point hold position.
    pub hold_radius: i32,
    /// Assembly cells lie within this radius (Chebyshev) of the rally point.
    pub spread: i32,
    /// Radius (Chebyshev) in which units count towards `crowd_limit`.
    pub crowd_radius: i32,
    /// Points sampled on the approach from the units' centroid.
    pub wall_samples: i64,
    /// Score multipliers by nutrient value, richest band first after validation.
    pub bands: Vec<NutrientBand>,
    /// Mean distance at or under which the score is multiplied again.
    pub near_distance: i32,
    /// Multiplier for near rally points, in percent.
    pub near_factor_percent: i64,
}

impl Default for RallyConfig {
    fn default() -> Self {
        Self {
            min_nutrients: 3,
            crowd_limit: 3,
            combined_strength_percent: 80,
            max_distance: 40,
            wall_biomass: 70,
            wall_penalty: 30,
            hold_radius: 2,
            spread: 4,
            crowd_radius: 2,
            wall_samples: 3,
            bands: vec![
                NutrientBand::new(20, 800),
                NutrientBand::new(15, 500),
                NutrientBand::new(10, 300),
                NutrientBand::new(7, 150),
            ],
            near_distance: 20,
            near_factor_percent: 200,
        }
    }
}

/// Score multiplier for rally points holding at least `min_nutrients`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutrientBand {
    /// Lower bound (inclusive) of the band.
    pub min_nutrients: u32,
    /// Multiplier in percent.
    pub factor_percent: i64,
}

impl NutrientBand {
    /// Create a new band.
    #[must_use]
    pub const fn new(min_nutrients: u32, factor_percent: i64) -> Self {
        Self {
            min_nutrients,
            factor_percent,
        }
    }
}

/// Heaviest-unit strike group during ATTACK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrikeConfig {
    /// Number of heaviest units that join the strike group.
    pub group_size: usize,
    /// Hostile tile biomass the striker accepts, as a percentage of its own.
    pub ratio_percent: u32,
}

impl Default for StrikeConfig {
    fn default() -> Self {
        Self {
            group_size: 4,
            ratio_percent: 200,
        }
    }
}

// ============================================================================
// Movement
// ============================================================================

/// Weights of the single-step cost function (lower is better).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepWeights {
    /// Cost per unit of non-own biomass on the next tile.
    pub hostile_weight: i64,
    /// Reward per nutrient on the next tile.
    pub nutrient_weight: i64,
    /// Cost per tile of remaining Manhattan distance.
    pub distance_weight: i64,
    /// Extra cost when the next tile's non-own biomass would defeat the unit.
    pub blocking_penalty: i64,
}

impl Default for StepWeights {
    fn default() -> Self {
        Self {
            hostile_weight: 1,
            nutrient_weight: 1,
            distance_weight: 10,
            blocking_penalty: 1_000,
        }
    }
}

/// How a resolved long-range target is turned into an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementMode {
    /// Emit `MoveTo(target)` and let the game's mover path there.
    #[default]
    LongRange,
    /// Emit one `Step` per tick chosen by the local step planner.
    SingleStep,
}
