//! Engine configuration
//!
//! Physiological approximations and decision thresholds used by each pipeline
//! stage. Every value has a default; partial JSON documents override only the
//! fields they name.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Smoothing constants per series type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// EWMA alpha for body weight
    pub weight_alpha: f64,
    /// EWMA alpha for daily intake
    pub intake_alpha: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            weight_alpha: 0.10,
            intake_alpha: 0.15,
        }
    }
}

/// Energy-balance estimation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    /// Energy equivalent of one kilogram of body mass (kcal/kg)
    pub kcal_per_kg: f64,
    /// Samples required in each series before estimating
    pub minimum_data_points: usize,
    /// Days averaged at each end of the weekly trend comparison
    pub trend_window_days: usize,
    /// Most recent raw intake days averaged for intake
    pub intake_window_days: usize,
    /// Accepted activity multiplier range (inclusive)
    pub min_activity_factor: f64,
    pub max_activity_factor: f64,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            kcal_per_kg: 7700.0,
            minimum_data_points: 14,
            trend_window_days: 7,
            intake_window_days: 14,
            min_activity_factor: 1.0,
            max_activity_factor: 2.5,
        }
    }
}

/// Confidence and flexibility scoring parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Days of history that earn full completeness credit
    pub completeness_target_days: usize,
    pub completeness_weight: f64,
    /// Recent raw samples used for stability
    pub stability_window_days: usize,
    pub weight_stability_cap: f64,
    /// Divisor applied to weight stdev (kg) before subtracting from the cap
    pub weight_stdev_divisor: f64,
    pub intake_stability_cap: f64,
    pub intake_stdev_divisor: f64,
    /// Samples required in both series before flexibility is computed
    pub flexibility_min_points: usize,
    pub flexibility_gain: f64,
    pub flexibility_min: f64,
    pub flexibility_max: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            completeness_target_days: 28,
            completeness_weight: 0.4,
            stability_window_days: 7,
            weight_stability_cap: 0.3,
            weight_stdev_divisor: 2.0,
            intake_stability_cap: 0.3,
            intake_stdev_divisor: 500.0,
            flexibility_min_points: 21,
            flexibility_gain: 0.5,
            flexibility_min: 0.5,
            flexibility_max: 1.5,
        }
    }
}

/// Coaching decision thresholds and adjustment formulas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachingConfig {
    /// Below this adaptation factor a fat-loss diet should pause entirely
    pub diet_break_threshold: f64,
    /// Below this adaptation factor metabolism is considered adapted
    pub adaptation_threshold: f64,
    /// Weekly change (kg) below which weight is considered flat
    pub plateau_kg: f64,
    /// Maximum healthy weekly loss as a fraction of body weight
    pub max_weekly_loss_fraction: f64,
    /// Maximum weekly gain as a fraction of body weight outside a muscle-gain phase
    pub max_weekly_gain_fraction: f64,
    /// Fixed part of an increase/decrease adjustment (kcal/day)
    pub adjustment_base_kcal: f64,
    /// Proportional part of an increase/decrease adjustment (fraction of TDEE)
    pub adjustment_tdee_fraction: f64,
    /// Refeed surplus as a fraction of TDEE
    pub refeed_tdee_fraction: f64,
}

impl Default for CoachingConfig {
    fn default() -> Self {
        Self {
            diet_break_threshold: 0.75,
            adaptation_threshold: 0.85,
            plateau_kg: 0.1,
            max_weekly_loss_fraction: 0.01,
            max_weekly_gain_fraction: 0.005,
            adjustment_base_kcal: 100.0,
            adjustment_tdee_fraction: 0.05,
            refeed_tdee_fraction: 0.15,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub smoothing: SmoothingConfig,
    pub estimation: EstimationConfig,
    pub scoring: ScoringConfig,
    pub coaching: CoachingConfig,
}

impl EngineConfig {
    /// Load a configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::EncodingError(e.to_string()))
    }

    /// Check every parameter for a usable value
    pub fn validate(&self) -> Result<(), EngineError> {
        let s = &self.smoothing;
        check_alpha("smoothing.weight_alpha", s.weight_alpha)?;
        check_alpha("smoothing.intake_alpha", s.intake_alpha)?;

        let e = &self.estimation;
        check_positive("estimation.kcal_per_kg", e.kcal_per_kg)?;
        // Two full trend windows are needed for a week-over-week comparison
        if e.trend_window_days == 0 || e.minimum_data_points < 2 * e.trend_window_days {
            return Err(invalid(
                "estimation.minimum_data_points must cover two trend windows",
            ));
        }
        if e.intake_window_days == 0 {
            return Err(invalid("estimation.intake_window_days must be positive"));
        }
        check_positive("estimation.min_activity_factor", e.min_activity_factor)?;
        if e.max_activity_factor < e.min_activity_factor {
            return Err(invalid("estimation activity factor range is inverted"));
        }

        let sc = &self.scoring;
        if sc.completeness_target_days == 0 || sc.stability_window_days < 2 {
            return Err(invalid("scoring windows are too short"));
        }
        check_positive("scoring.weight_stdev_divisor", sc.weight_stdev_divisor)?;
        check_positive("scoring.intake_stdev_divisor", sc.intake_stdev_divisor)?;
        if [
            sc.completeness_weight,
            sc.weight_stability_cap,
            sc.intake_stability_cap,
        ]
        .iter()
        .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(invalid("scoring confidence components must be non-negative"));
        }
        if sc.flexibility_min_points < 3 {
            return Err(invalid("scoring.flexibility_min_points must be at least 3"));
        }
        if !(sc.flexibility_min > 0.0 && sc.flexibility_min <= sc.flexibility_max) {
            return Err(invalid("scoring flexibility bounds are inverted"));
        }

        let c = &self.coaching;
        check_positive("coaching.diet_break_threshold", c.diet_break_threshold)?;
        if c.diet_break_threshold >= c.adaptation_threshold {
            return Err(invalid(
                "coaching.diet_break_threshold must be below adaptation_threshold",
            ));
        }
        check_positive("coaching.plateau_kg", c.plateau_kg)?;
        check_positive("coaching.max_weekly_loss_fraction", c.max_weekly_loss_fraction)?;
        check_positive("coaching.max_weekly_gain_fraction", c.max_weekly_gain_fraction)?;
        if c.adjustment_base_kcal < 0.0
            || c.adjustment_tdee_fraction < 0.0
            || c.refeed_tdee_fraction < 0.0
        {
            return Err(invalid("coaching adjustments must be non-negative"));
        }

        Ok(())
    }
}

fn invalid(msg: &str) -> EngineError {
    EngineError::InvalidConfig(msg.to_string())
}

fn check_alpha(name: &str, alpha: f64) -> Result<(), EngineError> {
    if alpha.is_finite() && alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{name} must be in (0, 1), got {alpha}"
        )))
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{name} must be positive, got {value}"
        )))
    }
}
