//! Core types for the adaptive metabolism pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw samples and profile in, metabolic estimate and weekly coaching out.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// A single user-initiated weigh-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSample {
    /// Day of the weigh-in
    pub date: NaiveDate,
    /// Raw scale weight (kg)
    pub weight_kg: f64,
}

impl WeightSample {
    pub fn new(date: NaiveDate, weight_kg: f64) -> Self {
        Self { date, weight_kg }
    }
}

/// One day of food intake, already aggregated from all of the day's entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeSample {
    /// Day the food was eaten
    pub date: NaiveDate,
    /// Total energy intake (kcal)
    pub calories: f64,
    /// Protein (g)
    #[serde(default)]
    pub protein_g: f64,
    /// Carbohydrates (g)
    #[serde(default)]
    pub carbs_g: f64,
    /// Fat (g)
    #[serde(default)]
    pub fat_g: f64,
    /// Fiber (g)
    #[serde(default)]
    pub fiber_g: f64,
}

impl IntakeSample {
    /// Create an intake sample with calories only (macros zeroed)
    pub fn new(date: NaiveDate, calories: f64) -> Self {
        Self {
            date,
            calories,
            protein_g: 0.0,
            carbs_g: 0.0,
            fat_g: 0.0,
            fiber_g: 0.0,
        }
    }
}

/// Biological sex category selecting the BMR equation branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiologicalSex {
    Male,
    Female,
}

/// User's nutrition goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    FatLoss,
    MuscleGain,
    Maintenance,
}

impl Goal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::FatLoss => "fat_loss",
            Goal::MuscleGain => "muscle_gain",
            Goal::Maintenance => "maintenance",
        }
    }
}

/// Static user profile, supplied fresh on every call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Age in whole years
    pub age_years: u32,
    pub sex: BiologicalSex,
    pub height_cm: f64,
    /// Body weight (kg) used for the BMR formula and coaching thresholds
    pub weight_kg: f64,
    /// Activity multiplier applied to BMR (e.g. 1.2 sedentary, 1.55 moderately active)
    pub activity_factor: f64,
    pub goal: Goal,
}

/// Quality flag describing how an estimate was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    /// Fewer samples than the minimum in at least one series
    InsufficientData,
    /// Back-calculated TDEE was non-positive or non-finite
    ImplausibleEnergyBalance,
    /// Recent weigh-ins too noisy to earn any stability credit
    NoisyWeighIns,
    /// Recent intake logging too erratic to earn any stability credit
    ErraticIntakeLogging,
    /// Not enough history for flexibility; neutral value used
    FlexibilityDefaulted,
    /// Input samples were not in ascending date order
    UnsortedInput,
    /// No estimate has ever been computed; values are the profile's baseline
    SeededFromProfile,
}

/// The engine's best current belief about the user's metabolism.
///
/// Overwritten, never appended, on each estimation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetabolicEstimate {
    /// Stable identity of this user's estimate across overwrites
    pub estimate_id: Uuid,
    /// Back-calculated TDEE from intake and weight trend (kcal/day)
    pub current_tdee: f64,
    /// Formula-predicted TDEE from the profile (kcal/day)
    pub baseline_tdee: f64,
    /// current_tdee / baseline_tdee, always > 0
    pub adaptation_factor: f64,
    /// Trust in the estimate (0-1)
    pub confidence: f64,
    /// Week-over-week change of the smoothed weight trend (kg)
    pub weekly_weight_change: f64,
    /// Average daily intake over the intake window (kcal/day)
    pub weekly_intake_average: f64,
    /// Responsiveness of weight to intake changes (0.5-1.5)
    pub metabolic_flexibility: f64,
    pub last_calculated: DateTime<Utc>,
    #[serde(default)]
    pub quality_flags: Vec<QualityFlag>,
}

impl MetabolicEstimate {
    /// Whether the values are a profile-derived placeholder rather than a measurement
    pub fn is_seeded_from_profile(&self) -> bool {
        self.quality_flags.contains(&QualityFlag::SeededFromProfile)
    }

    /// Load an estimate from JSON
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the estimate to JSON
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string(self).map_err(|e| EngineError::EncodingError(e.to_string()))
    }
}

/// Weekly coaching directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    MaintainCurrent,
    IncreaseCalories,
    DecreaseCalories,
    RefeedRecommended,
    DietBreakRecommended,
    MetabolicReset,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::MaintainCurrent => "maintain_current",
            Recommendation::IncreaseCalories => "increase_calories",
            Recommendation::DecreaseCalories => "decrease_calories",
            Recommendation::RefeedRecommended => "refeed_recommended",
            Recommendation::DietBreakRecommended => "diet_break_recommended",
            Recommendation::MetabolicReset => "metabolic_reset",
        }
    }

    /// Whether acting on this recommendation interrupts the current diet phase
    pub fn requires_intervention(&self) -> bool {
        matches!(
            self,
            Recommendation::DietBreakRecommended
                | Recommendation::MetabolicReset
                | Recommendation::RefeedRecommended
        )
    }
}

/// Coaching output, recomputed every cycle and never fed back into the estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyCoaching {
    pub recommendation: Recommendation,
    /// Signed change to daily intake target (kcal/day)
    pub target_calorie_adjustment: f64,
    pub rationale: String,
    /// Confidence carried over from the estimate (0-1)
    pub confidence: f64,
    pub intervention_required: bool,
    /// Name of the decision-table rule that fired
    pub rule: String,
}
