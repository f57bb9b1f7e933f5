//! Pipeline orchestration
//!
//! This module provides the public API for the engine. It runs one
//! estimation cycle from raw samples to a metabolic estimate, and turns an
//! estimate into weekly coaching.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::coaching::CoachingEngine;
use crate::config::EngineConfig;
use crate::energy_balance::{baseline_tdee, recent_mean, validate_profile, EnergyBalanceEstimator};
use crate::error::EngineError;
use crate::request::{is_strictly_ascending, EstimationRequest};
use crate::scorer::Scorer;
use crate::types::{
    IntakeSample, MetabolicEstimate, QualityFlag, UserProfile, WeeklyCoaching, WeightSample,
};

/// Estimate metabolism with the default configuration, stamped now.
///
/// # Arguments
/// * `weights` - Weigh-ins sorted by date ascending
/// * `intakes` - Daily intake totals sorted by date ascending
/// * `profile` - Static user profile
/// * `previous` - Estimate from the previous cycle, if any
///
/// # Returns
/// The new estimate. With too little history this is the previous estimate
/// (or a profile-seeded one) with confidence 0, never an error.
///
/// # Example
/// ```ignore
/// let estimate = estimate(&weights, &intakes, &profile, stored.as_ref())?;
/// let coaching = coach(&estimate, &profile);
/// ```
pub fn estimate(
    weights: &[WeightSample],
    intakes: &[IntakeSample],
    profile: &UserProfile,
    previous: Option<&MetabolicEstimate>,
) -> Result<MetabolicEstimate, EngineError> {
    estimate_at(
        weights,
        intakes,
        profile,
        previous,
        &EngineConfig::default(),
        Utc::now(),
    )
}

/// Coach from an estimate with the default configuration
pub fn coach(estimate: &MetabolicEstimate, profile: &UserProfile) -> WeeklyCoaching {
    CoachingEngine::new(&EngineConfig::default().coaching).coach(estimate, profile)
}

/// Coach from an estimate with an explicit configuration.
///
/// The configuration is validated first, so inverted thresholds are an
/// error rather than a silently unreachable rule.
pub fn coach_with_config(
    estimate: &MetabolicEstimate,
    profile: &UserProfile,
    config: &EngineConfig,
) -> Result<WeeklyCoaching, EngineError> {
    config.validate()?;
    Ok(CoachingEngine::new(&config.coaching).coach(estimate, profile))
}

/// Run one estimation cycle for a request document
pub fn estimate_request(
    request: &EstimationRequest,
    config: &EngineConfig,
    as_of: DateTime<Utc>,
) -> Result<MetabolicEstimate, EngineError> {
    estimate_at(
        &request.weights,
        &request.intakes,
        &request.profile,
        request.previous.as_ref(),
        config,
        as_of,
    )
}

/// Run one estimation cycle with an explicit configuration and timestamp.
///
/// Pipeline stages:
/// 1. Profile validation (invalid profiles are rejected)
/// 2. Data sufficiency check (short history is a zero-confidence no-op)
/// 3. EnergyBalanceEstimator - smoothed trend to current and baseline TDEE
/// 4. Scorer - confidence and metabolic flexibility
pub fn estimate_at(
    weights: &[WeightSample],
    intakes: &[IntakeSample],
    profile: &UserProfile,
    previous: Option<&MetabolicEstimate>,
    config: &EngineConfig,
    as_of: DateTime<Utc>,
) -> Result<MetabolicEstimate, EngineError> {
    config.validate()?;
    validate_profile(profile, &config.estimation)?;
    check_finite(weights, intakes)?;

    let mut flags = Vec::new();
    let weight_dates: Vec<_> = weights.iter().map(|s| s.date).collect();
    let intake_dates: Vec<_> = intakes.iter().map(|s| s.date).collect();
    if !is_strictly_ascending(&weight_dates) || !is_strictly_ascending(&intake_dates) {
        warn!("Samples are not strictly ascending by date; using them as supplied");
        flags.push(QualityFlag::UnsortedInput);
    }

    let weight_values: Vec<f64> = weights.iter().map(|s| s.weight_kg).collect();
    let intake_values: Vec<f64> = intakes.iter().map(|s| s.calories).collect();

    let estimator = EnergyBalanceEstimator::new(&config.estimation, &config.smoothing)?;
    if !estimator.has_sufficient_data(weight_values.len(), intake_values.len()) {
        warn!(
            weight_samples = weight_values.len(),
            intake_samples = intake_values.len(),
            required = config.estimation.minimum_data_points,
            "Insufficient data for estimation"
        );
        flags.push(QualityFlag::InsufficientData);
        return Ok(fallback_estimate(
            previous,
            profile,
            &intake_values,
            config,
            as_of,
            flags,
        ));
    }

    let balance = estimator.estimate(&weight_values, &intake_values, profile)?;
    if !(balance.current_tdee.is_finite() && balance.current_tdee > 0.0) {
        warn!(
            current_tdee = balance.current_tdee,
            "Back-calculated TDEE is not positive"
        );
        flags.push(QualityFlag::ImplausibleEnergyBalance);
        return Ok(fallback_estimate(
            previous,
            profile,
            &intake_values,
            config,
            as_of,
            flags,
        ));
    }

    let scores = Scorer::new(&config.scoring, &config.smoothing)?.score(&weight_values, &intake_values);
    if scores.weight_stability == 0.0 {
        flags.push(QualityFlag::NoisyWeighIns);
    }
    if scores.intake_stability == 0.0 {
        flags.push(QualityFlag::ErraticIntakeLogging);
    }
    if scores.flexibility_defaulted {
        flags.push(QualityFlag::FlexibilityDefaulted);
    }

    let estimate = MetabolicEstimate {
        estimate_id: previous.map_or_else(Uuid::new_v4, |p| p.estimate_id),
        current_tdee: balance.current_tdee,
        baseline_tdee: balance.baseline_tdee,
        adaptation_factor: balance.adaptation_factor,
        confidence: scores.confidence,
        weekly_weight_change: balance.weekly_weight_change,
        weekly_intake_average: balance.avg_daily_intake,
        metabolic_flexibility: scores.metabolic_flexibility,
        last_calculated: as_of,
        quality_flags: flags,
    };

    debug!(
        estimate_id = %estimate.estimate_id,
        current_tdee = estimate.current_tdee,
        adaptation_factor = estimate.adaptation_factor,
        confidence = estimate.confidence,
        "Metabolic estimate updated"
    );

    Ok(estimate)
}

fn check_finite(weights: &[WeightSample], intakes: &[IntakeSample]) -> Result<(), EngineError> {
    if let Some(sample) = weights.iter().find(|s| !s.weight_kg.is_finite()) {
        return Err(EngineError::InvalidSample(format!(
            "weight on {} is not a finite number",
            sample.date
        )));
    }
    if let Some(sample) = intakes.iter().find(|s| !s.calories.is_finite()) {
        return Err(EngineError::InvalidSample(format!(
            "intake on {} is not a finite number",
            sample.date
        )));
    }
    Ok(())
}

/// Zero-confidence estimate: the previous one restamped, or one seeded from the profile
fn fallback_estimate(
    previous: Option<&MetabolicEstimate>,
    profile: &UserProfile,
    intakes: &[f64],
    config: &EngineConfig,
    as_of: DateTime<Utc>,
    mut flags: Vec<QualityFlag>,
) -> MetabolicEstimate {
    match previous {
        Some(prev) => {
            // A restamped placeholder is still a placeholder
            if prev.is_seeded_from_profile() {
                flags.push(QualityFlag::SeededFromProfile);
            }
            MetabolicEstimate {
                confidence: 0.0,
                last_calculated: as_of,
                quality_flags: flags,
                ..prev.clone()
            }
        }
        None => {
            flags.push(QualityFlag::SeededFromProfile);
            let baseline = baseline_tdee(profile);
            MetabolicEstimate {
                estimate_id: Uuid::new_v4(),
                current_tdee: baseline,
                baseline_tdee: baseline,
                adaptation_factor: 1.0,
                confidence: 0.0,
                weekly_weight_change: 0.0,
                weekly_intake_average: recent_mean(intakes, config.estimation.intake_window_days),
                metabolic_flexibility: 1.0,
                last_calculated: as_of,
                quality_flags: flags,
            }
        }
    }
}

/// Stateful engine holding the persisted current estimate.
///
/// Use this when the caller keeps one engine per user across cycles.
pub struct MetabolicEngine {
    config: EngineConfig,
    current: Option<MetabolicEstimate>,
}

impl Default for MetabolicEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MetabolicEngine {
    /// Create a new engine with default settings
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            current: None,
        }
    }

    /// Create an engine with a specific configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            current: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn current_estimate(&self) -> Option<&MetabolicEstimate> {
        self.current.as_ref()
    }

    /// Load the persisted estimate from JSON
    pub fn load_estimate(&mut self, json: &str) -> Result<(), EngineError> {
        let estimate =
            MetabolicEstimate::from_json(json).map_err(|e| EngineError::ParseError(e.to_string()))?;
        self.current = Some(estimate);
        Ok(())
    }

    /// Save the current estimate to JSON, if one exists
    pub fn save_estimate(&self) -> Result<Option<String>, EngineError> {
        self.current.as_ref().map(MetabolicEstimate::to_json).transpose()
    }

    /// Run one cycle: estimate, overwrite the stored estimate, then coach
    pub fn update(
        &mut self,
        weights: &[WeightSample],
        intakes: &[IntakeSample],
        profile: &UserProfile,
        as_of: DateTime<Utc>,
    ) -> Result<(MetabolicEstimate, WeeklyCoaching), EngineError> {
        let estimate = estimate_at(
            weights,
            intakes,
            profile,
            self.current.as_ref(),
            &self.config,
            as_of,
        )?;
        let coaching = CoachingEngine::new(&self.config.coaching).coach(&estimate, profile);
        self.current = Some(estimate.clone());
        Ok((estimate, coaching))
    }
}
