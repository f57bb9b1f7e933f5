//! Energy-balance estimation
//!
//! This module back-calculates TDEE from intake and the smoothed weight trend:
//! - Weekly change of the smoothed weight trend
//! - Implied daily energy balance (kcal/day)
//! - Current TDEE = average intake - energy balance
//! - Baseline TDEE from the Mifflin-St Jeor BMR and the activity multiplier

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EstimationConfig, SmoothingConfig};
use crate::error::EngineError;
use crate::smoother::SeriesSmoother;
use crate::types::{BiologicalSex, UserProfile};

/// BMR coefficients (intercept, per kg, per cm, per year)
mod bmr {
    pub const MALE: (f64, f64, f64, f64) = (88.362, 13.397, 4.799, 5.677);
    pub const FEMALE: (f64, f64, f64, f64) = (447.593, 9.247, 3.098, 4.330);
}

/// Result of the energy-balance stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyBalance {
    /// Week-over-week change of the smoothed weight (kg)
    pub weekly_weight_change: f64,
    /// Implied daily surplus (+) or deficit (-) (kcal/day)
    pub energy_balance: f64,
    /// Mean of the most recent raw intake values (kcal/day)
    pub avg_daily_intake: f64,
    pub current_tdee: f64,
    pub baseline_tdee: f64,
    pub adaptation_factor: f64,
}

/// Estimator for back-calculating TDEE
pub struct EnergyBalanceEstimator<'a> {
    config: &'a EstimationConfig,
    weight_smoother: SeriesSmoother,
}

impl<'a> EnergyBalanceEstimator<'a> {
    pub fn new(
        config: &'a EstimationConfig,
        smoothing: &SmoothingConfig,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            config,
            weight_smoother: SeriesSmoother::for_weight(smoothing)?,
        })
    }

    /// Whether both series meet the minimum sample count
    pub fn has_sufficient_data(&self, weight_count: usize, intake_count: usize) -> bool {
        weight_count >= self.config.minimum_data_points
            && intake_count >= self.config.minimum_data_points
    }

    /// Run the estimation on raw weight (kg) and intake (kcal) series.
    ///
    /// Callers check `has_sufficient_data` first; on short series the weekly
    /// change is simply 0.
    pub fn estimate(
        &self,
        weights: &[f64],
        intakes: &[f64],
        profile: &UserProfile,
    ) -> Result<EnergyBalance, EngineError> {
        validate_profile(profile, self.config)?;

        let smoothed = self.weight_smoother.smooth(weights);
        let weekly_weight_change = weekly_change(&smoothed, self.config.trend_window_days);
        let energy_balance = weekly_weight_change * self.config.kcal_per_kg / 7.0;
        let avg_daily_intake = recent_mean(intakes, self.config.intake_window_days);
        let current_tdee = avg_daily_intake - energy_balance;
        let baseline_tdee = baseline_tdee(profile);
        let adaptation_factor = current_tdee / baseline_tdee;

        debug!(
            weekly_weight_change,
            energy_balance,
            avg_daily_intake,
            current_tdee,
            baseline_tdee,
            adaptation_factor,
            "Energy balance estimated"
        );

        Ok(EnergyBalance {
            weekly_weight_change,
            energy_balance,
            avg_daily_intake,
            current_tdee,
            baseline_tdee,
            adaptation_factor,
        })
    }
}

/// Reject profiles that would silently corrupt the BMR
pub fn validate_profile(profile: &UserProfile, config: &EstimationConfig) -> Result<(), EngineError> {
    if profile.age_years == 0 {
        return Err(EngineError::InvalidProfile("age must be positive".to_string()));
    }
    if !(profile.height_cm.is_finite() && profile.height_cm > 0.0) {
        return Err(EngineError::InvalidProfile(format!(
            "height must be positive, got {} cm",
            profile.height_cm
        )));
    }
    if !(profile.weight_kg.is_finite() && profile.weight_kg > 0.0) {
        return Err(EngineError::InvalidProfile(format!(
            "weight must be positive, got {} kg",
            profile.weight_kg
        )));
    }
    let factor = profile.activity_factor;
    if !(factor >= config.min_activity_factor && factor <= config.max_activity_factor) {
        return Err(EngineError::InvalidProfile(format!(
            "activity factor {} outside [{}, {}]",
            factor, config.min_activity_factor, config.max_activity_factor
        )));
    }
    // Very old, very light profiles can drive the equation to zero
    if basal_metabolic_rate(profile) <= 0.0 {
        return Err(EngineError::InvalidProfile(
            "profile yields a non-positive BMR".to_string(),
        ));
    }
    Ok(())
}

/// Mifflin-St Jeor style BMR (kcal/day)
pub fn basal_metabolic_rate(profile: &UserProfile) -> f64 {
    let (intercept, per_kg, per_cm, per_year) = match profile.sex {
        BiologicalSex::Male => bmr::MALE,
        BiologicalSex::Female => bmr::FEMALE,
    };
    intercept + per_kg * profile.weight_kg + per_cm * profile.height_cm
        - per_year * f64::from(profile.age_years)
}

/// Formula-predicted TDEE: BMR x activity multiplier
pub fn baseline_tdee(profile: &UserProfile) -> f64 {
    basal_metabolic_rate(profile) * profile.activity_factor
}

/// Mean of the last `window` smoothed values minus mean of the `window` before.
///
/// Returns 0.0 when fewer than two full windows exist.
pub fn weekly_change(smoothed: &[f64], window: usize) -> f64 {
    if window == 0 || smoothed.len() < 2 * window {
        return 0.0;
    }
    let n = smoothed.len();
    let recent = &smoothed[n - window..];
    let preceding = &smoothed[n - 2 * window..n - window];
    mean(recent) - mean(preceding)
}

/// Mean of the last `window` values (all values if fewer; 0.0 if empty)
pub fn recent_mean(values: &[f64], window: usize) -> f64 {
    let start = values.len().saturating_sub(window);
    mean(&values[start..])
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Goal;

    fn male_profile() -> UserProfile {
        UserProfile {
            age_years: 30,
            sex: BiologicalSex::Male,
            height_cm: 180.0,
            weight_kg: 80.0,
            activity_factor: 1.4,
            goal: Goal::FatLoss,
        }
    }

    fn estimator_config() -> (EstimationConfig, SmoothingConfig) {
        (EstimationConfig::default(), SmoothingConfig::default())
    }

    #[test]
    fn test_male_bmr() {
        // 88.362 + 13.397*80 + 4.799*180 - 5.677*30
        let bmr = basal_metabolic_rate(&male_profile());
        assert!((bmr - 1853.632).abs() < 0.001);
        assert!((baseline_tdee(&male_profile()) - 2595.0848).abs() < 0.001);
    }

    #[test]
    fn test_female_bmr() {
        let profile = UserProfile {
            age_years: 28,
            sex: BiologicalSex::Female,
            height_cm: 165.0,
            weight_kg: 62.0,
            activity_factor: 1.2,
            goal: Goal::Maintenance,
        };
        let expected = 447.593 + 9.247 * 62.0 + 3.098 * 165.0 - 4.330 * 28.0;
        assert!((basal_metabolic_rate(&profile) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_weekly_change() {
        let mut smoothed = vec![80.0; 7];
        smoothed.extend(vec![79.5; 7]);
        assert!((weekly_change(&smoothed, 7) + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_weekly_change_short_series() {
        assert_eq!(weekly_change(&[80.0; 13], 7), 0.0);
    }

    #[test]
    fn test_recent_mean_uses_last_window() {
        let mut intakes = vec![3000.0; 10];
        intakes.extend(vec![2000.0; 14]);
        assert!((recent_mean(&intakes, 14) - 2000.0).abs() < 1e-9);
        assert_eq!(recent_mean(&[], 14), 0.0);
    }

    #[test]
    fn test_constant_series_adaptation() {
        let (config, smoothing) = estimator_config();
        let estimator = EnergyBalanceEstimator::new(&config, &smoothing).unwrap();
        let profile = male_profile();

        let result = estimator
            .estimate(&[80.0; 28], &[2200.0; 28], &profile)
            .unwrap();

        assert_eq!(result.weekly_weight_change, 0.0);
        assert!((result.current_tdee - 2200.0).abs() < 1e-9);
        assert!((result.adaptation_factor - 2200.0 / baseline_tdee(&profile)).abs() < 1e-9);
    }

    #[test]
    fn test_weight_loss_raises_tdee_above_intake() {
        let (config, smoothing) = estimator_config();
        let estimator = EnergyBalanceEstimator::new(&config, &smoothing).unwrap();
        let weights: Vec<f64> = (0..28).map(|i| 80.0 - i as f64 / 27.0).collect();

        let result = estimator
            .estimate(&weights, &[2200.0; 28], &male_profile())
            .unwrap();

        assert!(result.weekly_weight_change < 0.0);
        assert!(result.energy_balance < 0.0);
        assert!(result.current_tdee > 2200.0);
    }

    #[test]
    fn test_invalid_profiles_rejected() {
        let config = EstimationConfig::default();

        let mut profile = male_profile();
        profile.age_years = 0;
        assert!(matches!(
            validate_profile(&profile, &config),
            Err(EngineError::InvalidProfile(_))
        ));

        let mut profile = male_profile();
        profile.height_cm = -1.0;
        assert!(validate_profile(&profile, &config).is_err());

        let mut profile = male_profile();
        profile.weight_kg = 0.0;
        assert!(validate_profile(&profile, &config).is_err());

        let mut profile = male_profile();
        profile.activity_factor = 2.6;
        assert!(validate_profile(&profile, &config).is_err());

        let mut profile = male_profile();
        profile.activity_factor = f64::NAN;
        assert!(validate_profile(&profile, &config).is_err());

        assert!(validate_profile(&male_profile(), &config).is_ok());
    }
}
