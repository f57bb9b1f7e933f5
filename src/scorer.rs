//! Confidence and flexibility scoring
//!
//! Confidence is the sum of three capped components, clamped to 0-1:
//! - Completeness: how much history both series carry
//! - Weight stability: penalizes noisy recent weigh-ins
//! - Intake stability: penalizes erratic recent logging
//!
//! Metabolic flexibility measures how closely day-to-day weight changes follow
//! day-to-day intake changes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ScoringConfig, SmoothingConfig};
use crate::error::EngineError;
use crate::smoother::SeriesSmoother;

/// Scores for a single estimation cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    /// Overall confidence (0-1)
    pub confidence: f64,
    pub completeness: f64,
    pub weight_stability: f64,
    pub intake_stability: f64,
    /// Flexibility (bounded by config, 0.5-1.5 by default)
    pub metabolic_flexibility: f64,
    /// True when too little history existed and the neutral value was used
    pub flexibility_defaulted: bool,
}

/// Scorer for confidence and metabolic flexibility
pub struct Scorer<'a> {
    config: &'a ScoringConfig,
    weight_smoother: SeriesSmoother,
    intake_smoother: SeriesSmoother,
}

impl<'a> Scorer<'a> {
    pub fn new(config: &'a ScoringConfig, smoothing: &SmoothingConfig) -> Result<Self, EngineError> {
        Ok(Self {
            config,
            weight_smoother: SeriesSmoother::for_weight(smoothing)?,
            intake_smoother: SeriesSmoother::for_intake(smoothing)?,
        })
    }

    /// Score raw weight (kg) and intake (kcal) series
    pub fn score(&self, weights: &[f64], intakes: &[f64]) -> Scores {
        let completeness = self.completeness(weights.len(), intakes.len());
        let weight_stability = stability(
            recent(weights, self.config.stability_window_days),
            self.config.weight_stability_cap,
            self.config.weight_stdev_divisor,
        );
        let intake_stability = stability(
            recent(intakes, self.config.stability_window_days),
            self.config.intake_stability_cap,
            self.config.intake_stdev_divisor,
        );
        let confidence = (completeness + weight_stability + intake_stability).clamp(0.0, 1.0);

        let (metabolic_flexibility, flexibility_defaulted) = self.flexibility(weights, intakes);

        debug!(
            confidence,
            completeness,
            weight_stability,
            intake_stability,
            metabolic_flexibility,
            "Scores computed"
        );

        Scores {
            confidence,
            completeness,
            weight_stability,
            intake_stability,
            metabolic_flexibility,
            flexibility_defaulted,
        }
    }

    /// Completeness component; never decreases as either count grows
    pub fn completeness(&self, weight_count: usize, intake_count: usize) -> f64 {
        let target = self.config.completeness_target_days as f64;
        let coverage = (weight_count as f64 / target).min(intake_count as f64 / target);
        coverage.min(1.0) * self.config.completeness_weight
    }

    fn flexibility(&self, weights: &[f64], intakes: &[f64]) -> (f64, bool) {
        let neutral = 1.0_f64.clamp(self.config.flexibility_min, self.config.flexibility_max);
        let min_points = self.config.flexibility_min_points;
        if weights.len() < min_points || intakes.len() < min_points {
            return (neutral, true);
        }

        // Align the two series on their most recent common span
        let n = weights.len().min(intakes.len());
        let weight_trend = self.weight_smoother.smooth(recent(weights, n));
        let intake_trend = self.intake_smoother.smooth(recent(intakes, n));

        let corr = pearson(&deltas(&intake_trend), &deltas(&weight_trend));
        let flexibility = (1.0 + self.config.flexibility_gain * corr)
            .clamp(self.config.flexibility_min, self.config.flexibility_max);
        (flexibility, false)
    }
}

/// Stability credit: cap minus scaled stdev, floored at zero.
///
/// Fewer than two samples earn no credit; a zero-variance series earns the full cap.
fn stability(values: &[f64], cap: f64, divisor: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    (cap - std_dev(values) / divisor).max(0.0)
}

fn recent(values: &[f64], window: usize) -> &[f64] {
    &values[values.len().saturating_sub(window)..]
}

fn deltas(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0.0 for fewer than two values
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Pearson correlation of two equal-length series.
///
/// Degenerate input (length mismatch, fewer than two points, zero variance,
/// non-finite values) yields 0.0 rather than NaN.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return 0.0;
    }
    let mx = mean(xs);
    let my = mean(ys);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if !denom.is_finite() || denom <= f64::EPSILON {
        return 0.0;
    }
    let r = cov / denom;
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}
