//! Series smoothing
//!
//! Single exponential smoothing (EWMA) of daily weight and intake series:
//!
//! ```text
//! s[0] = x[0]
//! s[i] = α·x[i] + (1 - α)·s[i-1]
//! ```
//!
//! A low α suppresses single-day noise (water retention, meal-to-meal
//! variance) while still following a real trend within one to two weeks.

use crate::config::SmoothingConfig;
use crate::error::EngineError;

/// Exponential smoother with a fixed smoothing constant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSmoother {
    alpha: f64,
}

impl SeriesSmoother {
    /// Create a smoother; `alpha` must lie in (0, 1)
    pub fn new(alpha: f64) -> Result<Self, EngineError> {
        if !alpha.is_finite() || alpha <= 0.0 || alpha >= 1.0 {
            return Err(EngineError::InvalidConfig(format!(
                "smoothing alpha must be in (0, 1), got {alpha}"
            )));
        }
        Ok(Self { alpha })
    }

    /// Smoother tuned for body-weight series
    pub fn for_weight(config: &SmoothingConfig) -> Result<Self, EngineError> {
        Self::new(config.weight_alpha)
    }

    /// Smoother tuned for daily intake series
    pub fn for_intake(config: &SmoothingConfig) -> Result<Self, EngineError> {
        Self::new(config.intake_alpha)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Smooth a series, returning a sequence of the same length.
    ///
    /// Empty input yields empty output.
    pub fn smooth(&self, values: &[f64]) -> Vec<f64> {
        let mut smoothed = Vec::with_capacity(values.len());
        let mut iter = values.iter();

        let Some(&first) = iter.next() else {
            return smoothed;
        };

        let mut level = first;
        smoothed.push(level);
        for &x in iter {
            // Same as α·x + (1 - α)·level, but exact when x == level
            level += self.alpha * (x - level);
            smoothed.push(level);
        }

        smoothed
    }
}
