//! Estimation request documents
//!
//! A request bundles everything one estimation cycle needs. It is the JSON
//! document accepted by the CLI and the FFI layer, and it can be checked
//! against the sample contract (ascending, deduplicated, plausible values)
//! before the engine runs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{IntakeSample, MetabolicEstimate, UserProfile, WeightSample};

/// Plausible daily intake range (kcal)
pub const MAX_DAILY_CALORIES: f64 = 15_000.0;

/// Plausible body weight range (kg)
pub const MAX_WEIGHT_KG: f64 = 650.0;

/// Input for one estimation cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationRequest {
    pub profile: UserProfile,
    #[serde(default)]
    pub weights: Vec<WeightSample>,
    #[serde(default)]
    pub intakes: Vec<IntakeSample>,
    /// Estimate from the previous cycle, if one exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<MetabolicEstimate>,
}

/// Which series a sample issue refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Series {
    Weight,
    Intake,
}

/// A single contract violation in a request's samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleIssue {
    pub series: Series,
    pub index: usize,
    pub date: NaiveDate,
    pub message: String,
}

impl EstimationRequest {
    /// Parse a request from JSON
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(|e| EngineError::ParseError(e.to_string()))
    }

    /// Report every sample that breaks the input contract
    pub fn validate(&self) -> Vec<SampleIssue> {
        let mut issues = Vec::new();

        let weight_dates: Vec<NaiveDate> = self.weights.iter().map(|s| s.date).collect();
        check_order(Series::Weight, &weight_dates, &mut issues);
        for (index, sample) in self.weights.iter().enumerate() {
            if !(sample.weight_kg.is_finite()
                && sample.weight_kg > 0.0
                && sample.weight_kg <= MAX_WEIGHT_KG)
            {
                issues.push(SampleIssue {
                    series: Series::Weight,
                    index,
                    date: sample.date,
                    message: format!("implausible weight {} kg", sample.weight_kg),
                });
            }
        }

        let intake_dates: Vec<NaiveDate> = self.intakes.iter().map(|s| s.date).collect();
        check_order(Series::Intake, &intake_dates, &mut issues);
        for (index, sample) in self.intakes.iter().enumerate() {
            if !(sample.calories.is_finite()
                && sample.calories >= 0.0
                && sample.calories <= MAX_DAILY_CALORIES)
            {
                issues.push(SampleIssue {
                    series: Series::Intake,
                    index,
                    date: sample.date,
                    message: format!("implausible intake {} kcal", sample.calories),
                });
            }
            let macros = [sample.protein_g, sample.carbs_g, sample.fat_g, sample.fiber_g];
            if macros.iter().any(|g| !g.is_finite() || *g < 0.0) {
                issues.push(SampleIssue {
                    series: Series::Intake,
                    index,
                    date: sample.date,
                    message: "negative or non-finite macro grams".to_string(),
                });
            }
        }

        issues
    }
}

/// Whether dates are strictly ascending (sorted, no duplicates)
pub fn is_strictly_ascending(dates: &[NaiveDate]) -> bool {
    dates.windows(2).all(|w| w[0] < w[1])
}

fn check_order(series: Series, dates: &[NaiveDate], issues: &mut Vec<SampleIssue>) {
    for (offset, pair) in dates.windows(2).enumerate() {
        let message = if pair[1] == pair[0] {
            "duplicate date"
        } else if pair[1] < pair[0] {
            "date out of order"
        } else {
            continue;
        };
        issues.push(SampleIssue {
            series,
            index: offset + 1,
            date: pair[1],
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BiologicalSex, Goal};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn request() -> EstimationRequest {
        EstimationRequest {
            profile: UserProfile {
                age_years: 35,
                sex: BiologicalSex::Female,
                height_cm: 168.0,
                weight_kg: 70.0,
                activity_factor: 1.5,
                goal: Goal::FatLoss,
            },
            weights: (1..=3).map(|d| WeightSample::new(day(d), 70.0)).collect(),
            intakes: (1..=3).map(|d| IntakeSample::new(day(d), 1900.0)).collect(),
            previous: None,
        }
    }

    #[test]
    fn test_clean_request_has_no_issues() {
        assert!(request().validate().is_empty());
    }

    #[test]
    fn test_detects_duplicates_and_disorder() {
        let mut req = request();
        req.weights.push(WeightSample::new(day(3), 69.8));
        req.intakes.insert(0, IntakeSample::new(day(5), 2000.0));

        let issues = req.validate();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].series, Series::Weight);
        assert_eq!(issues[0].message, "duplicate date");
        assert_eq!(issues[1].series, Series::Intake);
        assert_eq!(issues[1].index, 1);
        assert_eq!(issues[1].message, "date out of order");
    }

    #[test]
    fn test_detects_implausible_values() {
        let mut req = request();
        req.weights[1].weight_kg = -70.0;
        req.intakes[2].calories = f64::INFINITY;
        req.intakes[0].protein_g = -5.0;

        let issues = req.validate();
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn test_parse_from_json() {
        let json = r#"{
            "profile": {
                "age_years": 30, "sex": "male", "height_cm": 180.0,
                "weight_kg": 80.0, "activity_factor": 1.4, "goal": "fat_loss"
            },
            "weights": [{"date": "2024-01-01", "weight_kg": 80.0}],
            "intakes": [{"date": "2024-01-01", "calories": 2200.0, "protein_g": 160.0}]
        }"#;
        let req = EstimationRequest::from_json(json).unwrap();
        assert_eq!(req.profile.goal, Goal::FatLoss);
        assert_eq!(req.weights.len(), 1);
        assert!((req.intakes[0].protein_g - 160.0).abs() < f64::EPSILON);
        assert!(req.previous.is_none());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            EstimationRequest::from_json("{"),
            Err(EngineError::ParseError(_))
        ));
    }

    #[test]
    fn test_strictly_ascending() {
        assert!(is_strictly_ascending(&[day(1), day(2), day(4)]));
        assert!(!is_strictly_ascending(&[day(1), day(1)]));
        assert!(is_strictly_ascending(&[]));
    }
}
