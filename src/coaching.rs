//! Weekly coaching decisions
//!
//! The decision procedure is an ordered table of rules evaluated top to bottom;
//! the first rule whose predicate matches decides the recommendation. Each
//! rule carries its own rationale template, and the calorie adjustment is a
//! function of the recommendation alone. No hidden state: identical inputs
//! always produce identical coaching.

use tracing::debug;

use crate::config::CoachingConfig;
use crate::types::{Goal, MetabolicEstimate, Recommendation, UserProfile, WeeklyCoaching};

/// Everything a rule may look at
#[derive(Debug, Clone, PartialEq)]
pub struct CoachingInputs {
    pub adaptation_factor: f64,
    pub weekly_weight_change: f64,
    pub goal: Goal,
    pub body_weight_kg: f64,
    pub current_tdee: f64,
    pub baseline_tdee: f64,
    pub weekly_intake_average: f64,
    /// True when the values are a profile-derived placeholder
    pub seeded_from_profile: bool,
}

impl CoachingInputs {
    pub fn new(estimate: &MetabolicEstimate, profile: &UserProfile) -> Self {
        Self {
            adaptation_factor: estimate.adaptation_factor,
            weekly_weight_change: estimate.weekly_weight_change,
            goal: profile.goal,
            body_weight_kg: profile.weight_kg,
            current_tdee: estimate.current_tdee,
            baseline_tdee: estimate.baseline_tdee,
            weekly_intake_average: estimate.weekly_intake_average,
            seeded_from_profile: estimate.is_seeded_from_profile(),
        }
    }
}

type Predicate = fn(&CoachingInputs, &CoachingConfig) -> bool;
type Rationale = fn(&CoachingInputs) -> String;

/// One row of the decision table
pub struct CoachingRule {
    pub name: &'static str,
    pub recommendation: Recommendation,
    predicate: Predicate,
    rationale: Rationale,
}

impl CoachingRule {
    pub fn matches(&self, inputs: &CoachingInputs, config: &CoachingConfig) -> bool {
        (self.predicate)(inputs, config)
    }

    pub fn rationale(&self, inputs: &CoachingInputs) -> String {
        (self.rationale)(inputs)
    }
}

static RULES: [CoachingRule; 10] = [
    CoachingRule {
        name: "seeded_from_profile",
        recommendation: Recommendation::MaintainCurrent,
        predicate: seeded_from_profile,
        rationale: seeded_from_profile_rationale,
    },
    CoachingRule {
        name: "severe_adaptation",
        recommendation: Recommendation::DietBreakRecommended,
        predicate: severe_adaptation,
        rationale: diet_break_rationale,
    },
    CoachingRule {
        name: "moderate_adaptation",
        recommendation: Recommendation::RefeedRecommended,
        predicate: moderate_adaptation,
        rationale: refeed_rationale,
    },
    CoachingRule {
        name: "adaptation_outside_fat_loss",
        recommendation: Recommendation::IncreaseCalories,
        predicate: adaptation_outside_fat_loss,
        rationale: adaptation_increase_rationale,
    },
    CoachingRule {
        name: "plateau_fat_loss",
        recommendation: Recommendation::DecreaseCalories,
        predicate: plateau_fat_loss,
        rationale: plateau_rationale,
    },
    CoachingRule {
        name: "plateau_muscle_gain",
        recommendation: Recommendation::IncreaseCalories,
        predicate: plateau_muscle_gain,
        rationale: plateau_rationale,
    },
    CoachingRule {
        name: "plateau_maintenance",
        recommendation: Recommendation::MaintainCurrent,
        predicate: plateau_maintenance,
        rationale: stable_weight_rationale,
    },
    CoachingRule {
        name: "rapid_loss",
        recommendation: Recommendation::IncreaseCalories,
        predicate: rapid_loss,
        rationale: rapid_loss_rationale,
    },
    CoachingRule {
        name: "rapid_gain",
        recommendation: Recommendation::DecreaseCalories,
        predicate: rapid_gain,
        rationale: rapid_gain_rationale,
    },
    CoachingRule {
        name: "on_track",
        recommendation: Recommendation::MaintainCurrent,
        predicate: always,
        rationale: on_track_rationale,
    },
];

/// The decision table in evaluation order
pub fn rules() -> &'static [CoachingRule] {
    &RULES
}

/// Coaching decision engine
pub struct CoachingEngine<'a> {
    config: &'a CoachingConfig,
}

impl<'a> CoachingEngine<'a> {
    pub fn new(config: &'a CoachingConfig) -> Self {
        Self { config }
    }

    /// Classify an estimate into one weekly recommendation
    pub fn coach(&self, estimate: &MetabolicEstimate, profile: &UserProfile) -> WeeklyCoaching {
        let inputs = CoachingInputs::new(estimate, profile);
        // The final rule always matches
        let rule = rules()
            .iter()
            .find(|rule| rule.matches(&inputs, self.config))
            .unwrap_or(&RULES[RULES.len() - 1]);

        let recommendation = rule.recommendation;
        let target_calorie_adjustment = self.adjustment(recommendation, &inputs);

        debug!(
            rule = rule.name,
            recommendation = recommendation.as_str(),
            target_calorie_adjustment,
            "Coaching rule matched"
        );

        WeeklyCoaching {
            recommendation,
            target_calorie_adjustment,
            rationale: rule.rationale(&inputs),
            confidence: estimate.confidence,
            intervention_required: recommendation.requires_intervention(),
            rule: rule.name.to_string(),
        }
    }

    /// Signed daily calorie adjustment for a recommendation, rounded to 1 kcal
    pub fn adjustment(&self, recommendation: Recommendation, inputs: &CoachingInputs) -> f64 {
        let step =
            self.config.adjustment_base_kcal + self.config.adjustment_tdee_fraction * inputs.current_tdee;
        let raw = match recommendation {
            Recommendation::MaintainCurrent => 0.0,
            Recommendation::IncreaseCalories => step,
            Recommendation::DecreaseCalories => -step,
            Recommendation::RefeedRecommended => self.config.refeed_tdee_fraction * inputs.current_tdee,
            Recommendation::DietBreakRecommended => {
                inputs.baseline_tdee - inputs.weekly_intake_average
            }
            Recommendation::MetabolicReset => inputs.baseline_tdee - inputs.current_tdee,
        };
        raw.round()
    }
}

// Predicates

fn seeded_from_profile(i: &CoachingInputs, _: &CoachingConfig) -> bool {
    i.seeded_from_profile
}

fn severe_adaptation(i: &CoachingInputs, c: &CoachingConfig) -> bool {
    i.goal == Goal::FatLoss && i.adaptation_factor < c.diet_break_threshold
}

fn moderate_adaptation(i: &CoachingInputs, c: &CoachingConfig) -> bool {
    i.goal == Goal::FatLoss
        && i.adaptation_factor >= c.diet_break_threshold
        && i.adaptation_factor < c.adaptation_threshold
}

fn adaptation_outside_fat_loss(i: &CoachingInputs, c: &CoachingConfig) -> bool {
    i.goal != Goal::FatLoss && i.adaptation_factor < c.adaptation_threshold
}

fn is_plateau(i: &CoachingInputs, c: &CoachingConfig) -> bool {
    i.weekly_weight_change.abs() < c.plateau_kg
}

fn plateau_fat_loss(i: &CoachingInputs, c: &CoachingConfig) -> bool {
    i.goal == Goal::FatLoss && is_plateau(i, c)
}

fn plateau_muscle_gain(i: &CoachingInputs, c: &CoachingConfig) -> bool {
    i.goal == Goal::MuscleGain && is_plateau(i, c)
}

fn plateau_maintenance(i: &CoachingInputs, c: &CoachingConfig) -> bool {
    i.goal == Goal::Maintenance && is_plateau(i, c)
}

fn rapid_loss(i: &CoachingInputs, c: &CoachingConfig) -> bool {
    i.weekly_weight_change < -c.max_weekly_loss_fraction * i.body_weight_kg
}

fn rapid_gain(i: &CoachingInputs, c: &CoachingConfig) -> bool {
    i.goal != Goal::MuscleGain && i.weekly_weight_change > c.max_weekly_gain_fraction * i.body_weight_kg
}

fn always(_: &CoachingInputs, _: &CoachingConfig) -> bool {
    true
}

// Rationale templates

fn seeded_from_profile_rationale(_: &CoachingInputs) -> String {
    "Your tracking data does not support a metabolism estimate yet. \
     Keep logging weigh-ins and food daily; recommendations start after two consistent weeks."
        .to_string()
}

fn diet_break_rationale(i: &CoachingInputs) -> String {
    format!(
        "Your metabolism is running at {:.0}% of its predicted rate ({:.0} vs {:.0} kcal/day). \
         A diet break at maintenance calories is recommended before continuing fat loss.",
        i.adaptation_factor * 100.0,
        i.current_tdee,
        i.baseline_tdee
    )
}

fn refeed_rationale(i: &CoachingInputs) -> String {
    format!(
        "Your metabolism has adapted to {:.0}% of its predicted rate. \
         A short refeed can help counteract the slowdown.",
        i.adaptation_factor * 100.0
    )
}

fn adaptation_increase_rationale(i: &CoachingInputs) -> String {
    format!(
        "Your energy expenditure is {:.0}% of predicted ({:.0} kcal/day). \
         Increasing calories supports your {} goal.",
        i.adaptation_factor * 100.0,
        i.current_tdee,
        i.goal.as_str().replace('_', " ")
    )
}

fn plateau_rationale(i: &CoachingInputs) -> String {
    format!(
        "Your weight trend changed by only {:+.2} kg this week. \
         Adjusting calories will restart progress toward your {} goal.",
        i.weekly_weight_change,
        i.goal.as_str().replace('_', " ")
    )
}

fn stable_weight_rationale(i: &CoachingInputs) -> String {
    format!(
        "Your weight is stable ({:+.2} kg this week) at about {:.0} kcal/day. Keep it up.",
        i.weekly_weight_change, i.weekly_intake_average
    )
}

fn rapid_loss_rationale(i: &CoachingInputs) -> String {
    format!(
        "You lost {:.2} kg this week, more than 1% of body weight. \
         Slowing the rate of loss helps preserve muscle.",
        -i.weekly_weight_change
    )
}

fn rapid_gain_rationale(i: &CoachingInputs) -> String {
    format!(
        "You gained {:.2} kg this week, faster than intended for your {} goal.",
        i.weekly_weight_change,
        i.goal.as_str().replace('_', " ")
    )
}

fn on_track_rationale(i: &CoachingInputs) -> String {
    format!(
        "Your weight trend ({:+.2} kg/week) is on track. Keep your current intake.",
        i.weekly_weight_change
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BiologicalSex, QualityFlag};
    use chrono::Utc;
    use uuid::Uuid;

    fn profile(goal: Goal) -> UserProfile {
        UserProfile {
            age_years: 30,
            sex: BiologicalSex::Male,
            height_cm: 180.0,
            weight_kg: 80.0,
            activity_factor: 1.4,
            goal,
        }
    }

    fn estimate(adaptation_factor: f64, weekly_weight_change: f64) -> MetabolicEstimate {
        let baseline_tdee = 2600.0;
        MetabolicEstimate {
            estimate_id: Uuid::new_v4(),
            current_tdee: baseline_tdee * adaptation_factor,
            baseline_tdee,
            adaptation_factor,
            confidence: 0.8,
            weekly_weight_change,
            weekly_intake_average: 2000.0,
            metabolic_flexibility: 1.0,
            last_calculated: Utc::now(),
            quality_flags: vec![],
        }
    }

    fn coach(adaptation: f64, change: f64, goal: Goal) -> WeeklyCoaching {
        let config = CoachingConfig::default();
        CoachingEngine::new(&config).coach(&estimate(adaptation, change), &profile(goal))
    }

    #[test]
    fn test_rule_order() {
        let names: Vec<&str> = rules().iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "seeded_from_profile",
                "severe_adaptation",
                "moderate_adaptation",
                "adaptation_outside_fat_loss",
                "plateau_fat_loss",
                "plateau_muscle_gain",
                "plateau_maintenance",
                "rapid_loss",
                "rapid_gain",
                "on_track",
            ]
        );
    }

    #[test]
    fn test_each_rule_reachable() {
        let cases = [
            (0.70, -0.3, Goal::FatLoss, "severe_adaptation"),
            (0.80, -0.3, Goal::FatLoss, "moderate_adaptation"),
            (0.80, -0.3, Goal::Maintenance, "adaptation_outside_fat_loss"),
            (0.95, 0.05, Goal::FatLoss, "plateau_fat_loss"),
            (0.95, -0.05, Goal::MuscleGain, "plateau_muscle_gain"),
            (0.95, 0.0, Goal::Maintenance, "plateau_maintenance"),
            (0.95, -0.9, Goal::FatLoss, "rapid_loss"),
            (1.05, 0.5, Goal::Maintenance, "rapid_gain"),
            (1.00, -0.4, Goal::FatLoss, "on_track"),
        ];
        for (adaptation, change, goal, expected) in cases {
            assert_eq!(coach(adaptation, change, goal).rule, expected);
        }
    }

    #[test]
    fn test_diet_break() {
        let coaching = coach(0.70, -0.3, Goal::FatLoss);
        assert_eq!(coaching.recommendation, Recommendation::DietBreakRecommended);
        assert!(coaching.intervention_required);
        // baseline 2600 - intake average 2000
        assert_eq!(coaching.target_calorie_adjustment, 600.0);
        assert!(coaching.rationale.contains("70%"));
    }

    #[test]
    fn test_refeed_adjustment() {
        let coaching = coach(0.80, -0.3, Goal::FatLoss);
        assert_eq!(coaching.recommendation, Recommendation::RefeedRecommended);
        assert!(coaching.intervention_required);
        // 15% of 2080
        assert_eq!(coaching.target_calorie_adjustment, 312.0);
    }

    #[test]
    fn test_adaptation_threshold_boundary() {
        // Exactly at the adaptation threshold is not adapted
        let coaching = coach(0.85, -0.3, Goal::FatLoss);
        assert_eq!(coaching.rule, "on_track");
        assert_eq!(coaching.recommendation, Recommendation::MaintainCurrent);

        // Exactly at the diet-break threshold refeeds rather than breaks
        let coaching = coach(0.75, -0.3, Goal::FatLoss);
        assert_eq!(coaching.recommendation, Recommendation::RefeedRecommended);

        let coaching = coach(0.85, -0.3, Goal::MuscleGain);
        assert_ne!(coaching.rule, "adaptation_outside_fat_loss");
    }

    #[test]
    fn test_plateau_adjustments() {
        let coaching = coach(1.0, 0.0, Goal::FatLoss);
        assert_eq!(coaching.recommendation, Recommendation::DecreaseCalories);
        // -(100 + 5% of 2600)
        assert_eq!(coaching.target_calorie_adjustment, -230.0);
        assert!(!coaching.intervention_required);

        let coaching = coach(1.0, 0.0, Goal::MuscleGain);
        assert_eq!(coaching.recommendation, Recommendation::IncreaseCalories);
        assert_eq!(coaching.target_calorie_adjustment, 230.0);
    }

    #[test]
    fn test_plateau_boundary_is_exclusive() {
        let coaching = coach(1.0, -0.1, Goal::FatLoss);
        assert_ne!(coaching.rule, "plateau_fat_loss");
    }

    #[test]
    fn test_rapid_gain_ignored_when_building_muscle() {
        let coaching = coach(1.05, 0.5, Goal::MuscleGain);
        assert_eq!(coaching.rule, "on_track");
    }

    #[test]
    fn test_maintain_has_zero_adjustment() {
        let coaching = coach(1.0, 0.0, Goal::Maintenance);
        assert_eq!(coaching.recommendation, Recommendation::MaintainCurrent);
        assert_eq!(coaching.target_calorie_adjustment, 0.0);
        assert!(!coaching.intervention_required);
    }

    #[test]
    fn test_seeded_placeholder_maintains() {
        let config = CoachingConfig::default();
        let mut est = estimate(1.0, 0.0);
        est.confidence = 0.0;
        est.quality_flags.push(QualityFlag::SeededFromProfile);

        let coaching = CoachingEngine::new(&config).coach(&est, &profile(Goal::FatLoss));
        assert_eq!(coaching.rule, "seeded_from_profile");
        assert_eq!(coaching.recommendation, Recommendation::MaintainCurrent);
        assert_eq!(coaching.confidence, 0.0);
    }

    #[test]
    fn test_carried_estimate_is_classified() {
        let config = CoachingConfig::default();
        let mut est = estimate(0.675, -0.3);
        est.confidence = 0.0;
        est.quality_flags.push(QualityFlag::InsufficientData);

        let coaching = CoachingEngine::new(&config).coach(&est, &profile(Goal::FatLoss));
        assert_eq!(coaching.rule, "severe_adaptation");
        assert_eq!(coaching.recommendation, Recommendation::DietBreakRecommended);
    }

    #[test]
    fn test_metabolic_reset_adjustment() {
        let config = CoachingConfig::default();
        let engine = CoachingEngine::new(&config);
        let inputs = CoachingInputs::new(&estimate(0.9, 0.0), &profile(Goal::FatLoss));
        // 2600 - 2340
        assert_eq!(engine.adjustment(Recommendation::MetabolicReset, &inputs), 260.0);
    }

    #[test]
    fn test_deterministic() {
        let a = coach(0.8, -0.2, Goal::FatLoss);
        let b = coach(0.8, -0.2, Goal::FatLoss);
        assert_eq!(a, b);
    }
}
