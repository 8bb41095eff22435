//! Skill value model.
//!
//! Turns a teacher's declared skill into one comparable scalar:
//!
//! ```text
//! base  = difficulty*0.30 + demand*0.25 + reputation*0.20
//!       + min(hours*10, 50)*0.25
//! value = base * level multiplier
//! ```
//!
//! Every input has a default, so valuation never fails. Inputs are clamped to
//! their 0–100 domain; the result is not, so an advanced teacher can reach
//! 122.5.

use super::{DEFAULT_REPUTATION, SkillLevel, UserSkill};

/// Fallback for difficulty and demand scores.
pub const DEFAULT_SCORE: f64 = 50.0;
/// Weekly hours assumed when none (or zero) are declared.
pub const DEFAULT_WEEKLY_HOURS: f64 = 1.0;
/// Upper bound of every score input.
pub const MAX_SCORE: f64 = 100.0;

const DIFFICULTY_WEIGHT: f64 = 0.30;
const DEMAND_WEIGHT: f64 = 0.25;
const REPUTATION_WEIGHT: f64 = 0.20;
const AVAILABILITY_WEIGHT: f64 = 0.25;
const HOURS_TO_POINTS: f64 = 10.0;
const AVAILABILITY_POINTS_CAP: f64 = 50.0;

/// Fully defaulted inputs of the value model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueInputs {
    /// Difficulty score in `0..=100`.
    pub difficulty: f64,
    /// Community demand in `0..=100`.
    pub demand: f64,
    /// Owner reputation in `0..=100`.
    pub reputation: f64,
    /// Positive weekly hours offered.
    pub weekly_hours: f64,
    /// Declared proficiency, if any.
    pub level: Option<SkillLevel>,
}

impl ValueInputs {
    /// Resolve inputs for a user skill owned by someone with
    /// `owner_reputation`.
    ///
    /// Difficulty falls back to the skill's base difficulty, then to
    /// [`DEFAULT_SCORE`].
    #[must_use]
    pub fn resolve(user_skill: &UserSkill, owner_reputation: Option<f64>) -> Self {
        let skill = &user_skill.skill;
        Self {
            difficulty: score_or_default(user_skill.difficulty_score.or(skill.base_difficulty)),
            demand: score_or_default(skill.demand_score),
            reputation: owner_reputation
                .filter(|value| value.is_finite())
                .map_or(DEFAULT_REPUTATION, clamp_score),
            weekly_hours: user_skill
                .weekly_hours_available
                .filter(|hours| hours.is_finite() && *hours > 0.0)
                .unwrap_or(DEFAULT_WEEKLY_HOURS),
            level: user_skill.level,
        }
    }

    /// Evaluate the model. Non-negative; at most 122.5 for an advanced
    /// teacher with every score maxed.
    #[must_use]
    pub fn value(&self) -> f64 {
        let availability = (self.weekly_hours * HOURS_TO_POINTS).min(AVAILABILITY_POINTS_CAP);
        let base = self.difficulty * DIFFICULTY_WEIGHT
            + self.demand * DEMAND_WEIGHT
            + self.reputation * REPUTATION_WEIGHT
            + availability * AVAILABILITY_WEIGHT;
        base * level_multiplier(self.level)
    }
}

/// Multiplier for an optional level; unknown levels count as intermediate.
#[must_use]
pub fn level_multiplier(level: Option<SkillLevel>) -> f64 {
    level.map_or(1.0, SkillLevel::multiplier)
}

/// Value of `user_skill` when taught by an owner with `owner_reputation`.
///
/// # Examples
/// ```
/// use skillswap::domain::{compute_value, Skill, SkillId, SkillLevel, SkillRole, UserId, UserSkill};
///
/// let user_skill = UserSkill {
///     id: uuid::Uuid::new_v4(),
///     user_id: UserId::random(),
///     skill: Skill {
///         id: SkillId::random(),
///         name: "Pottery".into(),
///         category: "Crafts".into(),
///         demand_score: Some(70.0),
///         base_difficulty: None,
///     },
///     role: SkillRole::Teach,
///     level: Some(SkillLevel::Advanced),
///     difficulty_score: Some(80.0),
///     weekly_hours_available: Some(10.0),
///     active: true,
/// };
/// let value = compute_value(&user_skill, Some(60.0));
/// assert!((value - 92.4).abs() < 1e-9);
/// ```
#[must_use]
pub fn compute_value(user_skill: &UserSkill, owner_reputation: Option<f64>) -> f64 {
    ValueInputs::resolve(user_skill, owner_reputation).value()
}

fn score_or_default(score: Option<f64>) -> f64 {
    score
        .filter(|value| value.is_finite())
        .map_or(DEFAULT_SCORE, clamp_score)
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, MAX_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Skill, SkillId, SkillRole, UserId};
    use rstest::rstest;
    use uuid::Uuid;

    fn teach_skill(
        difficulty: Option<f64>,
        base_difficulty: Option<f64>,
        demand: Option<f64>,
        hours: Option<f64>,
        level: Option<SkillLevel>,
    ) -> UserSkill {
        UserSkill {
            id: Uuid::new_v4(),
            user_id: UserId::random(),
            skill: Skill {
                id: SkillId::random(),
                name: "Pottery".to_owned(),
                category: "Crafts".to_owned(),
                demand_score: demand,
                base_difficulty,
            },
            role: SkillRole::Teach,
            level,
            difficulty_score: difficulty,
            weekly_hours_available: hours,
            active: true,
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn advanced_teacher_scenario() {
        let skill = teach_skill(
            Some(80.0),
            None,
            Some(70.0),
            Some(10.0),
            Some(SkillLevel::Advanced),
        );
        assert_close(compute_value(&skill, Some(60.0)), 92.4);
    }

    #[test]
    fn all_defaults_yield_the_neutral_value() {
        // 50*.30 + 50*.25 + 50*.20 + min(1*10, 50)*.25
        let skill = teach_skill(None, None, None, None, None);
        assert_close(compute_value(&skill, None), 40.0);
    }

    #[test]
    fn difficulty_falls_back_to_base_difficulty() {
        let with_base = teach_skill(None, Some(90.0), None, None, None);
        let inputs = ValueInputs::resolve(&with_base, None);
        assert_close(inputs.difficulty, 90.0);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(0.0))]
    fn unlimited_hours_value_as_one_hour(#[case] hours: Option<f64>) {
        let skill = teach_skill(None, None, None, hours, None);
        assert_close(ValueInputs::resolve(&skill, None).weekly_hours, 1.0);
    }

    #[test]
    fn availability_points_are_capped() {
        let five = teach_skill(None, None, None, Some(5.0), None);
        let forty = teach_skill(None, None, None, Some(40.0), None);
        assert_close(compute_value(&five, None), compute_value(&forty, None));
    }

    #[rstest]
    #[case(Some(SkillLevel::Beginner), 0.7)]
    #[case(Some(SkillLevel::Intermediate), 1.0)]
    #[case(Some(SkillLevel::Advanced), 1.4)]
    #[case(None, 1.0)]
    fn level_scales_the_base(#[case] level: Option<SkillLevel>, #[case] factor: f64) {
        let skill = teach_skill(None, None, None, None, level);
        assert_close(compute_value(&skill, None), 40.0 * factor);
    }

    #[test]
    fn extreme_inputs_are_clamped_but_the_level_still_scales() {
        let maxed = teach_skill(
            Some(100.0),
            None,
            Some(100.0),
            Some(80.0),
            Some(SkillLevel::Advanced),
        );
        assert_close(compute_value(&maxed, Some(100.0)), 122.5);

        let overflowing = teach_skill(
            Some(400.0),
            None,
            Some(250.0),
            Some(80.0),
            Some(SkillLevel::Advanced),
        );
        assert_close(compute_value(&overflowing, Some(900.0)), 122.5);

        let out_of_range = teach_skill(Some(-40.0), None, Some(-10.0), None, None);
        let low = compute_value(&out_of_range, Some(-5.0));
        assert!(low >= 0.0, "value {low}");
    }

    #[test]
    fn advanced_pair_keeps_its_true_ratio() {
        let expert = teach_skill(
            Some(100.0),
            None,
            Some(100.0),
            Some(80.0),
            Some(SkillLevel::Advanced),
        );
        let solid = teach_skill(
            Some(50.0),
            None,
            Some(100.0),
            Some(80.0),
            Some(SkillLevel::Advanced),
        );
        let high = compute_value(&expert, Some(100.0));
        let low = compute_value(&solid, Some(50.0));
        assert_close(high, 122.5);
        assert_close(low, 87.5);
        assert_eq!(crate::domain::compute_fairness(high, low).value(), 71);
    }

    #[test]
    fn fairness_threshold_sees_unclamped_advanced_values() {
        let expert = teach_skill(
            Some(100.0),
            None,
            Some(100.0),
            Some(80.0),
            Some(SkillLevel::Advanced),
        );
        // 20*.30 + 100*.25 + 20*.20 + 50*.25 = 47.5; * 1.4 = 66.5
        let modest = teach_skill(
            Some(20.0),
            None,
            Some(100.0),
            Some(80.0),
            Some(SkillLevel::Advanced),
        );
        let score = crate::domain::compute_fairness(
            compute_value(&expert, Some(100.0)),
            compute_value(&modest, Some(20.0)),
        );
        assert_eq!(score.value(), 54);
        assert!(!score.meets(crate::domain::DEFAULT_FAIRNESS_THRESHOLD));
    }

    #[test]
    fn valuation_is_deterministic() {
        let skill = teach_skill(Some(33.0), None, Some(61.0), Some(2.5), None);
        assert_close(
            compute_value(&skill, Some(47.0)),
            compute_value(&skill, Some(47.0)),
        );
    }
}
