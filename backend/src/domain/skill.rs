//! Skills, user skill declarations and their validation.
//!
//! A [`Skill`] is shared reference data. A [`UserSkill`] records one user's
//! `teach` or `learn` relationship to a skill; at most one active row exists
//! per (user, skill, role) and removal deactivates rather than deletes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::UserId;

/// Longest accepted skill name, in characters.
pub const SKILL_NAME_MAX: usize = 80;

/// Identifier of a shared [`Skill`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(Uuid);

impl SkillId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap a UUID read from storage.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SkillId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Error raised when parsing a textual enum value fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised {kind} `{value}`")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Direction of a user's relationship to a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SkillRole {
    Teach,
    Learn,
}

impl SkillRole {
    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Teach => "teach",
            Self::Learn => "learn",
        }
    }
}

impl fmt::Display for SkillRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "teach" => Ok(Self::Teach),
            "learn" => Ok(Self::Learn),
            _ => Err(ParseEnumError::new("skill role", s)),
        }
    }
}

/// Self-declared or assessed proficiency of a teacher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// Scaling applied to a skill's base value.
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Beginner => 0.7,
            Self::Intermediate => 1.0,
            Self::Advanced => 1.4,
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(ParseEnumError::new("skill level", s)),
        }
    }
}

/// Shared skill reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    pub category: String,
    /// Community demand on a 0–100 scale.
    pub demand_score: Option<f64>,
    /// Baseline difficulty on a 0–100 scale.
    pub base_difficulty: Option<f64>,
}

/// A user's declaration against a skill, joined with the skill itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSkill {
    pub id: Uuid,
    pub user_id: UserId,
    pub skill: Skill,
    pub role: SkillRole,
    pub level: Option<SkillLevel>,
    /// Difficulty on a 0–100 scale, self-reported or assessed.
    pub difficulty_score: Option<f64>,
    /// Weekly teaching hours on offer; `None` or zero means unlimited.
    pub weekly_hours_available: Option<f64>,
    pub active: bool,
}

impl UserSkill {
    /// The shared skill identifier.
    #[must_use]
    pub const fn skill_id(&self) -> SkillId {
        self.skill.id
    }

    /// Declared weekly cap, or `None` when the user set no limit.
    ///
    /// Zero, negative and non-finite values count as "no limit" so a
    /// missing value is never mistaken for zero capacity.
    #[must_use]
    pub fn weekly_cap(&self) -> Option<f64> {
        self.weekly_hours_available
            .filter(|hours| hours.is_finite() && *hours > 0.0)
    }
}

/// Validation failures for skill input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkillValidationError {
    /// The skill name was blank.
    #[error("skill name must not be empty")]
    EmptyName,
    /// The skill name exceeded [`SKILL_NAME_MAX`].
    #[error("skill name must be at most {max} characters")]
    NameTooLong { max: usize },
    /// The category was blank.
    #[error("skill category must not be empty")]
    EmptyCategory,
    /// A 0–100 score was outside its range.
    #[error("{field} must be between 0 and 100, got {value}")]
    ScoreOutOfRange { field: &'static str, value: f64 },
    /// Weekly hours were negative or not a number.
    #[error("weekly hours must be zero or positive, got {value}")]
    InvalidHours { value: f64 },
}

/// Check that an optional score lies in `0..=100`.
///
/// # Errors
/// Returns [`SkillValidationError::ScoreOutOfRange`] for out-of-range or
/// non-finite scores.
pub fn validate_score(field: &'static str, value: Option<f64>) -> Result<(), SkillValidationError> {
    match value {
        Some(score) if !(0.0..=100.0).contains(&score) => {
            Err(SkillValidationError::ScoreOutOfRange {
                field,
                value: score,
            })
        }
        _ => Ok(()),
    }
}

/// Normalise a skill name for storage and lookup.
///
/// # Errors
/// Returns [`SkillValidationError`] for blank or oversized names.
pub fn normalise_skill_name(raw: &str) -> Result<String, SkillValidationError> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Err(SkillValidationError::EmptyName);
    }
    if collapsed.chars().count() > SKILL_NAME_MAX {
        return Err(SkillValidationError::NameTooLong {
            max: SKILL_NAME_MAX,
        });
    }
    Ok(collapsed)
}

/// Input for declaring (or re-declaring) a skill on a user's profile.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillDeclaration {
    pub name: String,
    pub category: String,
    pub role: SkillRole,
    pub level: Option<SkillLevel>,
    pub difficulty_score: Option<f64>,
    pub weekly_hours_available: Option<f64>,
}

impl SkillDeclaration {
    /// Validate and normalise the declaration.
    ///
    /// Capacity fields only apply to `teach`; they are dropped for `learn`.
    ///
    /// # Errors
    /// Returns [`SkillValidationError`] describing the first invalid field.
    pub fn validated(self) -> Result<Self, SkillValidationError> {
        let name = normalise_skill_name(&self.name)?;
        let category = self.category.trim().to_owned();
        if category.is_empty() {
            return Err(SkillValidationError::EmptyCategory);
        }
        validate_score("difficulty", self.difficulty_score)?;
        if let Some(hours) = self.weekly_hours_available {
            if !hours.is_finite() || hours < 0.0 {
                return Err(SkillValidationError::InvalidHours { value: hours });
            }
        }
        let (level, difficulty_score, weekly_hours_available) = match self.role {
            SkillRole::Teach => (
                self.level,
                self.difficulty_score,
                self.weekly_hours_available,
            ),
            SkillRole::Learn => (None, None, None),
        };
        Ok(Self {
            name,
            category,
            role: self.role,
            level,
            difficulty_score,
            weekly_hours_available,
        })
    }
}

/// Row-level write for a user skill; the store creates or reactivates it.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSkillDraft {
    pub user_id: UserId,
    pub skill_id: SkillId,
    pub role: SkillRole,
    pub level: Option<SkillLevel>,
    pub difficulty_score: Option<f64>,
    pub weekly_hours_available: Option<f64>,
}

/// Input for creating a shared skill on first use.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSkill {
    pub name: String,
    pub category: String,
}

/// Level and difficulty suggested by the external assessment service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillAssessment {
    pub level: SkillLevel,
    pub difficulty: f64,
    pub explanation: String,
}

impl SkillAssessment {
    /// Check the suggested difficulty lies in range.
    ///
    /// # Errors
    /// Returns [`SkillValidationError::ScoreOutOfRange`] when it does not.
    pub fn validate(&self) -> Result<(), SkillValidationError> {
        validate_score("difficulty", Some(self.difficulty))
    }
}
