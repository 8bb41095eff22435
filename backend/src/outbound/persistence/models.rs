//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types report
//! malformed rows as plain messages that each repository wraps in its own
//! query error.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    FairnessScore, Skill, SkillId, SkillLevel, SkillRole, Swap, SwapId, SwapParticipant,
    SwapStatus, UserId, UserProfile, UserSkill,
};

use super::schema::{skills, swap_participants, swaps, user_profiles, user_skills};

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = skills)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SkillRow {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub demand_score: Option<f64>,
    pub base_difficulty: Option<f64>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = skills)]
pub(crate) struct NewSkillRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub category: &'a str,
    pub demand_score: Option<f64>,
    pub base_difficulty: Option<f64>,
}

impl From<SkillRow> for Skill {
    fn from(row: SkillRow) -> Self {
        Self {
            id: SkillId::from_uuid(row.id),
            name: row.name,
            category: row.category,
            demand_score: row.demand_score,
            base_difficulty: row.base_difficulty,
        }
    }
}

// ---------------------------------------------------------------------------
// User skills
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_skills)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserSkillRow {
    pub id: Uuid,
    pub user_id: Uuid,
    #[expect(dead_code, reason = "the joined skill row carries the identifier")]
    pub skill_id: Uuid,
    pub role: String,
    pub level: Option<String>,
    pub difficulty_score: Option<f64>,
    pub weekly_hours_available: Option<f64>,
    pub active: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_skills)]
pub(crate) struct NewUserSkillRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub skill_id: Uuid,
    pub role: &'a str,
    pub level: Option<&'a str>,
    pub difficulty_score: Option<f64>,
    pub weekly_hours_available: Option<f64>,
    pub active: bool,
}

/// Combine a declaration with its joined skill.
pub(crate) fn user_skill_from_rows(row: UserSkillRow, skill: SkillRow) -> Result<UserSkill, String> {
    let role: SkillRole = row.role.parse().map_err(|err| format!("{err}"))?;
    let level = row
        .level
        .as_deref()
        .map(str::parse::<SkillLevel>)
        .transpose()
        .map_err(|err| format!("{err}"))?;
    Ok(UserSkill {
        id: row.id,
        user_id: UserId::from_uuid(row.user_id),
        skill: skill.into(),
        role,
        level,
        difficulty_score: row.difficulty_score,
        weekly_hours_available: row.weekly_hours_available,
        active: row.active,
    })
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserProfileRow {
    pub user_id: Uuid,
    pub display_name: String,
    pub reputation: Option<f64>,
    pub total_swaps_completed: i32,
    pub hours_taught: f64,
    pub hours_learned: f64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_profiles)]
pub(crate) struct NewProfileCreditRow {
    pub user_id: Uuid,
    pub total_swaps_completed: i32,
    pub hours_taught: f64,
    pub hours_learned: f64,
}

impl TryFrom<UserProfileRow> for UserProfile {
    type Error = String;

    fn try_from(row: UserProfileRow) -> Result<Self, Self::Error> {
        let total_swaps_completed = u32::try_from(row.total_swaps_completed)
            .map_err(|_| format!("negative swap count {}", row.total_swaps_completed))?;
        Ok(Self {
            user_id: UserId::from_uuid(row.user_id),
            display_name: row.display_name,
            reputation: row.reputation,
            total_swaps_completed,
            hours_taught: row.hours_taught,
            hours_learned: row.hours_learned,
        })
    }
}

// ---------------------------------------------------------------------------
// Swaps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = swaps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SwapRow {
    pub id: Uuid,
    pub status: String,
    pub fairness_score: i16,
    pub rationale: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = swaps)]
pub(crate) struct NewSwapRow<'a> {
    pub id: Uuid,
    pub status: &'a str,
    pub fairness_score: i16,
    pub rationale: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable swap columns written by a lifecycle transition.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = swaps)]
pub(crate) struct SwapUpdate<'a> {
    pub status: &'a str,
    pub fairness_score: i16,
    pub rationale: &'a str,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = swap_participants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ParticipantRow {
    pub swap_id: Uuid,
    pub seat: i16,
    pub user_id: Uuid,
    pub teaching_skill_id: Uuid,
    pub learning_skill_id: Uuid,
    pub teaching_hours_per_week: f64,
    pub learning_hours_per_week: f64,
    pub accepted: bool,
}

/// Mutable participant columns written by a lifecycle transition.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = swap_participants)]
pub(crate) struct ParticipantUpdate {
    pub teaching_skill_id: Uuid,
    pub learning_skill_id: Uuid,
    pub teaching_hours_per_week: f64,
    pub learning_hours_per_week: f64,
    pub accepted: bool,
}

impl From<&SwapParticipant> for ParticipantUpdate {
    fn from(participant: &SwapParticipant) -> Self {
        Self {
            teaching_skill_id: *participant.teaching_skill_id.as_uuid(),
            learning_skill_id: *participant.learning_skill_id.as_uuid(),
            teaching_hours_per_week: participant.teaching_hours_per_week,
            learning_hours_per_week: participant.learning_hours_per_week,
            accepted: participant.accepted,
        }
    }
}

pub(crate) fn fairness_column(score: FairnessScore) -> i16 {
    i16::from(score.value())
}

/// Participant rows for both seats, proposer first.
pub(crate) fn participant_rows(swap: &Swap) -> Vec<ParticipantRow> {
    (0_i16..)
        .zip(&swap.participants)
        .map(|(seat, participant)| {
            let update = ParticipantUpdate::from(participant);
            ParticipantRow {
                swap_id: *swap.id.as_uuid(),
                seat,
                user_id: *participant.user_id.as_uuid(),
                teaching_skill_id: update.teaching_skill_id,
                learning_skill_id: update.learning_skill_id,
                teaching_hours_per_week: update.teaching_hours_per_week,
                learning_hours_per_week: update.learning_hours_per_week,
                accepted: update.accepted,
            }
        })
        .collect()
}

fn participant_from_row(row: ParticipantRow) -> SwapParticipant {
    SwapParticipant {
        user_id: UserId::from_uuid(row.user_id),
        teaching_skill_id: SkillId::from_uuid(row.teaching_skill_id),
        learning_skill_id: SkillId::from_uuid(row.learning_skill_id),
        teaching_hours_per_week: row.teaching_hours_per_week,
        learning_hours_per_week: row.learning_hours_per_week,
        accepted: row.accepted,
    }
}

/// Rebuild a swap from its row and participant rows ordered by seat.
pub(crate) fn swap_from_rows(row: SwapRow, participants: Vec<ParticipantRow>) -> Result<Swap, String> {
    let status: SwapStatus = row.status.parse().map_err(|err| format!("{err}"))?;
    let fairness = u8::try_from(row.fairness_score)
        .map(FairnessScore::new)
        .map_err(|_| format!("fairness score {} out of range", row.fairness_score))?;
    let count = participants.len();
    let participants: [ParticipantRow; 2] = participants
        .try_into()
        .map_err(|_| format!("swap {} has {count} participants", row.id))?;
    Ok(Swap {
        id: SwapId::from_uuid(row.id),
        status,
        fairness,
        rationale: row.rationale,
        participants: participants.map(participant_from_row),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
