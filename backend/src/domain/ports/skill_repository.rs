//! Port for skill reference data and users' skill declarations.
//!
//! All `UserSkill` reads return active rows only; deactivated declarations
//! are visible to the store alone, which reactivates them on re-declaration.

use async_trait::async_trait;

use crate::domain::{
    NewSkill, Skill, SkillAssessment, SkillId, SkillRole, UserId, UserSkill, UserSkillDraft,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by skill repository adapters.
    pub enum SkillRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "skill repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "skill repository query failed: {message}",
        /// A referenced skill does not exist.
        UnknownSkill { skill_id: String } => "skill {skill_id} does not exist",
    }
}

/// Storage for skills and user skill declarations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SkillRepository: Send + Sync {
    /// Fetch a skill by id.
    async fn find_skill(&self, skill_id: &SkillId) -> Result<Option<Skill>, SkillRepositoryError>;

    /// Fetch a skill by case-insensitive name.
    async fn find_skill_by_name(&self, name: &str) -> Result<Option<Skill>, SkillRepositoryError>;

    /// Create a skill with default demand and difficulty.
    ///
    /// Creating a name that already exists (ignoring case) returns the
    /// existing skill.
    async fn insert_skill(&self, skill: &NewSkill) -> Result<Skill, SkillRepositoryError>;

    /// A user's active declarations for one role.
    async fn list_user_skills(
        &self,
        user_id: &UserId,
        role: SkillRole,
    ) -> Result<Vec<UserSkill>, SkillRepositoryError>;

    /// The active declaration for a (user, skill, role) triple.
    async fn find_active_user_skill(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<Option<UserSkill>, SkillRepositoryError>;

    /// Active `teach` declarations of `skill_id` by anyone but `exclude`.
    async fn find_teachers(
        &self,
        skill_id: &SkillId,
        exclude: &UserId,
    ) -> Result<Vec<UserSkill>, SkillRepositoryError>;

    /// Every active `teach` declaration by anyone but `exclude`.
    async fn list_teaching_offers(
        &self,
        exclude: &UserId,
    ) -> Result<Vec<UserSkill>, SkillRepositoryError>;

    /// Create the declaration, or reactivate and overwrite an existing row
    /// for the same (user, skill, role).
    async fn upsert_user_skill(
        &self,
        draft: &UserSkillDraft,
    ) -> Result<UserSkill, SkillRepositoryError>;

    /// Deactivate a declaration. Returns `false` when no active row existed.
    async fn deactivate_user_skill(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<bool, SkillRepositoryError>;

    /// Write an assessed level and difficulty onto the active `teach`
    /// declaration. Returns `None` when there is none.
    async fn apply_assessment(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        assessment: &SkillAssessment,
    ) -> Result<Option<UserSkill>, SkillRepositoryError>;
}

/// Fixture implementation holding no skills.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSkillRepository;

#[async_trait]
impl SkillRepository for FixtureSkillRepository {
    async fn find_skill(&self, _skill_id: &SkillId) -> Result<Option<Skill>, SkillRepositoryError> {
        Ok(None)
    }

    async fn find_skill_by_name(&self, _name: &str) -> Result<Option<Skill>, SkillRepositoryError> {
        Ok(None)
    }

    async fn insert_skill(&self, skill: &NewSkill) -> Result<Skill, SkillRepositoryError> {
        Ok(Skill {
            id: SkillId::random(),
            name: skill.name.clone(),
            category: skill.category.clone(),
            demand_score: Some(crate::domain::DEFAULT_SCORE),
            base_difficulty: Some(crate::domain::DEFAULT_SCORE),
        })
    }

    async fn list_user_skills(
        &self,
        _user_id: &UserId,
        _role: SkillRole,
    ) -> Result<Vec<UserSkill>, SkillRepositoryError> {
        Ok(Vec::new())
    }

    async fn find_active_user_skill(
        &self,
        _user_id: &UserId,
        _skill_id: &SkillId,
        _role: SkillRole,
    ) -> Result<Option<UserSkill>, SkillRepositoryError> {
        Ok(None)
    }

    async fn find_teachers(
        &self,
        _skill_id: &SkillId,
        _exclude: &UserId,
    ) -> Result<Vec<UserSkill>, SkillRepositoryError> {
        Ok(Vec::new())
    }

    async fn list_teaching_offers(
        &self,
        _exclude: &UserId,
    ) -> Result<Vec<UserSkill>, SkillRepositoryError> {
        Ok(Vec::new())
    }

    async fn upsert_user_skill(
        &self,
        draft: &UserSkillDraft,
    ) -> Result<UserSkill, SkillRepositoryError> {
        Err(SkillRepositoryError::unknown_skill(draft.skill_id.to_string()))
    }

    async fn deactivate_user_skill(
        &self,
        _user_id: &UserId,
        _skill_id: &SkillId,
        _role: SkillRole,
    ) -> Result<bool, SkillRepositoryError> {
        Ok(false)
    }

    async fn apply_assessment(
        &self,
        _user_id: &UserId,
        _skill_id: &SkillId,
        _assessment: &SkillAssessment,
    ) -> Result<Option<UserSkill>, SkillRepositoryError> {
        Ok(None)
    }
}
