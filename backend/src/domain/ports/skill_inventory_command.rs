//! Driving port for managing the skills on a user's profile.

use async_trait::async_trait;

use crate::domain::{
    Error, SkillAssessment, SkillDeclaration, SkillId, SkillRole, UserId, UserSkill,
};

/// Add, remove, assess and list a user's skill declarations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SkillInventoryCommand: Send + Sync {
    /// Declare a skill, creating the shared skill on first use and
    /// reactivating a previously removed declaration.
    ///
    /// # Errors
    /// `invalid_request` when the declaration fails validation.
    async fn add_skill(
        &self,
        user_id: &UserId,
        declaration: SkillDeclaration,
    ) -> Result<UserSkill, Error>;

    /// Deactivate a declaration.
    ///
    /// # Errors
    /// `not_found` when no active declaration exists.
    async fn remove_skill(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<(), Error>;

    /// Store an assessed level and difficulty on the user's teaching
    /// declaration.
    async fn apply_assessment(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        assessment: SkillAssessment,
    ) -> Result<UserSkill, Error>;

    /// Active declarations for one role.
    async fn list_skills(&self, user_id: &UserId, role: SkillRole)
    -> Result<Vec<UserSkill>, Error>;
}

/// Fixture that keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSkillInventoryCommand;

#[async_trait]
impl SkillInventoryCommand for FixtureSkillInventoryCommand {
    async fn add_skill(
        &self,
        _user_id: &UserId,
        declaration: SkillDeclaration,
    ) -> Result<UserSkill, Error> {
        Err(Error::invalid_request(format!(
            "cannot store skill {}",
            declaration.name
        )))
    }

    async fn remove_skill(
        &self,
        _user_id: &UserId,
        skill_id: &SkillId,
        _role: SkillRole,
    ) -> Result<(), Error> {
        Err(Error::not_found(format!("skill {skill_id} is not declared")))
    }

    async fn apply_assessment(
        &self,
        _user_id: &UserId,
        skill_id: &SkillId,
        _assessment: SkillAssessment,
    ) -> Result<UserSkill, Error> {
        Err(Error::not_found(format!("skill {skill_id} is not taught")))
    }

    async fn list_skills(
        &self,
        _user_id: &UserId,
        _role: SkillRole,
    ) -> Result<Vec<UserSkill>, Error> {
        Ok(Vec::new())
    }
}
