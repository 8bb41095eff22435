//! Skill inventory service.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{SkillInventoryCommand, SkillRepository, SkillRepositoryError};
use crate::domain::{
    Error, NewSkill, SkillAssessment, SkillDeclaration, SkillId, SkillRole, SkillValidationError,
    UserId, UserSkill, UserSkillDraft,
};

/// Service implementing [`SkillInventoryCommand`].
#[derive(Clone)]
pub struct SkillInventoryService<S: ?Sized> {
    skills: Arc<S>,
}

impl<S: ?Sized> SkillInventoryService<S> {
    /// Create the service.
    pub const fn new(skills: Arc<S>) -> Self {
        Self { skills }
    }
}

fn map_repository_error(error: SkillRepositoryError) -> Error {
    match error {
        SkillRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("skill repository unavailable: {message}"))
        }
        SkillRepositoryError::Query { message } => {
            Error::internal(format!("skill repository error: {message}"))
        }
        SkillRepositoryError::UnknownSkill { skill_id } => {
            Error::not_found(format!("skill {skill_id} not found"))
        }
    }
}

fn map_validation_error(error: &SkillValidationError) -> Error {
    let field = match error {
        SkillValidationError::EmptyName | SkillValidationError::NameTooLong { .. } => "name",
        SkillValidationError::EmptyCategory => "category",
        SkillValidationError::ScoreOutOfRange { .. } => "difficulty",
        SkillValidationError::InvalidHours { .. } => "weeklyHoursAvailable",
    };
    Error::invalid_request(error.to_string()).with_details(json!({ "field": field }))
}

#[async_trait]
impl<S> SkillInventoryCommand for SkillInventoryService<S>
where
    S: SkillRepository + ?Sized,
{
    async fn add_skill(
        &self,
        user_id: &UserId,
        declaration: SkillDeclaration,
    ) -> Result<UserSkill, Error> {
        let declaration = declaration
            .validated()
            .map_err(|err| map_validation_error(&err))?;
        let existing = self
            .skills
            .find_skill_by_name(&declaration.name)
            .await
            .map_err(map_repository_error)?;
        let skill = match existing {
            Some(skill) => skill,
            None => {
                let created = self
                    .skills
                    .insert_skill(&NewSkill {
                        name: declaration.name.clone(),
                        category: declaration.category.clone(),
                    })
                    .await
                    .map_err(map_repository_error)?;
                info!(skill_id = %created.id, name = %created.name, "skill created");
                created
            }
        };
        let stored = self
            .skills
            .upsert_user_skill(&UserSkillDraft {
                user_id: user_id.clone(),
                skill_id: skill.id,
                role: declaration.role,
                level: declaration.level,
                difficulty_score: declaration.difficulty_score,
                weekly_hours_available: declaration.weekly_hours_available,
            })
            .await
            .map_err(map_repository_error)?;
        info!(
            user_id = %user_id,
            skill_id = %skill.id,
            role = %declaration.role,
            "skill declared"
        );
        Ok(stored)
    }

    async fn remove_skill(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<(), Error> {
        let removed = self
            .skills
            .deactivate_user_skill(user_id, skill_id, role)
            .await
            .map_err(map_repository_error)?;
        if !removed {
            return Err(Error::not_found(format!(
                "no active {role} declaration for skill {skill_id}"
            )));
        }
        info!(user_id = %user_id, skill_id = %skill_id, role = %role, "skill removed");
        Ok(())
    }

    async fn apply_assessment(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        assessment: SkillAssessment,
    ) -> Result<UserSkill, Error> {
        assessment
            .validate()
            .map_err(|err| map_validation_error(&err))?;
        let updated = self
            .skills
            .apply_assessment(user_id, skill_id, &assessment)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| {
                Error::not_found(format!("no active teach declaration for skill {skill_id}"))
            })?;
        info!(
            user_id = %user_id,
            skill_id = %skill_id,
            level = %assessment.level,
            difficulty = assessment.difficulty,
            explanation = %assessment.explanation,
            "assessment applied"
        );
        Ok(updated)
    }

    async fn list_skills(
        &self,
        user_id: &UserId,
        role: SkillRole,
    ) -> Result<Vec<UserSkill>, Error> {
        self.skills
            .list_user_skills(user_id, role)
            .await
            .map_err(map_repository_error)
    }
}
