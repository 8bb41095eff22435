//! PostgreSQL-backed `SkillRepository` implementation using Diesel ORM.
//!
//! Declarations are always read joined with their skill row. Removing a
//! declaration only clears `active`, so re-declaring reuses the row.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{SkillRepository, SkillRepositoryError};
use crate::domain::{
    DEFAULT_SCORE, NewSkill, Skill, SkillAssessment, SkillId, SkillLevel, SkillRole, UserId,
    UserSkill, UserSkillDraft,
};

use super::diesel_basic_error_mapping::{
    is_foreign_key_violation, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{NewSkillRow, NewUserSkillRow, SkillRow, UserSkillRow, user_skill_from_rows};
use super::pool::{DbPool, PoolError};
use super::schema::{skills, user_skills};

diesel::define_sql_function! {
    /// SQL `lower()`.
    fn lower(value: diesel::sql_types::Text) -> diesel::sql_types::Text;
}

/// Diesel-backed implementation of the skill repository port.
#[derive(Clone)]
pub struct DieselSkillRepository {
    pool: DbPool,
}

impl DieselSkillRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> SkillRepositoryError {
    map_basic_pool_error(error, SkillRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> SkillRepositoryError {
    map_basic_diesel_error(
        error,
        SkillRepositoryError::query,
        SkillRepositoryError::connection,
    )
}

fn into_declarations(
    rows: Vec<(UserSkillRow, SkillRow)>,
) -> Result<Vec<UserSkill>, SkillRepositoryError> {
    rows.into_iter()
        .map(|(row, skill)| user_skill_from_rows(row, skill))
        .collect::<Result<Vec<_>, _>>()
        .map_err(SkillRepositoryError::query)
}

fn into_declaration(
    row: Option<(UserSkillRow, SkillRow)>,
) -> Result<Option<UserSkill>, SkillRepositoryError> {
    row.map(|(row, skill)| user_skill_from_rows(row, skill))
        .transpose()
        .map_err(SkillRepositoryError::query)
}

#[async_trait]
impl SkillRepository for DieselSkillRepository {
    async fn find_skill(&self, skill_id: &SkillId) -> Result<Option<Skill>, SkillRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = skills::table
            .filter(skills::id.eq(skill_id.as_uuid()))
            .select(SkillRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(Skill::from))
    }

    async fn find_skill_by_name(&self, name: &str) -> Result<Option<Skill>, SkillRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = skills::table
            .filter(lower(skills::name).eq(name.trim().to_lowercase()))
            .select(SkillRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(Skill::from))
    }

    async fn insert_skill(&self, skill: &NewSkill) -> Result<Skill, SkillRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let new_row = NewSkillRow {
            id: Uuid::new_v4(),
            name: skill.name.as_str(),
            category: skill.category.as_str(),
            demand_score: Some(DEFAULT_SCORE),
            base_difficulty: Some(DEFAULT_SCORE),
        };
        let inserted = diesel::insert_into(skills::table)
            .values(&new_row)
            .on_conflict_do_nothing()
            .returning(SkillRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        if let Some(row) = inserted {
            return Ok(row.into());
        }

        // Lost a race with a concurrent insert of the same name.
        debug!(name = %skill.name, "skill already exists, reusing");
        skills::table
            .filter(lower(skills::name).eq(skill.name.to_lowercase()))
            .select(SkillRow::as_select())
            .first(&mut conn)
            .await
            .map(Skill::from)
            .map_err(map_diesel_error)
    }

    async fn list_user_skills(
        &self,
        user_id: &UserId,
        role: SkillRole,
    ) -> Result<Vec<UserSkill>, SkillRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = user_skills::table
            .inner_join(skills::table)
            .filter(
                user_skills::user_id
                    .eq(user_id.as_uuid())
                    .and(user_skills::role.eq(role.as_str()))
                    .and(user_skills::active.eq(true)),
            )
            .order((skills::name.asc(), user_skills::id.asc()))
            .select((UserSkillRow::as_select(), SkillRow::as_select()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        into_declarations(rows)
    }

    async fn find_active_user_skill(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<Option<UserSkill>, SkillRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = user_skills::table
            .inner_join(skills::table)
            .filter(
                user_skills::user_id
                    .eq(user_id.as_uuid())
                    .and(user_skills::skill_id.eq(skill_id.as_uuid()))
                    .and(user_skills::role.eq(role.as_str()))
                    .and(user_skills::active.eq(true)),
            )
            .select((UserSkillRow::as_select(), SkillRow::as_select()))
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        into_declaration(row)
    }

    async fn find_teachers(
        &self,
        skill_id: &SkillId,
        exclude: &UserId,
    ) -> Result<Vec<UserSkill>, SkillRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = user_skills::table
            .inner_join(skills::table)
            .filter(
                user_skills::skill_id
                    .eq(skill_id.as_uuid())
                    .and(user_skills::role.eq(SkillRole::Teach.as_str()))
                    .and(user_skills::active.eq(true))
                    .and(user_skills::user_id.ne(exclude.as_uuid())),
            )
            .select((UserSkillRow::as_select(), SkillRow::as_select()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        into_declarations(rows)
    }

    async fn list_teaching_offers(
        &self,
        exclude: &UserId,
    ) -> Result<Vec<UserSkill>, SkillRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = user_skills::table
            .inner_join(skills::table)
            .filter(
                user_skills::role
                    .eq(SkillRole::Teach.as_str())
                    .and(user_skills::active.eq(true))
                    .and(user_skills::user_id.ne(exclude.as_uuid())),
            )
            .select((UserSkillRow::as_select(), SkillRow::as_select()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        into_declarations(rows)
    }

    async fn upsert_user_skill(
        &self,
        draft: &UserSkillDraft,
    ) -> Result<UserSkill, SkillRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let new_row = NewUserSkillRow {
            id: Uuid::new_v4(),
            user_id: *draft.user_id.as_uuid(),
            skill_id: *draft.skill_id.as_uuid(),
            role: draft.role.as_str(),
            level: draft.level.map(SkillLevel::as_str),
            difficulty_score: draft.difficulty_score,
            weekly_hours_available: draft.weekly_hours_available,
            active: true,
        };
        let row = diesel::insert_into(user_skills::table)
            .values(&new_row)
            .on_conflict((user_skills::user_id, user_skills::skill_id, user_skills::role))
            .do_update()
            .set((
                user_skills::level.eq(excluded(user_skills::level)),
                user_skills::difficulty_score.eq(excluded(user_skills::difficulty_score)),
                user_skills::weekly_hours_available
                    .eq(excluded(user_skills::weekly_hours_available)),
                user_skills::active.eq(true),
            ))
            .returning(UserSkillRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    SkillRepositoryError::unknown_skill(draft.skill_id.to_string())
                } else {
                    map_diesel_error(err)
                }
            })?;
        let skill = skills::table
            .filter(skills::id.eq(draft.skill_id.as_uuid()))
            .select(SkillRow::as_select())
            .first(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        user_skill_from_rows(row, skill).map_err(SkillRepositoryError::query)
    }

    async fn deactivate_user_skill(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<bool, SkillRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(user_skills::table)
            .filter(
                user_skills::user_id
                    .eq(user_id.as_uuid())
                    .and(user_skills::skill_id.eq(skill_id.as_uuid()))
                    .and(user_skills::role.eq(role.as_str()))
                    .and(user_skills::active.eq(true)),
            )
            .set(user_skills::active.eq(false))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn apply_assessment(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        assessment: &SkillAssessment,
    ) -> Result<Option<UserSkill>, SkillRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(user_skills::table)
            .filter(
                user_skills::user_id
                    .eq(user_id.as_uuid())
                    .and(user_skills::skill_id.eq(skill_id.as_uuid()))
                    .and(user_skills::role.eq(SkillRole::Teach.as_str()))
                    .and(user_skills::active.eq(true)),
            )
            .set((
                user_skills::level.eq(Some(assessment.level.as_str())),
                user_skills::difficulty_score.eq(Some(assessment.difficulty)),
            ))
            .returning(UserSkillRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        let Some(row) = updated else {
            return Ok(None);
        };
        let skill = skills::table
            .filter(skills::id.eq(skill_id.as_uuid()))
            .select(SkillRow::as_select())
            .first(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        user_skill_from_rows(row, skill)
            .map(Some)
            .map_err(SkillRepositoryError::query)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for error mapping.

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let err = map_pool_error(PoolError::checkout("connection refused"));

        assert!(matches!(err, SkillRepositoryError::Connection { .. }));
        assert!(err.to_string().contains("connection refused"));
    }

    #[rstest]
    fn diesel_error_maps_to_query_error() {
        let err = map_diesel_error(diesel::result::Error::NotFound);

        assert!(matches!(err, SkillRepositoryError::Query { .. }));
        assert!(err.to_string().contains("record not found"));
    }

    #[rstest]
    fn malformed_rows_surface_as_query_errors() {
        let skill = SkillRow {
            id: Uuid::new_v4(),
            name: "Pottery".to_owned(),
            category: "Crafts".to_owned(),
            demand_score: None,
            base_difficulty: None,
        };
        let row = UserSkillRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            skill_id: skill.id,
            role: "mentor".to_owned(),
            level: None,
            difficulty_score: None,
            weekly_hours_available: None,
            active: true,
        };

        let err = into_declaration(Some((row, skill))).expect_err("bad role");

        assert!(matches!(err, SkillRepositoryError::Query { .. }));
    }
}
