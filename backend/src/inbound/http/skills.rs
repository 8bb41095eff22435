//! Skill inventory HTTP handlers.
//!
//! ```text
//! GET    /api/v1/skills?role=teach|learn
//! POST   /api/v1/skills
//! DELETE /api/v1/skills/{skill_id}?role=teach|learn
//! PUT    /api/v1/skills/{skill_id}/assessment
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    Error, Skill, SkillAssessment, SkillDeclaration, SkillLevel, SkillRole, UserSkill,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::identity::Caller;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, finite_number, missing_field_error, parse_level, parse_role, parse_skill_id,
};

/// Shared skill reference data.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkillSummaryBody {
    #[schema(format = "uuid")]
    pub skill_id: String,
    pub name: String,
    pub category: String,
}

impl From<&Skill> for SkillSummaryBody {
    fn from(skill: &Skill) -> Self {
        Self {
            skill_id: skill.id.to_string(),
            name: skill.name.clone(),
            category: skill.category.clone(),
        }
    }
}

/// A user's declaration against a skill.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSkillBody {
    #[schema(format = "uuid")]
    pub skill_id: String,
    pub name: String,
    pub category: String,
    pub role: SkillRole,
    pub level: Option<SkillLevel>,
    pub difficulty_score: Option<f64>,
    /// `null` means no weekly limit.
    pub weekly_hours_available: Option<f64>,
}

impl From<&UserSkill> for UserSkillBody {
    fn from(row: &UserSkill) -> Self {
        Self {
            skill_id: row.skill.id.to_string(),
            name: row.skill.name.clone(),
            category: row.skill.category.clone(),
            role: row.role,
            level: row.level,
            difficulty_score: row.difficulty_score,
            weekly_hours_available: row.weekly_cap(),
        }
    }
}

/// Request payload for declaring a skill.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddSkillRequestBody {
    pub name: String,
    pub category: String,
    #[schema(example = "teach")]
    pub role: String,
    #[schema(example = "intermediate")]
    pub level: Option<String>,
    pub difficulty_score: Option<f64>,
    pub weekly_hours_available: Option<f64>,
}

/// Request payload carrying an external skill assessment.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRequestBody {
    #[schema(example = "advanced")]
    pub level: String,
    pub difficulty: f64,
    #[serde(default)]
    pub explanation: String,
}

/// `?role=` query parameter.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoleQuery {
    /// `teach` or `learn`.
    pub role: Option<String>,
}

const ROLE: FieldName = FieldName::new("role");
const SKILL_ID: FieldName = FieldName::new("skillId");

fn optional_finite(value: Option<f64>, field: FieldName) -> Result<Option<f64>, Error> {
    value.map(|number| finite_number(number, field)).transpose()
}

fn parse_declaration(body: AddSkillRequestBody) -> Result<SkillDeclaration, Error> {
    Ok(SkillDeclaration {
        name: body.name,
        category: body.category,
        role: parse_role(Some(body.role.as_str()), ROLE)?,
        level: parse_level(body.level.as_deref(), FieldName::new("level"))?,
        difficulty_score: optional_finite(
            body.difficulty_score,
            FieldName::new("difficultyScore"),
        )?,
        weekly_hours_available: optional_finite(
            body.weekly_hours_available,
            FieldName::new("weeklyHoursAvailable"),
        )?,
    })
}

fn parse_assessment(body: AssessmentRequestBody) -> Result<SkillAssessment, Error> {
    let level = parse_level(Some(body.level.as_str()), FieldName::new("level"))?
        .ok_or_else(|| missing_field_error(FieldName::new("level")))?;
    Ok(SkillAssessment {
        level,
        difficulty: finite_number(body.difficulty, FieldName::new("difficulty"))?,
        explanation: body.explanation,
    })
}

/// List the caller's active skills in one role.
#[utoipa::path(
    get,
    path = "/api/v1/skills",
    params(RoleQuery),
    responses(
        (status = 200, description = "Active skills", body = [UserSkillBody]),
        (status = 400, description = "Invalid role", body = Error),
        (status = 401, description = "Missing caller identity", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["skills"],
    operation_id = "listSkills",
    security(("XUserId" = []))
)]
#[get("/skills")]
pub async fn list_skills(
    state: web::Data<HttpState>,
    caller: Caller,
    query: web::Query<RoleQuery>,
) -> ApiResult<web::Json<Vec<UserSkillBody>>> {
    let role = parse_role(query.role.as_deref(), ROLE)?;
    let rows = state.skills.list_skills(caller.user_id(), role).await?;
    Ok(web::Json(rows.iter().map(UserSkillBody::from).collect()))
}

/// Declare or re-declare a skill.
#[utoipa::path(
    post,
    path = "/api/v1/skills",
    request_body = AddSkillRequestBody,
    responses(
        (status = 201, description = "Skill declared", body = UserSkillBody),
        (status = 400, description = "Invalid declaration", body = Error),
        (status = 401, description = "Missing caller identity", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["skills"],
    operation_id = "addSkill",
    security(("XUserId" = []))
)]
#[post("/skills")]
pub async fn add_skill(
    state: web::Data<HttpState>,
    caller: Caller,
    payload: web::Json<AddSkillRequestBody>,
) -> ApiResult<HttpResponse> {
    let declaration = parse_declaration(payload.into_inner())?;
    let row = state.skills.add_skill(caller.user_id(), declaration).await?;
    Ok(HttpResponse::Created().json(UserSkillBody::from(&row)))
}

/// Deactivate one of the caller's skills.
#[utoipa::path(
    delete,
    path = "/api/v1/skills/{skill_id}",
    params(
        ("skill_id" = String, Path, format = "uuid", description = "Skill identifier"),
        RoleQuery
    ),
    responses(
        (status = 204, description = "Skill removed"),
        (status = 400, description = "Invalid identifier or role", body = Error),
        (status = 401, description = "Missing caller identity", body = Error),
        (status = 404, description = "No active declaration", body = Error)
    ),
    tags = ["skills"],
    operation_id = "removeSkill",
    security(("XUserId" = []))
)]
#[delete("/skills/{skill_id}")]
pub async fn remove_skill(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
    query: web::Query<RoleQuery>,
) -> ApiResult<HttpResponse> {
    let skill_id = parse_skill_id(&path, SKILL_ID)?;
    let role = parse_role(query.role.as_deref(), ROLE)?;
    state
        .skills
        .remove_skill(caller.user_id(), &skill_id, role)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Apply an external assessment to the caller's teaching declaration.
#[utoipa::path(
    put,
    path = "/api/v1/skills/{skill_id}/assessment",
    params(("skill_id" = String, Path, format = "uuid", description = "Skill identifier")),
    request_body = AssessmentRequestBody,
    responses(
        (status = 200, description = "Assessment applied", body = UserSkillBody),
        (status = 400, description = "Invalid assessment", body = Error),
        (status = 401, description = "Missing caller identity", body = Error),
        (status = 404, description = "No active teaching declaration", body = Error)
    ),
    tags = ["skills"],
    operation_id = "applyAssessment",
    security(("XUserId" = []))
)]
#[put("/skills/{skill_id}/assessment")]
pub async fn apply_assessment(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
    payload: web::Json<AssessmentRequestBody>,
) -> ApiResult<web::Json<UserSkillBody>> {
    let skill_id = parse_skill_id(&path, SKILL_ID)?;
    let assessment = parse_assessment(payload.into_inner())?;
    let row = state
        .skills
        .apply_assessment(caller.user_id(), &skill_id, assessment)
        .await?;
    Ok(web::Json(UserSkillBody::from(&row)))
}

#[cfg(test)]
#[path = "skills_tests.rs"]
mod tests;
