//! Capacity report handler.
//!
//! ```text
//! GET /api/v1/capacity/{skill_id}?role=teach|learn
//! ```

use actix_web::{get, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Capacity, Error, SkillRole};
use crate::inbound::http::ApiResult;
use crate::inbound::http::identity::Caller;
use crate::inbound::http::matches::display_remaining;
use crate::inbound::http::skills::RoleQuery;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_role, parse_skill_id};

/// Remaining weekly hours on one of the caller's skills.
///
/// JSON has no infinity, so unlimited capacity reports `null` hours.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapacityBody {
    #[schema(format = "uuid")]
    pub skill_id: String,
    pub role: SkillRole,
    pub unlimited: bool,
    pub total_hours: Option<f64>,
    pub allocated_hours: f64,
    pub remaining_hours: Option<f64>,
    pub fully_booked: bool,
    pub partially_booked: bool,
}

impl CapacityBody {
    fn new(skill_id: String, role: SkillRole, capacity: &Capacity) -> Self {
        Self {
            skill_id,
            role,
            unlimited: capacity.is_unlimited(),
            total_hours: capacity.total_hours(),
            allocated_hours: capacity.allocated_hours(),
            remaining_hours: display_remaining(capacity),
            fully_booked: capacity.is_fully_booked(),
            partially_booked: capacity.is_partially_booked(),
        }
    }
}

/// Report the caller's remaining capacity on a skill.
#[utoipa::path(
    get,
    path = "/api/v1/capacity/{skill_id}",
    params(
        ("skill_id" = String, Path, format = "uuid", description = "Skill identifier"),
        RoleQuery
    ),
    responses(
        (status = 200, description = "Capacity report", body = CapacityBody),
        (status = 400, description = "Invalid identifier or role", body = Error),
        (status = 401, description = "Missing caller identity", body = Error),
        (status = 503, description = "Capacity lookup unavailable", body = Error)
    ),
    tags = ["capacity"],
    operation_id = "getCapacity",
    security(("XUserId" = []))
)]
#[get("/capacity/{skill_id}")]
pub async fn get_capacity(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
    query: web::Query<RoleQuery>,
) -> ApiResult<web::Json<CapacityBody>> {
    let skill_id = parse_skill_id(&path, FieldName::new("skillId"))?;
    let role = parse_role(query.role.as_deref(), FieldName::new("role"))?;
    let capacity = state
        .capacity
        .remaining_capacity(caller.user_id(), &skill_id, role)
        .await?;
    Ok(web::Json(CapacityBody::new(
        skill_id.to_string(),
        role,
        &capacity,
    )))
}
