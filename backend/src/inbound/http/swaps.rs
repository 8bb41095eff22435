//! Swap proposal and lifecycle handlers.
//!
//! ```text
//! POST /api/v1/swaps
//! POST /api/v1/swaps/{swap_id}/accept
//! POST /api/v1/swaps/{swap_id}/decline
//! POST /api/v1/swaps/{swap_id}/counter
//! POST /api/v1/swaps/{swap_id}/complete
//! POST /api/v1/swaps/{swap_id}/cancel
//! ```
//!
//! The caller is always the acting participant; the proposer is never taken
//! from the body.

use actix_web::{HttpResponse, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{
    CounterSwapRequest, LockedSkill, ProposalPreferences, ProposeSwapRequest, SwapActionRequest,
};
use crate::domain::{Error, Swap, SwapId, SwapParticipant, SwapStatus, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::identity::Caller;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, finite_number, missing_field_error, parse_role, parse_skill_id, parse_swap_id,
    parse_uuid,
};

/// The skill the proposer picked first.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LockedSkillBody {
    #[schema(example = "learn")]
    pub role: String,
    #[schema(format = "uuid")]
    pub skill_id: String,
}

/// Request payload for proposing a swap.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposeSwapRequestBody {
    #[schema(format = "uuid")]
    pub partner_id: String,
    /// Skill the caller teaches.
    #[schema(format = "uuid")]
    pub teach_skill_id: String,
    /// Skill the caller learns from the partner.
    #[schema(format = "uuid")]
    pub learn_skill_id: String,
    /// The skill picked from the match; the proposal fails if the confirmed
    /// skills no longer include it.
    #[schema(required = true)]
    pub locked_skill: Option<LockedSkillBody>,
    pub hours_per_week: f64,
    pub note: Option<String>,
}

/// Request payload for countering a swap.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CounterSwapRequestBody {
    /// The skill the caller wants to learn instead.
    #[schema(format = "uuid")]
    pub learn_skill_id: String,
}

/// One side of a swap.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SwapParticipantBody {
    #[schema(format = "uuid")]
    pub user_id: String,
    #[schema(format = "uuid")]
    pub teaching_skill_id: String,
    #[schema(format = "uuid")]
    pub learning_skill_id: String,
    pub teaching_hours_per_week: f64,
    pub learning_hours_per_week: f64,
    pub accepted: bool,
}

impl From<&SwapParticipant> for SwapParticipantBody {
    fn from(participant: &SwapParticipant) -> Self {
        Self {
            user_id: participant.user_id.to_string(),
            teaching_skill_id: participant.teaching_skill_id.to_string(),
            learning_skill_id: participant.learning_skill_id.to_string(),
            teaching_hours_per_week: participant.teaching_hours_per_week,
            learning_hours_per_week: participant.learning_hours_per_week,
            accepted: participant.accepted,
        }
    }
}

/// A swap as returned to participants.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SwapBody {
    #[schema(format = "uuid")]
    pub id: String,
    pub status: SwapStatus,
    #[schema(minimum = 0, maximum = 100)]
    pub fairness_score: u8,
    pub fairness_tier: String,
    pub rationale: String,
    /// Proposer first.
    pub participants: Vec<SwapParticipantBody>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Swap> for SwapBody {
    fn from(swap: &Swap) -> Self {
        Self {
            id: swap.id.to_string(),
            status: swap.status,
            fairness_score: swap.fairness.value(),
            fairness_tier: swap.fairness.tier().as_str().to_owned(),
            rationale: swap.rationale.clone(),
            participants: swap
                .participants
                .iter()
                .map(SwapParticipantBody::from)
                .collect(),
            created_at: swap.created_at,
            updated_at: swap.updated_at,
        }
    }
}

const SWAP_ID: FieldName = FieldName::new("swapId");
const LEARN_SKILL_ID: FieldName = FieldName::new("learnSkillId");

fn parse_locked(locked: Option<LockedSkillBody>) -> Result<LockedSkill, Error> {
    let body = locked.ok_or_else(|| missing_field_error(FieldName::new("lockedSkill")))?;
    Ok(LockedSkill {
        role: parse_role(Some(body.role.as_str()), FieldName::new("lockedSkill.role"))?,
        skill_id: parse_skill_id(&body.skill_id, FieldName::new("lockedSkill.skillId"))?,
    })
}

fn parse_proposal(
    proposer: UserId,
    body: ProposeSwapRequestBody,
) -> Result<ProposeSwapRequest, Error> {
    let partner =
        parse_uuid(&body.partner_id, FieldName::new("partnerId")).map(UserId::from_uuid)?;
    let proposer_teaches = parse_skill_id(&body.teach_skill_id, FieldName::new("teachSkillId"))?;
    let proposer_learns = parse_skill_id(&body.learn_skill_id, LEARN_SKILL_ID)?;
    let locked = parse_locked(body.locked_skill)?;
    Ok(ProposeSwapRequest {
        proposer,
        partner,
        proposer_teaches,
        proposer_learns,
        locked,
        hours_per_week: finite_number(body.hours_per_week, FieldName::new("hoursPerWeek"))?,
        preferences: ProposalPreferences { note: body.note },
    })
}

fn action(path: &str, caller: Caller) -> Result<SwapActionRequest, Error> {
    Ok(SwapActionRequest {
        swap_id: parse_swap_id(path, SWAP_ID)?,
        actor: caller.into_user_id(),
    })
}

/// Propose a swap to another user.
#[utoipa::path(
    post,
    path = "/api/v1/swaps",
    request_body = ProposeSwapRequestBody,
    responses(
        (status = 201, description = "Swap proposed", body = SwapBody),
        (status = 400, description = "Invalid proposal", body = Error),
        (status = 401, description = "Missing caller identity", body = Error),
        (status = 409, description = "Capacity exceeded or duplicate proposal", body = Error),
        (status = 422, description = "Selected skill changed", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["swaps"],
    operation_id = "proposeSwap",
    security(("XUserId" = []))
)]
#[post("/swaps")]
pub async fn propose_swap(
    state: web::Data<HttpState>,
    caller: Caller,
    payload: web::Json<ProposeSwapRequestBody>,
) -> ApiResult<HttpResponse> {
    let request = parse_proposal(caller.into_user_id(), payload.into_inner())?;
    let swap = state.swaps.propose(request).await?;
    Ok(HttpResponse::Created().json(SwapBody::from(&swap)))
}

/// Accept the current terms.
#[utoipa::path(
    post,
    path = "/api/v1/swaps/{swap_id}/accept",
    params(("swap_id" = String, Path, format = "uuid", description = "Swap identifier")),
    responses(
        (status = 200, description = "Swap accepted or activated", body = SwapBody),
        (status = 403, description = "Caller is not a participant", body = Error),
        (status = 404, description = "Unknown swap", body = Error),
        (status = 409, description = "Invalid transition or capacity exceeded", body = Error)
    ),
    tags = ["swaps"],
    operation_id = "acceptSwap",
    security(("XUserId" = []))
)]
#[post("/swaps/{swap_id}/accept")]
pub async fn accept_swap(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<web::Json<SwapBody>> {
    let swap = state.swaps.accept(action(&path, caller)?).await?;
    Ok(web::Json(SwapBody::from(&swap)))
}

/// Decline or withdraw before the swap starts.
#[utoipa::path(
    post,
    path = "/api/v1/swaps/{swap_id}/decline",
    params(("swap_id" = String, Path, format = "uuid", description = "Swap identifier")),
    responses(
        (status = 200, description = "Swap cancelled", body = SwapBody),
        (status = 403, description = "Caller is not a participant", body = Error),
        (status = 404, description = "Unknown swap", body = Error),
        (status = 409, description = "Swap already started or finished", body = Error)
    ),
    tags = ["swaps"],
    operation_id = "declineSwap",
    security(("XUserId" = []))
)]
#[post("/swaps/{swap_id}/decline")]
pub async fn decline_swap(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<web::Json<SwapBody>> {
    let swap = state.swaps.decline(action(&path, caller)?).await?;
    Ok(web::Json(SwapBody::from(&swap)))
}

/// Counter by asking to learn a different skill.
#[utoipa::path(
    post,
    path = "/api/v1/swaps/{swap_id}/counter",
    params(("swap_id" = String, Path, format = "uuid", description = "Swap identifier")),
    request_body = CounterSwapRequestBody,
    responses(
        (status = 200, description = "Swap countered", body = SwapBody),
        (status = 400, description = "Counter repeats the current terms", body = Error),
        (status = 403, description = "Caller is not a participant", body = Error),
        (status = 404, description = "Unknown swap", body = Error),
        (status = 409, description = "Invalid transition", body = Error),
        (status = 422, description = "Partner does not teach the skill", body = Error)
    ),
    tags = ["swaps"],
    operation_id = "counterSwap",
    security(("XUserId" = []))
)]
#[post("/swaps/{swap_id}/counter")]
pub async fn counter_swap(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
    payload: web::Json<CounterSwapRequestBody>,
) -> ApiResult<web::Json<SwapBody>> {
    let SwapActionRequest { swap_id, actor } = action(&path, caller)?;
    let learn_skill_id = parse_skill_id(&payload.learn_skill_id, LEARN_SKILL_ID)?;
    let swap = state
        .swaps
        .counter(CounterSwapRequest {
            swap_id,
            actor,
            learn_skill_id,
        })
        .await?;
    Ok(web::Json(SwapBody::from(&swap)))
}

/// Mark an active swap as completed.
#[utoipa::path(
    post,
    path = "/api/v1/swaps/{swap_id}/complete",
    params(("swap_id" = String, Path, format = "uuid", description = "Swap identifier")),
    responses(
        (status = 200, description = "Swap completed", body = SwapBody),
        (status = 403, description = "Caller is not a participant", body = Error),
        (status = 404, description = "Unknown swap", body = Error),
        (status = 409, description = "Swap is not active", body = Error)
    ),
    tags = ["swaps"],
    operation_id = "completeSwap",
    security(("XUserId" = []))
)]
#[post("/swaps/{swap_id}/complete")]
pub async fn complete_swap(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<web::Json<SwapBody>> {
    let swap = state.swaps.complete(action(&path, caller)?).await?;
    Ok(web::Json(SwapBody::from(&swap)))
}

/// Cancel a swap that has not finished.
#[utoipa::path(
    post,
    path = "/api/v1/swaps/{swap_id}/cancel",
    params(("swap_id" = String, Path, format = "uuid", description = "Swap identifier")),
    responses(
        (status = 200, description = "Swap cancelled", body = SwapBody),
        (status = 403, description = "Caller is not a participant", body = Error),
        (status = 404, description = "Unknown swap", body = Error),
        (status = 409, description = "Swap already finished", body = Error)
    ),
    tags = ["swaps"],
    operation_id = "cancelSwap",
    security(("XUserId" = []))
)]
#[post("/swaps/{swap_id}/cancel")]
pub async fn cancel_swap(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<web::Json<SwapBody>> {
    let swap = state.swaps.cancel(action(&path, caller)?).await?;
    Ok(web::Json(SwapBody::from(&swap)))
}

#[cfg(test)]
#[path = "swaps_tests.rs"]
mod tests;
