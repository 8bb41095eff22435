//! Match browsing and discovery handlers.
//!
//! ```text
//! GET /api/v1/matches
//! GET /api/v1/discovery
//! ```

use actix_web::{get, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Capacity, DiscoveryReason, DiscoverySuggestion, Error, RankedMatch};
use crate::inbound::http::ApiResult;
use crate::inbound::http::identity::Caller;
use crate::inbound::http::skills::{SkillSummaryBody, UserSkillBody};
use crate::inbound::http::state::HttpState;

/// Remaining hours for display; `None` when the teacher set no limit.
pub(crate) fn display_remaining(capacity: &Capacity) -> Option<f64> {
    capacity
        .total_hours()
        .map(|_| capacity.remaining_hours())
}

/// A fair, bookable exchange with another user.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchBody {
    #[schema(format = "uuid")]
    pub partner_id: String,
    /// What the caller would teach.
    pub you_teach: UserSkillBody,
    /// What the caller would learn.
    pub you_learn: UserSkillBody,
    pub value_given: f64,
    pub value_received: f64,
    #[schema(minimum = 0, maximum = 100)]
    pub fairness_score: u8,
    #[schema(example = "good")]
    pub fairness_tier: String,
    pub explanation: String,
    /// Upper bound for `hoursPerWeek` when proposing this swap.
    pub max_joint_hours: f64,
    pub your_remaining_hours: Option<f64>,
    pub partner_remaining_hours: Option<f64>,
}

impl From<&RankedMatch> for MatchBody {
    fn from(ranked: &RankedMatch) -> Self {
        let candidate = &ranked.candidate;
        Self {
            partner_id: candidate.partner_id.to_string(),
            you_teach: UserSkillBody::from(&candidate.caller_teaches),
            you_learn: UserSkillBody::from(&candidate.partner_teaches),
            value_given: candidate.value_given,
            value_received: candidate.value_received,
            fairness_score: candidate.fairness.value(),
            fairness_tier: candidate.fairness.tier().as_str().to_owned(),
            explanation: candidate.explanation.clone(),
            max_joint_hours: ranked.max_joint_hours,
            your_remaining_hours: display_remaining(&ranked.caller_capacity),
            partner_remaining_hours: display_remaining(&ranked.partner_capacity),
        }
    }
}

/// A related teaching offer for one of the caller's wishes.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryBody {
    #[schema(format = "uuid")]
    pub partner_id: String,
    pub wanted: SkillSummaryBody,
    pub offered: UserSkillBody,
    pub relevance: f64,
    pub reason: DiscoveryReason,
}

impl From<&DiscoverySuggestion> for DiscoveryBody {
    fn from(suggestion: &DiscoverySuggestion) -> Self {
        Self {
            partner_id: suggestion.partner_id.to_string(),
            wanted: SkillSummaryBody::from(&suggestion.wanted),
            offered: UserSkillBody::from(&suggestion.offered),
            relevance: suggestion.relevance,
            reason: suggestion.reason,
        }
    }
}

/// Ranked matches for the caller.
///
/// Store failures degrade to an empty list rather than an error.
#[utoipa::path(
    get,
    path = "/api/v1/matches",
    responses(
        (status = 200, description = "Matches, best first", body = [MatchBody]),
        (status = 401, description = "Missing caller identity", body = Error)
    ),
    tags = ["matches"],
    operation_id = "listMatches",
    security(("XUserId" = []))
)]
#[get("/matches")]
pub async fn list_matches(
    state: web::Data<HttpState>,
    caller: Caller,
) -> ApiResult<web::Json<Vec<MatchBody>>> {
    let ranked = state.matches.browse_matches(caller.user_id()).await?;
    Ok(web::Json(ranked.iter().map(MatchBody::from).collect()))
}

/// Related offers for the caller's learning wishes.
#[utoipa::path(
    get,
    path = "/api/v1/discovery",
    responses(
        (status = 200, description = "Suggestions, most relevant first", body = [DiscoveryBody]),
        (status = 401, description = "Missing caller identity", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["matches"],
    operation_id = "listDiscovery",
    security(("XUserId" = []))
)]
#[get("/discovery")]
pub async fn list_discovery(
    state: web::Data<HttpState>,
    caller: Caller,
) -> ApiResult<web::Json<Vec<DiscoveryBody>>> {
    let suggestions = state.matches.discover(caller.user_id()).await?;
    Ok(web::Json(suggestions.iter().map(DiscoveryBody::from).collect()))
}
