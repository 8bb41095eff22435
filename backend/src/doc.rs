//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every `/api/v1` handler, the health checks and the
//! response bodies they emit. Authenticated routes declare the `XUserId`
//! scheme: the upstream gateway forwards the caller's UUID in the
//! `x-user-id` header.
//!
//! The generated document backs Swagger UI in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{DiscoveryReason, Error, ErrorCode, SkillLevel, SkillRole, SwapStatus};
use crate::inbound::http::capacity::CapacityBody;
use crate::inbound::http::identity::USER_ID_HEADER;
use crate::inbound::http::matches::{DiscoveryBody, MatchBody};
use crate::inbound::http::skills::{
    AddSkillRequestBody, AssessmentRequestBody, SkillSummaryBody, UserSkillBody,
};
use crate::inbound::http::swaps::{
    CounterSwapRequestBody, LockedSkillBody, ProposeSwapRequestBody, SwapBody,
    SwapParticipantBody,
};

/// Register the caller identity header as an API key scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "XUserId",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                USER_ID_HEADER,
                "Authenticated user UUID forwarded by the upstream auth provider.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Skill swap marketplace API",
        description = "Fair skill-exchange matching, capacity reports and swap lifecycle."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("XUserId" = [])),
    paths(
        crate::inbound::http::matches::list_matches,
        crate::inbound::http::matches::list_discovery,
        crate::inbound::http::capacity::get_capacity,
        crate::inbound::http::skills::list_skills,
        crate::inbound::http::skills::add_skill,
        crate::inbound::http::skills::remove_skill,
        crate::inbound::http::skills::apply_assessment,
        crate::inbound::http::swaps::propose_swap,
        crate::inbound::http::swaps::accept_swap,
        crate::inbound::http::swaps::decline_swap,
        crate::inbound::http::swaps::counter_swap,
        crate::inbound::http::swaps::complete_swap,
        crate::inbound::http::swaps::cancel_swap,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        SkillRole,
        SkillLevel,
        SwapStatus,
        DiscoveryReason,
        SkillSummaryBody,
        UserSkillBody,
        AddSkillRequestBody,
        AssessmentRequestBody,
        MatchBody,
        DiscoveryBody,
        CapacityBody,
        LockedSkillBody,
        ProposeSwapRequestBody,
        CounterSwapRequestBody,
        SwapParticipantBody,
        SwapBody,
    )),
    tags(
        (name = "matches", description = "Fair matches and related offers"),
        (name = "capacity", description = "Remaining weekly teaching hours"),
        (name = "skills", description = "A user's teach and learn declarations"),
        (name = "swaps", description = "Swap proposals and lifecycle"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
