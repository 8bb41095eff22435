//! Swap proposal and lifecycle service.
//!
//! Proposals are validated in a fixed order: input, locked skill, duplicate
//! check, declarations, then capacity recomputed fresh from the ledger. The
//! repository repeats the duplicate and capacity checks atomically with the
//! insert, so two concurrent confirmations cannot both overcommit a teacher.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    CounterSwapRequest, ProfileCache, ProposeSwapRequest, SkillRepository, SkillRepositoryError,
    SwapActionRequest, SwapCommand, SwapRepository, SwapRepositoryError,
};
use crate::domain::{
    Capacity, CapacityLedger, Error, FairnessScore, HOURS_EPSILON, NewSwapProposal, SkillId,
    SkillRole, Swap, SwapId, SwapStatus, SwapTerms, SwapTransition, SwapTransitionError, UserId,
    UserSkill, ValuedSkill, compute_fairness, compute_value, explain_fairness,
};

/// Service implementing [`SwapCommand`].
pub struct SwapWorkflowService<S: ?Sized, W: ?Sized, C: ?Sized> {
    skills: Arc<S>,
    swaps: Arc<W>,
    profiles: Arc<C>,
    ledger: CapacityLedger<S, W>,
    clock: Arc<dyn Clock>,
}

impl<S: ?Sized, W: ?Sized, C: ?Sized> SwapWorkflowService<S, W, C> {
    /// Create the service. The ledger should share the same repositories.
    pub fn new(
        skills: Arc<S>,
        swaps: Arc<W>,
        profiles: Arc<C>,
        ledger: CapacityLedger<S, W>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            skills,
            swaps,
            profiles,
            ledger,
            clock,
        }
    }
}

fn map_skill_error(error: SkillRepositoryError) -> Error {
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

fn map_swap_error(error: SwapRepositoryError) -> Error {
    match error {
        SwapRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("swap repository unavailable: {message}"))
        }
        SwapRepositoryError::Query { message } => {
            Error::internal(format!("swap repository error: {message}"))
        }
        SwapRepositoryError::DuplicateProposal { existing } => {
            duplicate_proposal(SwapId::from_uuid(existing))
        }
        SwapRepositoryError::CapacityExceeded {
            user_id,
            skill_id,
            requested,
            remaining,
        } => Error::conflict("requested hours exceed remaining capacity").with_details(json!({
            "code": "capacity_exceeded",
            "userId": user_id,
            "skillId": skill_id,
            "requestedHours": requested,
            "remainingHours": remaining,
        })),
        SwapRepositoryError::StatusConflict { expected, actual } => {
            Error::conflict("swap changed while the request was in flight").with_details(json!({
                "code": "invalid_transition",
                "expectedStatus": expected,
                "actualStatus": actual,
            }))
        }
        SwapRepositoryError::NotFound { swap_id } => {
            Error::not_found(format!("swap {swap_id} not found"))
        }
        SwapRepositoryError::Contention { message } => {
            Error::conflict(format!("swap was updated concurrently: {message}"))
                .with_details(json!({ "code": "concurrent_update" }))
        }
    }
}

fn map_transition_error(error: &SwapTransitionError) -> Error {
    match error {
        SwapTransitionError::NotParticipant => Error::forbidden(error.to_string()),
        SwapTransitionError::InvalidTransition { from, action } => {
            Error::conflict(error.to_string()).with_details(json!({
                "code": "invalid_transition",
                "status": from.as_str(),
                "action": action.as_str(),
            }))
        }
        SwapTransitionError::AlreadyAccepted => Error::conflict(error.to_string())
            .with_details(json!({ "code": "invalid_transition" })),
        SwapTransitionError::UnchangedCounter => Error::invalid_request(error.to_string()),
        SwapTransitionError::SameSkillExchange => Error::invalid_request(error.to_string())
            .with_details(json!({ "code": "same_skill" })),
    }
}

fn duplicate_proposal(existing: SwapId) -> Error {
    Error::conflict("an open swap already exists for these skills").with_details(json!({
        "code": "duplicate_proposal",
        "existingSwapId": existing,
    }))
}

fn capacity_exceeded(requested: f64, remaining: f64) -> Error {
    Error::conflict(format!(
        "requested {requested} h/week but only {remaining} h/week remain"
    ))
    .with_details(json!({
        "code": "capacity_exceeded",
        "requestedHours": requested,
        "remainingHours": remaining,
    }))
}

fn validate_request(request: &ProposeSwapRequest) -> Result<(), Error> {
    let hours = request.hours_per_week;
    if !hours.is_finite() || hours <= 0.0 {
        return Err(Error::invalid_request("hoursPerWeek must be greater than zero")
            .with_details(json!({ "field": "hoursPerWeek", "code": "invalid_hours" })));
    }
    if request.proposer == request.partner {
        return Err(Error::invalid_request("cannot propose a swap with yourself"));
    }
    if request.proposer_teaches == request.proposer_learns {
        return Err(Error::invalid_request(
            "a swap must exchange two different skills",
        ));
    }
    let locked_side = match request.locked.role {
        SkillRole::Teach => request.proposer_teaches,
        SkillRole::Learn => request.proposer_learns,
    };
    if locked_side != request.locked.skill_id {
        return Err(
            Error::data_integrity("confirmed swap no longer refers to the selected skill")
                .with_details(json!({
                    "code": "skill_mismatch",
                    "role": request.locked.role.as_str(),
                    "lockedSkillId": request.locked.skill_id,
                    "confirmedSkillId": locked_side,
                })),
        );
    }
    Ok(())
}

fn rationale(explanation: &str, hours: f64, note: Option<&str>) -> String {
    let mut text = format!("{explanation} Proposed at {hours} h/week each way.");
    if let Some(note) = note.map(str::trim).filter(|note| !note.is_empty()) {
        text.push_str(" Note: ");
        text.push_str(note);
    }
    text
}

impl<S, W, C> SwapWorkflowService<S, W, C>
where
    S: SkillRepository + ?Sized,
    W: SwapRepository + ?Sized,
    C: ProfileCache + ?Sized,
{
    async fn teach_declaration(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
    ) -> Result<UserSkill, Error> {
        self.skills
            .find_active_user_skill(user_id, skill_id, SkillRole::Teach)
            .await
            .map_err(map_skill_error)?
            .ok_or_else(|| {
                Error::data_integrity("swap refers to a skill the user no longer teaches")
                    .with_details(json!({
                        "code": "missing_declaration",
                        "userId": user_id,
                        "skillId": skill_id,
                    }))
            })
    }

    async fn reputation(&self, user_id: &UserId) -> Option<f64> {
        match self.profiles.get_or_fetch(user_id).await {
            Ok(profile) => profile.and_then(|profile| profile.reputation),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "profile unavailable; using default reputation");
                None
            }
        }
    }

    /// Score `a` teaching `a_skill` against `b` teaching `b_skill`.
    async fn score(&self, a_skill: &UserSkill, b_skill: &UserSkill) -> (FairnessScore, String) {
        let a_value = compute_value(a_skill, self.reputation(&a_skill.user_id).await);
        let b_value = compute_value(b_skill, self.reputation(&b_skill.user_id).await);
        let fairness = compute_fairness(a_value, b_value);
        let explanation = explain_fairness(
            ValuedSkill {
                name: &a_skill.skill.name,
                value: a_value,
            },
            ValuedSkill {
                name: &b_skill.skill.name,
                value: b_value,
            },
            fairness,
        );
        (fairness, explanation)
    }

    async fn fresh_capacity(&self, user_id: &UserId, skill_id: &SkillId) -> Result<Capacity, Error> {
        self.ledger
            .remaining_capacity(user_id, skill_id, SkillRole::Teach)
            .await
            .map_err(|err| {
                Error::service_unavailable("capacity could not be verified")
                    .with_details(json!({ "code": "capacity_unavailable", "reason": err.to_string() }))
            })
    }

    async fn load(&self, swap_id: &SwapId) -> Result<Swap, Error> {
        self.swaps
            .find_swap(swap_id)
            .await
            .map_err(map_swap_error)?
            .ok_or_else(|| Error::not_found(format!("swap {swap_id} not found")))
    }

    async fn persist(&self, expected_status: SwapStatus, swap: Swap) -> Result<Swap, Error> {
        let capacity_checks = if swap.status == SwapStatus::Active {
            swap.teaching_commitments()
        } else {
            Vec::new()
        };
        let completion_credits = if swap.status == SwapStatus::Completed {
            swap.completion_credits()
        } else {
            Vec::new()
        };
        let recheck_open_duplicates = swap.status == SwapStatus::Countered;
        let transition = SwapTransition {
            swap,
            expected_status,
            capacity_checks,
            completion_credits,
            recheck_open_duplicates,
        };
        let stored = self
            .swaps
            .apply_transition(&transition)
            .await
            .map_err(map_swap_error)?;
        if stored.status == SwapStatus::Completed {
            for participant in &stored.participants {
                self.profiles.invalidate(&participant.user_id);
            }
        }
        info!(
            swap_id = %stored.id,
            from = %expected_status,
            to = %stored.status,
            "swap transitioned"
        );
        Ok(stored)
    }

    async fn transition(
        &self,
        request: &SwapActionRequest,
        apply: fn(&mut Swap, &UserId, chrono::DateTime<chrono::Utc>) -> Result<(), SwapTransitionError>,
    ) -> Result<Swap, Error> {
        let mut swap = self.load(&request.swap_id).await?;
        let expected_status = swap.status;
        apply(&mut swap, &request.actor, self.clock.utc())
            .map_err(|err| map_transition_error(&err))?;
        self.persist(expected_status, swap).await
    }
}

#[async_trait]
impl<S, W, C> SwapCommand for SwapWorkflowService<S, W, C>
where
    S: SkillRepository + ?Sized,
    W: SwapRepository + ?Sized,
    C: ProfileCache + ?Sized,
{
    async fn propose(&self, request: ProposeSwapRequest) -> Result<Swap, Error> {
        validate_request(&request)?;

        if let Some(existing) = self
            .swaps
            .find_open_swap(
                &request.proposer,
                &request.proposer_teaches,
                &request.partner,
                &request.proposer_learns,
            )
            .await
            .map_err(map_swap_error)?
        {
            return Err(duplicate_proposal(existing));
        }

        let proposer_offer = self
            .teach_declaration(&request.proposer, &request.proposer_teaches)
            .await?;
        let partner_offer = self
            .teach_declaration(&request.partner, &request.proposer_learns)
            .await?;

        let proposer_capacity = self
            .fresh_capacity(&request.proposer, &request.proposer_teaches)
            .await?;
        let partner_capacity = self
            .fresh_capacity(&request.partner, &request.proposer_learns)
            .await?;
        let remaining = proposer_capacity
            .remaining_hours()
            .min(partner_capacity.remaining_hours());
        if request.hours_per_week > remaining + HOURS_EPSILON {
            return Err(capacity_exceeded(request.hours_per_week, remaining));
        }

        let (fairness, explanation) = self.score(&proposer_offer, &partner_offer).await;
        let swap = Swap::propose(
            SwapId::random(),
            SwapTerms {
                proposer: request.proposer,
                partner: request.partner,
                proposer_teaches: request.proposer_teaches,
                partner_teaches: request.proposer_learns,
                hours_per_week: request.hours_per_week,
                fairness,
                rationale: rationale(
                    &explanation,
                    request.hours_per_week,
                    request.preferences.note.as_deref(),
                ),
            },
            self.clock.utc(),
        );
        let proposal = NewSwapProposal {
            capacity_checks: swap.teaching_commitments(),
            swap,
        };
        let stored = self
            .swaps
            .create_proposal(&proposal)
            .await
            .map_err(map_swap_error)?;
        info!(
            swap_id = %stored.id,
            fairness = stored.fairness.value(),
            hours_per_week = request.hours_per_week,
            "swap proposed"
        );
        Ok(stored)
    }

    async fn accept(&self, request: SwapActionRequest) -> Result<Swap, Error> {
        self.transition(&request, Swap::accept).await
    }

    async fn decline(&self, request: SwapActionRequest) -> Result<Swap, Error> {
        self.transition(&request, Swap::decline).await
    }

    async fn counter(&self, request: CounterSwapRequest) -> Result<Swap, Error> {
        let mut swap = self.load(&request.swap_id).await?;
        let expected_status = swap.status;
        swap.counter(&request.actor, request.learn_skill_id, self.clock.utc())
            .map_err(|err| map_transition_error(&err))?;

        let (own_teaches, hours) = swap
            .participant(&request.actor)
            .map(|p| (p.teaching_skill_id, p.teaching_hours_per_week))
            .ok_or_else(|| map_transition_error(&SwapTransitionError::NotParticipant))?;
        let other = swap
            .counterpart(&request.actor)
            .map(|p| p.user_id.clone())
            .ok_or_else(|| map_transition_error(&SwapTransitionError::NotParticipant))?;

        if let Some(existing) = self
            .swaps
            .find_open_swap(&request.actor, &own_teaches, &other, &request.learn_skill_id)
            .await
            .map_err(map_swap_error)?
            .filter(|existing| *existing != swap.id)
        {
            return Err(duplicate_proposal(existing));
        }

        let own_offer = self.teach_declaration(&request.actor, &own_teaches).await?;
        let other_offer = self
            .teach_declaration(&other, &request.learn_skill_id)
            .await?;
        let (fairness, explanation) = self.score(&own_offer, &other_offer).await;
        swap.rescore(fairness, rationale(&explanation, hours, None));
        self.persist(expected_status, swap).await
    }

    async fn complete(&self, request: SwapActionRequest) -> Result<Swap, Error> {
        self.transition(&request, Swap::complete).await
    }

    async fn cancel(&self, request: SwapActionRequest) -> Result<Swap, Error> {
        self.transition(&request, Swap::cancel).await
    }
}

#[cfg(test)]
#[path = "swap_service_tests.rs"]
mod tests;
